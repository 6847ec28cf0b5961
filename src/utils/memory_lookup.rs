//! In-memory collaborators for testing and development

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::traits::*;
use crate::types::*;

/// In-memory lookup session keyed by booking reference
///
/// References without an entry answer `LookupError::NotFound`. Clones share
/// the same state, so a test can keep a handle and inspect the queries made.
#[derive(Debug, Clone, Default)]
pub struct MemoryLookup {
    messages: Arc<RwLock<HashMap<String, Result<String, LookupError>>>>,
    delays: Arc<RwLock<HashMap<String, Duration>>>,
    queries: Arc<RwLock<Vec<String>>>,
}

impl MemoryLookup {
    /// Create an empty lookup
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the confirmation text for a reference
    pub fn with_message(self, reference: &str, text: &str) -> Self {
        self.write_messages()
            .insert(reference.to_string(), Ok(text.to_string()));
        self
    }

    /// Make lookups of `reference` fail with `error`
    pub fn with_failure(self, reference: &str, error: LookupError) -> Self {
        self.write_messages().insert(reference.to_string(), Err(error));
        self
    }

    /// Make lookups of `reference` stall for `delay` before answering
    pub fn with_delay(self, reference: &str, delay: Duration) -> Self {
        if let Ok(mut delays) = self.delays.write() {
            delays.insert(reference.to_string(), delay);
        }
        self
    }

    /// References queried so far, in order
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .read()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }

    fn write_messages(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Result<String, LookupError>>> {
        match self.messages.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl ConfirmationLookup for MemoryLookup {
    async fn find(&mut self, reference: &str, _timeout: Duration) -> Result<String, LookupError> {
        if let Ok(mut queries) = self.queries.write() {
            queries.push(reference.to_string());
        }

        let delay = self
            .delays
            .read()
            .ok()
            .and_then(|delays| delays.get(reference).copied());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let answer = self
            .messages
            .read()
            .map_err(|e| LookupError::Session(e.to_string()))?
            .get(reference)
            .cloned();
        answer.unwrap_or(Err(LookupError::NotFound))
    }
}

/// Question answerer that replays a fixed answer
#[derive(Debug, Clone)]
pub struct ScriptedAnswerer {
    answer: Option<QaAnswer>,
    available: bool,
    loads: Arc<AtomicUsize>,
    questions: Arc<RwLock<Vec<String>>>,
}

impl ScriptedAnswerer {
    /// Answerer that always replies `answer` with confidence `score`
    pub fn answering(answer: &str, score: f64) -> Self {
        Self {
            answer: Some(QaAnswer {
                answer: answer.to_string(),
                score,
            }),
            available: true,
            loads: Arc::new(AtomicUsize::new(0)),
            questions: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Answerer that loads but never finds an answer
    pub fn silent() -> Self {
        Self {
            answer: None,
            ..Self::answering("", 0.0)
        }
    }

    /// Answerer whose model fails to load
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::silent()
        }
    }

    /// Number of times `load` was called
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Questions asked so far
    pub fn questions(&self) -> Vec<String> {
        self.questions
            .read()
            .map(|questions| questions.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QuestionAnswerer for ScriptedAnswerer {
    async fn load(&self) -> ReconResult<()> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.available {
            Ok(())
        } else {
            Err(ReconError::Capability("model weights not installed".to_string()))
        }
    }

    async fn ask(&self, _context: &str, question: &str) -> ReconResult<Option<QaAnswer>> {
        if let Ok(mut questions) = self.questions.write() {
            questions.push(question.to_string());
        }
        Ok(self.answer.clone())
    }
}
