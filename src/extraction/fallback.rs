//! Last-resort extraction through a question-answering capability

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::FallbackConfig;
use crate::traits::*;
use crate::types::*;
use crate::utils::{decimal_from_f64, normalize_money};

/// Asks the capability for the target date's rate and keeps only answers that
/// are both confident and plausible
///
/// The capability is loaded at most once; the loaded model is shared by every
/// run that holds this extractor. An unavailable capability is not an error,
/// the extractor simply never produces a rate.
pub struct NlFallbackExtractor {
    answerer: Arc<dyn QuestionAnswerer>,
    enabled: bool,
    min_confidence: f64,
    min_plausible: BigDecimal,
    max_plausible: BigDecimal,
    context_chars: usize,
    load_timeout: Duration,
    ask_timeout: Duration,
    ready: AtomicBool,
    loading: Mutex<()>,
}

impl NlFallbackExtractor {
    pub fn new(answerer: Arc<dyn QuestionAnswerer>, config: &FallbackConfig) -> Self {
        Self {
            answerer,
            enabled: config.enabled,
            min_confidence: config.min_confidence,
            min_plausible: decimal_from_f64(config.min_plausible),
            max_plausible: decimal_from_f64(config.max_plausible),
            context_chars: config.context_chars,
            load_timeout: Duration::from_secs(config.load_timeout_secs),
            ask_timeout: Duration::from_secs(config.ask_timeout_secs),
            ready: AtomicBool::new(false),
            loading: Mutex::new(()),
        }
    }

    /// Load the capability unless it is disabled or already loaded
    ///
    /// Returns whether the capability is ready afterwards.
    pub async fn load(&self) -> bool {
        if !self.enabled {
            return false;
        }
        let _loading = self.loading.lock().await;
        if self.ready.load(Ordering::SeqCst) {
            return true;
        }

        match tokio::time::timeout(self.load_timeout, self.answerer.load()).await {
            Ok(Ok(())) => {
                self.ready.store(true, Ordering::SeqCst);
                true
            }
            Ok(Err(err)) => {
                log::warn!("fallback model unavailable: {err}");
                false
            }
            Err(_) => {
                log::warn!(
                    "fallback model did not load within {}s",
                    self.load_timeout.as_secs()
                );
                false
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_ready(&self) -> bool {
        self.enabled && self.ready.load(Ordering::SeqCst)
    }

    /// Question put to the capability for a target date
    pub fn question_for(target_date: NaiveDate) -> String {
        format!(
            "What is the daily rate for {}?",
            target_date.format("%d/%m/%Y")
        )
    }

    /// Apply the confidence and plausibility gates to an answer
    pub fn accept(&self, answer: &QaAnswer) -> Option<RateMatch> {
        if answer.score <= self.min_confidence {
            return None;
        }
        let rate = normalize_money(&answer.answer);
        if rate <= self.min_plausible || rate >= self.max_plausible {
            log::debug!(
                "discarding implausible fallback answer '{}' ({:.2})",
                answer.answer,
                answer.score
            );
            return None;
        }
        Some(
            RateMatch::new(rate, Provenance::NlFallback)
                .with_detail(MatchDetail::Confidence(answer.score)),
        )
    }
}

impl std::fmt::Debug for NlFallbackExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NlFallbackExtractor")
            .field("enabled", &self.enabled)
            .field("ready", &self.is_ready())
            .field("min_confidence", &self.min_confidence)
            .finish_non_exhaustive()
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl RateExtractor for NlFallbackExtractor {
    fn provenance(&self) -> Provenance {
        Provenance::NlFallback
    }

    async fn extract(&self, ctx: &ExtractionContext<'_>) -> Option<RateMatch> {
        if !self.is_ready() {
            return None;
        }

        let context = truncate_chars(ctx.text, self.context_chars);
        let question = Self::question_for(ctx.target_date);
        let answer = match tokio::time::timeout(
            self.ask_timeout,
            self.answerer.ask(context, &question),
        )
        .await
        {
            Ok(Ok(answer)) => answer?,
            Ok(Err(err)) => {
                log::warn!("fallback question failed: {err}");
                return None;
            }
            Err(_) => {
                log::warn!(
                    "fallback question unanswered after {}s",
                    self.ask_timeout.as_secs()
                );
                return None;
            }
        };
        self.accept(&answer)
    }
}
