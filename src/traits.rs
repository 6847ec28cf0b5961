//! Traits for the collaborators the reconciliation engine is wired to

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::time::Duration;

use crate::extraction::PeriodRateExtractor;
use crate::types::*;

/// Source of ledger records for one run
///
/// Implementations return records in ledger order. An empty vector is a valid
/// answer; the pipeline treats it as "nothing to reconcile".
pub trait LedgerSource: Send + Sync {
    /// Load every usable record
    fn load(&self) -> ReconResult<Vec<LedgerRecord>>;
}

/// Session that finds the confirmation text for a booking reference
///
/// The session is stateful (one mailbox view, one cursor) and is owned
/// exclusively by a single run, hence `&mut self`.
#[async_trait]
pub trait ConfirmationLookup: Send {
    /// Find the confirmation text for `reference`, waiting at most `timeout`
    /// for each interaction with the underlying view.
    async fn find(&mut self, reference: &str, timeout: Duration) -> Result<String, LookupError>;
}

/// Answer span returned by a question-answering capability
#[derive(Debug, Clone, PartialEq)]
pub struct QaAnswer {
    pub answer: String,
    /// Confidence in `[0, 1]`
    pub score: f64,
}

/// Extractive question answering over confirmation text
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    /// Load the underlying model. Errors mean the capability is unavailable.
    async fn load(&self) -> ReconResult<()>;

    /// Ask `question` about `context`
    async fn ask(&self, context: &str, question: &str) -> ReconResult<Option<QaAnswer>>;
}

/// Receives the side effects of a run, synchronously, from the worker task
///
/// Implementations must return quickly; the worker does not advance while a
/// callback is running.
pub trait RunObserver: Send {
    fn on_log(&mut self, message: &str);

    /// `fraction` is in `[0, 1]` and never decreases within a run
    fn on_progress(&mut self, fraction: f64, text: &str);

    /// Called exactly once per run, including cancelled and aborted runs
    fn on_complete(&mut self, report: &RunReport);
}

/// Everything an extractor may look at for one confirmation text
///
/// Period statements are scanned once on construction so later strategies can
/// see whether the text carries dated rate data at all.
#[derive(Debug, Clone)]
pub struct ExtractionContext<'a> {
    pub text: &'a str,
    pub target_date: NaiveDate,
    periods: Vec<ValidityPeriod>,
}

impl<'a> ExtractionContext<'a> {
    pub fn new(text: &'a str, target_date: NaiveDate) -> Self {
        Self {
            text,
            target_date,
            periods: PeriodRateExtractor::scan(text),
        }
    }

    /// Every period statement in document order, applying or not
    pub fn periods(&self) -> &[ValidityPeriod] {
        &self.periods
    }

    pub fn has_periods(&self) -> bool {
        !self.periods.is_empty()
    }
}

/// One rate extraction strategy
#[async_trait]
pub trait RateExtractor: Send + Sync {
    /// Tag recorded on rates this strategy produces
    fn provenance(&self) -> Provenance;

    /// Try to extract the rate for the context's target date
    async fn extract(&self, ctx: &ExtractionContext<'_>) -> Option<RateMatch>;
}

/// Shared helper for strategies: a rate of zero is never a usable match
pub(crate) fn usable_rate(rate: BigDecimal) -> Option<BigDecimal> {
    if rate > BigDecimal::from(0) {
        Some(rate)
    } else {
        None
    }
}
