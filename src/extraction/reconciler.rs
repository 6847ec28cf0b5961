//! Ordered chain of extraction strategies

use chrono::NaiveDate;
use std::sync::Arc;

use crate::extraction::{GenericRateExtractor, NlFallbackExtractor, PeriodRateExtractor};
use crate::traits::*;
use crate::types::*;

/// Runs extraction strategies in priority order and keeps the first rate found
///
/// The standard chain is dated periods, then the undated per-night pattern,
/// then the question-answering fallback.
pub struct RateReconciler {
    extractors: Vec<Arc<dyn RateExtractor>>,
}

impl RateReconciler {
    /// Build a reconciler from an explicit strategy order
    pub fn new(extractors: Vec<Arc<dyn RateExtractor>>) -> Self {
        Self { extractors }
    }

    /// The standard chain, with the fallback appended when one is supplied
    pub fn standard(fallback: Option<Arc<NlFallbackExtractor>>) -> Self {
        let mut extractors: Vec<Arc<dyn RateExtractor>> = vec![
            Arc::new(PeriodRateExtractor::new()),
            Arc::new(GenericRateExtractor::new()),
        ];
        if let Some(fallback) = fallback {
            extractors.push(fallback);
        }
        Self::new(extractors)
    }

    /// Provenance tags of the chain, in order
    pub fn strategies(&self) -> Vec<Provenance> {
        self.extractors.iter().map(|e| e.provenance()).collect()
    }

    /// Extract the rate applying to `target_date` from confirmation text
    ///
    /// Returns a zero `NotFound` match when every strategy fails.
    pub async fn reconcile(&self, text: &str, target_date: NaiveDate) -> RateMatch {
        let ctx = ExtractionContext::new(text, target_date);
        for extractor in &self.extractors {
            if let Some(found) = extractor.extract(&ctx).await {
                return found;
            }
        }
        RateMatch::not_found()
    }
}

impl Default for RateReconciler {
    fn default() -> Self {
        Self::standard(None)
    }
}

impl std::fmt::Debug for RateReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateReconciler")
            .field("strategies", &self.strategies())
            .finish()
    }
}
