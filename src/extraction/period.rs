//! Explicit validity-period statements
//!
//! Confirmations that list rate changes carry one line per period, e.g.
//! `from Wednesday, November 19 2025 to Friday, November 21 2025 : R$401.40 BRL`.
//! The end date is the checkout day and is not covered by the period's rate.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

use crate::traits::*;
use crate::types::*;
use crate::utils::{normalize_date, normalize_money};

fn period_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)from\s+[^,\n]*?,\s*([a-z]+)\.?\s+(\d{1,2}),?\s+(\d{4})\s+to\s+[^,\n]*?,\s*([a-z]+)\.?\s+(\d{1,2}),?\s+(\d{4})\s*:\s*(?:[a-z]{0,3}\s?[$€£]|(?-i:[A-Z]{3}))?\s*(\d(?:[\d.,]*\d)?)",
        )
        .expect("invalid period regex")
    })
}

/// Finds the period whose half-open interval contains the target date
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodRateExtractor;

impl PeriodRateExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Every period statement in `text`, in document order
    ///
    /// Statements whose dates fail to normalize are kept with `None`
    /// endpoints: they still mark the text as carrying period data.
    pub fn scan(text: &str) -> Vec<ValidityPeriod> {
        period_re()
            .captures_iter(text)
            .map(|caps| ValidityPeriod {
                start: normalize_date(&caps[2], &caps[1], &caps[3]),
                end: normalize_date(&caps[5], &caps[4], &caps[6]),
                rate: normalize_money(&caps[7]),
            })
            .collect()
    }

    /// First period in document order that applies to the target date
    pub fn select(ctx: &ExtractionContext<'_>) -> Option<RateMatch> {
        ctx.periods()
            .iter()
            .filter(|period| period.contains(ctx.target_date))
            .find_map(|period| {
                let rate = usable_rate(period.rate.clone())?;
                let (start, end) = (period.start?, period.end?);
                Some(
                    RateMatch::new(rate, Provenance::PeriodMatch)
                        .with_detail(MatchDetail::Period { start, end }),
                )
            })
    }
}

#[async_trait]
impl RateExtractor for PeriodRateExtractor {
    fn provenance(&self) -> Provenance {
        Provenance::PeriodMatch
    }

    async fn extract(&self, ctx: &ExtractionContext<'_>) -> Option<RateMatch> {
        let found = Self::select(ctx);
        if found.is_none() && ctx.has_periods() {
            log::debug!(
                "{} period statement(s) found, none covers {}",
                ctx.periods().len(),
                ctx.target_date
            );
        }
        found
    }
}
