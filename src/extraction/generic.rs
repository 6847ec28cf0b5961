//! Single undated "per night" statements

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

use crate::traits::*;
use crate::types::*;
use crate::utils::normalize_money;

fn per_night_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:[a-z]{0,3}\s?[$€£]|(?-i:\b[A-Z]{3}\b))\s*(\d(?:[\d.,]*\d)?)\s*(?:(?-i:[A-Z]{3})\s*)?(?:per|a|/)\s*night",
        )
        .expect("invalid per-night regex")
    })
}

/// Reads a single nightly rate from text that carries no period statements
///
/// Once a text lists dated periods, an undated rate is ambiguous, so this
/// strategy stays silent whenever the context holds any period at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericRateExtractor;

impl GenericRateExtractor {
    pub fn new() -> Self {
        Self
    }

    /// The first "per night" amount in `text`, if any
    pub fn find(text: &str) -> Option<bigdecimal::BigDecimal> {
        let caps = per_night_re().captures(text)?;
        usable_rate(normalize_money(&caps[1]))
    }
}

#[async_trait]
impl RateExtractor for GenericRateExtractor {
    fn provenance(&self) -> Provenance {
        Provenance::GenericPattern
    }

    async fn extract(&self, ctx: &ExtractionContext<'_>) -> Option<RateMatch> {
        if ctx.has_periods() {
            return None;
        }
        Self::find(ctx.text).map(|rate| RateMatch::new(rate, Provenance::GenericPattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn target() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 20).unwrap()
    }

    #[test]
    fn test_find_per_night_variants() {
        let expected = BigDecimal::from_str("401.40").unwrap();
        assert_eq!(
            GenericRateExtractor::find("Rate: R$401.40 BRL per night"),
            Some(expected.clone())
        );
        assert_eq!(
            GenericRateExtractor::find("Daily rate : R$ 401,40 per night, taxes included"),
            Some(expected.clone())
        );
        assert_eq!(
            GenericRateExtractor::find("BRL 401.40 PER NIGHT"),
            Some(expected)
        );
        assert_eq!(GenericRateExtractor::find("Total stay: R$802.80 BRL"), None);
    }

    #[tokio::test]
    async fn test_extract_without_periods() {
        let ctx = ExtractionContext::new("Your rate: US$ 1,250.00 USD per night", target());
        let found = GenericRateExtractor.extract(&ctx).await.unwrap();
        assert_eq!(found.rate, BigDecimal::from(1250));
        assert_eq!(found.provenance, Provenance::GenericPattern);
    }

    #[tokio::test]
    async fn test_suppressed_by_any_period_statement() {
        let text = "from Monday, December 1 2025 to Wednesday, December 3 2025 : R$500.00 BRL\n\
                    Average: R$401.40 BRL per night";
        let ctx = ExtractionContext::new(text, target());
        assert!(ctx.has_periods());
        assert!(GenericRateExtractor.extract(&ctx).await.is_none());
    }
}
