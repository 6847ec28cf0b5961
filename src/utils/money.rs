//! Money normalization for free-form currency strings

use bigdecimal::{BigDecimal, RoundingMode};
use std::str::FromStr;

/// Turn a free-form currency string into a non-negative decimal
///
/// Everything except digits, `.` and `,` is discarded. With both separators
/// present `,` is read as a thousands separator (`1,842.98`); with only `,`
/// present it is read as the decimal point (`316,35`). Unparseable input
/// yields zero, which callers must treat as "no usable value".
pub fn normalize_money(raw: &str) -> BigDecimal {
    let mut cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    let has_comma = cleaned.contains(',');
    if has_comma && cleaned.contains('.') {
        cleaned.retain(|c| c != ',');
    } else if has_comma {
        cleaned = cleaned.replace(',', ".");
    }

    BigDecimal::from_str(&cleaned).unwrap_or_else(|_| BigDecimal::from(0))
}

/// Format an amount with two decimals behind a currency symbol, e.g. `R$401.40`
pub fn format_money(symbol: &str, amount: &BigDecimal) -> String {
    format!("{}{}", symbol, amount.with_scale_round(2, RoundingMode::HalfUp))
}

/// Parse a configuration value such as `1.0` or `5000` into a decimal
pub(crate) fn decimal_from_f64(value: f64) -> BigDecimal {
    BigDecimal::from_str(&value.to_string()).unwrap_or_else(|_| BigDecimal::from(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_thousands_comma_with_decimal_point() {
        assert_eq!(normalize_money("1,842.98"), dec("1842.98"));
        assert_eq!(normalize_money("R$ 1,842.98 BRL"), dec("1842.98"));
    }

    #[test]
    fn test_comma_as_decimal_point() {
        assert_eq!(normalize_money("316,35"), dec("316.35"));
        assert_eq!(normalize_money("R$401,40"), dec("401.40"));
    }

    #[test]
    fn test_plain_amounts() {
        assert_eq!(normalize_money("401.40"), dec("401.40"));
        assert_eq!(normalize_money("  250 "), dec("250"));
    }

    #[test]
    fn test_unparseable_yields_zero() {
        assert_eq!(normalize_money(""), BigDecimal::from(0));
        assert_eq!(normalize_money("garbage"), BigDecimal::from(0));
        assert_eq!(normalize_money("."), BigDecimal::from(0));
        assert_eq!(normalize_money("1.842.98"), BigDecimal::from(0));
    }

    #[test]
    fn test_sign_is_discarded() {
        assert_eq!(normalize_money("-12.50"), dec("12.50"));
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money("R$", &dec("401.4")), "R$401.40");
        assert_eq!(format_money("R$", &dec("1842.985")), "R$1842.99");
        assert_eq!(format_money("$", &BigDecimal::from(0)), "$0.00");
    }

    #[test]
    fn test_decimal_from_f64() {
        assert_eq!(decimal_from_f64(1.0), BigDecimal::from(1));
        assert_eq!(decimal_from_f64(5000.0), BigDecimal::from(5000));
        assert_eq!(decimal_from_f64(0.5), dec("0.5"));
    }
}
