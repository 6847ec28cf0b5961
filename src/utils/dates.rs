//! Date normalization for English month names and operator-supplied dates

use chrono::NaiveDate;

use crate::types::{ReconError, ReconResult};

/// Map an English month name, full or abbreviated, to its number
///
/// Matching is case-insensitive and fails closed: unknown names give `None`.
pub fn month_number(name: &str) -> Option<u32> {
    let month = match name.trim().to_ascii_lowercase().as_str() {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sep" | "sept" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Build a calendar date from a day, an English month name and a year
pub fn normalize_date(day: &str, month: &str, year: &str) -> Option<NaiveDate> {
    let day: u32 = day.trim().parse().ok()?;
    let year: i32 = year.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month_number(month)?, day)
}

/// Parse the run's target date, given by the operator as `DD/MM/YYYY`
pub fn parse_target_date(input: &str) -> ReconResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%d/%m/%Y")
        .map_err(|_| ReconError::InvalidTargetDate(input.to_string()))
}
