//! Core types and data structures for rate reconciliation

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// One row of the expected-charges export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Room identifier
    pub room: String,
    /// Guest name as exported
    pub guest: String,
    /// External booking reference, empty when the booking has none
    pub reference: String,
    /// Stated nightly rate, exactly as it appears in the export
    pub stated_rate: String,
    /// Number of adult occupants
    pub occupants: u32,
}

impl LedgerRecord {
    /// Create a new ledger record
    pub fn new(
        room: impl Into<String>,
        guest: impl Into<String>,
        reference: impl Into<String>,
        stated_rate: impl Into<String>,
        occupants: u32,
    ) -> Self {
        Self {
            room: room.into(),
            guest: guest.into(),
            reference: reference.into(),
            stated_rate: stated_rate.into(),
            occupants,
        }
    }

    /// Parse an occupant count loosely: `"2"`, `"2.0"` and `" 1 "` are accepted,
    /// anything else counts as zero.
    pub fn parse_occupants(raw: &str) -> u32 {
        let trimmed = raw.trim();
        if let Ok(count) = trimmed.parse::<u32>() {
            return count;
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() && value >= 1.0 => value.trunc() as u32,
            _ => 0,
        }
    }
}

/// Room identifiers that are skipped unconditionally for a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    rooms: HashSet<String>,
}

impl ExclusionSet {
    /// Create an empty exclusion set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list such as `"101, 102"`
    pub fn parse(input: &str) -> Self {
        input
            .split(',')
            .map(str::trim)
            .filter(|room| !room.is_empty())
            .collect()
    }

    /// Whether the room must be skipped
    pub fn contains(&self, room: &str) -> bool {
        self.rooms.contains(room)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            rooms: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// A dated rate statement found in confirmation text
///
/// Endpoints are `None` when the statement was recognised but its date could
/// not be normalized. Such a period never applies to any date, but it still
/// counts as period data when deciding whether the generic pattern may be used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidityPeriod {
    /// First night covered by the rate
    pub start: Option<NaiveDate>,
    /// Day after the last night covered (exclusive)
    pub end: Option<NaiveDate>,
    /// Rate stated for the period
    pub rate: BigDecimal,
}

impl ValidityPeriod {
    /// Half-open containment test: `start <= date < end`
    pub fn contains(&self, date: NaiveDate) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= date && date < end,
            _ => false,
        }
    }
}

/// Which extraction strategy produced a rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Explicit validity period containing the target date
    PeriodMatch,
    /// Single undated "per night" statement
    GenericPattern,
    /// Answer from the question-answering capability
    NlFallback,
    /// No strategy produced a usable rate
    NotFound,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::PeriodMatch => "period-match",
            Provenance::GenericPattern => "generic-pattern",
            Provenance::NlFallback => "nl-fallback",
            Provenance::NotFound => "not-found",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy-specific detail kept alongside a rate for log lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchDetail {
    /// The period that contained the target date
    Period { start: NaiveDate, end: NaiveDate },
    /// Confidence reported by the question-answering capability
    Confidence(f64),
    None,
}

/// An extracted rate together with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateMatch {
    /// Extracted rate; zero only when `provenance` is `NotFound`
    pub rate: BigDecimal,
    pub provenance: Provenance,
    pub detail: MatchDetail,
}

impl RateMatch {
    pub fn new(rate: BigDecimal, provenance: Provenance) -> Self {
        Self {
            rate,
            provenance,
            detail: MatchDetail::None,
        }
    }

    /// Attach strategy detail
    pub fn with_detail(mut self, detail: MatchDetail) -> Self {
        self.detail = detail;
        self
    }

    /// The result reported when every strategy fails
    pub fn not_found() -> Self {
        Self::new(BigDecimal::from(0), Provenance::NotFound)
    }

    pub fn is_found(&self) -> bool {
        self.provenance != Provenance::NotFound
    }

    /// Human-readable provenance, e.g. `period 19/11/2025-21/11/2025`
    pub fn label(&self) -> String {
        match &self.detail {
            MatchDetail::Period { start, end } => format!(
                "period {}-{}",
                start.format("%d/%m/%Y"),
                end.format("%d/%m/%Y")
            ),
            MatchDetail::Confidence(score) => format!("{} ({:.2})", self.provenance, score),
            MatchDetail::None => self.provenance.to_string(),
        }
    }
}

/// Classification of one ledger record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationOutcome {
    Correct,
    RateMismatch,
    NoReference,
    IgnoredShare,
    IgnoredRoom,
    SearchError,
    LookupNotFound,
    ReadError,
    GenericError,
}

impl ReconciliationOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ReconciliationOutcome::Correct => "CORRECT",
            ReconciliationOutcome::RateMismatch => "RATE_MISMATCH",
            ReconciliationOutcome::NoReference => "NO_REFERENCE",
            ReconciliationOutcome::IgnoredShare => "IGNORED_SHARE",
            ReconciliationOutcome::IgnoredRoom => "IGNORED_ROOM",
            ReconciliationOutcome::SearchError => "SEARCH_ERROR",
            ReconciliationOutcome::LookupNotFound => "LOOKUP_NOT_FOUND",
            ReconciliationOutcome::ReadError => "READ_ERROR",
            ReconciliationOutcome::GenericError => "GENERIC_ERROR",
        }
    }

    /// Presentation tone a front end can colour rows by
    pub fn tone(&self) -> OutcomeTone {
        match self {
            ReconciliationOutcome::Correct => OutcomeTone::Correct,
            ReconciliationOutcome::RateMismatch => OutcomeTone::Error,
            ReconciliationOutcome::IgnoredShare => OutcomeTone::Share,
            ReconciliationOutcome::IgnoredRoom => OutcomeTone::Ignored,
            ReconciliationOutcome::NoReference
            | ReconciliationOutcome::SearchError
            | ReconciliationOutcome::LookupNotFound
            | ReconciliationOutcome::ReadError
            | ReconciliationOutcome::GenericError => OutcomeTone::Warning,
        }
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeTone {
    Correct,
    Error,
    Share,
    Ignored,
    Warning,
}

/// One line of the final report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub room: String,
    pub guest: String,
    pub reference: String,
    /// Stated rate, formatted when it was compared and raw otherwise
    pub stated_rate: String,
    /// Extracted rate, formatted when it was compared
    pub extracted_rate: String,
    pub outcome: ReconciliationOutcome,
    /// Extraction result, present only for compared rows
    pub rate_match: Option<RateMatch>,
}

impl ReportRow {
    /// Row for a record that never reached the comparison step
    pub fn uncompared(
        record: &LedgerRecord,
        outcome: ReconciliationOutcome,
        extracted_rate: impl Into<String>,
    ) -> Self {
        Self {
            room: record.room.clone(),
            guest: record.guest.clone(),
            reference: record.reference.clone(),
            stated_rate: record.stated_rate.clone(),
            extracted_rate: extracted_rate.into(),
            outcome,
            rate_match: None,
        }
    }
}

/// Room ids grouped by the three buckets operators act on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub verified: Vec<String>,
    pub no_reference: Vec<String>,
    pub mismatched: Vec<String>,
}

impl RunSummary {
    /// Derive the buckets from report rows, preserving ledger order
    pub fn from_rows(rows: &[ReportRow]) -> Self {
        let mut summary = Self::default();
        for row in rows {
            let bucket = match row.outcome {
                ReconciliationOutcome::Correct => &mut summary.verified,
                ReconciliationOutcome::NoReference => &mut summary.no_reference,
                ReconciliationOutcome::RateMismatch => &mut summary.mismatched,
                _ => continue,
            };
            bucket.push(row.room.clone());
        }
        summary
    }

    pub fn is_empty(&self) -> bool {
        self.verified.is_empty() && self.no_reference.is_empty() && self.mismatched.is_empty()
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Every ledger record was processed
    Completed,
    /// The cancellation token was observed before the last record
    Cancelled,
    /// The run could not start processing records
    Aborted(String),
}

/// Everything handed to the completion callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: uuid::Uuid,
    pub target_date: NaiveDate,
    pub rows: Vec<ReportRow>,
    pub summary: RunSummary,
    pub status: RunStatus,
}

impl RunReport {
    pub fn was_cancelled(&self) -> bool {
        self.status == RunStatus::Cancelled
    }
}

/// Errors that can occur while setting up or driving a run
#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Ledger error: {0}")]
    Ledger(String),
    #[error("Invalid target date '{0}', expected DD/MM/YYYY")]
    InvalidTargetDate(String),
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),
    #[error("Capability error: {0}")]
    Capability(String),
    #[error("Worker error: {0}")]
    Worker(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reported by the confirmation lookup collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("search control unavailable: {0}")]
    SearchUnavailable(String),
    #[error("no message matches the reference")]
    NotFound,
    #[error("message body could not be read: {0}")]
    Unreadable(String),
    #[error("lookup did not answer within {0:?}")]
    TimedOut(std::time::Duration),
    #[error("lookup session failure: {0}")]
    Session(String),
}

impl LookupError {
    /// Outcome a record is classified as when its lookup fails this way
    pub fn outcome(&self) -> ReconciliationOutcome {
        match self {
            LookupError::SearchUnavailable(_) | LookupError::TimedOut(_) => {
                ReconciliationOutcome::SearchError
            }
            LookupError::NotFound => ReconciliationOutcome::LookupNotFound,
            LookupError::Unreadable(_) => ReconciliationOutcome::ReadError,
            LookupError::Session(_) => ReconciliationOutcome::GenericError,
        }
    }
}

/// Result type for reconciliation operations
pub type ReconResult<T> = Result<T, ReconError>;
