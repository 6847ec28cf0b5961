//! Sequential, cancellable reconciliation run

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::ReconcilerConfig;
use crate::extraction::{NlFallbackExtractor, RateReconciler};
use crate::traits::*;
use crate::types::*;
use crate::utils::{decimal_from_f64, format_money, normalize_money, parse_target_date};

/// Drives every ledger record through lookup, extraction and comparison
///
/// A pipeline is built fresh for each run and consumed by it. Records are
/// processed strictly in ledger order because the lookup session cannot serve
/// two queries at once.
#[derive(Debug)]
pub struct ReconciliationPipeline {
    run_id: Uuid,
    config: ReconcilerConfig,
    target_date: NaiveDate,
    exclusions: ExclusionSet,
    fallback: Option<Arc<NlFallbackExtractor>>,
    tolerance: BigDecimal,
    rows: Vec<ReportRow>,
}

impl ReconciliationPipeline {
    /// Create a pipeline for one run
    pub fn new(
        config: ReconcilerConfig,
        target_date: NaiveDate,
        exclusions: ExclusionSet,
    ) -> ReconResult<Self> {
        config.validate()?;
        let tolerance = decimal_from_f64(config.matching.tolerance);
        Ok(Self {
            run_id: Uuid::new_v4(),
            config,
            target_date,
            exclusions,
            fallback: None,
            tolerance,
            rows: Vec::new(),
        })
    }

    /// Create a pipeline from the operator's raw inputs: a `DD/MM/YYYY`
    /// target date and a comma-separated list of rooms to skip
    pub fn from_operator_input(
        config: ReconcilerConfig,
        target_date: &str,
        excluded_rooms: &str,
    ) -> ReconResult<Self> {
        Self::new(
            config,
            parse_target_date(target_date)?,
            ExclusionSet::parse(excluded_rooms),
        )
    }

    /// Use a question-answering fallback as the last extraction strategy
    pub fn with_fallback(mut self, fallback: Arc<NlFallbackExtractor>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn target_date(&self) -> NaiveDate {
        self.target_date
    }

    /// Run on a background task
    pub fn spawn<L, C, O>(self, ledger: L, mut lookup: C, mut observer: O) -> RunHandle
    where
        L: LedgerSource + 'static,
        C: ConfirmationLookup + 'static,
        O: RunObserver + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let join = tokio::spawn(async move {
            self.run(&ledger, &mut lookup, &mut observer, &token).await
        });
        RunHandle { cancel, join }
    }

    /// Process the whole ledger
    ///
    /// The cancellation token is checked before each record. The observer's
    /// `on_complete` is called exactly once, whether the run completes, is
    /// cancelled, or cannot start.
    pub async fn run<L, C, O>(
        mut self,
        ledger: &L,
        lookup: &mut C,
        observer: &mut O,
        cancel: &CancellationToken,
    ) -> RunReport
    where
        L: LedgerSource + ?Sized,
        C: ConfirmationLookup + ?Sized,
        O: RunObserver + ?Sized,
    {
        self.emit(
            observer,
            &format!(
                "Starting reconciliation for {}",
                self.target_date.format("%d/%m/%Y")
            ),
        );

        if let Some(fallback) = self.fallback.as_ref().filter(|f| f.is_enabled()) {
            self.emit(observer, "Loading fallback model...");
            let message = if fallback.load().await {
                "Fallback model ready"
            } else {
                "Fallback model unavailable, continuing without it"
            };
            self.emit(observer, message);
        }

        let records = match ledger.load() {
            Ok(records) if records.is_empty() => {
                return self.abort(observer, "No usable ledger rows".to_string());
            }
            Ok(records) => records,
            Err(err) => {
                return self.abort(observer, format!("Ledger could not be loaded: {err}"));
            }
        };

        let total = records.len();
        self.emit(observer, &format!("Total reservations to analyse: {total}"));

        let reconciler = RateReconciler::standard(self.fallback.clone());
        let mut status = RunStatus::Completed;

        for (index, record) in records.iter().enumerate() {
            if cancel.is_cancelled() {
                self.emit(observer, "--- interrupted ---");
                observer.on_progress(1.0, &format!("Stopped after {index} of {total}"));
                status = RunStatus::Cancelled;
                break;
            }

            let caught = AssertUnwindSafe(self.process_record(record, &reconciler, lookup, observer))
                .catch_unwind()
                .await;
            let row = match caught {
                Ok(row) => row,
                Err(panic) => {
                    self.emit(
                        observer,
                        &format!("Unexpected failure: {}", panic_message(panic.as_ref())),
                    );
                    let outcome = ReconciliationOutcome::GenericError;
                    ReportRow::uncompared(record, outcome, placeholder(outcome))
                }
            };
            self.emit(observer, &describe(&row));
            self.rows.push(row);

            let done = index + 1;
            let fraction = done as f64 / total as f64;
            observer.on_progress(
                fraction,
                &format!(
                    "Processing {done} of {total} ({}%)",
                    (fraction * 100.0) as u32
                ),
            );
        }

        self.finish(observer, status)
    }

    /// Classify one record
    async fn process_record<C, O>(
        &self,
        record: &LedgerRecord,
        reconciler: &RateReconciler,
        lookup: &mut C,
        observer: &mut O,
    ) -> ReportRow
    where
        C: ConfirmationLookup + ?Sized,
        O: RunObserver + ?Sized,
    {
        if record.occupants < 1 {
            return ReportRow::uncompared(record, ReconciliationOutcome::IgnoredShare, "");
        }
        if record.reference.is_empty() {
            return ReportRow::uncompared(record, ReconciliationOutcome::NoReference, "");
        }
        if self.exclusions.contains(&record.room) {
            return ReportRow::uncompared(record, ReconciliationOutcome::IgnoredRoom, "");
        }

        self.emit(
            observer,
            &format!("--- Room: {} (Ref: {}) ---", record.room, record.reference),
        );

        let text = match self.find_text(&record.reference, lookup).await {
            Ok(text) => text,
            Err(err) => {
                self.emit(observer, &format!("Lookup failed: {err}"));
                let outcome = err.outcome();
                return ReportRow::uncompared(record, outcome, placeholder(outcome));
            }
        };

        let found = reconciler.reconcile(&text, self.target_date).await;
        let stated = normalize_money(&record.stated_rate);
        let outcome = if self.rates_agree(&stated, &found.rate) {
            ReconciliationOutcome::Correct
        } else {
            ReconciliationOutcome::RateMismatch
        };

        let symbol = &self.config.report.currency_symbol;
        ReportRow {
            room: record.room.clone(),
            guest: record.guest.clone(),
            reference: record.reference.clone(),
            stated_rate: format_money(symbol, &stated),
            extracted_rate: format_money(symbol, &found.rate),
            outcome,
            rate_match: Some(found),
        }
    }

    /// Look up confirmation text, bounded by the configured deadline
    async fn find_text<C>(&self, reference: &str, lookup: &mut C) -> Result<String, LookupError>
    where
        C: ConfirmationLookup + ?Sized,
    {
        let deadline = self.config.lookup.deadline();
        let step_timeout = self.config.lookup.step_timeout();
        match tokio::time::timeout(deadline, lookup.find(reference, step_timeout)).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::TimedOut(deadline)),
        }
    }

    /// A zero extracted rate never agrees with anything
    fn rates_agree(&self, stated: &BigDecimal, extracted: &BigDecimal) -> bool {
        *extracted > BigDecimal::from(0) && (stated - extracted).abs() < self.tolerance
    }

    fn abort<O>(self, observer: &mut O, reason: String) -> RunReport
    where
        O: RunObserver + ?Sized,
    {
        self.emit(observer, &reason);
        self.finish(observer, RunStatus::Aborted(reason))
    }

    fn finish<O>(self, observer: &mut O, status: RunStatus) -> RunReport
    where
        O: RunObserver + ?Sized,
    {
        let summary = RunSummary::from_rows(&self.rows);
        self.emit(
            observer,
            &format!(
                "--- finished: {} verified, {} without reference, {} mismatched ---",
                summary.verified.len(),
                summary.no_reference.len(),
                summary.mismatched.len()
            ),
        );

        let report = RunReport {
            run_id: self.run_id,
            target_date: self.target_date,
            rows: self.rows,
            summary,
            status,
        };
        observer.on_complete(&report);
        report
    }

    fn emit<O>(&self, observer: &mut O, message: &str)
    where
        O: RunObserver + ?Sized,
    {
        log::info!("[run {}] {}", self.run_id, message);
        observer.on_log(message);
    }
}

/// Text shown in the extracted-rate column when no comparison happened
fn placeholder(outcome: ReconciliationOutcome) -> &'static str {
    match outcome {
        ReconciliationOutcome::SearchError | ReconciliationOutcome::GenericError => "ERROR",
        ReconciliationOutcome::LookupNotFound => "N/A",
        _ => "",
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "collaborator panicked"
    }
}

/// Log line summarising a record's outcome
fn describe(row: &ReportRow) -> String {
    match &row.rate_match {
        Some(found) => format!(
            "Status: {} | Room {} | Ledger: {} | Confirmation: {} [{}]",
            row.outcome,
            row.room,
            row.stated_rate,
            row.extracted_rate,
            found.label()
        ),
        None => format!("Status: {} | Room {}", row.outcome, row.room),
    }
}

/// Handle to a run executing on a background task
#[derive(Debug)]
pub struct RunHandle {
    cancel: CancellationToken,
    join: JoinHandle<RunReport>,
}

impl RunHandle {
    /// Ask the run to stop before its next record
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the run to end and return its report
    pub async fn wait(self) -> ReconResult<RunReport> {
        self.join
            .await
            .map_err(|e| ReconError::Worker(e.to_string()))
    }
}
