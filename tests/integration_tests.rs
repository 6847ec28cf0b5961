//! Integration tests for rate-reconciler

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use rate_reconciler::{
    utils::{MemoryLookup, ScriptedAnswerer},
    ChannelObserver, CsvLedgerSource, ExclusionSet, FallbackConfig, LedgerRecord, LookupError,
    MemoryLedger, NlFallbackExtractor, Provenance, ReconcilerConfig, ReconciliationOutcome,
    ReconciliationPipeline, RunEvent, RunStatus,
};
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const CONFIRMATION: &str = "Reservation confirmed - Hotel Copacabana\n\
    Rate changes during your stay:\n\
    from Wednesday, November 19 2025 to Friday, November 21 2025 : R$401.40 BRL\n\
    from Friday, November 21 2025 to Saturday, November 22 2025 : R$455.00 BRL\n";

fn ledger_csv(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn drain(mut receiver: tokio::sync::mpsc::UnboundedReceiver<RunEvent>) -> Vec<RunEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_three_row_ledger_end_to_end() {
    let csv = ledger_csv(
        "Room,Name,External Reference,Rate,Adults\n\
         101,Shared Guest,RES-100,\"R$401,40\",0\n\
         102,No Reference Guest,,\"R$401,40\",2\n\
         103,Ana Souza,RES-103,\"R$401,40\",2\n",
    );
    let config = ReconcilerConfig::default();
    let source = CsvLedgerSource::new([csv.path()], config.ledger.clone());
    let lookup = MemoryLookup::new().with_message("RES-103", CONFIRMATION);
    let (observer, receiver) = ChannelObserver::channel();

    let pipeline = ReconciliationPipeline::from_operator_input(config, "20/11/2025", "").unwrap();
    let run_id = pipeline.run_id();
    let handle = pipeline.spawn(source, lookup.clone(), observer);
    let report = handle.wait().await.unwrap();

    assert_eq!(report.run_id, run_id);
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.target_date, NaiveDate::from_ymd_opt(2025, 11, 20).unwrap());
    let outcomes: Vec<ReconciliationOutcome> = report.rows.iter().map(|r| r.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            ReconciliationOutcome::IgnoredShare,
            ReconciliationOutcome::NoReference,
            ReconciliationOutcome::Correct,
        ]
    );

    let verified = &report.rows[2];
    let found = verified.rate_match.as_ref().unwrap();
    assert_eq!(found.rate, BigDecimal::from_str("401.40").unwrap());
    assert_eq!(found.provenance, Provenance::PeriodMatch);
    assert_eq!(verified.stated_rate, "R$401.40");
    assert_eq!(verified.extracted_rate, "R$401.40");
    assert_eq!(report.rows[0].stated_rate, "R$401,40");

    assert_eq!(report.summary.verified, vec!["103"]);
    assert_eq!(report.summary.no_reference, vec!["102"]);
    assert!(report.summary.mismatched.is_empty());
    assert_eq!(lookup.queries(), vec!["RES-103"]);

    let events = drain(receiver);
    let completions = events
        .iter()
        .filter(|e| matches!(e, RunEvent::Complete(_)))
        .count();
    assert_eq!(completions, 1);
    assert!(matches!(events.last(), Some(RunEvent::Complete(_))));
}

#[tokio::test]
async fn test_each_outcome_log_precedes_its_progress_update() {
    let records = vec![
        LedgerRecord::new("201", "A", "RES-1", "401.40", 1),
        LedgerRecord::new("202", "B", "", "401.40", 1),
        LedgerRecord::new("203", "C", "RES-3", "300.00", 1),
    ];
    let lookup = MemoryLookup::new()
        .with_message("RES-1", CONFIRMATION)
        .with_message("RES-3", CONFIRMATION);
    let (observer, receiver) = ChannelObserver::channel();

    let pipeline = ReconciliationPipeline::from_operator_input(
        ReconcilerConfig::default(),
        "20/11/2025",
        "",
    )
    .unwrap();
    pipeline
        .spawn(MemoryLedger::new(records), lookup, observer)
        .wait()
        .await
        .unwrap();

    let events = drain(receiver);
    let mut fractions = Vec::new();
    for (i, event) in events.iter().enumerate() {
        if let RunEvent::Progress { fraction, .. } = event {
            match &events[i - 1] {
                RunEvent::Log(line) => assert!(line.starts_with("Status: "), "got {line}"),
                other => panic!("progress not preceded by an outcome line: {other:?}"),
            }
            fractions.push(*fraction);
        }
    }

    assert_eq!(fractions.len(), 3);
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(fractions.last(), Some(&1.0));
}

#[tokio::test]
async fn test_every_record_gets_exactly_one_row() {
    let mut records = Vec::new();
    for i in 0..12 {
        let reference = match i % 4 {
            0 => String::new(),
            1 => format!("OK-{i}"),
            2 => format!("MISSING-{i}"),
            _ => format!("BROKEN-{i}"),
        };
        records.push(LedgerRecord::new(
            format!("3{i:02}"),
            "Guest",
            reference,
            "401,40",
            (i % 3) as u32,
        ));
    }

    let mut lookup = MemoryLookup::new();
    for i in 0..12 {
        lookup = lookup
            .with_message(&format!("OK-{i}"), CONFIRMATION)
            .with_failure(
                &format!("BROKEN-{i}"),
                LookupError::Unreadable("pane empty".into()),
            );
    }

    let pipeline = ReconciliationPipeline::new(
        ReconcilerConfig::default(),
        NaiveDate::from_ymd_opt(2025, 11, 21).unwrap(),
        ExclusionSet::parse("305"),
    )
    .unwrap();
    let (observer, _receiver) = ChannelObserver::channel();
    let report = pipeline
        .spawn(MemoryLedger::new(records.clone()), lookup, observer)
        .wait()
        .await
        .unwrap();

    assert_eq!(report.rows.len(), records.len());
    for (row, record) in report.rows.iter().zip(&records) {
        assert_eq!(row.room, record.room);
    }
    assert_eq!(report.rows[5].outcome, ReconciliationOutcome::IgnoredRoom);
    assert_eq!(report.rows[1].outcome, ReconciliationOutcome::RateMismatch);
    assert_eq!(report.rows[2].outcome, ReconciliationOutcome::LookupNotFound);
    assert_eq!(report.rows[3].outcome, ReconciliationOutcome::IgnoredShare);
    assert_eq!(report.rows[7].outcome, ReconciliationOutcome::ReadError);
}

#[tokio::test]
async fn test_stop_from_handle_keeps_partial_report() {
    let records: Vec<LedgerRecord> = (1..=4)
        .map(|i| LedgerRecord::new(format!("40{i}"), "Guest", format!("RES-{i}"), "401.40", 1))
        .collect();
    let mut lookup = MemoryLookup::new();
    for i in 1..=4 {
        let reference = format!("RES-{i}");
        lookup = lookup
            .with_message(&reference, CONFIRMATION)
            .with_delay(&reference, Duration::from_millis(200));
    }
    let (observer, receiver) = ChannelObserver::channel();

    let pipeline = ReconciliationPipeline::from_operator_input(
        ReconcilerConfig::default(),
        "19/11/2025",
        "",
    )
    .unwrap();
    let handle = pipeline.spawn(MemoryLedger::new(records), lookup, observer);
    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.stop();
    let report = handle.wait().await.unwrap();

    assert_eq!(report.status, RunStatus::Cancelled);
    assert!(!report.rows.is_empty());
    assert!(report.rows.len() < 4);
    for row in &report.rows {
        assert_eq!(row.outcome, ReconciliationOutcome::Correct);
    }

    let events = drain(receiver);
    assert!(events
        .iter()
        .any(|e| matches!(e, RunEvent::Log(line) if line == "--- interrupted ---")));
    match events.last() {
        Some(RunEvent::Complete(final_report)) => {
            assert_eq!(final_report.rows.len(), report.rows.len())
        }
        other => panic!("expected completion last, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreadable_ledger_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let source = CsvLedgerSource::new(
        [dir.path().join("missing.csv")],
        ReconcilerConfig::default().ledger,
    );
    let (observer, receiver) = ChannelObserver::channel();

    let pipeline = ReconciliationPipeline::from_operator_input(
        ReconcilerConfig::default(),
        "20/11/2025",
        "",
    )
    .unwrap();
    let report = pipeline
        .spawn(source, MemoryLookup::new(), observer)
        .wait()
        .await
        .unwrap();

    assert!(report.rows.is_empty());
    assert!(matches!(report.status, RunStatus::Aborted(_)));
    assert!(report.summary.is_empty());
    let events = drain(receiver);
    assert!(events
        .iter()
        .any(|e| matches!(e, RunEvent::Log(line) if line.starts_with("Ledger could not be loaded"))));
}

#[tokio::test]
async fn test_fallback_answers_prose_confirmation() {
    let answerer = ScriptedAnswerer::answering("R$ 389,00", 0.42);
    let fallback = Arc::new(NlFallbackExtractor::new(
        Arc::new(answerer.clone()),
        &FallbackConfig::default(),
    ));
    let lookup = MemoryLookup::new().with_message(
        "RES-9",
        "Olá! Your stay in a superior room is confirmed at 389 reais daily.",
    );
    let (observer, _receiver) = ChannelObserver::channel();

    let pipeline = ReconciliationPipeline::from_operator_input(
        ReconcilerConfig::default(),
        "20/11/2025",
        "",
    )
    .unwrap()
    .with_fallback(fallback);
    let report = pipeline
        .spawn(
            MemoryLedger::new(vec![LedgerRecord::new("501", "Guest", "RES-9", "R$ 389,00", 2)]),
            lookup,
            observer,
        )
        .wait()
        .await
        .unwrap();

    let row = &report.rows[0];
    assert_eq!(row.outcome, ReconciliationOutcome::Correct);
    let found = row.rate_match.as_ref().unwrap();
    assert_eq!(found.provenance, Provenance::NlFallback);
    assert_eq!(found.label(), "nl-fallback (0.42)");
    assert_eq!(answerer.questions(), vec!["What is the daily rate for 20/11/2025?"]);
}

#[test]
fn test_outcome_labels_serialize_as_tags() {
    let json = serde_json::to_string(&ReconciliationOutcome::LookupNotFound).unwrap();
    assert_eq!(json, "\"LOOKUP_NOT_FOUND\"");
    let json = serde_json::to_string(&Provenance::PeriodMatch).unwrap();
    assert_eq!(json, "\"period-match\"");
}
