//! Reconcile a CSV ledger against confirmation messages saved as files
//!
//! ```text
//! cargo run --example reconcile_ledger -- ledger.csv messages/ 20/11/2025 "101, 102"
//! ```
//!
//! Each confirmation is looked up as `messages/<reference>.txt`, falling back
//! to `messages/<reference>.eml`. Set `RATE_RECONCILER_CONFIG` to a TOML file
//! to override the defaults.

use async_trait::async_trait;
use rate_reconciler::{
    ChannelObserver, ConfirmationLookup, CsvLedgerSource, LookupError, ReconcilerConfig,
    ReconciliationPipeline, RunEvent, RunStatus,
};
use std::path::PathBuf;
use std::time::Duration;

/// Reads confirmations from a directory, one file per reference
struct DirectoryLookup {
    root: PathBuf,
}

#[async_trait]
impl ConfirmationLookup for DirectoryLookup {
    async fn find(&mut self, reference: &str, timeout: Duration) -> Result<String, LookupError> {
        if !self.root.is_dir() {
            return Err(LookupError::SearchUnavailable(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }

        let candidates = ["txt", "eml"].map(|ext| self.root.join(format!("{reference}.{ext}")));
        if !candidates.iter().any(|path| path.exists()) {
            return Err(LookupError::NotFound);
        }

        let mut last_error = String::new();
        for path in &candidates {
            match tokio::time::timeout(timeout, tokio::fs::read_to_string(path)).await {
                Ok(Ok(text)) if !text.trim().is_empty() => return Ok(text),
                Ok(Ok(_)) => last_error = format!("{} is empty", path.display()),
                Ok(Err(err)) => last_error = format!("{}: {err}", path.display()),
                Err(_) => last_error = format!("{} timed out", path.display()),
            }
        }
        Err(LookupError::Unreadable(last_error))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        eprintln!("usage: reconcile_ledger <ledger.csv> <messages-dir> <DD/MM/YYYY> [excluded rooms]");
        std::process::exit(2);
    }

    let config = match std::env::var_os("RATE_RECONCILER_CONFIG") {
        Some(path) => ReconcilerConfig::load(path)?,
        None => ReconcilerConfig::default(),
    };
    let source = CsvLedgerSource::new([&args[0]], config.ledger.clone());
    let lookup = DirectoryLookup {
        root: PathBuf::from(&args[1]),
    };
    let excluded = args.get(3).map(String::as_str).unwrap_or("");
    let pipeline = ReconciliationPipeline::from_operator_input(config, &args[2], excluded)?;

    let (observer, mut events) = ChannelObserver::channel();
    let handle = pipeline.spawn(source, lookup, observer);

    while let Some(event) = events.recv().await {
        match event {
            RunEvent::Log(line) => println!("{line}"),
            RunEvent::Progress { text, .. } => eprintln!("{text}"),
            RunEvent::Complete(report) => {
                println!();
                for row in &report.rows {
                    println!(
                        "{:<6} {:<28} {:<14} {:>12} {:>12}  {}",
                        row.room,
                        row.guest,
                        row.reference,
                        row.stated_rate,
                        row.extracted_rate,
                        row.outcome
                    );
                }
                println!();
                println!("Verified:      {}", report.summary.verified.join(","));
                println!("No reference:  {}", report.summary.no_reference.join(","));
                println!("Rate mismatch: {}", report.summary.mismatched.join(","));
                match &report.status {
                    RunStatus::Completed => println!("Reconciliation finished."),
                    RunStatus::Cancelled => println!("Stopped by the user."),
                    RunStatus::Aborted(reason) => println!("Aborted: {reason}"),
                }
                break;
            }
        }
    }

    handle.wait().await?;
    Ok(())
}
