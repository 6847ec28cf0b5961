//! CSV ledger exports

use csv::StringRecord;
use std::path::{Path, PathBuf};

use crate::config::LedgerColumns;
use crate::traits::LedgerSource;
use crate::types::*;

/// Ledger read from one or more CSV exports, concatenated in the order given
///
/// Missing columns read as empty strings. A file that cannot be read is
/// skipped with a warning; loading fails only when every file fails.
#[derive(Debug, Clone)]
pub struct CsvLedgerSource {
    paths: Vec<PathBuf>,
    columns: LedgerColumns,
}

impl CsvLedgerSource {
    pub fn new<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>, columns: LedgerColumns) -> Self {
        Self {
            paths: paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect(),
            columns,
        }
    }

    /// Parse one CSV document
    pub fn parse_reader<R: std::io::Read>(
        reader: R,
        columns: &LedgerColumns,
    ) -> ReconResult<Vec<LedgerRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ReconError::Ledger(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let idx = |name: &str| headers.iter().position(|h| h == name);

        let room_idx = idx(&columns.room);
        let guest_idx = idx(&columns.guest);
        let reference_idx = idx(&columns.reference);
        let rate_idx = idx(&columns.rate);
        let occupants_idx = idx(&columns.occupants);

        let field = |row: &StringRecord, index: Option<usize>| -> String {
            index
                .and_then(|i| row.get(i))
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| ReconError::Ledger(e.to_string()))?;
            records.push(LedgerRecord {
                room: field(&row, room_idx),
                guest: field(&row, guest_idx),
                reference: field(&row, reference_idx),
                stated_rate: field(&row, rate_idx),
                occupants: LedgerRecord::parse_occupants(&field(&row, occupants_idx)),
            });
        }
        Ok(records)
    }

    fn load_file(&self, path: &Path) -> ReconResult<Vec<LedgerRecord>> {
        let file = std::fs::File::open(path)?;
        Self::parse_reader(file, &self.columns)
    }
}

impl LedgerSource for CsvLedgerSource {
    fn load(&self) -> ReconResult<Vec<LedgerRecord>> {
        let mut records = Vec::new();
        let mut failures = Vec::new();

        for path in &self.paths {
            match self.load_file(path) {
                Ok(mut loaded) => {
                    log::info!("loaded {} ledger rows from {}", loaded.len(), path.display());
                    records.append(&mut loaded);
                }
                Err(err) => {
                    log::warn!("skipping ledger file {}: {err}", path.display());
                    failures.push(format!("{}: {err}", path.display()));
                }
            }
        }

        if !self.paths.is_empty() && failures.len() == self.paths.len() {
            return Err(ReconError::Ledger(format!(
                "no ledger file could be read ({})",
                failures.join("; ")
            )));
        }
        Ok(records)
    }
}

/// Ledger already held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    records: Vec<LedgerRecord>,
}

impl MemoryLedger {
    pub fn new(records: Vec<LedgerRecord>) -> Self {
        Self { records }
    }
}

impl LedgerSource for MemoryLedger {
    fn load(&self) -> ReconResult<Vec<LedgerRecord>> {
        Ok(self.records.clone())
    }
}
