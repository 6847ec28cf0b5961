//! Run configuration, loadable from TOML

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::types::{ReconError, ReconResult};

/// Tunables for one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    pub matching: MatchingConfig,
    pub fallback: FallbackConfig,
    pub lookup: LookupConfig,
    pub ledger: LedgerColumns,
    pub report: ReportConfig,
}

impl ReconcilerConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> ReconResult<Self> {
        let config: Self = toml::from_str(input).map_err(|e| ReconError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> ReconResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> ReconResult<()> {
        if !self.matching.tolerance.is_finite() || self.matching.tolerance <= 0.0 {
            return Err(ReconError::Config(format!(
                "matching.tolerance must be a positive number, got {}",
                self.matching.tolerance
            )));
        }

        let fallback = &self.fallback;
        if !(0.0..=1.0).contains(&fallback.min_confidence) {
            return Err(ReconError::Config(format!(
                "fallback.min_confidence must be within [0, 1], got {}",
                fallback.min_confidence
            )));
        }
        if !fallback.min_plausible.is_finite() || !fallback.max_plausible.is_finite() {
            return Err(ReconError::Config(format!(
                "fallback plausible range ({}, {}) must be finite",
                fallback.min_plausible, fallback.max_plausible
            )));
        }
        if fallback.min_plausible < 0.0 || fallback.min_plausible >= fallback.max_plausible {
            return Err(ReconError::Config(format!(
                "fallback plausible range ({}, {}) is empty",
                fallback.min_plausible, fallback.max_plausible
            )));
        }
        if fallback.context_chars == 0 {
            return Err(ReconError::Config(
                "fallback.context_chars must be positive".to_string(),
            ));
        }
        if fallback.load_timeout_secs == 0 || fallback.ask_timeout_secs == 0 {
            return Err(ReconError::Config(
                "fallback timeouts must be positive".to_string(),
            ));
        }

        if self.lookup.step_timeout_secs == 0 || self.lookup.deadline_secs == 0 {
            return Err(ReconError::Config(
                "lookup timeouts must be positive".to_string(),
            ));
        }
        if self.lookup.deadline_secs < self.lookup.step_timeout_secs {
            return Err(ReconError::Config(format!(
                "lookup.deadline_secs ({}) is shorter than lookup.step_timeout_secs ({})",
                self.lookup.deadline_secs, self.lookup.step_timeout_secs
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Stated and extracted rates agree when they differ by less than this
    pub tolerance: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self { tolerance: 1.0 }
    }
}

/// Question-answering fallback settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,
    /// Answers need a score strictly above this
    pub min_confidence: f64,
    /// Exclusive bounds on an accepted rate
    pub min_plausible: f64,
    pub max_plausible: f64,
    /// Characters of confirmation text passed to the model
    pub context_chars: usize,
    pub load_timeout_secs: u64,
    pub ask_timeout_secs: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 0.1,
            min_plausible: 10.0,
            max_plausible: 5000.0,
            context_chars: 3000,
            load_timeout_secs: 120,
            ask_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Per-interaction timeout handed to the lookup session
    pub step_timeout_secs: u64,
    /// Hard bound on a whole lookup, enforced by the pipeline
    pub deadline_secs: u64,
}

impl LookupConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: 5,
            deadline_secs: 30,
        }
    }
}

/// Header names of the ledger export
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LedgerColumns {
    pub room: String,
    pub guest: String,
    pub reference: String,
    pub rate: String,
    pub occupants: String,
}

impl Default for LedgerColumns {
    fn default() -> Self {
        Self {
            room: "Room".to_string(),
            guest: "Name".to_string(),
            reference: "External Reference".to_string(),
            rate: "Rate".to_string(),
            occupants: "Adults".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Prefix for compared rates in the report
    pub currency_symbol: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "R$".to_string(),
        }
    }
}
