//! # Rate Reconciler
//!
//! Reconciles the nightly rates stated in a ledger export against the
//! confirmation messages that are the source of truth for what was billed.
//!
//! ## Features
//!
//! - **Money and date normalization**: regional decimal separators, English month names
//! - **Layered rate extraction**: dated validity periods, then a single per-night rate,
//!   then an optional question-answering fallback gated by confidence and plausibility
//! - **Cancellable batch pipeline**: one record at a time, with progress reporting and
//!   per-record failure isolation
//! - **Collaborator abstraction**: ledger source, confirmation lookup and question
//!   answering are trait-based so any backend can be plugged in
//!
//! ## Quick Start
//!
//! ```rust
//! use rate_reconciler::{RateReconciler, Provenance};
//! use chrono::NaiveDate;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let text = "from Wednesday, November 19 2025 to Friday, November 21 2025 : R$401.40 BRL";
//! let target = NaiveDate::from_ymd_opt(2025, 11, 20).unwrap();
//!
//! let found = RateReconciler::default().reconcile(text, target).await;
//! assert_eq!(found.provenance, Provenance::PeriodMatch);
//! # });
//! ```

pub mod config;
pub mod extraction;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use extraction::*;
pub use reconciliation::*;
pub use traits::*;
pub use types::*;
