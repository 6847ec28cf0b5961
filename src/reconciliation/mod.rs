//! Reconciliation of ledger records against confirmation text
//!
//! A run loads the ledger, then drives each record through lookup, rate
//! extraction and comparison, one record at a time, reporting progress to a
//! [`RunObserver`](crate::traits::RunObserver) as it goes.

pub mod events;
pub mod ledger_source;
pub mod pipeline;

pub use events::*;
pub use ledger_source::*;
pub use pipeline::*;
