//! Matching engine: candidate generation, confidence scoring and manual
//! split selection
//!
//! Everything here is read-only over a [`RecordSnapshot`](crate::types::RecordSnapshot).
//! Accepted matches are written by the [`ReconciliationLedger`](crate::ledger::ReconciliationLedger).

pub mod candidates;
pub mod confidence;
pub mod selection;

pub use candidates::*;
pub use confidence::*;
pub use selection::*;
