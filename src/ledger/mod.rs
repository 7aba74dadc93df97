//! Reconciliation ledger: the only component that writes reconciliation state

mod core;
mod journal;
pub mod links;
pub mod records;

pub use self::core::*;
pub use links::*;
pub use records::*;
