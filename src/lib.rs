//! # Reconciliation Core
//!
//! Bank reconciliation engine for a trades back office: matches bank
//! statement lines against recorded expenses and paid invoices, scores the
//! suggestions, and commits many-to-one reconciliation links atomically.
//!
//! ## Features
//!
//! - **Candidate generation**: exact-amount and VAT-inclusive expense matching, paid invoice matching
//! - **Confidence scoring**: high / medium / low tiers from the rule and the day gap
//! - **Split matches**: one bank transaction settling several expenses and invoices
//! - **Atomic ledger**: all-or-nothing commit and unreconcile with compensating rollback
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use reconciliation_core::utils::MemoryStorage;
//! use reconciliation_core::{BankTransaction, Expense, ReconciliationLedger};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! # async fn run() -> reconciliation_core::ReconciliationResult<()> {
//! let mut ledger = ReconciliationLedger::new(MemoryStorage::new());
//! let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
//!
//! ledger
//!     .import_transaction(BankTransaction::new(
//!         "t1".to_string(),
//!         date,
//!         "CARD PAYMENT".to_string(),
//!         BigDecimal::from(-120),
//!     ))
//!     .await?;
//! ledger
//!     .record_expense(Expense::new(
//!         "e1".to_string(),
//!         "Screwfix".to_string(),
//!         BigDecimal::from(100),
//!         date,
//!     ))
//!     .await?;
//!
//! for scored in ledger.suggest_matches().await? {
//!     ledger.accept_suggestion(&scored.suggestion).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod ledger;
pub mod reconciliation;
pub mod tax;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use ledger::*;
pub use reconciliation::*;
pub use tax::vat::*;
pub use traits::*;
pub use types::*;
