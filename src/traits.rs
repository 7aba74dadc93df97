//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use bigdecimal::BigDecimal;

use crate::types::*;

/// Storage abstraction for the reconciliation system
///
/// Holds the three externally sourced record kinds (bank transactions,
/// expenses and invoices) plus the reconciliation links owned by this crate.
/// Any backend (PostgreSQL, SQLite, a hosted document store, in-memory) can
/// be plugged in by implementing these methods.
///
/// Writes are single-row. The reconciliation ledger composes them into
/// all-or-nothing commits and undoes applied writes itself when a later
/// write fails, so a backend does not need multi-row transactions. It must
/// however honour the two guards below, which are what stop two concurrent
/// commits from both succeeding:
///
/// - [`mark_transaction`](RecordStore::mark_transaction) and
///   [`mark_record`](RecordStore::mark_record) refuse to set a flag that is
///   already set.
/// - [`save_link`](RecordStore::save_link) refuses a second link for a
///   settled record that already has one.
///
/// Both refusals are reported as [`ReconciliationError::AlreadyReconciled`].
/// Listing methods return rows in insertion order.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Save (insert or replace) a bank transaction
    async fn save_transaction(&mut self, transaction: &BankTransaction)
        -> ReconciliationResult<()>;

    /// Get a bank transaction by ID
    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> ReconciliationResult<Option<BankTransaction>>;

    /// List all bank transactions
    async fn list_transactions(&self) -> ReconciliationResult<Vec<BankTransaction>>;

    /// Set or clear the reconciled flag on a bank transaction
    async fn mark_transaction(
        &mut self,
        transaction_id: &str,
        reconciled: bool,
    ) -> ReconciliationResult<()>;

    /// Save (insert or replace) an expense
    async fn save_expense(&mut self, expense: &Expense) -> ReconciliationResult<()>;

    /// Get an expense by ID
    async fn get_expense(&self, expense_id: &str) -> ReconciliationResult<Option<Expense>>;

    /// List all expenses
    async fn list_expenses(&self) -> ReconciliationResult<Vec<Expense>>;

    /// Save (insert or replace) an invoice
    async fn save_invoice(&mut self, invoice: &Invoice) -> ReconciliationResult<()>;

    /// Get an invoice by ID
    async fn get_invoice(&self, invoice_id: &str) -> ReconciliationResult<Option<Invoice>>;

    /// List all invoices
    async fn list_invoices(&self) -> ReconciliationResult<Vec<Invoice>>;

    /// Set or clear the reconciled flag on an expense or invoice
    async fn mark_record(&mut self, record: &SettledRef, reconciled: bool)
        -> ReconciliationResult<()>;

    /// Save a reconciliation link
    async fn save_link(&mut self, link: &ReconciliationLink) -> ReconciliationResult<()>;

    /// Delete a reconciliation link
    async fn delete_link(&mut self, link_id: &str) -> ReconciliationResult<()>;

    /// All links that reference a bank transaction
    async fn get_links_for_transaction(
        &self,
        transaction_id: &str,
    ) -> ReconciliationResult<Vec<ReconciliationLink>>;

    /// The link that settles a record, if any
    async fn get_link_for_record(
        &self,
        record: &SettledRef,
    ) -> ReconciliationResult<Option<ReconciliationLink>>;

    /// List every reconciliation link
    async fn list_links(&self) -> ReconciliationResult<Vec<ReconciliationLink>>;
}

/// Trait for implementing custom rules on what may be linked to a transaction
///
/// Runs after the ledger has checked existence and reconciled state, and
/// before anything is written.
pub trait LinkValidator: Send + Sync {
    /// Validate a settled record before it is linked to the transaction
    fn validate_link(
        &self,
        transaction: &BankTransaction,
        record: &SettledRecord,
    ) -> ReconciliationResult<()>;
}

/// Default link validator: only paid invoices and positive amounts
pub struct DefaultLinkValidator;

impl LinkValidator for DefaultLinkValidator {
    fn validate_link(
        &self,
        _transaction: &BankTransaction,
        record: &SettledRecord,
    ) -> ReconciliationResult<()> {
        if *record.amount() <= BigDecimal::from(0) {
            return Err(ReconciliationError::Validation(format!(
                "{} must have a positive amount to be reconciled",
                record.settled_ref()
            )));
        }

        if let SettledRecord::Invoice(invoice) = record {
            if !invoice.is_paid() {
                return Err(ReconciliationError::Validation(format!(
                    "Invoice '{}' is not paid",
                    invoice.reference
                )));
            }
        }

        Ok(())
    }
}
