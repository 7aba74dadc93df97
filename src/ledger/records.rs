//! Record registration and lookup

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_bank_transaction, validate_expense, validate_invoice};

/// Load a bank transaction, returning an error if not found
pub(crate) async fn load_transaction<S: RecordStore>(
    storage: &S,
    transaction_id: &str,
) -> ReconciliationResult<BankTransaction> {
    storage
        .get_transaction(transaction_id)
        .await?
        .ok_or_else(|| ReconciliationError::not_found(RecordKind::Transaction, transaction_id))
}

/// Load the expense or invoice behind a reference, returning an error if not found
pub(crate) async fn load_record<S: RecordStore>(
    storage: &S,
    record: &SettledRef,
) -> ReconciliationResult<SettledRecord> {
    let found = match record {
        SettledRef::Expense(id) => storage.get_expense(id).await?.map(SettledRecord::Expense),
        SettledRef::Invoice(id) => storage.get_invoice(id).await?.map(SettledRecord::Invoice),
    };
    found.ok_or_else(|| ReconciliationError::not_found(record.kind(), record.id()))
}

/// Record manager for bringing externally sourced records into the store
///
/// New records always start unreconciled; the reconciled flag on incoming
/// rows is ignored.
pub struct RecordManager<S: RecordStore> {
    pub(crate) storage: S,
}

impl<S: RecordStore> RecordManager<S> {
    /// Create a new record manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Register a statement line produced by the bank statement importer
    pub async fn import_transaction(
        &mut self,
        mut transaction: BankTransaction,
    ) -> ReconciliationResult<BankTransaction> {
        validate_bank_transaction(&transaction)?;

        if self.storage.get_transaction(&transaction.id).await?.is_some() {
            return Err(ReconciliationError::Validation(format!(
                "Bank transaction with ID '{}' already exists",
                transaction.id
            )));
        }

        transaction.is_reconciled = false;
        self.storage.save_transaction(&transaction).await?;
        Ok(transaction)
    }

    /// Register an expense
    pub async fn record_expense(&mut self, mut expense: Expense) -> ReconciliationResult<Expense> {
        validate_expense(&expense)?;

        if self.storage.get_expense(&expense.id).await?.is_some() {
            return Err(ReconciliationError::Validation(format!(
                "Expense with ID '{}' already exists",
                expense.id
            )));
        }

        expense.is_reconciled = false;
        self.storage.save_expense(&expense).await?;
        Ok(expense)
    }

    /// Register an invoice
    pub async fn record_invoice(&mut self, mut invoice: Invoice) -> ReconciliationResult<Invoice> {
        validate_invoice(&invoice)?;

        if self.storage.get_invoice(&invoice.id).await?.is_some() {
            return Err(ReconciliationError::Validation(format!(
                "Invoice with ID '{}' already exists",
                invoice.id
            )));
        }

        invoice.is_reconciled = false;
        self.storage.save_invoice(&invoice).await?;
        Ok(invoice)
    }

    /// Get a bank transaction by ID
    pub async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> ReconciliationResult<Option<BankTransaction>> {
        self.storage.get_transaction(transaction_id).await
    }

    /// Get an expense by ID
    pub async fn get_expense(&self, expense_id: &str) -> ReconciliationResult<Option<Expense>> {
        self.storage.get_expense(expense_id).await
    }

    /// Get an invoice by ID
    pub async fn get_invoice(&self, invoice_id: &str) -> ReconciliationResult<Option<Invoice>> {
        self.storage.get_invoice(invoice_id).await
    }

    /// Get the expense or invoice behind a reference, returning an error if not found
    pub async fn get_record_required(
        &self,
        record: &SettledRef,
    ) -> ReconciliationResult<SettledRecord> {
        load_record(&self.storage, record).await
    }

    /// Copy every record and link out of the store
    pub async fn snapshot(&self) -> ReconciliationResult<RecordSnapshot> {
        Ok(RecordSnapshot {
            transactions: self.storage.list_transactions().await?,
            expenses: self.storage.list_expenses().await?,
            invoices: self.storage.list_invoices().await?,
            links: self.storage.list_links().await?,
        })
    }
}
