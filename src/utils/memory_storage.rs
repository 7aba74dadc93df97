//! In-memory storage implementation for testing and embedding

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;

/// Rows keyed by id, iterated in insertion order
#[derive(Debug)]
struct Table<T> {
    rows: HashMap<String, T>,
    order: Vec<String>,
}

impl<T: Clone> Table<T> {
    fn new() -> Self {
        Self {
            rows: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn upsert(&mut self, id: &str, row: T) {
        if self.rows.insert(id.to_string(), row).is_none() {
            self.order.push(id.to_string());
        }
    }

    fn get(&self, id: &str) -> Option<&T> {
        self.rows.get(id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.rows.get_mut(id)
    }

    fn remove(&mut self, id: &str) -> Option<T> {
        let removed = self.rows.remove(id);
        if removed.is_some() {
            self.order.retain(|key| key != id);
        }
        removed
    }

    fn values(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(|id| self.rows.get(id))
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.order.clear();
    }
}

fn read<T>(lock: &RwLock<T>) -> ReconciliationResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| ReconciliationError::Storage("memory storage lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> ReconciliationResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| ReconciliationError::Storage("memory storage lock poisoned".to_string()))
}

/// Set a reconciled flag, refusing to set one that is already set
fn compare_and_mark(
    flag: &mut bool,
    reconciled: bool,
    describe: impl FnOnce() -> String,
) -> ReconciliationResult<()> {
    if reconciled && *flag {
        return Err(ReconciliationError::AlreadyReconciled(describe()));
    }
    *flag = reconciled;
    Ok(())
}

/// In-memory storage implementation for testing and development
///
/// Clones share the same tables, so several ledgers built from clones of one
/// storage see each other's writes.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    transactions: Arc<RwLock<Table<BankTransaction>>>,
    expenses: Arc<RwLock<Table<Expense>>>,
    invoices: Arc<RwLock<Table<Invoice>>>,
    links: Arc<RwLock<Table<ReconciliationLink>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            transactions: Arc::new(RwLock::new(Table::new())),
            expenses: Arc::new(RwLock::new(Table::new())),
            invoices: Arc::new(RwLock::new(Table::new())),
            links: Arc::new(RwLock::new(Table::new())),
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> ReconciliationResult<()> {
        write(&self.transactions)?.clear();
        write(&self.expenses)?.clear();
        write(&self.invoices)?.clear();
        write(&self.links)?.clear();
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStorage {
    async fn save_transaction(
        &mut self,
        transaction: &BankTransaction,
    ) -> ReconciliationResult<()> {
        write(&self.transactions)?.upsert(&transaction.id, transaction.clone());
        Ok(())
    }

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> ReconciliationResult<Option<BankTransaction>> {
        Ok(read(&self.transactions)?.get(transaction_id).cloned())
    }

    async fn list_transactions(&self) -> ReconciliationResult<Vec<BankTransaction>> {
        Ok(read(&self.transactions)?.values().cloned().collect())
    }

    async fn mark_transaction(
        &mut self,
        transaction_id: &str,
        reconciled: bool,
    ) -> ReconciliationResult<()> {
        let mut transactions = write(&self.transactions)?;
        let transaction = transactions.get_mut(transaction_id).ok_or_else(|| {
            ReconciliationError::not_found(RecordKind::Transaction, transaction_id)
        })?;
        compare_and_mark(&mut transaction.is_reconciled, reconciled, || {
            format!("Bank transaction '{}' is already reconciled", transaction_id)
        })
    }

    async fn save_expense(&mut self, expense: &Expense) -> ReconciliationResult<()> {
        write(&self.expenses)?.upsert(&expense.id, expense.clone());
        Ok(())
    }

    async fn get_expense(&self, expense_id: &str) -> ReconciliationResult<Option<Expense>> {
        Ok(read(&self.expenses)?.get(expense_id).cloned())
    }

    async fn list_expenses(&self) -> ReconciliationResult<Vec<Expense>> {
        Ok(read(&self.expenses)?.values().cloned().collect())
    }

    async fn save_invoice(&mut self, invoice: &Invoice) -> ReconciliationResult<()> {
        write(&self.invoices)?.upsert(&invoice.id, invoice.clone());
        Ok(())
    }

    async fn get_invoice(&self, invoice_id: &str) -> ReconciliationResult<Option<Invoice>> {
        Ok(read(&self.invoices)?.get(invoice_id).cloned())
    }

    async fn list_invoices(&self) -> ReconciliationResult<Vec<Invoice>> {
        Ok(read(&self.invoices)?.values().cloned().collect())
    }

    async fn mark_record(
        &mut self,
        record: &SettledRef,
        reconciled: bool,
    ) -> ReconciliationResult<()> {
        let describe = || format!("{} is already reconciled", record);
        match record {
            SettledRef::Expense(id) => {
                let mut expenses = write(&self.expenses)?;
                let expense = expenses
                    .get_mut(id)
                    .ok_or_else(|| ReconciliationError::not_found(RecordKind::Expense, id))?;
                compare_and_mark(&mut expense.is_reconciled, reconciled, describe)
            }
            SettledRef::Invoice(id) => {
                let mut invoices = write(&self.invoices)?;
                let invoice = invoices
                    .get_mut(id)
                    .ok_or_else(|| ReconciliationError::not_found(RecordKind::Invoice, id))?;
                compare_and_mark(&mut invoice.is_reconciled, reconciled, describe)
            }
        }
    }

    async fn save_link(&mut self, link: &ReconciliationLink) -> ReconciliationResult<()> {
        let mut links = write(&self.links)?;

        // One link per settled record
        if let Some(existing) = links
            .values()
            .find(|l| l.record == link.record && l.id != link.id)
        {
            return Err(ReconciliationError::AlreadyReconciled(format!(
                "{} is already linked to bank transaction '{}'",
                link.record, existing.bank_transaction_id
            )));
        }

        links.upsert(&link.id, link.clone());
        Ok(())
    }

    async fn delete_link(&mut self, link_id: &str) -> ReconciliationResult<()> {
        if write(&self.links)?.remove(link_id).is_some() {
            Ok(())
        } else {
            Err(ReconciliationError::not_found(RecordKind::Link, link_id))
        }
    }

    async fn get_links_for_transaction(
        &self,
        transaction_id: &str,
    ) -> ReconciliationResult<Vec<ReconciliationLink>> {
        Ok(read(&self.links)?
            .values()
            .filter(|link| link.bank_transaction_id == transaction_id)
            .cloned()
            .collect())
    }

    async fn get_link_for_record(
        &self,
        record: &SettledRef,
    ) -> ReconciliationResult<Option<ReconciliationLink>> {
        Ok(read(&self.links)?
            .values()
            .find(|link| &link.record == record)
            .cloned())
    }

    async fn list_links(&self) -> ReconciliationResult<Vec<ReconciliationLink>> {
        Ok(read(&self.links)?.values().cloned().collect())
    }
}
