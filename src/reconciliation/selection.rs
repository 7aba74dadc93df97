//! Manual many-to-one matching: one bank transaction against a hand-picked
//! set of expenses and invoices

use bigdecimal::BigDecimal;
use std::collections::BTreeSet;

use crate::config::ReconciliationConfig;
use crate::ledger::ReconciliationLedger;
use crate::traits::RecordStore;
use crate::types::*;

/// Working set for a split match
///
/// The pool is fixed when the selection is built: unreconciled expenses and
/// paid, unreconciled invoices. Selecting and deselecting are idempotent, so
/// a UI can replay toggles without tracking state of its own. Running total
/// and residual are recomputed on every call.
#[derive(Debug, Clone)]
pub struct MatchSelection {
    transaction: BankTransaction,
    expenses: Vec<Expense>,
    invoices: Vec<Invoice>,
    selected_expenses: BTreeSet<String>,
    selected_invoices: BTreeSet<String>,
    amount_tolerance: BigDecimal,
    require_exact_match: bool,
}

impl MatchSelection {
    /// Start a selection for `transaction_id` over a record snapshot
    pub fn new(
        transaction_id: &str,
        snapshot: &RecordSnapshot,
        config: &ReconciliationConfig,
    ) -> ReconciliationResult<Self> {
        let transaction = snapshot
            .transaction(transaction_id)
            .ok_or_else(|| ReconciliationError::not_found(RecordKind::Transaction, transaction_id))?;

        if transaction.is_reconciled {
            return Err(ReconciliationError::AlreadyReconciled(format!(
                "Bank transaction '{}' is already reconciled",
                transaction_id
            )));
        }

        Ok(Self {
            transaction: transaction.clone(),
            expenses: snapshot.open_expenses().cloned().collect(),
            invoices: snapshot.open_invoices().cloned().collect(),
            selected_expenses: BTreeSet::new(),
            selected_invoices: BTreeSet::new(),
            amount_tolerance: config.amount_tolerance.clone(),
            require_exact_match: config.require_exact_match,
        })
    }

    pub fn transaction(&self) -> &BankTransaction {
        &self.transaction
    }

    /// Expenses that may be selected
    pub fn available_expenses(&self) -> &[Expense] {
        &self.expenses
    }

    /// Invoices that may be selected
    pub fn available_invoices(&self) -> &[Invoice] {
        &self.invoices
    }

    pub fn select_expense(&mut self, expense_id: &str) -> ReconciliationResult<()> {
        if !self.expenses.iter().any(|e| e.id == expense_id) {
            return Err(ReconciliationError::Validation(format!(
                "Expense '{}' is not available for matching",
                expense_id
            )));
        }
        self.selected_expenses.insert(expense_id.to_string());
        Ok(())
    }

    pub fn deselect_expense(&mut self, expense_id: &str) {
        self.selected_expenses.remove(expense_id);
    }

    /// Flip an expense in or out of the selection; returns whether it is now selected
    pub fn toggle_expense(&mut self, expense_id: &str) -> ReconciliationResult<bool> {
        if self.selected_expenses.contains(expense_id) {
            self.deselect_expense(expense_id);
            Ok(false)
        } else {
            self.select_expense(expense_id)?;
            Ok(true)
        }
    }

    pub fn select_invoice(&mut self, invoice_id: &str) -> ReconciliationResult<()> {
        if !self.invoices.iter().any(|i| i.id == invoice_id) {
            return Err(ReconciliationError::Validation(format!(
                "Invoice '{}' is not available for matching",
                invoice_id
            )));
        }
        self.selected_invoices.insert(invoice_id.to_string());
        Ok(())
    }

    pub fn deselect_invoice(&mut self, invoice_id: &str) {
        self.selected_invoices.remove(invoice_id);
    }

    /// Flip an invoice in or out of the selection; returns whether it is now selected
    pub fn toggle_invoice(&mut self, invoice_id: &str) -> ReconciliationResult<bool> {
        if self.selected_invoices.contains(invoice_id) {
            self.deselect_invoice(invoice_id);
            Ok(false)
        } else {
            self.select_invoice(invoice_id)?;
            Ok(true)
        }
    }

    pub fn is_expense_selected(&self, expense_id: &str) -> bool {
        self.selected_expenses.contains(expense_id)
    }

    pub fn is_invoice_selected(&self, invoice_id: &str) -> bool {
        self.selected_invoices.contains(invoice_id)
    }

    pub fn clear(&mut self) {
        self.selected_expenses.clear();
        self.selected_invoices.clear();
    }

    pub fn selected_count(&self) -> usize {
        self.selected_expenses.len() + self.selected_invoices.len()
    }

    /// Selected expense ids, in pool order
    pub fn selected_expense_ids(&self) -> Vec<String> {
        self.expenses
            .iter()
            .filter(|e| self.selected_expenses.contains(&e.id))
            .map(|e| e.id.clone())
            .collect()
    }

    /// Selected invoice ids, in pool order
    pub fn selected_invoice_ids(&self) -> Vec<String> {
        self.invoices
            .iter()
            .filter(|i| self.selected_invoices.contains(&i.id))
            .map(|i| i.id.clone())
            .collect()
    }

    /// Sum of every selected expense amount and invoice total
    pub fn running_total(&self) -> BigDecimal {
        let expenses: BigDecimal = self
            .expenses
            .iter()
            .filter(|e| self.selected_expenses.contains(&e.id))
            .map(|e| &e.amount)
            .sum();
        let invoices: BigDecimal = self
            .invoices
            .iter()
            .filter(|i| self.selected_invoices.contains(&i.id))
            .map(|i| &i.total)
            .sum();
        expenses + invoices
    }

    /// Unallocated part of the transaction; negative when over-allocated
    pub fn residual(&self) -> BigDecimal {
        self.transaction.magnitude() - self.running_total()
    }

    /// Whether the selection accounts for the whole transaction amount
    pub fn is_balanced(&self) -> bool {
        self.residual().abs() < self.amount_tolerance
    }

    /// Check the commit preconditions without committing
    pub fn check_commit(&self) -> ReconciliationResult<()> {
        if self.selected_count() == 0 {
            return Err(ReconciliationError::Validation(
                "Select at least one expense or invoice".to_string(),
            ));
        }

        if self.require_exact_match && !self.is_balanced() {
            return Err(ReconciliationError::AmountMismatch {
                expected: self.transaction.magnitude(),
                selected: self.running_total(),
            });
        }

        Ok(())
    }

    pub fn can_commit(&self) -> bool {
        self.check_commit().is_ok()
    }

    /// Link every selected record to the transaction in one atomic commit
    pub async fn commit<S: RecordStore + Clone>(
        &self,
        ledger: &mut ReconciliationLedger<S>,
    ) -> ReconciliationResult<Vec<ReconciliationLink>> {
        self.check_commit()?;
        ledger
            .reconcile_multi(
                &self.transaction.id,
                &self.selected_expense_ids(),
                &self.selected_invoice_ids(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn snapshot() -> RecordSnapshot {
        let mut reconciled = Expense::new("e9".to_string(), "Old".to_string(), dec("1.00"), date());
        reconciled.is_reconciled = true;

        RecordSnapshot {
            transactions: vec![BankTransaction::new(
                "t1".to_string(),
                date(),
                "CARD PAYMENT BUILDBASE".to_string(),
                dec("-85.50"),
            )],
            expenses: vec![
                Expense::new("e1".to_string(), "Buildbase".to_string(), dec("40.00"), date()),
                Expense::new("e2".to_string(), "Buildbase".to_string(), dec("45.50"), date()),
                reconciled,
            ],
            invoices: vec![Invoice::new(
                "i1".to_string(),
                "INV-1".to_string(),
                dec("10.00"),
                date(),
                InvoiceStatus::Draft,
            )],
            links: Vec::new(),
        }
    }

    #[test]
    fn test_residual_tracks_selection() {
        let mut selection =
            MatchSelection::new("t1", &snapshot(), &ReconciliationConfig::default()).unwrap();

        selection.select_expense("e1").unwrap();
        assert_eq!(selection.running_total(), dec("40.00"));
        assert_eq!(selection.residual(), dec("45.50"));
        assert!(!selection.is_balanced());

        selection.select_expense("e2").unwrap();
        assert_eq!(selection.running_total(), dec("85.50"));
        assert_eq!(selection.residual(), dec("0.00"));
        assert!(selection.is_balanced());
    }

    #[test]
    fn test_toggling_is_idempotent() {
        let mut selection =
            MatchSelection::new("t1", &snapshot(), &ReconciliationConfig::default()).unwrap();

        selection.select_expense("e1").unwrap();
        selection.select_expense("e1").unwrap();
        assert_eq!(selection.selected_count(), 1);

        assert!(!selection.toggle_expense("e1").unwrap());
        assert!(selection.toggle_expense("e1").unwrap());
        assert!(!selection.toggle_expense("e1").unwrap());

        selection.deselect_expense("e1");
        selection.deselect_expense("e1");
        assert_eq!(selection.selected_count(), 0);
        assert_eq!(selection.running_total(), BigDecimal::from(0));
    }

    #[test]
    fn test_pool_excludes_reconciled_and_unpaid() {
        let mut selection =
            MatchSelection::new("t1", &snapshot(), &ReconciliationConfig::default()).unwrap();

        assert_eq!(selection.available_expenses().len(), 2);
        assert!(selection.available_invoices().is_empty());
        assert!(selection.select_expense("e9").is_err());
        assert!(selection.toggle_invoice("i1").is_err());
        assert!(selection.select_expense("missing").is_err());
    }

    #[test]
    fn test_over_allocation_gives_negative_residual() {
        let mut snapshot = snapshot();
        snapshot.transactions[0].amount = dec("-50.00");
        let mut selection =
            MatchSelection::new("t1", &snapshot, &ReconciliationConfig::default()).unwrap();

        selection.select_expense("e2").unwrap();
        selection.select_expense("e1").unwrap();
        assert_eq!(selection.residual(), dec("-35.50"));
        // Commit order follows the pool, not the click order
        assert_eq!(selection.selected_expense_ids(), vec!["e1", "e2"]);
    }

    #[test]
    fn test_commit_preconditions() {
        let mut selection =
            MatchSelection::new("t1", &snapshot(), &ReconciliationConfig::default()).unwrap();
        assert!(matches!(
            selection.check_commit(),
            Err(ReconciliationError::Validation(_))
        ));

        // Partial allocation is allowed by default
        selection.select_expense("e1").unwrap();
        assert!(selection.can_commit());

        let strict = ReconciliationConfig {
            require_exact_match: true,
            ..Default::default()
        };
        let mut selection = MatchSelection::new("t1", &snapshot(), &strict).unwrap();
        selection.select_expense("e1").unwrap();
        assert!(matches!(
            selection.check_commit(),
            Err(ReconciliationError::AmountMismatch { .. })
        ));
        selection.select_expense("e2").unwrap();
        assert!(selection.can_commit());
    }

    #[test]
    fn test_reconciled_transaction_cannot_start_selection() {
        let mut snapshot = snapshot();
        snapshot.transactions[0].is_reconciled = true;
        let err = MatchSelection::new("t1", &snapshot, &ReconciliationConfig::default()).unwrap_err();
        assert!(matches!(err, ReconciliationError::AlreadyReconciled(_)));

        let err = MatchSelection::new("nope", &snapshot, &ReconciliationConfig::default()).unwrap_err();
        assert!(matches!(err, ReconciliationError::NotFound { .. }));
    }
}
