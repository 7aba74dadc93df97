//! Main reconciliation ledger that coordinates records, matching and links

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

use crate::config::ReconciliationConfig;
use crate::ledger::{LinkManager, RecordManager};
use crate::reconciliation::{
    generate_candidates, score_all, Confidence, MatchSelection, ScoredMatch, SuggestedMatch,
};
use crate::traits::*;
use crate::types::*;

/// Main reconciliation system that orchestrates all reconciliation operations
pub struct ReconciliationLedger<S: RecordStore> {
    record_manager: RecordManager<S>,
    link_manager: LinkManager<S>,
    config: ReconciliationConfig,
}

impl<S: RecordStore + Clone> ReconciliationLedger<S> {
    /// Create a new ledger with the given storage backend and default configuration
    pub fn new(storage: S) -> Self {
        Self {
            record_manager: RecordManager::new(storage.clone()),
            link_manager: LinkManager::new(storage),
            config: ReconciliationConfig::default(),
        }
    }

    /// Create a new ledger with custom configuration
    pub fn with_config(storage: S, config: ReconciliationConfig) -> ReconciliationResult<Self> {
        config.validate()?;
        Ok(Self {
            record_manager: RecordManager::new(storage.clone()),
            link_manager: LinkManager::new(storage),
            config,
        })
    }

    /// Create a new ledger with custom configuration and link validator
    pub fn with_validator(
        storage: S,
        config: ReconciliationConfig,
        validator: Box<dyn LinkValidator>,
    ) -> ReconciliationResult<Self> {
        config.validate()?;
        Ok(Self {
            record_manager: RecordManager::new(storage.clone()),
            link_manager: LinkManager::with_validator(storage, validator),
            config,
        })
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    // Record operations
    /// Register a statement line produced by the statement importer
    pub async fn import_transaction(
        &mut self,
        transaction: BankTransaction,
    ) -> ReconciliationResult<BankTransaction> {
        self.record_manager.import_transaction(transaction).await
    }

    /// Register an expense
    pub async fn record_expense(&mut self, expense: Expense) -> ReconciliationResult<Expense> {
        self.record_manager.record_expense(expense).await
    }

    /// Register an invoice
    pub async fn record_invoice(&mut self, invoice: Invoice) -> ReconciliationResult<Invoice> {
        self.record_manager.record_invoice(invoice).await
    }

    /// Get a bank transaction by ID
    pub async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> ReconciliationResult<Option<BankTransaction>> {
        self.record_manager.get_transaction(transaction_id).await
    }

    /// Get an expense by ID
    pub async fn get_expense(&self, expense_id: &str) -> ReconciliationResult<Option<Expense>> {
        self.record_manager.get_expense(expense_id).await
    }

    /// Get an invoice by ID
    pub async fn get_invoice(&self, invoice_id: &str) -> ReconciliationResult<Option<Invoice>> {
        self.record_manager.get_invoice(invoice_id).await
    }

    /// Copy every record and link out of the store
    pub async fn snapshot(&self) -> ReconciliationResult<RecordSnapshot> {
        self.record_manager.snapshot().await
    }

    // Matching operations
    /// Generate and score suggestions over a fresh snapshot, high confidence first
    pub async fn suggest_matches(&self) -> ReconciliationResult<Vec<ScoredMatch>> {
        let snapshot = self.snapshot().await?;
        let suggestions = generate_candidates(
            &snapshot.transactions,
            &snapshot.expenses,
            &snapshot.invoices,
            &self.config,
        );
        Ok(score_all(suggestions))
    }

    /// Accept a suggestion as-is (one-click accept)
    pub async fn accept_suggestion(
        &mut self,
        suggestion: &SuggestedMatch,
    ) -> ReconciliationResult<Vec<ReconciliationLink>> {
        self.reconcile_single(&suggestion.transaction.id, suggestion.settled_ref())
            .await
    }

    /// Accept every current suggestion at or above `min_confidence`
    ///
    /// Each accept is its own atomic commit. When an accept loses a race to
    /// an earlier one in the batch (the same expense proposed for two
    /// transactions) the suggestions are regenerated, so the losing
    /// transaction can still pick up another open record. A transaction that
    /// ends the batch without a match is reported as skipped. Any other error
    /// stops the batch, leaving earlier accepts committed.
    #[instrument(skip(self), fields(min_confidence = %min_confidence))]
    pub async fn accept_all(
        &mut self,
        min_confidence: Confidence,
    ) -> ReconciliationResult<BulkAcceptReport> {
        let mut report = BulkAcceptReport::default();
        let mut attempted: HashSet<(String, SettledRef)> = HashSet::new();

        'batch: loop {
            for scored in self.suggest_matches().await? {
                if scored.confidence < min_confidence {
                    continue;
                }

                let transaction_id = scored.suggestion.transaction.id.clone();
                let record = scored.suggestion.settled_ref();
                // Each pair is tried once so a store that keeps refusing cannot loop
                if !attempted.insert((transaction_id.clone(), record.clone())) {
                    continue;
                }

                match self.accept_suggestion(&scored.suggestion).await {
                    Ok(links) => report.accepted.extend(links),
                    Err(ReconciliationError::AlreadyReconciled(reason)) => {
                        debug!(%transaction_id, %record, "Suggestion lost to an earlier accept");
                        report.skipped.push(SkippedSuggestion {
                            transaction_id,
                            record,
                            reason,
                        });
                        continue 'batch;
                    }
                    Err(err) => return Err(err),
                }
            }
            break;
        }

        let accepted: HashSet<&str> = report
            .accepted
            .iter()
            .map(|link| link.bank_transaction_id.as_str())
            .collect();
        let skipped = std::mem::take(&mut report.skipped);
        report.skipped = skipped
            .into_iter()
            .filter(|s| !accepted.contains(s.transaction_id.as_str()))
            .collect();

        info!(
            accepted = report.accepted.len(),
            skipped = report.skipped.len(),
            "Bulk accept finished"
        );
        Ok(report)
    }

    /// Start a manual split match for one transaction over a fresh snapshot
    pub async fn begin_selection(
        &self,
        transaction_id: &str,
    ) -> ReconciliationResult<MatchSelection> {
        let snapshot = self.snapshot().await?;
        MatchSelection::new(transaction_id, &snapshot, &self.config)
    }

    // Ledger operations
    /// Link a bank transaction to several expenses and invoices at once
    pub async fn reconcile_multi(
        &mut self,
        transaction_id: &str,
        expense_ids: &[String],
        invoice_ids: &[String],
    ) -> ReconciliationResult<Vec<ReconciliationLink>> {
        let records: Vec<SettledRef> = expense_ids
            .iter()
            .cloned()
            .map(SettledRef::Expense)
            .chain(invoice_ids.iter().cloned().map(SettledRef::Invoice))
            .collect();
        self.link_manager.reconcile(transaction_id, &records).await
    }

    /// Link a bank transaction to exactly one expense or invoice
    pub async fn reconcile_single(
        &mut self,
        transaction_id: &str,
        record: SettledRef,
    ) -> ReconciliationResult<Vec<ReconciliationLink>> {
        self.link_manager.reconcile(transaction_id, &[record]).await
    }

    /// Remove all links of a bank transaction; a no-op if it has none
    pub async fn unreconcile(&mut self, transaction_id: &str) -> ReconciliationResult<()> {
        self.link_manager.unreconcile(transaction_id).await
    }

    /// All links that reference a bank transaction
    pub async fn get_links_for_transaction(
        &self,
        transaction_id: &str,
    ) -> ReconciliationResult<Vec<ReconciliationLink>> {
        self.link_manager
            .get_links_for_transaction(transaction_id)
            .await
    }

    /// The link that settles an expense or invoice, if any
    pub async fn get_link_for_record(
        &self,
        record: &SettledRef,
    ) -> ReconciliationResult<Option<ReconciliationLink>> {
        self.link_manager.get_link_for_record(record).await
    }

    /// List every reconciliation link
    pub async fn list_links(&self) -> ReconciliationResult<Vec<ReconciliationLink>> {
        self.link_manager.list_links().await
    }

    // Reporting operations
    /// Progress counters for the reconciliation screen
    pub async fn summary(&self) -> ReconciliationResult<ReconciliationSummary> {
        let snapshot = self.snapshot().await?;

        let reconciled_transactions = snapshot
            .transactions
            .iter()
            .filter(|t| t.is_reconciled)
            .count();
        let unmatched_outflows: BigDecimal = snapshot
            .transactions
            .iter()
            .filter(|t| !t.is_reconciled && t.is_outflow())
            .map(|t| t.magnitude())
            .sum();
        let unmatched_inflows: BigDecimal = snapshot
            .transactions
            .iter()
            .filter(|t| !t.is_reconciled && t.is_inflow())
            .map(|t| &t.amount)
            .sum();

        Ok(ReconciliationSummary {
            total_transactions: snapshot.transactions.len(),
            reconciled_transactions,
            unreconciled_transactions: snapshot.transactions.len() - reconciled_transactions,
            open_expenses: snapshot.open_expenses().count(),
            open_invoices: snapshot.open_invoices().count(),
            link_count: snapshot.links.len(),
            unmatched_outflows,
            unmatched_inflows,
        })
    }

    /// Validate the reconciliation invariants across the whole store
    pub async fn check_integrity(&self) -> ReconciliationResult<IntegrityReport> {
        let snapshot = self.snapshot().await?;
        let mut issues = Vec::new();

        let mut links_by_transaction: HashMap<&str, usize> = HashMap::new();
        let mut links_by_record: HashMap<&SettledRef, usize> = HashMap::new();
        for link in &snapshot.links {
            *links_by_transaction
                .entry(link.bank_transaction_id.as_str())
                .or_default() += 1;
            *links_by_record.entry(&link.record).or_default() += 1;
        }

        // A transaction is reconciled iff at least one link references it
        for transaction in &snapshot.transactions {
            let linked = links_by_transaction.contains_key(transaction.id.as_str());
            if transaction.is_reconciled != linked {
                issues.push(format!(
                    "Bank transaction '{}' has reconciled = {} but {} link(s)",
                    transaction.id,
                    transaction.is_reconciled,
                    links_by_transaction
                        .get(transaction.id.as_str())
                        .copied()
                        .unwrap_or(0)
                ));
            }
        }

        for link in &snapshot.links {
            if snapshot.transaction(&link.bank_transaction_id).is_none() {
                issues.push(format!(
                    "Link '{}' references missing bank transaction '{}'",
                    link.id, link.bank_transaction_id
                ));
            }

            let record = match &link.record {
                SettledRef::Expense(id) => snapshot
                    .expenses
                    .iter()
                    .find(|e| &e.id == id)
                    .map(|e| (e.is_reconciled, &e.amount)),
                SettledRef::Invoice(id) => snapshot
                    .invoices
                    .iter()
                    .find(|i| &i.id == id)
                    .map(|i| (i.is_reconciled, &i.total)),
            };
            match record {
                None => issues.push(format!(
                    "Link '{}' references missing {}",
                    link.id, link.record
                )),
                Some((is_reconciled, amount)) => {
                    if !is_reconciled {
                        issues.push(format!(
                            "{} is linked but not marked reconciled",
                            link.record
                        ));
                    }
                    if &link.matched_amount != amount {
                        issues.push(format!(
                            "Link '{}' matched {} but {} amount is {}",
                            link.id, link.matched_amount, link.record, amount
                        ));
                    }
                }
            }
        }

        for (record, count) in &links_by_record {
            if *count > 1 {
                issues.push(format!("{} is referenced by {} links", record, count));
            }
        }

        let flagged_records = snapshot
            .expenses
            .iter()
            .filter(|e| e.is_reconciled)
            .map(|e| SettledRef::Expense(e.id.clone()))
            .chain(
                snapshot
                    .invoices
                    .iter()
                    .filter(|i| i.is_reconciled)
                    .map(|i| SettledRef::Invoice(i.id.clone())),
            );
        for record in flagged_records {
            if !links_by_record.contains_key(&record) {
                issues.push(format!("{} is marked reconciled without a link", record));
            }
        }

        Ok(IntegrityReport {
            is_valid: issues.is_empty(),
            issues,
            transactions_checked: snapshot.transactions.len(),
            links_checked: snapshot.links.len(),
        })
    }
}

/// Outcome of [`ReconciliationLedger::accept_all`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkAcceptReport {
    pub accepted: Vec<ReconciliationLink>,
    pub skipped: Vec<SkippedSuggestion>,
}

/// A suggestion that could not be accepted because its record was taken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSuggestion {
    pub transaction_id: String,
    pub record: SettledRef,
    pub reason: String,
}

/// Progress counters across the whole store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub total_transactions: usize,
    pub reconciled_transactions: usize,
    pub unreconciled_transactions: usize,
    /// Unreconciled expenses
    pub open_expenses: usize,
    /// Paid, unreconciled invoices
    pub open_invoices: usize,
    pub link_count: usize,
    /// Total money out still waiting for a match
    pub unmatched_outflows: BigDecimal,
    /// Total money in still waiting for a match
    pub unmatched_inflows: BigDecimal,
}

/// Report on reconciliation integrity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub transactions_checked: usize,
    pub links_checked: usize,
}
