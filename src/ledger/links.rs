//! Committing and reversing reconciliation links

use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

use super::journal::{abort, AppliedWrite, CommitJournal};
use super::records::{load_record, load_transaction};
use crate::traits::*;
use crate::types::*;

/// Link manager: the only writer of reconciliation state
pub struct LinkManager<S: RecordStore> {
    storage: S,
    validator: Box<dyn LinkValidator>,
}

impl<S: RecordStore> LinkManager<S> {
    /// Create a new link manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultLinkValidator),
        }
    }

    /// Create a new link manager with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn LinkValidator>) -> Self {
        Self { storage, validator }
    }

    /// Link a bank transaction to one or more settled records
    ///
    /// Every precondition is checked before the first write. The writes then
    /// claim the transaction, save one link per record (carrying the record's
    /// full amount) and flag each record. Any failure undoes what was written.
    #[instrument(skip(self, records), fields(transaction_id = %transaction_id, records = records.len()))]
    pub async fn reconcile(
        &mut self,
        transaction_id: &str,
        records: &[SettledRef],
    ) -> ReconciliationResult<Vec<ReconciliationLink>> {
        if records.is_empty() {
            return Err(ReconciliationError::Validation(
                "At least one expense or invoice is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for record in records {
            if !seen.insert(record) {
                return Err(ReconciliationError::Validation(format!(
                    "{} is listed more than once",
                    record
                )));
            }
        }

        let transaction = load_transaction(&self.storage, transaction_id).await?;
        if transaction.is_reconciled {
            return Err(ReconciliationError::AlreadyReconciled(format!(
                "Bank transaction '{}' is already reconciled",
                transaction_id
            )));
        }

        let mut links = Vec::with_capacity(records.len());
        for reference in records {
            let record = load_record(&self.storage, reference).await?;

            if let Some(existing) = self.storage.get_link_for_record(reference).await? {
                return Err(ReconciliationError::AlreadyReconciled(format!(
                    "{} is already linked to bank transaction '{}'",
                    reference, existing.bank_transaction_id
                )));
            }
            if record.is_reconciled() {
                return Err(ReconciliationError::AlreadyReconciled(format!(
                    "{} is already reconciled",
                    reference
                )));
            }

            self.validator.validate_link(&transaction, &record)?;
            links.push(ReconciliationLink::new(
                transaction.id.clone(),
                reference.clone(),
                record.amount().clone(),
            ));
        }

        let mut journal = CommitJournal::new();
        if let Err(err) = self.apply_links(&transaction.id, &links, &mut journal).await {
            return Err(abort(journal, &mut self.storage, err).await);
        }

        info!(links = links.len(), "Bank transaction reconciled");
        Ok(links)
    }

    async fn apply_links(
        &mut self,
        transaction_id: &str,
        links: &[ReconciliationLink],
        journal: &mut CommitJournal,
    ) -> ReconciliationResult<()> {
        // Claiming the transaction first makes a concurrent commit fail fast
        self.storage.mark_transaction(transaction_id, true).await?;
        journal.record(AppliedWrite::TransactionMarked(transaction_id.to_string()));

        for link in links {
            self.storage.save_link(link).await?;
            journal.record(AppliedWrite::LinkSaved(link.clone()));

            self.storage.mark_record(&link.record, true).await?;
            journal.record(AppliedWrite::RecordMarked(link.record.clone()));
        }

        Ok(())
    }

    /// Remove every link of a bank transaction and clear the reconciled flags
    ///
    /// Unreconciling a transaction that has no links is a successful no-op.
    #[instrument(skip(self), fields(transaction_id = %transaction_id))]
    pub async fn unreconcile(&mut self, transaction_id: &str) -> ReconciliationResult<()> {
        let transaction = load_transaction(&self.storage, transaction_id).await?;
        let links = self.storage.get_links_for_transaction(transaction_id).await?;

        if links.is_empty() {
            if transaction.is_reconciled {
                warn!("Reconciled flag set without any links; clearing it");
                self.storage.mark_transaction(transaction_id, false).await?;
            } else {
                debug!("Bank transaction is not reconciled; nothing to undo");
            }
            return Ok(());
        }

        let mut journal = CommitJournal::new();
        if let Err(err) = self.remove_links(transaction_id, &links, &mut journal).await {
            return Err(abort(journal, &mut self.storage, err).await);
        }

        info!(links = links.len(), "Bank transaction unreconciled");
        Ok(())
    }

    async fn remove_links(
        &mut self,
        transaction_id: &str,
        links: &[ReconciliationLink],
        journal: &mut CommitJournal,
    ) -> ReconciliationResult<()> {
        for link in links {
            self.storage.delete_link(&link.id).await?;
            journal.record(AppliedWrite::LinkDeleted(link.clone()));

            self.storage.mark_record(&link.record, false).await?;
            journal.record(AppliedWrite::RecordCleared(link.record.clone()));
        }

        // Cleared last so the transaction reads as reconciled until every link is gone
        self.storage.mark_transaction(transaction_id, false).await?;
        journal.record(AppliedWrite::TransactionCleared(transaction_id.to_string()));

        Ok(())
    }

    /// All links that reference a bank transaction
    pub async fn get_links_for_transaction(
        &self,
        transaction_id: &str,
    ) -> ReconciliationResult<Vec<ReconciliationLink>> {
        self.storage.get_links_for_transaction(transaction_id).await
    }

    /// The link that settles a record, if any
    pub async fn get_link_for_record(
        &self,
        record: &SettledRef,
    ) -> ReconciliationResult<Option<ReconciliationLink>> {
        self.storage.get_link_for_record(record).await
    }

    /// List every reconciliation link
    pub async fn list_links(&self) -> ReconciliationResult<Vec<ReconciliationLink>> {
        self.storage.list_links().await
    }
}
