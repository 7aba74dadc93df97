//! Undo journal for multi-write reconciliation commits
//!
//! The record store only offers single-row writes. Every write the ledger
//! applies during a commit or reversal is journaled, and on failure the
//! journal replays the inverse writes newest first.

use tracing::{error, warn};

use crate::traits::RecordStore;
use crate::types::*;

/// A write that has been applied to the store
#[derive(Debug, Clone)]
pub(crate) enum AppliedWrite {
    TransactionMarked(String),
    TransactionCleared(String),
    RecordMarked(SettledRef),
    RecordCleared(SettledRef),
    LinkSaved(ReconciliationLink),
    LinkDeleted(ReconciliationLink),
}

#[derive(Debug, Default)]
pub(crate) struct CommitJournal {
    applied: Vec<AppliedWrite>,
}

impl CommitJournal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, write: AppliedWrite) {
        self.applied.push(write);
    }

    pub(crate) fn len(&self) -> usize {
        self.applied.len()
    }

    /// Undo every applied write, newest first
    ///
    /// Keeps going after a failed undo so as much state as possible is
    /// restored; the failures are returned.
    pub(crate) async fn roll_back<S: RecordStore>(
        self,
        storage: &mut S,
    ) -> Vec<ReconciliationError> {
        let mut failures = Vec::new();

        for write in self.applied.into_iter().rev() {
            let undone = match &write {
                AppliedWrite::TransactionMarked(id) => storage.mark_transaction(id, false).await,
                AppliedWrite::TransactionCleared(id) => storage.mark_transaction(id, true).await,
                AppliedWrite::RecordMarked(record) => storage.mark_record(record, false).await,
                AppliedWrite::RecordCleared(record) => storage.mark_record(record, true).await,
                AppliedWrite::LinkSaved(link) => storage.delete_link(&link.id).await,
                AppliedWrite::LinkDeleted(link) => storage.save_link(link).await,
            };

            if let Err(err) = undone {
                error!(?write, error = %err, "Failed to undo reconciliation write");
                failures.push(err);
            }
        }

        failures
    }
}

/// Roll back a failed commit and translate the failure for the caller
///
/// A guard refusal from the store (another commit got there first) keeps its
/// `AlreadyReconciled` meaning. Anything else becomes a
/// `PartialCommitFailure` whose message says whether the rollback completed.
pub(crate) async fn abort<S: RecordStore>(
    journal: CommitJournal,
    storage: &mut S,
    cause: ReconciliationError,
) -> ReconciliationError {
    let applied = journal.len();
    let failures = journal.roll_back(storage).await;

    if !failures.is_empty() {
        let details: Vec<String> = failures.iter().map(|e| e.to_string()).collect();
        return ReconciliationError::PartialCommitFailure(format!(
            "{}; rollback incomplete: {}",
            cause,
            details.join("; ")
        ));
    }

    warn!(undone = applied, error = %cause, "Rolled back reconciliation commit");

    match cause {
        ReconciliationError::AlreadyReconciled(_) => cause,
        other => ReconciliationError::PartialCommitFailure(format!(
            "{}; all changes were rolled back",
            other
        )),
    }
}
