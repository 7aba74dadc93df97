//! Candidate generation: propose one settled record per open bank transaction

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ReconciliationConfig, TieBreak};
use crate::types::*;

/// Which matching rule produced a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Outflow equals the expense amount
    ExactAmount,
    /// Outflow equals the expense amount plus VAT
    VatUplift,
    /// Inflow equals a paid invoice total
    InvoiceTotal,
}

/// A proposed, unconfirmed pairing of one transaction with one settled record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedMatch {
    pub transaction: BankTransaction,
    pub record: SettledRecord,
    pub kind: MatchKind,
    /// Absolute distance in days between the transaction and record dates
    pub day_gap: i64,
    /// Human-readable explanation of the rule that fired
    pub reason: String,
}

impl SuggestedMatch {
    pub fn settled_ref(&self) -> SettledRef {
        self.record.settled_ref()
    }
}

/// A record that passed a matching rule, before tie-breaking
struct Qualified<'a, R> {
    record: &'a R,
    id: &'a str,
    kind: MatchKind,
    day_gap: i64,
    amount_delta: BigDecimal,
}

/// Propose at most one match for every unreconciled transaction
///
/// Outflows are compared with unreconciled expenses inside the expense
/// window, either at face value or uplifted by VAT. Inflows are compared with
/// paid, unreconciled invoices inside the invoice window. Zero-amount lines
/// are never matched. The inputs are a snapshot; nothing is written.
pub fn generate_candidates(
    transactions: &[BankTransaction],
    expenses: &[Expense],
    invoices: &[Invoice],
    config: &ReconciliationConfig,
) -> Vec<SuggestedMatch> {
    let open_expenses: Vec<&Expense> = expenses.iter().filter(|e| !e.is_reconciled).collect();
    let open_invoices: Vec<&Invoice> = invoices
        .iter()
        .filter(|i| i.is_paid() && !i.is_reconciled)
        .collect();

    let suggestions: Vec<SuggestedMatch> = transactions
        .iter()
        .filter(|t| !t.is_reconciled)
        .filter_map(|transaction| {
            if transaction.is_outflow() {
                match_expense(transaction, &open_expenses, config)
            } else if transaction.is_inflow() {
                match_invoice(transaction, &open_invoices, config)
            } else {
                None
            }
        })
        .collect();

    debug!(
        transactions = transactions.len(),
        expenses = open_expenses.len(),
        invoices = open_invoices.len(),
        suggestions = suggestions.len(),
        "Generated reconciliation candidates"
    );

    suggestions
}

fn match_expense(
    transaction: &BankTransaction,
    expenses: &[&Expense],
    config: &ReconciliationConfig,
) -> Option<SuggestedMatch> {
    let magnitude = transaction.magnitude();

    let qualifying = expenses.iter().filter_map(|expense| {
        let day_gap = day_gap(transaction.date, expense.date);
        if day_gap > config.expense_window_days {
            return None;
        }

        let exact_delta = (&magnitude - &expense.amount).abs();
        if exact_delta < config.amount_tolerance {
            return Some(Qualified {
                record: *expense,
                id: expense.id.as_str(),
                kind: MatchKind::ExactAmount,
                day_gap,
                amount_delta: exact_delta,
            });
        }

        let gross_delta = (&magnitude - config.vat_rate.uplift(&expense.amount)).abs();
        if gross_delta < config.amount_tolerance {
            return Some(Qualified {
                record: *expense,
                id: expense.id.as_str(),
                kind: MatchKind::VatUplift,
                day_gap,
                amount_delta: gross_delta,
            });
        }

        None
    });

    let chosen = select(qualifying, config.tie_break)?;
    let expense = chosen.record;
    let reason = match chosen.kind {
        MatchKind::VatUplift => format!(
            "Amount matches {} expense plus {} VAT, {}",
            expense.vendor,
            config.vat_rate,
            describe_gap(chosen.day_gap)
        ),
        _ => format!(
            "Exact amount match with {} expense, {}",
            expense.vendor,
            describe_gap(chosen.day_gap)
        ),
    };

    Some(SuggestedMatch {
        transaction: transaction.clone(),
        record: SettledRecord::Expense(expense.clone()),
        kind: chosen.kind,
        day_gap: chosen.day_gap,
        reason,
    })
}

fn match_invoice(
    transaction: &BankTransaction,
    invoices: &[&Invoice],
    config: &ReconciliationConfig,
) -> Option<SuggestedMatch> {
    let magnitude = transaction.magnitude();

    let qualifying = invoices.iter().filter_map(|invoice| {
        let day_gap = day_gap(transaction.date, invoice.date);
        let amount_delta = (&magnitude - &invoice.total).abs();
        if day_gap > config.invoice_window_days || amount_delta >= config.amount_tolerance {
            return None;
        }
        Some(Qualified {
            record: *invoice,
            id: invoice.id.as_str(),
            kind: MatchKind::InvoiceTotal,
            day_gap,
            amount_delta,
        })
    });

    let chosen = select(qualifying, config.tie_break)?;
    let invoice = chosen.record;

    Some(SuggestedMatch {
        transaction: transaction.clone(),
        record: SettledRecord::Invoice(invoice.clone()),
        kind: chosen.kind,
        day_gap: chosen.day_gap,
        reason: format!(
            "Matches paid invoice {} total, {}",
            invoice.reference,
            describe_gap(chosen.day_gap)
        ),
    })
}

fn select<'a, R>(
    mut qualifying: impl Iterator<Item = Qualified<'a, R>>,
    tie_break: TieBreak,
) -> Option<Qualified<'a, R>> {
    match tie_break {
        TieBreak::FirstEncountered => qualifying.next(),
        TieBreak::ClosestDate => qualifying.min_by(|a, b| {
            a.day_gap
                .cmp(&b.day_gap)
                .then_with(|| a.amount_delta.cmp(&b.amount_delta))
                .then_with(|| a.id.cmp(b.id))
        }),
    }
}

/// Absolute number of days between two dates
pub fn day_gap(a: NaiveDate, b: NaiveDate) -> i64 {
    a.signed_duration_since(b).num_days().abs()
}

fn describe_gap(days: i64) -> String {
    match days {
        0 => "same day".to_string(),
        1 => "1 day apart".to_string(),
        n => format!("{} days apart", n),
    }
}
