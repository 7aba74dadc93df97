//! Core types and data structures for the reconciliation system

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a record has been settled against a bank statement line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconciliationStatus {
    /// No reconciliation link references the record
    Unreconciled,
    /// At least one reconciliation link references the record
    Reconciled,
}

impl From<bool> for ReconciliationStatus {
    fn from(is_reconciled: bool) -> Self {
        if is_reconciled {
            ReconciliationStatus::Reconciled
        } else {
            ReconciliationStatus::Unreconciled
        }
    }
}

/// A single line of an imported bank statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    /// Unique identifier for the statement line
    pub id: String,
    /// Date the bank booked the transaction
    pub date: NaiveDate,
    /// Statement narrative
    pub description: String,
    /// Signed amount: negative is money out, positive is money in
    pub amount: BigDecimal,
    /// Running balance printed on the statement, when the bank provides one
    pub running_balance: Option<BigDecimal>,
    /// Set only by the reconciliation ledger
    pub is_reconciled: bool,
}

impl BankTransaction {
    /// Create a new, unreconciled statement line
    pub fn new(id: String, date: NaiveDate, description: String, amount: BigDecimal) -> Self {
        Self {
            id,
            date,
            description,
            amount,
            running_balance: None,
            is_reconciled: false,
        }
    }

    /// Attach the statement's running balance
    pub fn with_running_balance(mut self, balance: BigDecimal) -> Self {
        self.running_balance = Some(balance);
        self
    }

    /// Money leaving the account (matched against expenses)
    pub fn is_outflow(&self) -> bool {
        self.amount < BigDecimal::from(0)
    }

    /// Money entering the account (matched against paid invoices)
    pub fn is_inflow(&self) -> bool {
        self.amount > BigDecimal::from(0)
    }

    /// Unsigned amount of the transaction
    pub fn magnitude(&self) -> BigDecimal {
        self.amount.abs()
    }

    pub fn status(&self) -> ReconciliationStatus {
        self.is_reconciled.into()
    }
}

/// A recorded business expense (always an outflow)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    /// Who was paid
    pub vendor: String,
    /// Positive amount paid
    pub amount: BigDecimal,
    pub date: NaiveDate,
    pub is_reconciled: bool,
}

impl Expense {
    /// Create a new, unreconciled expense
    pub fn new(id: String, vendor: String, amount: BigDecimal, date: NaiveDate) -> Self {
        Self {
            id,
            vendor,
            amount,
            date,
            is_reconciled: false,
        }
    }
}

/// Lifecycle state of an invoice in the invoicing subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

/// Kind of invoice raised against a job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    /// Single invoice for the whole job
    #[default]
    Standard,
    /// Up-front deposit before work starts
    Deposit,
    /// Interim stage payment
    Progress,
    /// Closing invoice for the balance of the job
    Final,
}

/// A customer invoice (settles an inflow once paid)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    /// Human-facing invoice number, e.g. `INV-0042`
    pub reference: String,
    /// Positive total including tax
    pub total: BigDecimal,
    /// Last-updated date; for a paid invoice this is the payment date
    pub date: NaiveDate,
    pub status: InvoiceStatus,
    pub kind: InvoiceKind,
    pub is_reconciled: bool,
}

impl Invoice {
    /// Create a new, unreconciled standard invoice
    pub fn new(
        id: String,
        reference: String,
        total: BigDecimal,
        date: NaiveDate,
        status: InvoiceStatus,
    ) -> Self {
        Self {
            id,
            reference,
            total,
            date,
            status,
            kind: InvoiceKind::default(),
            is_reconciled: false,
        }
    }

    pub fn with_kind(mut self, kind: InvoiceKind) -> Self {
        self.kind = kind;
        self
    }

    /// Only paid invoices can settle a bank transaction
    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }
}

/// Kinds of records the reconciliation system reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Transaction,
    Expense,
    Invoice,
    Link,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Transaction => "Bank transaction",
            RecordKind::Expense => "Expense",
            RecordKind::Invoice => "Invoice",
            RecordKind::Link => "Reconciliation link",
        };
        f.write_str(name)
    }
}

/// Reference to the record a link settles: exactly one expense or one invoice
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SettledRef {
    Expense(String),
    Invoice(String),
}

impl SettledRef {
    pub fn id(&self) -> &str {
        match self {
            SettledRef::Expense(id) | SettledRef::Invoice(id) => id,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            SettledRef::Expense(_) => RecordKind::Expense,
            SettledRef::Invoice(_) => RecordKind::Invoice,
        }
    }

    pub fn expense_id(&self) -> Option<&str> {
        match self {
            SettledRef::Expense(id) => Some(id),
            SettledRef::Invoice(_) => None,
        }
    }

    pub fn invoice_id(&self) -> Option<&str> {
        match self {
            SettledRef::Invoice(id) => Some(id),
            SettledRef::Expense(_) => None,
        }
    }
}

impl fmt::Display for SettledRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettledRef::Expense(id) => write!(f, "expense '{}'", id),
            SettledRef::Invoice(id) => write!(f, "invoice '{}'", id),
        }
    }
}

/// A record that can settle a bank transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettledRecord {
    Expense(Expense),
    Invoice(Invoice),
}

impl SettledRecord {
    pub fn id(&self) -> &str {
        match self {
            SettledRecord::Expense(expense) => &expense.id,
            SettledRecord::Invoice(invoice) => &invoice.id,
        }
    }

    /// Amount the record settles (expense amount or invoice total)
    pub fn amount(&self) -> &BigDecimal {
        match self {
            SettledRecord::Expense(expense) => &expense.amount,
            SettledRecord::Invoice(invoice) => &invoice.total,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            SettledRecord::Expense(expense) => expense.date,
            SettledRecord::Invoice(invoice) => invoice.date,
        }
    }

    pub fn is_reconciled(&self) -> bool {
        match self {
            SettledRecord::Expense(expense) => expense.is_reconciled,
            SettledRecord::Invoice(invoice) => invoice.is_reconciled,
        }
    }

    /// Vendor name or invoice number, for display
    pub fn label(&self) -> &str {
        match self {
            SettledRecord::Expense(expense) => &expense.vendor,
            SettledRecord::Invoice(invoice) => &invoice.reference,
        }
    }

    pub fn settled_ref(&self) -> SettledRef {
        match self {
            SettledRecord::Expense(expense) => SettledRef::Expense(expense.id.clone()),
            SettledRecord::Invoice(invoice) => SettledRef::Invoice(invoice.id.clone()),
        }
    }
}

impl From<Expense> for SettledRecord {
    fn from(expense: Expense) -> Self {
        SettledRecord::Expense(expense)
    }
}

impl From<Invoice> for SettledRecord {
    fn from(invoice: Invoice) -> Self {
        SettledRecord::Invoice(invoice)
    }
}

/// Join between a bank transaction and one record it settles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationLink {
    /// Unique identifier for the link
    pub id: String,
    pub bank_transaction_id: String,
    /// The expense or invoice settled by the transaction
    pub record: SettledRef,
    /// Always the full amount of the settled record
    pub matched_amount: BigDecimal,
    pub created_at: NaiveDateTime,
}

impl ReconciliationLink {
    /// Create a new link with a generated id
    pub fn new(
        bank_transaction_id: String,
        record: SettledRef,
        matched_amount: BigDecimal,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            bank_transaction_id,
            record,
            matched_amount,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn expense_id(&self) -> Option<&str> {
        self.record.expense_id()
    }

    pub fn invoice_id(&self) -> Option<&str> {
        self.record.invoice_id()
    }
}

/// Point-in-time copy of every record the matcher works over
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub transactions: Vec<BankTransaction>,
    pub expenses: Vec<Expense>,
    pub invoices: Vec<Invoice>,
    pub links: Vec<ReconciliationLink>,
}

impl RecordSnapshot {
    pub fn transaction(&self, transaction_id: &str) -> Option<&BankTransaction> {
        self.transactions.iter().find(|t| t.id == transaction_id)
    }

    /// Expenses that can still be linked
    pub fn open_expenses(&self) -> impl Iterator<Item = &Expense> {
        self.expenses.iter().filter(|e| !e.is_reconciled)
    }

    /// Paid invoices that can still be linked
    pub fn open_invoices(&self) -> impl Iterator<Item = &Invoice> {
        self.invoices
            .iter()
            .filter(|i| i.is_paid() && !i.is_reconciled)
    }
}

/// Errors that can occur in the reconciliation system
#[derive(Debug, thiserror::Error)]
pub enum ReconciliationError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },
    #[error("Already reconciled: {0}")]
    AlreadyReconciled(String),
    #[error("Partial commit failure: {0}")]
    PartialCommitFailure(String),
    #[error("Selected total {selected} does not match transaction amount {expected}")]
    AmountMismatch {
        expected: BigDecimal,
        selected: BigDecimal,
    },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReconciliationError {
    pub fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        ReconciliationError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Result type for reconciliation operations
pub type ReconciliationResult<T> = Result<T, ReconciliationError>;
