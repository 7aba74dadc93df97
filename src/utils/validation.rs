//! Validation utilities

use crate::traits::*;
use crate::types::*;
use bigdecimal::BigDecimal;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> ReconciliationResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(ReconciliationError::Validation(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that a record ID is present
///
/// IDs are assigned by the importer, expense entry and invoicing and are
/// otherwise opaque here.
pub fn validate_record_id(record_id: &str) -> ReconciliationResult<()> {
    if record_id.trim().is_empty() {
        return Err(ReconciliationError::Validation(
            "Record ID cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validate a free-text label (statement narrative, vendor, invoice number)
pub fn validate_label(field: &str, value: &str) -> ReconciliationResult<()> {
    if value.trim().is_empty() {
        return Err(ReconciliationError::Validation(format!(
            "{} cannot be empty",
            field
        )));
    }

    if value.len() > 500 {
        return Err(ReconciliationError::Validation(format!(
            "{} cannot exceed 500 characters",
            field
        )));
    }

    Ok(())
}

/// Validate a statement line before import
pub fn validate_bank_transaction(transaction: &BankTransaction) -> ReconciliationResult<()> {
    validate_record_id(&transaction.id)?;
    validate_label("Transaction description", &transaction.description)
}

/// Validate an expense before it is recorded
pub fn validate_expense(expense: &Expense) -> ReconciliationResult<()> {
    validate_record_id(&expense.id)?;
    validate_label("Vendor", &expense.vendor)?;
    validate_positive_amount(&expense.amount)
}

/// Validate an invoice before it is recorded
pub fn validate_invoice(invoice: &Invoice) -> ReconciliationResult<()> {
    validate_record_id(&invoice.id)?;
    validate_label("Invoice reference", &invoice.reference)?;
    validate_positive_amount(&invoice.total)
}

/// Strict link validator that also keeps money flowing the right way
///
/// Expenses may only settle outflows and invoices may only settle inflows.
/// The default validator allows either so an operator can link refunds and
/// reversals by hand.
pub struct StrictLinkValidator;

impl LinkValidator for StrictLinkValidator {
    fn validate_link(
        &self,
        transaction: &BankTransaction,
        record: &SettledRecord,
    ) -> ReconciliationResult<()> {
        DefaultLinkValidator.validate_link(transaction, record)?;

        match record {
            SettledRecord::Expense(expense) if !transaction.is_outflow() => {
                Err(ReconciliationError::Validation(format!(
                    "Expense '{}' can only settle a payment out of the account",
                    expense.id
                )))
            }
            SettledRecord::Invoice(invoice) if !transaction.is_inflow() => {
                Err(ReconciliationError::Validation(format!(
                    "Invoice '{}' can only settle a payment into the account",
                    invoice.reference
                )))
            }
            _ => Ok(()),
        }
    }
}
