//! Split payment example: one card payment covering two supplier receipts

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use reconciliation_core::utils::MemoryStorage;
use reconciliation_core::{BankTransaction, Expense, ReconciliationLedger};
use std::str::FromStr;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🧮 Reconciliation Core - Split Payment Example\n");

    let mut ledger = ReconciliationLedger::new(MemoryStorage::new());
    let date = NaiveDate::from_ymd_opt(2024, 3, 10).ok_or("invalid date")?;

    ledger
        .import_transaction(BankTransaction::new(
            "tx-100".to_string(),
            date,
            "CARD PAYMENT BUILDBASE".to_string(),
            BigDecimal::from_str("-85.50")?,
        ))
        .await?;
    ledger
        .record_expense(Expense::new(
            "exp-100".to_string(),
            "Buildbase timber".to_string(),
            BigDecimal::from_str("40.00")?,
            date,
        ))
        .await?;
    ledger
        .record_expense(Expense::new(
            "exp-101".to_string(),
            "Buildbase fixings".to_string(),
            BigDecimal::from_str("45.50")?,
            date,
        ))
        .await?;

    // No single expense matches, so nothing is suggested
    println!(
        "🔍 Automatic suggestions: {}",
        ledger.suggest_matches().await?.len()
    );

    let mut selection = ledger.begin_selection("tx-100").await?;
    println!(
        "🏦 Transaction {} for {}",
        selection.transaction().description,
        selection.transaction().amount
    );

    for expense_id in ["exp-100", "exp-101"] {
        selection.select_expense(expense_id)?;
        println!(
            "  + {:<8} running total {:>6}  residual {:>6}",
            expense_id,
            selection.running_total(),
            selection.residual()
        );
    }

    if selection.is_balanced() {
        println!("  ✓ Selection covers the full amount");
    }

    let links = selection.commit(&mut ledger).await?;
    println!("\n✅ Committed {} link(s):", links.len());
    for link in &links {
        println!("  {} -> {} ({})", link.bank_transaction_id, link.record, link.matched_amount);
    }

    // Undo the whole split in one step
    ledger.unreconcile("tx-100").await?;
    let summary = ledger.summary().await?;
    println!(
        "\n↩️  Unreconciled: {} open expense(s), {} link(s)",
        summary.open_expenses, summary.link_count
    );

    Ok(())
}
