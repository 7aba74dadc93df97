//! Statement reconciliation example: suggest, review and accept matches

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use reconciliation_core::utils::MemoryStorage;
use reconciliation_core::{
    BankTransaction, Confidence, Expense, Invoice, InvoiceKind, InvoiceStatus, ReconciliationConfig,
    ReconciliationLedger,
};
use std::str::FromStr;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🏦 Reconciliation Core - Statement Example\n");

    // RECONCILE_* environment variables override the defaults
    let config = ReconciliationConfig::from_env()?;
    println!(
        "⚙️  Tolerance {}, expense window {} days, invoice window {} days, VAT {}\n",
        config.amount_tolerance, config.expense_window_days, config.invoice_window_days, config.vat_rate
    );

    let mut ledger = ReconciliationLedger::with_config(MemoryStorage::new(), config)?;
    let day = |d: u32| NaiveDate::from_ymd_opt(2024, 3, d).ok_or("invalid date");

    // 1. Import a few statement lines
    println!("📥 Importing statement lines...");
    let lines = [
        ("tx-001", 4, "CARD PAYMENT SCREWFIX", "-42.00", "2458.00"),
        ("tx-002", 10, "CARD PAYMENT TRAVIS PERKINS", "-120.00", "2338.00"),
        ("tx-003", 12, "BACS J SMITH", "1500.00", "3838.00"),
        ("tx-004", 15, "DD VAN LEASE", "-289.99", "3548.01"),
    ];
    for (id, d, description, amount, balance) in lines {
        let imported = ledger
            .import_transaction(
                BankTransaction::new(
                    id.to_string(),
                    day(d)?,
                    description.to_string(),
                    BigDecimal::from_str(amount)?,
                )
                .with_running_balance(BigDecimal::from_str(balance)?),
            )
            .await?;
        println!("  ✓ {} {} {}", imported.date, imported.description, imported.amount);
    }
    println!();

    // 2. Record the expenses and invoices they should settle
    println!("🧾 Recording expenses and invoices...");
    ledger
        .record_expense(Expense::new(
            "exp-001".to_string(),
            "Screwfix".to_string(),
            BigDecimal::from_str("42.00")?,
            day(3)?,
        ))
        .await?;
    ledger
        .record_expense(Expense::new(
            "exp-002".to_string(),
            "Travis Perkins".to_string(),
            BigDecimal::from_str("100.00")?,
            day(9)?,
        ))
        .await?;
    ledger
        .record_invoice(Invoice::new(
            "inv-001".to_string(),
            "INV-0042".to_string(),
            BigDecimal::from_str("1500.00")?,
            day(1)?,
            InvoiceStatus::Paid,
        )
        .with_kind(InvoiceKind::Final))
        .await?;
    println!("  ✓ 2 expenses, 1 invoice\n");

    // 3. Review suggestions
    println!("🔍 Suggested matches:");
    for scored in ledger.suggest_matches().await? {
        println!(
            "  [{:>6}] {} -> {} ({})",
            scored.confidence,
            scored.suggestion.transaction.id,
            scored.suggestion.record.label(),
            scored.suggestion.reason
        );
    }
    println!();

    // 4. Accept the confident ones in one pass, then review the rest by hand
    let report = ledger.accept_all(Confidence::High).await?;
    println!("✅ Accepted {} high confidence match(es)", report.accepted.len());

    for scored in ledger.suggest_matches().await? {
        println!(
            "  Accepting {} suggestion for {}",
            scored.confidence, scored.suggestion.transaction.id
        );
        ledger.accept_suggestion(&scored.suggestion).await?;
    }
    println!();

    // 5. Progress
    let summary = ledger.summary().await?;
    println!("📊 Summary:");
    println!(
        "  Reconciled {}/{} transactions, {} link(s)",
        summary.reconciled_transactions, summary.total_transactions, summary.link_count
    );
    println!("  Unmatched money out: {}", summary.unmatched_outflows);
    println!("  Unmatched money in:  {}", summary.unmatched_inflows);

    let integrity = ledger.check_integrity().await?;
    if integrity.is_valid {
        println!("  ✓ Ledger integrity verified");
    } else {
        for issue in &integrity.issues {
            println!("  ✗ {}", issue);
        }
    }

    Ok(())
}
