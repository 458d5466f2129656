//! The rule table shipped with the dashboard.

use crate::classifier::{
    JournalEntryTemplate, RuleTable, Side,
    TemplateAmount::{Fixed, Share},
    TemplateLine,
};
use crate::error::TemplateError;
use crate::transaction::TransactionType;

/// 85% expense, 7.5% CGST, 7.5% SGST, vendor credited in full.
pub fn default_split() -> JournalEntryTemplate {
    JournalEntryTemplate::new(vec![
        TemplateLine::debit("General Expenses", Share(0.85), 60),
        TemplateLine::debit("Input CGST", Share(0.075), 60),
        TemplateLine::debit("Input SGST", Share(0.075), 60),
        TemplateLine::vendor(Side::Credit, Share(1f64), 70),
    ])
}

/// Builds the standard table. Fails if any template does not balance.
pub fn standard() -> Result<RuleTable, TemplateError> {
    let mut table = RuleTable::new(default_split())?;

    table.register_id(
        "TXN-1001",
        JournalEntryTemplate::new(vec![
            TemplateLine::debit("Software Subscriptions", Fixed(1_250.00), 98),
            TemplateLine::debit("IGST Input (RCM)", Fixed(225.00), 94),
            TemplateLine::credit("IGST Payable (RCM)", Fixed(225.00), 94),
            TemplateLine::vendor(Side::Credit, Fixed(1_250.00), 97),
        ])
        .with_narration("AWS monthly subscription, reverse charge")
        .with_invoice("AWS-IN-88213")
        .with_cost_center("Engineering"),
    )?;

    table.register_id(
        "TXN-1002",
        JournalEntryTemplate::new(vec![
            TemplateLine::debit("Rent Expense", Fixed(100_000.00), 98),
            TemplateLine::debit("Input CGST", Fixed(9_000.00), 97),
            TemplateLine::debit("Input SGST", Fixed(9_000.00), 97),
            TemplateLine::credit("TDS Payable - 194I", Fixed(10_000.00), 92),
            TemplateLine::vendor(Side::Credit, Fixed(108_000.00), 96),
        ])
        .with_narration("Office rent for April")
        .with_invoice("SR/24-25/041")
        .with_cost_center("Administration"),
    )?;

    table.register_id(
        "TXN-1003",
        JournalEntryTemplate::new(vec![
            TemplateLine::debit("Professional Fees", Fixed(50_000.00), 97),
            TemplateLine::debit("Input CGST", Fixed(4_500.00), 95),
            TemplateLine::debit("Input SGST", Fixed(4_500.00), 95),
            TemplateLine::credit("TDS Payable - 194J", Fixed(5_000.00), 91),
            TemplateLine::vendor(Side::Credit, Fixed(54_000.00), 96),
        ])
        .with_narration("Statutory audit fees")
        .with_invoice("AC/1187")
        .with_cost_center("Finance"),
    )?;

    table.register_id(
        "TXN-1004",
        JournalEntryTemplate::new(vec![
            TemplateLine::debit("Office Supplies", Fixed(8_000.00), 93),
            TemplateLine::debit("Input CGST", Fixed(720.00), 93),
            TemplateLine::debit("Input SGST", Fixed(720.00), 93),
            TemplateLine::vendor(Side::Credit, Fixed(9_440.00), 95),
        ])
        .with_narration("Stationery and printer cartridges")
        .with_invoice("STP-55102"),
    )?;

    table.register_id(
        "TXN-1005",
        JournalEntryTemplate::new(vec![
            TemplateLine::debit("Bank - HDFC Current", Fixed(236_000.00), 99),
            TemplateLine::credit("Sales - Services", Fixed(200_000.00), 94),
            TemplateLine::credit("Output CGST", Fixed(18_000.00), 94),
            TemplateLine::credit("Output SGST", Fixed(18_000.00), 94),
        ])
        .with_narration("Receipt against invoice INV-0042")
        .with_invoice("INV-0042"),
    )?;

    table.register_id(
        "TXN-1006",
        JournalEntryTemplate::new(vec![
            TemplateLine::debit("Suspense Account", Fixed(4_500.00), 40),
            TemplateLine::credit("Bank - HDFC Current", Fixed(4_500.00), 99),
        ])
        .with_narration("Unidentified UPI transfer"),
    )?;

    table.register_id(
        "TXN-1007",
        JournalEntryTemplate::new(vec![
            TemplateLine::debit("Raw Materials", Fixed(120_000.00), 95),
            TemplateLine::debit("Input IGST", Fixed(21_600.00), 95),
            TemplateLine::credit("TDS Payable - 194Q", Fixed(120.00), 88),
            TemplateLine::vendor(Side::Credit, Fixed(141_480.00), 95),
        ])
        .with_narration("Steel coils, interstate purchase")
        .with_invoice("JSW/DL/7781")
        .with_cost_center("Production"),
    )?;

    table.register_fallback(
        "INR",
        TransactionType::Credit,
        JournalEntryTemplate::new(vec![
            TemplateLine::debit("Bank - HDFC Current", Share(1f64), 85),
            TemplateLine::credit("Sales Revenue", Share(0.85), 70),
            TemplateLine::credit("Output CGST", Share(0.075), 70),
            TemplateLine::credit("Output SGST", Share(0.075), 70),
        ]),
    )?;

    table.register_fallback(
        "USD",
        TransactionType::Debit,
        JournalEntryTemplate::new(vec![
            TemplateLine::debit("Foreign Software Expenses", Share(1f64), 75),
            TemplateLine::vendor(Side::Credit, Share(1f64), 80),
        ]),
    )?;

    table.register_fallback(
        "USD",
        TransactionType::Credit,
        JournalEntryTemplate::new(vec![
            TemplateLine::debit("Bank - USD EEFC", Share(1f64), 85),
            TemplateLine::credit("Export Revenue", Share(1f64), 75),
        ]),
    )?;

    Ok(table)
}
