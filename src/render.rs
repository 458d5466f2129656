use libledgergrid::ledger::{BalanceSummary, JournalEntry};
use libledgergrid::script::Rejection;
use libledgergrid::session::EditSession;

use anyhow::Result;
use serde_json::json;
use std::io::Write;

const ACCOUNT_WIDTH: usize = 28;

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(width - 1).collect();
        short.push('~');
        short
    }
}

fn write_header<W: Write>(out: &mut W, entry: &JournalEntry) -> Result<()> {
    writeln!(out, "{}", entry.meta.narration)?;

    let mut details = Vec::new();
    if let Some(date) = entry.meta.date {
        details.push(format!("date {}", date));
    }
    if let Some(invoice) = &entry.meta.invoice_number {
        details.push(format!("invoice {}", invoice));
    }
    if let Some(cost_center) = &entry.meta.cost_center {
        details.push(format!("cost center {}", cost_center));
    }
    if !details.is_empty() {
        writeln!(out, "{}", details.join(", "))?;
    }
    Ok(())
}

fn balance_line(summary: &BalanceSummary) -> String {
    if summary.is_balanced {
        "BALANCED".to_string()
    } else {
        format!("UNBALANCED by {:.2}", summary.difference)
    }
}

/// Plain text grid, one line per ledger line, followed by totals.
pub fn table<W: Write>(
    out: &mut W,
    session: &EditSession,
    rejections: &[Rejection],
) -> Result<()> {
    let entry = session.entry();
    let summary = session.summary();

    write_header(out, entry)?;
    writeln!(
        out,
        "{:>3}  {:<width$}  {:>14}  {:>14}  {:>4}",
        "#",
        "Account",
        "Debit",
        "Credit",
        "Conf",
        width = ACCOUNT_WIDTH
    )?;
    for (idx, line) in entry.lines.iter().enumerate() {
        writeln!(
            out,
            "{:>3}  {:<width$}  {:>14.2}  {:>14.2}  {:>4}",
            idx + 1,
            truncate(&line.account, ACCOUNT_WIDTH),
            line.debit,
            line.credit,
            line.confidence,
            width = ACCOUNT_WIDTH
        )?;
    }
    writeln!(
        out,
        "{:>3}  {:<width$}  {:>14.2}  {:>14.2}",
        "",
        "Total",
        summary.total_debit,
        summary.total_credit,
        width = ACCOUNT_WIDTH
    )?;
    writeln!(out, "{}", balance_line(&summary))?;

    if session.is_editing() {
        writeln!(out, "(unsaved draft)")?;
    }
    for rejection in rejections {
        writeln!(out, "rejected {}: {}", rejection.cell, rejection.error)?;
    }
    Ok(())
}

pub fn json<W: Write>(out: &mut W, session: &EditSession, rejections: &[Rejection]) -> Result<()> {
    let rejected: Vec<_> = rejections
        .iter()
        .map(|r| json!({ "cell": r.cell.to_string(), "error": r.error.to_string() }))
        .collect();
    let document = json!({
        "entry": session.entry(),
        "summary": session.summary(),
        "editing": session.is_editing(),
        "rejected": rejected,
    });
    serde_json::to_writer_pretty(&mut *out, &document)?;
    writeln!(out)?;
    Ok(())
}
