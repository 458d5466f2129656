use crate::reference::Column;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Largest absolute difference between debits and credits that still counts as balanced.
pub const BALANCE_TOLERANCE: f64 = 0.01;

/// Confidence given to lines a user adds by hand.
pub const DEFAULT_CONFIDENCE: u8 = 95;

fn default_confidence() -> u8 {
    DEFAULT_CONFIDENCE
}

/// One row of the entry grid: column A is the account, B the debit, C the credit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerLine {
    pub account: String,
    #[serde(default)]
    pub debit: f64,
    #[serde(default)]
    pub credit: f64,
    /// Informational only, 0 to 100.
    #[serde(default = "default_confidence")]
    pub confidence: u8,
}

impl LedgerLine {
    pub fn new(account: &str, debit: f64, credit: f64, confidence: u8) -> Self {
        Self {
            account: account.to_string(),
            debit,
            credit,
            confidence: confidence.min(100),
        }
    }

    pub fn debit(account: &str, amount: f64, confidence: u8) -> Self {
        Self::new(account, amount, 0f64, confidence)
    }

    pub fn credit(account: &str, amount: f64, confidence: u8) -> Self {
        Self::new(account, 0f64, amount, confidence)
    }

    /// Empty row appended by the editor.
    pub fn blank() -> Self {
        Self::new("", 0f64, 0f64, DEFAULT_CONFIDENCE)
    }

    /// Numeric value of a column. The account column and anything past C read as zero.
    pub fn value(&self, column: Column) -> f64 {
        match column {
            Column::Debit => self.debit,
            Column::Credit => self.credit,
            Column::Account | Column::Unsupported(_) => 0f64,
        }
    }
}

/// Descriptive data carried along with an entry. The engine never reads it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryMeta {
    #[serde(default)]
    pub narration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_center: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    #[serde(flatten)]
    pub meta: EntryMeta,
    pub lines: Vec<LedgerLine>,
}

impl JournalEntry {
    pub fn new(meta: EntryMeta, lines: Vec<LedgerLine>) -> Self {
        Self { meta, lines }
    }

    pub fn total_debit(&self) -> f64 {
        total_debit(&self.lines)
    }

    pub fn total_credit(&self) -> f64 {
        total_credit(&self.lines)
    }

    pub fn is_balanced(&self) -> bool {
        is_balanced(&self.lines)
    }

    pub fn summary(&self) -> BalanceSummary {
        BalanceSummary::of(&self.lines)
    }
}

/// Derived totals handed to whatever renders an entry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BalanceSummary {
    pub total_debit: f64,
    pub total_credit: f64,
    pub difference: f64,
    pub is_balanced: bool,
}

impl BalanceSummary {
    pub fn of(lines: &[LedgerLine]) -> Self {
        let total_debit = total_debit(lines);
        let total_credit = total_credit(lines);
        let difference = total_debit - total_credit;
        Self {
            total_debit,
            total_credit,
            difference,
            is_balanced: difference.abs() < BALANCE_TOLERANCE,
        }
    }
}

// Summed in sorted order so that reordering lines cannot change the last bits.
fn sorted_sum(mut amounts: Vec<f64>) -> f64 {
    amounts.sort_by(f64::total_cmp);
    amounts.into_iter().sum()
}

pub fn total_debit(lines: &[LedgerLine]) -> f64 {
    sorted_sum(lines.iter().map(|l| l.debit).collect())
}

pub fn total_credit(lines: &[LedgerLine]) -> f64 {
    sorted_sum(lines.iter().map(|l| l.credit).collect())
}

pub fn is_balanced(lines: &[LedgerLine]) -> bool {
    (total_debit(lines) - total_credit(lines)).abs() < BALANCE_TOLERANCE
}
