use crate::error::TemplateError;
use crate::ledger::{EntryMeta, JournalEntry, LedgerLine, BALANCE_TOLERANCE};
use crate::transaction::{Transaction, TransactionType};

use indexmap::IndexMap;
use tracing::debug;

// shares are fractions of one amount, so they must add up exactly
const SHARE_TOLERANCE: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Debit,
    Credit,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TemplateAccount {
    Named(String),
    /// Whoever the transaction names as its counterparty.
    Vendor,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TemplateAmount {
    Fixed(f64),
    /// Fraction of the transaction amount.
    Share(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TemplateLine {
    pub account: TemplateAccount,
    pub side: Side,
    pub amount: TemplateAmount,
    pub confidence: u8,
}

impl TemplateLine {
    pub fn debit(account: &str, amount: TemplateAmount, confidence: u8) -> Self {
        Self {
            account: TemplateAccount::Named(account.to_string()),
            side: Side::Debit,
            amount,
            confidence,
        }
    }

    pub fn credit(account: &str, amount: TemplateAmount, confidence: u8) -> Self {
        Self {
            account: TemplateAccount::Named(account.to_string()),
            side: Side::Credit,
            amount,
            confidence,
        }
    }

    pub fn vendor(side: Side, amount: TemplateAmount, confidence: u8) -> Self {
        Self {
            account: TemplateAccount::Vendor,
            side,
            amount,
            confidence,
        }
    }

    pub fn resolve(&self, txn: &Transaction) -> LedgerLine {
        let account = match &self.account {
            TemplateAccount::Named(name) => name.as_str(),
            TemplateAccount::Vendor => txn.vendor.as_str(),
        };
        let amount = match self.amount {
            TemplateAmount::Fixed(value) => value,
            TemplateAmount::Share(share) => txn.amount * share,
        };
        match self.side {
            Side::Debit => LedgerLine::debit(account, amount, self.confidence),
            Side::Credit => LedgerLine::credit(account, amount, self.confidence),
        }
    }
}

/// Lines a classifier proposes for a transaction, before any user edits.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JournalEntryTemplate {
    pub narration: Option<String>,
    pub invoice_number: Option<String>,
    pub cost_center: Option<String>,
    pub lines: Vec<TemplateLine>,
}

impl JournalEntryTemplate {
    pub fn new(lines: Vec<TemplateLine>) -> Self {
        Self {
            lines,
            ..Default::default()
        }
    }

    pub fn with_narration(mut self, narration: &str) -> Self {
        self.narration = Some(narration.to_string());
        self
    }

    pub fn with_invoice(mut self, invoice_number: &str) -> Self {
        self.invoice_number = Some(invoice_number.to_string());
        self
    }

    pub fn with_cost_center(mut self, cost_center: &str) -> Self {
        self.cost_center = Some(cost_center.to_string());
        self
    }

    fn side_totals(&self, pick: impl Fn(TemplateAmount) -> Option<f64>) -> (f64, f64) {
        self.lines.iter().fold((0f64, 0f64), |(debits, credits), line| {
            let value = pick(line.amount).unwrap_or(0f64);
            match line.side {
                Side::Debit => (debits + value, credits),
                Side::Credit => (debits, credits + value),
            }
        })
    }

    /// Fixed amounts and shares must each balance on their own, which makes
    /// the entry balance for every transaction amount.
    pub fn assert_balanced(&self, key: &str) -> Result<(), TemplateError> {
        let checks = [
            (
                self.side_totals(|a| match a {
                    TemplateAmount::Fixed(v) => Some(v),
                    TemplateAmount::Share(_) => None,
                }),
                BALANCE_TOLERANCE,
            ),
            (
                self.side_totals(|a| match a {
                    TemplateAmount::Share(v) => Some(v),
                    TemplateAmount::Fixed(_) => None,
                }),
                SHARE_TOLERANCE,
            ),
        ];

        for ((debits, credits), tolerance) in checks {
            if (debits - credits).abs() >= tolerance {
                return Err(TemplateError::Unbalanced {
                    key: key.to_string(),
                    debits,
                    credits,
                });
            }
        }
        Ok(())
    }

    pub fn instantiate(&self, txn: &Transaction) -> JournalEntry {
        JournalEntry::new(
            EntryMeta {
                narration: self
                    .narration
                    .clone()
                    .unwrap_or_else(|| txn.default_narration()),
                invoice_number: self.invoice_number.clone(),
                cost_center: self.cost_center.clone(),
                date: txn.date,
            },
            self.lines.iter().map(|line| line.resolve(txn)).collect(),
        )
    }
}

/// Maps an inbox transaction to the entry the user starts editing from.
pub trait TransactionClassifier {
    fn classify(&self, txn: &Transaction) -> JournalEntryTemplate;

    fn journal_entry(&self, txn: &Transaction) -> JournalEntry {
        self.classify(txn).instantiate(txn)
    }
}

/// Static lookup: transaction id first, then currency and type, then a default split.
/// Every template is checked for balance when it is registered.
#[derive(Clone, Debug)]
pub struct RuleTable {
    by_id: IndexMap<String, JournalEntryTemplate>,
    by_kind: IndexMap<(String, TransactionType), JournalEntryTemplate>,
    default: JournalEntryTemplate,
}

impl RuleTable {
    pub fn new(default: JournalEntryTemplate) -> Result<Self, TemplateError> {
        default.assert_balanced("default")?;
        Ok(Self {
            by_id: IndexMap::new(),
            by_kind: IndexMap::new(),
            default,
        })
    }

    pub fn register_id(
        &mut self,
        id: &str,
        template: JournalEntryTemplate,
    ) -> Result<(), TemplateError> {
        if self.by_id.contains_key(id) {
            return Err(TemplateError::DuplicateKey(id.to_string()));
        }
        template.assert_balanced(id)?;
        self.by_id.insert(id.to_string(), template);
        Ok(())
    }

    pub fn register_fallback(
        &mut self,
        currency: &str,
        kind: TransactionType,
        template: JournalEntryTemplate,
    ) -> Result<(), TemplateError> {
        let key = (currency.to_ascii_uppercase(), kind);
        let label = format!("{}/{}", key.0, kind);
        if self.by_kind.contains_key(&key) {
            return Err(TemplateError::DuplicateKey(label));
        }
        template.assert_balanced(&label)?;
        self.by_kind.insert(key, template);
        Ok(())
    }

    /// Registered transaction ids, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.by_id.keys().map(|id| id.as_str())
    }

    pub fn template_for_id(&self, id: &str) -> Option<&JournalEntryTemplate> {
        self.by_id.get(id)
    }
}

impl TransactionClassifier for RuleTable {
    fn classify(&self, txn: &Transaction) -> JournalEntryTemplate {
        if let Some(template) = self.by_id.get(&txn.id) {
            debug!(id = %txn.id, "matched transaction id");
            return template.clone();
        }

        let key = (txn.currency.to_ascii_uppercase(), txn.kind);
        if let Some(template) = self.by_kind.get(&key) {
            debug!(id = %txn.id, currency = %key.0, kind = %txn.kind, "matched currency and type");
            return template.clone();
        }

        debug!(id = %txn.id, "no rule matched, using default split");
        self.default.clone()
    }
}

#[cfg(test)]
mod tests {
    use crate::classifier::{
        JournalEntryTemplate, RuleTable, Side, TemplateAmount, TemplateLine, TransactionClassifier,
    };
    use crate::error::TemplateError;
    use crate::ledger::LedgerLine;
    use crate::transaction::{Transaction, TransactionType};

    use anyhow::Result;

    use crate::classifier::TemplateAmount::{Fixed, Share};

    fn halves() -> JournalEntryTemplate {
        JournalEntryTemplate::new(vec![
            TemplateLine::debit("Travel", Share(0.5), 80),
            TemplateLine::debit("Meals", Share(0.5), 80),
            TemplateLine::vendor(Side::Credit, Share(1f64), 90),
        ])
    }

    #[test]
    fn test_unbalanced_template_is_rejected() -> Result<()> {
        let mut table = RuleTable::new(halves())?;
        let lopsided = JournalEntryTemplate::new(vec![
            TemplateLine::debit("Rent", Fixed(1000f64), 90),
            TemplateLine::credit("Landlord", Fixed(900f64), 90),
        ]);

        assert_eq!(
            table.register_id("TXN-9", lopsided),
            Err(TemplateError::Unbalanced {
                key: "TXN-9".to_string(),
                debits: 1000f64,
                credits: 900f64,
            })
        );
        assert_eq!(table.ids().count(), 0);
        Ok(())
    }

    #[test]
    fn test_shares_balance_separately() {
        let mixed = JournalEntryTemplate::new(vec![
            TemplateLine::debit("Rent", Fixed(100f64), 90),
            TemplateLine::vendor(Side::Credit, Share(1f64), 90),
        ]);
        assert!(mixed.assert_balanced("mixed").is_err());
        assert!(RuleTable::new(mixed).is_err());
    }

    #[test]
    fn test_duplicate_id() -> Result<()> {
        let mut table = RuleTable::new(halves())?;
        table.register_id("TXN-1", halves())?;
        assert_eq!(
            table.register_id("TXN-1", halves()),
            Err(TemplateError::DuplicateKey("TXN-1".to_string()))
        );
        table.register_fallback("usd", TransactionType::Debit, halves())?;
        assert_eq!(
            table.register_fallback("USD", TransactionType::Debit, halves()),
            Err(TemplateError::DuplicateKey("USD/debit".to_string()))
        );
        Ok(())
    }

    #[test]
    fn test_lookup_order() -> Result<()> {
        let mut table = RuleTable::new(halves())?;
        table.register_id(
            "TXN-1",
            JournalEntryTemplate::new(vec![
                TemplateLine::debit("Rent", Fixed(500f64), 99),
                TemplateLine::vendor(Side::Credit, Fixed(500f64), 99),
            ])
            .with_narration("April rent"),
        )?;
        table.register_fallback(
            "INR",
            TransactionType::Credit,
            JournalEntryTemplate::new(vec![
                TemplateLine::debit("Bank", Share(1f64), 75),
                TemplateLine::credit("Sales", Share(1f64), 75),
            ]),
        )?;

        let by_id = Transaction::new("TXN-1", "Skyline", 1f64, "INR", TransactionType::Credit);
        let entry = table.journal_entry(&by_id);
        assert_eq!(entry.meta.narration, "April rent");
        assert_eq!(entry.lines[0], LedgerLine::debit("Rent", 500f64, 99));

        let by_kind = Transaction::new("TXN-2", "Acme", 300f64, "inr", TransactionType::Credit);
        let entry = table.journal_entry(&by_kind);
        assert_eq!(entry.lines[1], LedgerLine::credit("Sales", 300f64, 75));
        assert_eq!(entry.meta.narration, "Receipt from Acme");

        let fallback = Transaction::new("TXN-3", "Uber", 240f64, "INR", TransactionType::Debit);
        let entry = table.journal_entry(&fallback);
        assert_eq!(entry.lines[2], LedgerLine::credit("Uber", 240f64, 90));
        assert!(entry.is_balanced());
        Ok(())
    }
}
