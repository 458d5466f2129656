use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of money as seen from the company's bank account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Debit,
    Credit,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Debit => f.write_str("debit"),
            TransactionType::Credit => f.write_str("credit"),
        }
    }
}

/// A record from the transaction inbox.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub vendor: String,
    pub amount: f64,
    pub currency: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Transaction {
    pub fn new(
        id: &str,
        vendor: &str,
        amount: f64,
        currency: &str,
        kind: TransactionType,
    ) -> Self {
        Self {
            id: id.to_string(),
            vendor: vendor.to_string(),
            amount,
            currency: currency.to_string(),
            kind,
            date: None,
            description: None,
        }
    }

    /// Narration used when a template does not bring its own.
    pub fn default_narration(&self) -> String {
        match &self.description {
            Some(description) => description.clone(),
            None => match self.kind {
                TransactionType::Debit => format!("Payment to {}", self.vendor),
                TransactionType::Credit => format!("Receipt from {}", self.vendor),
            },
        }
    }
}
