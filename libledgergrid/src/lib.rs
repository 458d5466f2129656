//! ledgergrid - the formula and balance engine behind the journal entry grid
//! ---
//!
//! A journal entry is shown as a small spreadsheet: column A holds the account,
//! B the debit and C the credit of each line. Debit and credit cells accept
//! spreadsheet-like formulas (`=B1*0.1`, `10%*C2`, `=SUM(B1:B3)`) that are
//! evaluated against the grid itself when the cell is committed, and the entry
//! reports whether its debits and credits balance.
//!

extern crate pest;
#[macro_use]
extern crate pest_derive;

/// Classifying inbox transactions into a first draft of their journal entry.
///
/// [`TransactionClassifier`][classifier::TransactionClassifier] is the seam:
/// the [`RuleTable`][classifier::RuleTable] shipped here is a static lookup,
/// and every template it accepts is checked for balance on registration.
pub mod classifier;

pub mod error;

/// Formula evaluation against a snapshot of the grid.
///
/// Evaluation never blocks the user: malformed formulas report an
/// [`EvalError`][error::EvalError] next to a result of `0`, references to
/// rows that do not exist read as `0`, and so do NaN and infinities.
pub mod eval;

pub mod formula;

/// Ledger lines, journal entries and the balance invariant.
pub mod ledger;

/// Grammar entrypoints for formulas and session scripts.
pub mod parser;

pub mod reference;
pub mod rules;
pub mod script;

/// The view/edit state machine wrapped around one journal entry.
pub mod session;

pub mod transaction;

pub use classifier::TransactionClassifier;
pub use eval::evaluate;
pub use formula::is_formula;
pub use parser::{parse_formula, parse_script};
