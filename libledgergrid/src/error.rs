use thiserror::Error;

use crate::formula::Function;

/// Hard evaluation failures. The evaluator still reports a result of `0`
/// alongside any of these.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("malformed formula `{text}': {message}")]
    Syntax { text: String, message: String },

    #[error("{function} expects {expected} argument(s), got {found}")]
    Arity {
        function: Function,
        expected: &'static str,
        found: usize,
    },
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("entry is not being edited")]
    NotEditing,

    #[error("row {row} is out of range, entry has {len} line(s)")]
    RowOutOfRange { row: usize, len: usize },

    #[error("column {0} cannot be edited")]
    UnsupportedColumn(char),
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("template `{key}' does not balance: debits {debits} != credits {credits}")]
    Unbalanced {
        key: String,
        debits: f64,
        credits: f64,
    },

    #[error("template for `{0}' is already registered")]
    DuplicateKey(String),
}
