use crate::parser::Rule;
use crate::reference::{CellRef, RangeRef};

use anyhow::{anyhow, Result};
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Function {
    Sum,
    Average,
    Max,
    Min,
    Abs,
    Round,
}

impl Function {
    pub const ALL: [Function; 6] = [
        Function::Sum,
        Function::Average,
        Function::Max,
        Function::Min,
        Function::Abs,
        Function::Round,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Function::Sum => "SUM",
            Function::Average => "AVERAGE",
            Function::Max => "MAX",
            Function::Min => "MIN",
            Function::Abs => "ABS",
            Function::Round => "ROUND",
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<&str> for Function {
    type Error = anyhow::Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Function::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or(anyhow!(format!("unknown function `{}'", s)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    /// `n%`, holding `n` as written.
    Percent(f64),
    Cell(CellRef),
    Range(RangeRef),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

fn pratt() -> &'static PrattParser<Rule> {
    static PRATT: OnceLock<PrattParser<Rule>> = OnceLock::new();
    PRATT.get_or_init(|| {
        PrattParser::new()
            .op(Op::infix(Rule::op_add, Assoc::Left) | Op::infix(Rule::op_sub, Assoc::Left))
            .op(Op::infix(Rule::op_mul, Assoc::Left) | Op::infix(Rule::op_div, Assoc::Left))
            .op(Op::prefix(Rule::op_neg) | Op::prefix(Rule::op_pos))
    })
}

impl Expr {
    /// Builds an expression tree from an `expr` token.
    pub fn parse(token: Pair<'_, Rule>) -> Result<Expr> {
        pratt()
            .map_primary(Expr::parse_primary)
            .map_prefix(|op, rhs| match op.as_rule() {
                Rule::op_neg => Ok(Expr::Neg(Box::new(rhs?))),
                _ => rhs,
            })
            .map_infix(|lhs, op, rhs| {
                let op = match op.as_rule() {
                    Rule::op_add => BinOp::Add,
                    Rule::op_sub => BinOp::Sub,
                    Rule::op_mul => BinOp::Mul,
                    Rule::op_div => BinOp::Div,
                    _ => return Err(anyhow!(format!("unexpected operator: '{}'", op.as_str()))),
                };
                Ok(Expr::Binary(op, Box::new(lhs?), Box::new(rhs?)))
            })
            .parse(token.into_inner())
    }

    fn parse_primary(token: Pair<'_, Rule>) -> Result<Expr> {
        match token.as_rule() {
            Rule::number => Ok(Expr::Number(token.as_str().parse::<f64>()?)),
            Rule::percent => {
                let text = token.as_str();
                let number = token
                    .into_inner()
                    .next()
                    .ok_or(anyhow!(format!("invalid percent: '{}'", text)))?;
                Ok(Expr::Percent(number.as_str().parse::<f64>()?))
            }
            Rule::cell => Ok(Expr::Cell(CellRef::parse(token)?)),
            Rule::range => Ok(Expr::Range(RangeRef::parse(token)?)),
            Rule::call => {
                let text = token.as_str();
                let mut pairs = token.into_inner();
                let function = Function::try_from(
                    pairs
                        .next()
                        .ok_or(anyhow!(format!("invalid function call: '{}'", text)))?
                        .as_str(),
                )?;
                let args = pairs.map(Expr::parse).collect::<Result<Vec<_>>>()?;
                Ok(Expr::Call(function, args))
            }
            Rule::expr => Expr::parse(token),
            _ => Err(anyhow!(format!(
                "unexpected token for expression: '{}'",
                token.as_str()
            ))),
        }
    }
}

/// Whether committing `text` should go through the evaluator.
///
/// Deliberately broad: a leading `=`, anything shaped like a cell reference,
/// a `%`, or a function name anywhere in the text. Plain numbers never match,
/// but free text such as `MAXIMUM` does.
pub fn is_formula(text: &str) -> bool {
    text.trim_start().starts_with('=')
        || text.contains('%')
        || has_cell_reference(text)
        || has_function_name(text)
}

fn has_cell_reference(text: &str) -> bool {
    text.as_bytes()
        .windows(2)
        .any(|pair| pair[0].is_ascii_uppercase() && pair[1].is_ascii_digit())
}

fn has_function_name(text: &str) -> bool {
    let upper = text.to_ascii_uppercase();
    Function::ALL.iter().any(|f| upper.contains(f.name()))
}

/// How raw cell text is shown while editing. In formula mode a bare
/// expression gets a leading `=`; what gets evaluated is unchanged.
pub fn display_text(raw: &str, formula_mode: bool) -> Cow<'_, str> {
    if formula_mode && !raw.is_empty() && !raw.starts_with('=') {
        Cow::Owned(format!("={}", raw))
    } else {
        Cow::Borrowed(raw)
    }
}
