use crate::error::EvalError;
use crate::formula::{BinOp, Expr, Function};
use crate::ledger::LedgerLine;
use crate::parser::parse_formula;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// How functions treat their arguments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionSemantics {
    /// Ranges always collapse to their sum, so `AVERAGE` adds up like `SUM`
    /// and `MAX(B1:B3)` is the sum of the range. `ABS` and `ROUND` only look
    /// at their first argument, and `ROUND` always rounds to an integer.
    /// Matches what the dashboard has always computed.
    #[default]
    Legacy,
    /// Ranges passed to a function expand into their cells, `AVERAGE`
    /// divides by the number of values, `ROUND` takes an optional number of
    /// digits and `ABS`/`ROUND` reject the wrong number of arguments.
    Spreadsheet,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalOptions {
    #[serde(default)]
    pub functions: FunctionSemantics,
}

/// Outcome of evaluating one cell. `result` is always usable: it is `0`
/// whenever `error` is set or the arithmetic produced NaN or an infinity.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub result: f64,
    pub error: Option<EvalError>,
}

impl Evaluation {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Evaluator {
    options: EvalOptions,
}

impl Evaluator {
    pub fn new(options: EvalOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> EvalOptions {
        self.options
    }

    /// Evaluates `text` against a snapshot of the grid. Non-finite results
    /// become `0` without an error.
    pub fn try_evaluate(
        &self,
        lines: &[LedgerLine],
        current_row: usize,
        text: &str,
    ) -> Result<f64, EvalError> {
        let expr = parse_formula(text)?;
        let value = self.eval(&expr, lines)?;
        if !value.is_finite() {
            debug!(row = current_row, formula = text, value, "non-finite result read as zero");
            return Ok(0f64);
        }
        Ok(value)
    }

    /// Same as [`Evaluator::try_evaluate`] but never fails: errors are
    /// reported next to a result of `0`.
    pub fn evaluate(&self, lines: &[LedgerLine], current_row: usize, text: &str) -> Evaluation {
        match self.try_evaluate(lines, current_row, text) {
            Ok(result) => {
                debug!(row = current_row, formula = text, result, "evaluated formula");
                Evaluation {
                    result,
                    error: None,
                }
            }
            Err(error) => {
                debug!(row = current_row, formula = text, %error, "formula failed");
                Evaluation {
                    result: 0f64,
                    error: Some(error),
                }
            }
        }
    }

    fn eval(&self, expr: &Expr, lines: &[LedgerLine]) -> Result<f64, EvalError> {
        match expr {
            Expr::Number(n) => Ok(*n),
            Expr::Percent(n) => Ok(n / 100f64),
            Expr::Cell(cell) => Ok(cell.resolve(lines)),
            Expr::Range(range) => Ok(range.sum(lines)),
            Expr::Neg(inner) => Ok(-self.eval(inner, lines)?),
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs, lines)?;
                let rhs = self.eval(rhs, lines)?;
                Ok(match op {
                    BinOp::Add => lhs + rhs,
                    BinOp::Sub => lhs - rhs,
                    BinOp::Mul => lhs * rhs,
                    BinOp::Div => lhs / rhs,
                })
            }
            Expr::Call(function, args) => self.call(*function, args, lines),
        }
    }

    fn arguments(&self, args: &[Expr], lines: &[LedgerLine]) -> Result<Vec<f64>, EvalError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match (self.options.functions, arg) {
                (FunctionSemantics::Spreadsheet, Expr::Range(range)) => {
                    values.extend(range.values(lines))
                }
                _ => values.push(self.eval(arg, lines)?),
            }
        }
        Ok(values)
    }

    fn call(
        &self,
        function: Function,
        args: &[Expr],
        lines: &[LedgerLine],
    ) -> Result<f64, EvalError> {
        let values = self.arguments(args, lines)?;
        match function {
            Function::Sum => Ok(values.iter().sum()),
            Function::Average => match self.options.functions {
                FunctionSemantics::Legacy => Ok(values.iter().sum()),
                // no values gives NaN, which the caller reads as zero
                FunctionSemantics::Spreadsheet => {
                    Ok(values.iter().sum::<f64>() / values.len() as f64)
                }
            },
            Function::Max => Ok(extreme(&values, f64::NEG_INFINITY, f64::max)),
            Function::Min => Ok(extreme(&values, f64::INFINITY, f64::min)),
            Function::Abs | Function::Round
                if self.options.functions == FunctionSemantics::Legacy =>
            {
                // extra arguments are ignored, and no argument at all reads as zero
                let x = values.first().copied().unwrap_or(f64::NAN);
                Ok(match function {
                    Function::Abs => x.abs(),
                    _ => round_half_up(x, 0f64),
                })
            }
            Function::Abs => match values.as_slice() {
                [x] => Ok(x.abs()),
                _ => Err(EvalError::Arity {
                    function,
                    expected: "1",
                    found: values.len(),
                }),
            },
            Function::Round => match values.as_slice() {
                [x] => Ok(round_half_up(*x, 0f64)),
                [x, digits] => Ok(round_half_up(*x, *digits)),
                _ => Err(EvalError::Arity {
                    function,
                    expected: "1 or 2",
                    found: values.len(),
                }),
            },
        }
    }
}

// NaN poisons the result, an empty list yields the identity (an infinity).
fn extreme(values: &[f64], identity: f64, pick: fn(f64, f64) -> f64) -> f64 {
    values.iter().fold(identity, |acc, &v| {
        if acc.is_nan() || v.is_nan() {
            f64::NAN
        } else {
            pick(acc, v)
        }
    })
}

// Halves round towards positive infinity, so ROUND(-2.5) is -2.
fn round_half_up(x: f64, digits: f64) -> f64 {
    let factor = 10f64.powi(digits.trunc() as i32);
    (x * factor + 0.5).floor() / factor
}

/// Evaluates with the default options.
pub fn evaluate(lines: &[LedgerLine], current_row: usize, text: &str) -> Evaluation {
    Evaluator::default().evaluate(lines, current_row, text)
}
