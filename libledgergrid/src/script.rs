use crate::error::{EvalError, SessionError};
use crate::parser::{inner_str, Rule};
use crate::reference::CellRef;
use crate::session::{CommitOutcome, EditSession, Field};

use anyhow::{anyhow, Context, Result};
use pest::iterators::Pair;

/// One line of a session script. Rows are 1-based, like cell references.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Edit,
    /// Type into a cell and leave it, which commits.
    Set(CellRef, String),
    /// Type into a cell without committing.
    Type(CellRef, String),
    Commit(CellRef),
    Account(usize, String),
    AddRow,
    DeleteRow(usize),
    Narration(String),
    Invoice(String),
    CostCenter(String),
    FormulaMode(bool),
    Save,
    Cancel,
}

/// A commit whose formula failed; the cell kept its previous value.
#[derive(Clone, Debug, PartialEq)]
pub struct Rejection {
    pub cell: CellRef,
    pub error: EvalError,
}

macro_rules! next_token {
    ($pairs:ident, $expected:expr) => {
        $pairs.next().ok_or(anyhow::Error::msg(format!(
            "invalid next token, expected {}",
            $expected
        )))?
    };
}

fn parse_row(token: Pair<'_, Rule>) -> Result<usize> {
    let row = token.as_str().parse::<usize>()?;
    if row == 0 {
        return Err(anyhow!("rows start at 1"));
    }
    Ok(row)
}

fn cell_text(token: Option<Pair<'_, Rule>>) -> String {
    token
        .map(|t| t.as_str().trim().to_string())
        .unwrap_or_default()
}

impl<'s> TryFrom<Pair<'s, Rule>> for Command {
    type Error = anyhow::Error;

    fn try_from(token: Pair<'s, Rule>) -> Result<Self, Self::Error> {
        let tag = token.as_rule();
        let text = token.as_str().to_string();
        let mut pairs = token.into_inner();

        let command = match tag {
            Rule::cmd_edit => Command::Edit,
            Rule::cmd_set => Command::Set(
                CellRef::parse(next_token!(pairs, "cell"))?,
                cell_text(pairs.next()),
            ),
            Rule::cmd_type => Command::Type(
                CellRef::parse(next_token!(pairs, "cell"))?,
                cell_text(pairs.next()),
            ),
            Rule::cmd_commit => Command::Commit(CellRef::parse(next_token!(pairs, "cell"))?),
            Rule::cmd_account => Command::Account(
                parse_row(next_token!(pairs, "row"))?,
                inner_str(next_token!(pairs, "account name"))?.to_string(),
            ),
            Rule::cmd_add => Command::AddRow,
            Rule::cmd_delete => Command::DeleteRow(parse_row(next_token!(pairs, "row"))?),
            Rule::cmd_narration => {
                Command::Narration(inner_str(next_token!(pairs, "narration"))?.to_string())
            }
            Rule::cmd_invoice => {
                Command::Invoice(inner_str(next_token!(pairs, "invoice number"))?.to_string())
            }
            Rule::cmd_cost_center => {
                Command::CostCenter(inner_str(next_token!(pairs, "cost center"))?.to_string())
            }
            Rule::cmd_formula_mode => Command::FormulaMode(
                next_token!(pairs, "on/off")
                    .as_str()
                    .eq_ignore_ascii_case("on"),
            ),
            Rule::cmd_save => Command::Save,
            Rule::cmd_cancel => Command::Cancel,
            _ => return Err(anyhow!(format!("unexpected token: {}", text))),
        };

        Ok(command)
    }
}

fn index(row: usize) -> Result<usize> {
    row.checked_sub(1).ok_or(anyhow!("rows start at 1"))
}

fn locate(cell: &CellRef) -> Result<(usize, Field)> {
    let row = cell
        .index()
        .ok_or(anyhow!(format!("cell {} has no row", cell)))?;
    let field = Field::from_column(cell.column)
        .ok_or(SessionError::UnsupportedColumn(cell.column.letter()))?;
    Ok((row, field))
}

impl Command {
    /// Applies the command. Returns the outcome when a cell was committed.
    pub fn apply(&self, session: &mut EditSession) -> Result<Option<CommitOutcome>> {
        match self {
            Command::Edit => session.enter_edit(),
            Command::Set(cell, raw) => {
                let (row, field) = locate(cell)?;
                session.update_cell(row, field, raw)?;
                return Ok(Some(session.commit_cell(row, field)?));
            }
            Command::Type(cell, raw) => {
                let (row, field) = locate(cell)?;
                session.update_cell(row, field, raw)?;
            }
            Command::Commit(cell) => {
                let (row, field) = locate(cell)?;
                return Ok(Some(session.commit_cell(row, field)?));
            }
            Command::Account(row, name) => session.update_cell(index(*row)?, Field::Account, name)?,
            Command::AddRow => {
                session.add_row()?;
            }
            Command::DeleteRow(row) => {
                session.delete_row(index(*row)?)?;
            }
            Command::Narration(narration) => session.meta_mut()?.narration = narration.clone(),
            Command::Invoice(invoice) => session.meta_mut()?.invoice_number = Some(invoice.clone()),
            Command::CostCenter(cost_center) => {
                session.meta_mut()?.cost_center = Some(cost_center.clone())
            }
            Command::FormulaMode(on) => session.set_formula_mode(*on),
            Command::Save => {
                session.save()?;
            }
            Command::Cancel => session.cancel()?,
        }

        Ok(None)
    }

    fn cell(&self) -> Option<CellRef> {
        match self {
            Command::Set(cell, _) | Command::Commit(cell) => Some(*cell),
            _ => None,
        }
    }
}

/// Runs commands in order, stopping at the first one that cannot be applied.
/// Formulas that fail to evaluate do not stop the run; they are collected instead.
pub fn run(session: &mut EditSession, commands: &[Command]) -> Result<Vec<Rejection>> {
    let mut rejections = Vec::new();

    for (idx, command) in commands.iter().enumerate() {
        let outcome = command
            .apply(session)
            .with_context(|| format!("command #{} ({:?}) failed", idx + 1, command))?;

        if let (Some(CommitOutcome::Rejected(error)), Some(cell)) = (outcome, command.cell()) {
            rejections.push(Rejection { cell, error });
        }
    }

    Ok(rejections)
}
