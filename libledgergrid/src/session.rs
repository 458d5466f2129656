use crate::error::{EvalError, SessionError};
use crate::eval::{EvalOptions, Evaluator};
use crate::formula::{display_text, is_formula};
use crate::ledger::{BalanceSummary, EntryMeta, JournalEntry, LedgerLine};
use crate::reference::Column;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Editable columns of a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Account,
    Debit,
    Credit,
}

impl Field {
    pub fn column(&self) -> Column {
        match self {
            Field::Account => Column::Account,
            Field::Debit => Column::Debit,
            Field::Credit => Column::Credit,
        }
    }

    pub fn from_column(column: Column) -> Option<Field> {
        match column {
            Column::Account => Some(Field::Account),
            Column::Debit => Some(Field::Debit),
            Column::Credit => Some(Field::Credit),
            Column::Unsupported(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Show bare expressions with a leading `=` while they are pending.
    #[serde(default)]
    pub formula_mode: bool,
    #[serde(default)]
    pub eval: EvalOptions,
}

/// What a commit did to a cell.
#[derive(Clone, Debug, PartialEq)]
pub enum CommitOutcome {
    /// Nothing was pending, or the column holds no amount.
    Unchanged,
    Evaluated(f64),
    /// The formula failed; the cell kept its previous value.
    Rejected(EvalError),
}

fn set_amount(line: &mut LedgerLine, field: Field, value: f64) {
    match field {
        Field::Debit => line.debit = value,
        Field::Credit => line.credit = value,
        Field::Account => {}
    }
}

fn format_amount(value: f64) -> String {
    format!("{}", value)
}

#[derive(Clone, Debug)]
struct Draft {
    working: JournalEntry,
    /// Formula text typed into a cell and not yet committed, keyed by line index.
    pending: BTreeMap<(usize, Field), String>,
}

impl Draft {
    fn new(entry: &JournalEntry) -> Self {
        Self {
            working: entry.clone(),
            pending: BTreeMap::new(),
        }
    }

    fn check_row(&self, row: usize) -> Result<(), SessionError> {
        if row < self.working.lines.len() {
            Ok(())
        } else {
            Err(SessionError::RowOutOfRange {
                row,
                len: self.working.lines.len(),
            })
        }
    }

    fn commit(&mut self, evaluator: &Evaluator, row: usize, field: Field) -> CommitOutcome {
        let Some(raw) = self.pending.remove(&(row, field)) else {
            return CommitOutcome::Unchanged;
        };

        let outcome = evaluator.evaluate(&self.working.lines, row, &raw);
        match outcome.error {
            None => {
                set_amount(&mut self.working.lines[row], field, outcome.result);
                CommitOutcome::Evaluated(outcome.result)
            }
            Some(error) => {
                warn!(
                    row,
                    ?field,
                    formula = %raw,
                    %error,
                    "formula rejected, keeping previous value"
                );
                CommitOutcome::Rejected(error)
            }
        }
    }
}

#[derive(Clone, Debug)]
enum State {
    Viewing,
    Editing(Draft),
}

/// Owns one journal entry and the working copy made while it is edited.
///
/// Cell text is stored as typed and only evaluated on commit, which the UI
/// triggers on blur or Enter. Balance is derived on demand and never blocks
/// a save.
#[derive(Clone, Debug)]
pub struct EditSession {
    committed: JournalEntry,
    state: State,
    options: SessionOptions,
    evaluator: Evaluator,
}

impl EditSession {
    pub fn new(entry: JournalEntry, options: SessionOptions) -> Self {
        Self {
            committed: entry,
            state: State::Viewing,
            options,
            evaluator: Evaluator::new(options.eval),
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, State::Editing(_))
    }

    /// The last saved entry.
    pub fn committed(&self) -> &JournalEntry {
        &self.committed
    }

    /// What the grid currently shows: the working copy while editing.
    pub fn entry(&self) -> &JournalEntry {
        match &self.state {
            State::Viewing => &self.committed,
            State::Editing(draft) => &draft.working,
        }
    }

    pub fn summary(&self) -> BalanceSummary {
        self.entry().summary()
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn formula_mode(&self) -> bool {
        self.options.formula_mode
    }

    pub fn set_formula_mode(&mut self, on: bool) {
        self.options.formula_mode = on;
    }

    fn draft(&self) -> Result<&Draft, SessionError> {
        match &self.state {
            State::Editing(draft) => Ok(draft),
            State::Viewing => Err(SessionError::NotEditing),
        }
    }

    fn draft_mut(&mut self) -> Result<&mut Draft, SessionError> {
        match &mut self.state {
            State::Editing(draft) => Ok(draft),
            State::Viewing => Err(SessionError::NotEditing),
        }
    }

    /// Starts editing a copy of the committed entry. Already editing is a no-op.
    pub fn enter_edit(&mut self) {
        if self.is_editing() {
            debug!("already editing, keeping working copy");
            return;
        }
        self.state = State::Editing(Draft::new(&self.committed));
        debug!(lines = self.committed.lines.len(), "entered edit mode");
    }

    pub fn meta_mut(&mut self) -> Result<&mut EntryMeta, SessionError> {
        Ok(&mut self.draft_mut()?.working.meta)
    }

    /// Stores what was typed into a cell. Formulas wait for [`EditSession::commit_cell`];
    /// numbers are stored right away and anything else becomes `0`.
    pub fn update_cell(
        &mut self,
        row: usize,
        field: Field,
        raw: &str,
    ) -> Result<(), SessionError> {
        let draft = self.draft_mut()?;
        draft.check_row(row)?;
        let line = &mut draft.working.lines[row];

        match field {
            Field::Account => line.account = raw.to_string(),
            Field::Debit | Field::Credit => {
                let text = raw.trim();
                if is_formula(text) {
                    draft.pending.insert((row, field), text.to_string());
                } else {
                    draft.pending.remove(&(row, field));
                    let value = text
                        .parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite())
                        .unwrap_or(0f64);
                    set_amount(line, field, value);
                }
            }
        }

        Ok(())
    }

    /// Evaluates a pending formula against the whole working copy and stores
    /// the result. A failing formula leaves the previous value in place.
    pub fn commit_cell(
        &mut self,
        row: usize,
        field: Field,
    ) -> Result<CommitOutcome, SessionError> {
        let evaluator = self.evaluator;
        let draft = self.draft_mut()?;
        draft.check_row(row)?;
        Ok(draft.commit(&evaluator, row, field))
    }

    /// Text for a cell: the pending formula if there is one, otherwise the stored value.
    pub fn raw_text(&self, row: usize, field: Field) -> Result<String, SessionError> {
        let formula_mode = self.options.formula_mode;
        let lines = &self.entry().lines;
        let line = lines.get(row).ok_or(SessionError::RowOutOfRange {
            row,
            len: lines.len(),
        })?;

        if let Ok(draft) = self.draft() {
            if let Some(raw) = draft.pending.get(&(row, field)) {
                return Ok(display_text(raw, formula_mode).into_owned());
            }
        }

        Ok(match field {
            Field::Account => line.account.clone(),
            Field::Debit => format_amount(line.debit),
            Field::Credit => format_amount(line.credit),
        })
    }

    /// Appends an empty line and returns its index.
    pub fn add_row(&mut self) -> Result<usize, SessionError> {
        let lines = &mut self.draft_mut()?.working.lines;
        lines.push(LedgerLine::blank());
        Ok(lines.len() - 1)
    }

    /// Removes a line. The last remaining line is never removed; `false` means nothing changed.
    pub fn delete_row(&mut self, row: usize) -> Result<bool, SessionError> {
        let draft = self.draft_mut()?;
        let len = draft.working.lines.len();
        if len <= 1 {
            warn!(row, "refusing to delete the only line");
            return Ok(false);
        }
        if row >= len {
            warn!(row, len, "no such line to delete");
            return Ok(false);
        }

        draft.working.lines.remove(row);
        draft.pending = std::mem::take(&mut draft.pending)
            .into_iter()
            .filter_map(|((r, field), raw)| match r.cmp(&row) {
                Ordering::Less => Some(((r, field), raw)),
                Ordering::Equal => None,
                Ordering::Greater => Some(((r - 1, field), raw)),
            })
            .collect();
        Ok(true)
    }

    /// Commits whatever is still pending, then makes the working copy the
    /// committed entry. Unbalanced entries save too.
    pub fn save(&mut self) -> Result<BalanceSummary, SessionError> {
        let State::Editing(mut draft) = std::mem::replace(&mut self.state, State::Viewing) else {
            return Err(SessionError::NotEditing);
        };

        let pending: Vec<(usize, Field)> = draft.pending.keys().copied().collect();
        for (row, field) in pending {
            draft.commit(&self.evaluator, row, field);
        }

        self.committed = draft.working;
        let summary = self.committed.summary();
        if !summary.is_balanced {
            warn!(difference = summary.difference, "saved an unbalanced entry");
        }
        debug!(lines = self.committed.lines.len(), "saved entry");
        Ok(summary)
    }

    /// Throws the working copy away.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        match std::mem::replace(&mut self.state, State::Viewing) {
            State::Editing(_) => {
                debug!("discarded working copy");
                Ok(())
            }
            State::Viewing => Err(SessionError::NotEditing),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{EvalError, SessionError};
    use crate::eval::{EvalOptions, FunctionSemantics};
    use crate::ledger::{EntryMeta, JournalEntry, LedgerLine};
    use crate::session::{CommitOutcome, EditSession, Field, SessionOptions};

    use anyhow::Result;

    fn consulting() -> JournalEntry {
        JournalEntry::new(
            EntryMeta {
                narration: "Consulting retainer".to_string(),
                invoice_number: Some("INV-2291".to_string()),
                ..Default::default()
            },
            vec![
                LedgerLine::debit("Professional Fees", 50_000f64, 97),
                LedgerLine::credit("TDS Payable", 5_000f64, 91),
                LedgerLine::credit("Anand & Co", 45_000f64, 96),
            ],
        )
    }

    fn editing(entry: JournalEntry) -> EditSession {
        let mut session = EditSession::new(entry, SessionOptions::default());
        session.enter_edit();
        session
    }

    #[test]
    fn test_plain_number_round_trip() -> Result<()> {
        let mut session = editing(consulting());
        session.update_cell(0, Field::Debit, "123.45")?;
        assert_eq!(session.commit_cell(0, Field::Debit)?, CommitOutcome::Unchanged);
        assert_eq!(session.entry().lines[0].debit, 123.45);
        assert_eq!(session.raw_text(0, Field::Debit)?, "123.45");
        Ok(())
    }

    #[test]
    fn test_unparseable_text_is_zero() -> Result<()> {
        let mut session = editing(consulting());
        session.update_cell(1, Field::Credit, "five thousand")?;
        assert_eq!(session.entry().lines[1].credit, 0f64);
        session.update_cell(1, Field::Credit, "")?;
        assert_eq!(session.entry().lines[1].credit, 0f64);
        session.update_cell(1, Field::Credit, "inf")?;
        assert_eq!(session.entry().lines[1].credit, 0f64);
        Ok(())
    }

    #[test]
    fn test_formula_waits_for_commit() -> Result<()> {
        let mut session = editing(consulting());
        session.update_cell(1, Field::Credit, "=B1*0.1")?;

        // typed but not committed: raw text and value diverge
        assert_eq!(session.raw_text(1, Field::Credit)?, "=B1*0.1");
        assert_eq!(session.entry().lines[1].credit, 5_000f64);

        session.update_cell(0, Field::Debit, "60000")?;
        assert_eq!(
            session.commit_cell(1, Field::Credit)?,
            CommitOutcome::Evaluated(6_000f64)
        );
        assert_eq!(session.entry().lines[1].credit, 6_000f64);
        assert_eq!(session.raw_text(1, Field::Credit)?, "6000");
        Ok(())
    }

    #[test]
    fn test_commit_sees_sibling_commits() -> Result<()> {
        let mut session = editing(consulting());
        session.update_cell(1, Field::Credit, "=B1*10%")?;
        session.commit_cell(1, Field::Credit)?;
        session.update_cell(2, Field::Credit, "=B1-C2")?;
        session.commit_cell(2, Field::Credit)?;

        assert_eq!(session.entry().lines[2].credit, 45_000f64);
        assert!(session.summary().is_balanced);
        Ok(())
    }

    #[test]
    fn test_failed_commit_keeps_value() -> Result<()> {
        let mut session = editing(consulting());
        session.update_cell(1, Field::Credit, "=B1**2")?;
        let outcome = session.commit_cell(1, Field::Credit)?;

        assert!(matches!(outcome, CommitOutcome::Rejected(EvalError::Syntax { .. })));
        assert_eq!(session.entry().lines[1].credit, 5_000f64);
        assert_eq!(session.raw_text(1, Field::Credit)?, "5000");
        assert!(session.is_editing());
        Ok(())
    }

    #[test]
    fn test_account_is_text() -> Result<()> {
        let mut session = editing(consulting());
        session.update_cell(2, Field::Account, "Anand & Co LLP")?;
        assert_eq!(session.commit_cell(2, Field::Account)?, CommitOutcome::Unchanged);
        assert_eq!(session.raw_text(2, Field::Account)?, "Anand & Co LLP");
        Ok(())
    }

    #[test]
    fn test_formula_mode_display() -> Result<()> {
        let mut session = editing(consulting());
        session.set_formula_mode(true);
        session.update_cell(1, Field::Credit, "B1*10%")?;
        assert_eq!(session.raw_text(1, Field::Credit)?, "=B1*10%");
        assert_eq!(
            session.commit_cell(1, Field::Credit)?,
            CommitOutcome::Evaluated(5_000f64)
        );
        Ok(())
    }

    #[test]
    fn test_add_row_defaults() -> Result<()> {
        let mut session = editing(consulting());
        let idx = session.add_row()?;
        assert_eq!(idx, 3);
        assert_eq!(session.entry().lines[3], LedgerLine::new("", 0f64, 0f64, 95));
        Ok(())
    }

    #[test]
    fn test_last_row_is_kept() -> Result<()> {
        let entry = JournalEntry::new(
            EntryMeta::default(),
            vec![LedgerLine::debit("Suspense Account", 10f64, 40)],
        );
        let mut session = editing(entry.clone());
        assert!(!session.delete_row(0)?);
        assert_eq!(session.entry(), &entry);
        Ok(())
    }

    #[test]
    fn test_delete_row_shifts_pending() -> Result<()> {
        let mut session = editing(consulting());
        session.update_cell(2, Field::Credit, "=B1-C2")?;
        assert!(session.delete_row(0)?);
        assert!(!session.delete_row(7)?);

        assert_eq!(session.raw_text(1, Field::Credit)?, "=B1-C2");
        assert_eq!(session.entry().lines.len(), 2);
        Ok(())
    }

    #[test]
    fn test_cancel_isolation() -> Result<()> {
        let original = consulting();
        let mut session = EditSession::new(original.clone(), SessionOptions::default());
        session.enter_edit();
        session.add_row()?;
        session.update_cell(0, Field::Debit, "1")?;
        session.meta_mut()?.narration = "changed".to_string();
        session.cancel()?;

        assert!(!session.is_editing());
        assert_eq!(session.committed(), &original);
        assert_eq!(session.entry(), &original);
        Ok(())
    }

    #[test]
    fn test_save_commits_pending() -> Result<()> {
        let mut session = editing(consulting());
        session.update_cell(0, Field::Debit, "=C2+C3+1000")?;
        let summary = session.save()?;

        assert!(!session.is_editing());
        assert_eq!(session.committed().lines[0].debit, 51_000f64);
        // unbalanced entries are still saved
        assert!(!summary.is_balanced);
        assert_eq!(summary.difference, 1_000f64);
        Ok(())
    }

    #[test]
    fn test_reentering_keeps_working_copy() -> Result<()> {
        let mut session = editing(consulting());
        session.add_row()?;
        session.enter_edit();
        assert_eq!(session.entry().lines.len(), 4);
        Ok(())
    }

    #[test]
    fn test_viewing_rejects_edits() {
        let mut session = EditSession::new(consulting(), SessionOptions::default());
        assert_eq!(
            session.update_cell(0, Field::Debit, "1"),
            Err(SessionError::NotEditing)
        );
        assert_eq!(session.add_row(), Err(SessionError::NotEditing));
        assert_eq!(session.save(), Err(SessionError::NotEditing));
        assert_eq!(session.cancel(), Err(SessionError::NotEditing));
    }

    #[test]
    fn test_row_out_of_range() {
        let mut session = editing(consulting());
        assert_eq!(
            session.update_cell(3, Field::Debit, "1"),
            Err(SessionError::RowOutOfRange { row: 3, len: 3 })
        );
        assert_eq!(
            session.commit_cell(9, Field::Credit),
            Err(SessionError::RowOutOfRange { row: 9, len: 3 })
        );
    }

    #[test]
    fn test_session_uses_eval_options() -> Result<()> {
        let options = SessionOptions {
            formula_mode: false,
            eval: EvalOptions {
                functions: FunctionSemantics::Spreadsheet,
            },
        };
        let mut session = EditSession::new(consulting(), options);
        session.enter_edit();
        session.update_cell(0, Field::Debit, "=AVERAGE(C2:C3)")?;
        assert_eq!(
            session.commit_cell(0, Field::Debit)?,
            CommitOutcome::Evaluated(25_000f64)
        );
        Ok(())
    }
}
