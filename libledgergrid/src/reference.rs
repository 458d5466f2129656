use crate::ledger::LedgerLine;
use crate::parser::Rule;

use pest::iterators::Pair;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Column {
    Account,
    Debit,
    Credit,
    /// Any letter past `C`. Parses, but never holds a value.
    Unsupported(char),
}

impl Column {
    pub fn from_letter(letter: char) -> Column {
        match letter {
            'A' => Column::Account,
            'B' => Column::Debit,
            'C' => Column::Credit,
            other => Column::Unsupported(other),
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Column::Account => 'A',
            Column::Debit => 'B',
            Column::Credit => 'C',
            Column::Unsupported(c) => *c,
        }
    }
}

/// A single grid address such as `B2`. Rows are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRef {
    pub column: Column,
    pub row: usize,
}

impl CellRef {
    pub fn new(column: Column, row: usize) -> Self {
        Self { column, row }
    }

    pub fn parse(token: Pair<'_, Rule>) -> anyhow::Result<CellRef> {
        token.as_str().try_into()
    }

    /// Position in the lines slice, `None` for row 0.
    pub fn index(&self) -> Option<usize> {
        self.row.checked_sub(1)
    }

    /// Rows that do not exist yet read as zero.
    pub fn resolve(&self, lines: &[LedgerLine]) -> f64 {
        self.index()
            .and_then(|idx| lines.get(idx))
            .map(|line| line.value(self.column))
            .unwrap_or(0f64)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column.letter(), self.row)
    }
}

impl TryFrom<&str> for CellRef {
    type Error = anyhow::Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let mut chars = s.chars();
        let letter = chars
            .next()
            .filter(|c| c.is_ascii_uppercase())
            .ok_or(anyhow::Error::msg(format!(
                "input `{}' is not a valid cell reference",
                s
            )))?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(anyhow::Error::msg(format!(
                "input `{}' is not a valid cell reference",
                s
            )));
        }

        // only overflow can fail here, and such a row is out of range anyway
        let row = digits.parse::<usize>().unwrap_or(usize::MAX);
        Ok(CellRef::new(Column::from_letter(letter), row))
    }
}

/// An inclusive block of cells such as `B1:B3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeRef {
    pub start: CellRef,
    pub end: CellRef,
}

impl RangeRef {
    pub fn new(start: CellRef, end: CellRef) -> Self {
        Self { start, end }
    }

    pub fn parse(token: Pair<'_, Rule>) -> anyhow::Result<RangeRef> {
        let text = token.as_str();
        let mut cells = token.into_inner();
        let start = cells
            .next()
            .ok_or(anyhow::Error::msg(format!("invalid range start: '{}'", text)))?;
        let end = cells
            .next()
            .ok_or(anyhow::Error::msg(format!("invalid range end: '{}'", text)))?;
        Ok(RangeRef::new(CellRef::parse(start)?, CellRef::parse(end)?))
    }

    /// Values of every cell in the block, row by row. Rows are clipped to the
    /// lines that exist, and either corner may come first.
    pub fn values(&self, lines: &[LedgerLine]) -> Vec<f64> {
        let first_row = self.start.row.min(self.end.row).max(1);
        let last_row = self.start.row.max(self.end.row).min(lines.len());
        let first_col = self.start.column.letter().min(self.end.column.letter());
        let last_col = self.start.column.letter().max(self.end.column.letter());

        let mut values = Vec::new();
        if first_row > last_row {
            return values;
        }
        for line in &lines[first_row - 1..last_row] {
            for letter in first_col..=last_col {
                values.push(line.value(Column::from_letter(letter)));
            }
        }
        values
    }

    pub fn sum(&self, lines: &[LedgerLine]) -> f64 {
        self.values(lines).into_iter().sum()
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use crate::ledger::LedgerLine;
    use crate::reference::{CellRef, Column, RangeRef};

    use anyhow::Result;

    fn grid() -> Vec<LedgerLine> {
        vec![
            LedgerLine::new("Freight", 10f64, 1f64, 90),
            LedgerLine::new("Packing", 20f64, 2f64, 90),
            LedgerLine::new("Courier", 30f64, 3f64, 90),
        ]
    }

    #[test]
    fn test_parse_cell() -> Result<()> {
        let cell: CellRef = "C12".try_into()?;
        assert_eq!(cell, CellRef::new(Column::Credit, 12));
        assert_eq!(format!("{}", cell), "C12");

        assert_eq!(
            format!("{}", CellRef::try_from("b1").unwrap_err()),
            "input `b1' is not a valid cell reference"
        );
        assert!(CellRef::try_from("B").is_err());
        assert!(CellRef::try_from("B1x").is_err());
        Ok(())
    }

    #[test]
    fn test_resolve_out_of_range() -> Result<()> {
        let lines = grid();
        assert_eq!(CellRef::try_from("B3")?.resolve(&lines), 30f64);
        assert_eq!(CellRef::try_from("B4")?.resolve(&lines), 0f64);
        assert_eq!(CellRef::try_from("B0")?.resolve(&lines), 0f64);
        assert_eq!(CellRef::try_from("A1")?.resolve(&lines), 0f64);
        assert_eq!(
            CellRef::try_from("B99999999999999999999999")?.resolve(&lines),
            0f64
        );
        Ok(())
    }

    #[test]
    fn test_range_values() -> Result<()> {
        let lines = grid();
        let range = RangeRef::new("B1".try_into()?, "B3".try_into()?);
        assert_eq!(range.values(&lines), vec![10f64, 20f64, 30f64]);
        assert_eq!(format!("{}", range), "B1:B3");

        let reversed = RangeRef::new("B3".try_into()?, "B2".try_into()?);
        assert_eq!(reversed.sum(&lines), 50f64);

        let clipped = RangeRef::new("C2".try_into()?, "C40".try_into()?);
        assert_eq!(clipped.sum(&lines), 5f64);

        let beyond = RangeRef::new("B7".try_into()?, "B9".try_into()?);
        assert!(beyond.values(&lines).is_empty());
        Ok(())
    }

    #[test]
    fn test_cross_column_range() -> Result<()> {
        let lines = grid();
        let block = RangeRef::new("A1".try_into()?, "C2".try_into()?);
        assert_eq!(block.values(&lines), vec![0f64, 10f64, 1f64, 0f64, 20f64, 2f64]);
        assert_eq!(block.sum(&lines), 33f64);
        Ok(())
    }
}
