use crate::error::EvalError;
use crate::formula::Expr;
use crate::script::Command;

use anyhow::{anyhow, Result};
use pest::iterators::Pair;
use pest::Parser;

#[derive(Parser)]
#[grammar = "journal.pest"]
pub struct JournalParser;

/// Formulas longer than this are rejected before they reach the parser.
pub const MAX_FORMULA_LEN: usize = 1024;

fn syntax(text: &str, message: impl Into<String>) -> EvalError {
    EvalError::Syntax {
        text: text.to_string(),
        message: message.into(),
    }
}

/// Parses the text of a debit/credit cell into an expression tree.
/// The leading `=` is optional.
pub fn parse_formula(text: &str) -> Result<Expr, EvalError> {
    if text.len() > MAX_FORMULA_LEN {
        return Err(syntax(
            text,
            format!("longer than {} characters", MAX_FORMULA_LEN),
        ));
    }

    let mut pairs = JournalParser::parse(Rule::formula, text)
        .map_err(|e| syntax(text, e.variant.message()))?;
    let expr = pairs
        .next()
        .and_then(|formula| formula.into_inner().next())
        .ok_or_else(|| syntax(text, "empty formula"))?;

    Expr::parse(expr).map_err(|e| syntax(text, e.to_string()))
}

/// Parses a session script, one command per line. Blank lines and `#` comments are skipped.
pub fn parse_script(input: &str) -> Result<Vec<Command>> {
    let script = JournalParser::parse(Rule::script, input)?
        .next()
        .ok_or(anyhow!("empty script"))?;

    let mut commands = Vec::new();
    for token in script.into_inner() {
        match token.as_rule() {
            Rule::EOI => break,
            _ => commands.push(Command::try_from(token)?),
        }
    }

    Ok(commands)
}

pub fn inner_str(token: Pair<Rule>) -> Result<&str> {
    let text = token.as_str();
    token
        .into_inner()
        .next()
        .map(|inner| inner.as_str())
        .ok_or(anyhow!(format!("unexpected token: {}", text)))
}

#[cfg(test)]
mod tests {
    use crate::error::EvalError;
    use crate::parser::{inner_str, parse_formula, parse_script, JournalParser, Rule};
    use crate::script::Command;

    use anyhow::{anyhow, Result};
    use pest::Parser;

    #[test]
    fn test_parse_rejects_garbage() {
        for text in ["=", "", "=B1 +", "=alert(1)", "=B1 # note", "=b1*2", "=(1"] {
            assert!(
                matches!(parse_formula(text), Err(EvalError::Syntax { .. })),
                "`{}' should not parse",
                text
            );
        }
    }

    #[test]
    fn test_parse_rejects_long_input() {
        let text = format!("={}", "1+".repeat(600) + "1");
        let err = parse_formula(&text).unwrap_err();
        assert!(format!("{}", err).contains("longer than 1024 characters"));
    }

    #[test]
    fn test_inner_str() -> Result<()> {
        let mut tokens = JournalParser::parse(Rule::string, r#""Office Supplies""#)?;
        let token = tokens.next().ok_or(anyhow!("no token"))?;
        assert_eq!(inner_str(token)?, "Office Supplies");
        Ok(())
    }

    #[test]
    fn test_parse_script_skips_blanks_and_comments() -> Result<()> {
        let commands = parse_script(
            "# open the grid\nedit\n\n   \nadd   # one more row\nsave\n",
        )?;
        assert_eq!(commands, vec![Command::Edit, Command::AddRow, Command::Save]);
        Ok(())
    }

    #[test]
    fn test_parse_script_reports_bad_line() {
        let err = parse_script("edit\nfrobnicate 2\n").unwrap_err();
        assert!(format!("{}", err).contains("2:1"));
    }
}
