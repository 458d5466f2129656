use libledgergrid::classifier::TransactionClassifier;
use libledgergrid::eval::{EvalOptions, FunctionSemantics};
use libledgergrid::parser::parse_script;
use libledgergrid::rules;
use libledgergrid::script;
use libledgergrid::session::{EditSession, SessionOptions};
use libledgergrid::transaction::Transaction;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::{info, warn};

mod logging;
mod render;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Functions {
    Legacy,
    Spreadsheet,
}

impl From<Functions> for FunctionSemantics {
    fn from(functions: Functions) -> Self {
        match functions {
            Functions::Legacy => FunctionSemantics::Legacy,
            Functions::Spreadsheet => FunctionSemantics::Spreadsheet,
        }
    }
}

/// Draft a journal entry for an inbox transaction and replay grid edits on it.
#[derive(Debug, Parser)]
#[command(name = "ledgergrid", version, about)]
struct Cli {
    /// Transaction JSON file, read from stdin when omitted
    #[arg(short, long)]
    txn: Option<PathBuf>,

    /// Session script to replay against the drafted entry
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Start with formula mode on
    #[arg(long)]
    formula_mode: bool,

    /// How functions treat ranges
    #[arg(long, value_enum, default_value_t = Functions::Legacy)]
    functions: Functions,

    /// Print the entry and its balance as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn read_transaction(path: Option<&PathBuf>) -> Result<Transaction> {
    let text = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("cannot read transaction {}", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("cannot read transaction from stdin")?;
            text
        }
    };
    serde_json::from_str(&text).context("transaction is not valid JSON")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let txn = read_transaction(cli.txn.as_ref())?;
    let table = rules::standard()?;
    let entry = table.journal_entry(&txn);
    info!(id = %txn.id, lines = entry.lines.len(), "drafted journal entry");

    let options = SessionOptions {
        formula_mode: cli.formula_mode,
        eval: EvalOptions {
            functions: cli.functions.into(),
        },
    };
    let mut session = EditSession::new(entry, options);

    let rejections = match &cli.script {
        Some(path) => {
            let input = fs::read_to_string(path)
                .with_context(|| format!("cannot read script {}", path.display()))?;
            let commands = parse_script(&input)?;
            script::run(&mut session, &commands)?
        }
        None => Vec::new(),
    };
    if session.is_editing() {
        warn!("script ended while still editing, showing the unsaved draft");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        render::json(&mut out, &session, &rejections)
    } else {
        render::table(&mut out, &session, &rejections)
    }
}
