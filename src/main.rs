//! `cpl`: drive the commercial-paper ledger from the command line.
//!
//!   cpl [--store <file.json>] [--config <ledger.toml>] invoke <function> [args...]
//!   cpl ... query <function> [args...]
//!   cpl ... run <script.jsonl>
//!   cpl ... digest
//!
//! Without `--store` every command runs against a fresh in-memory store, which
//! is mostly useful together with `run`.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use paper_ledger::{dispatch::Call, FileStore, KvStore, Ledger, LedgerConfig, MemoryStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cpl", version)]
#[command(about = "Commercial-paper ledger over a key-value store")]
struct Cli {
    /// JSON store file; created on first commit. Omit for an in-memory store
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// TOML ledger configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `paper_ledger=trace` (falls back to RUST_LOG)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a state-changing function
    Invoke {
        function: String,
        args: Vec<String>,
    },
    /// Run a read-only function, or read a raw key
    Query {
        function: String,
        args: Vec<String>,
    },
    /// Execute a script with one JSON call per line
    Run {
        script: PathBuf,
        /// Report failed calls and continue with the next line
        #[arg(long)]
        keep_going: bool,
    },
    /// Print the merkle digest of the whole store
    Digest,
}

fn init_tracing(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter {directives:?}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

/// Query results are JSON; pretty-print them when they parse, otherwise
/// print the bytes as text.
fn render(bytes: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Parses a script: one [`Call`] per non-blank line, `#` starts a comment line.
fn read_script(path: &Path) -> Result<Vec<(usize, Call)>> {
    let file = File::open(path).with_context(|| format!("opening script {}", path.display()))?;
    let mut calls = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let call: Call = serde_json::from_str(trimmed)
            .with_context(|| format!("{}:{}: malformed call", path.display(), idx + 1))?;
        calls.push((idx + 1, call));
    }
    Ok(calls)
}

fn execute<S: KvStore>(
    ledger: &Ledger<S>,
    command: Command,
    digest: impl Fn() -> [u8; 32],
) -> Result<()> {
    match command {
        Command::Invoke { function, args } => {
            let out = ledger
                .invoke(&function, &args)
                .with_context(|| format!("invoke {function} failed"))?;
            println!("{}", render(&out));
        }
        Command::Query { function, args } => {
            let out = ledger
                .query(&function, &args)
                .with_context(|| format!("query {function} failed"))?;
            println!("{}", render(&out));
        }
        Command::Run { script, keep_going } => {
            let calls = read_script(&script)?;
            let mut failed = 0usize;
            for (line, call) in &calls {
                match ledger.dispatch(call) {
                    Ok(out) => println!("{}", render(&out)),
                    Err(err) if keep_going => {
                        failed += 1;
                        warn!(line, function = %call.function, error = %err, "call failed");
                    }
                    Err(err) => {
                        return Err(err)
                            .with_context(|| format!("line {line}: {} failed", call.function))
                    }
                }
            }
            info!(calls = calls.len(), failed, "script finished");
            if failed > 0 {
                bail!("{failed} of {} calls failed", calls.len());
            }
        }
        Command::Digest => println!("{}", hex::encode(digest())),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref())?;

    let config = match &cli.config {
        Some(path) => LedgerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LedgerConfig::default(),
    };

    match &cli.store {
        Some(path) => {
            let store = FileStore::open(path.clone())
                .with_context(|| format!("opening store {}", path.display()))?;
            let ledger = Ledger::new(store, config);
            execute(&ledger, cli.command, || ledger.store().state_digest())
        }
        None => {
            let ledger = Ledger::new(MemoryStore::new(), config);
            execute(&ledger, cli.command, || ledger.store().state_digest())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn render_pretty_prints_json() {
        assert_eq!(render(br#"{"a":1}"#), "{\n  \"a\": 1\n}");
        assert_eq!(render(b"not json"), "not json");
        assert_eq!(render(b""), "");
    }

    #[test]
    fn script_skips_blank_and_comment_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# setup").unwrap();
        writeln!(file, r#"{{"function":"init"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"function":"GetAllCPs","query":true}}"#).unwrap();
        let calls = read_script(file.path()).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, 2);
        assert_eq!(calls[1].0, 4);
        assert!(calls[1].1.query);
    }

    #[test]
    fn malformed_script_line_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"function":"init"}}"#).unwrap();
        writeln!(file, "{{oops").unwrap();
        let err = read_script(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains(":2: malformed call"));
    }

    #[test]
    fn script_runs_against_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let mut script = tempfile::NamedTempFile::new().unwrap();
        writeln!(script, r#"{{"function":"init"}}"#).unwrap();
        writeln!(script, r#"{{"function":"createAccounts","args":["2"]}}"#).unwrap();

        let ledger = Ledger::with_defaults(FileStore::open(path.clone()).unwrap());
        let command = Command::Run {
            script: script.path().to_path_buf(),
            keep_going: false,
        };
        execute(&ledger, command, || ledger.store().state_digest()).unwrap();

        let reopened = Ledger::with_defaults(FileStore::open(path).unwrap());
        assert_eq!(reopened.account("company2").unwrap().prefix, "20000A");
    }
}
