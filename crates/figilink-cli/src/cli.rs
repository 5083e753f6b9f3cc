//! CLI argument definitions for figilink.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lookup` | Resolve one ISIN through OpenFIGI and store the result |
//! | `show` | Print the stored security and recent audit-log rows |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--db-path` | `$FIGILINK_HOME/figilink.duckdb` | DuckDB database file |
//! | `--api-url` | `OPENFIGI_API_URL` or the public endpoint | Mapping endpoint |
//! | `--retry-delay-ms` | `OPENFIGI_RETRY_DELAY_MS` or `2000` | Linear retry step |
//! | `--timeout-ms` | `OPENFIGI_TIMEOUT_MS` or `10000` | Per-request timeout |
//!
//! # Examples
//!
//! ```bash
//! figilink lookup US0378331005 --pretty
//! figilink lookup US0378331005 --max-retries 5 --start-attempt 2
//! figilink show US0378331005 --history 10
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// ISIN to FIGI resolution backed by OpenFIGI and a local DuckDB warehouse.
#[derive(Debug, Parser)]
#[command(name = "figilink", author, version, about = "Resolve ISINs to FIGIs via OpenFIGI")]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// DuckDB database file (overrides FIGILINK_DB_PATH).
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// OpenFIGI mapping endpoint (overrides OPENFIGI_API_URL).
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Base retry delay in milliseconds (overrides OPENFIGI_RETRY_DELAY_MS).
    #[arg(long, global = true)]
    pub retry_delay_ms: Option<u64>,

    /// Request timeout in milliseconds (overrides OPENFIGI_TIMEOUT_MS).
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Look up one ISIN and upsert the security record.
    Lookup(LookupArgs),
    /// Show the stored security record and its audit trail.
    Show(ShowArgs),
}

impl Command {
    pub fn isin(&self) -> &str {
        match self {
            Self::Lookup(args) => &args.isin,
            Self::Show(args) => &args.isin,
        }
    }
}

#[derive(Debug, Args)]
pub struct LookupArgs {
    /// ISIN to resolve, e.g. US0378331005.
    pub isin: String,

    /// Maximum number of API attempts.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_retries: Option<u32>,

    /// Attempt number recorded for the first call.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub start_attempt: u32,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// ISIN to inspect.
    pub isin: String,

    /// Number of audit-log rows to include, newest first.
    #[arg(long, default_value_t = 5)]
    pub history: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lookup_with_overrides() {
        let cli = Cli::try_parse_from([
            "figilink",
            "--pretty",
            "lookup",
            "US0378331005",
            "--max-retries",
            "5",
            "--start-attempt",
            "2",
            "--retry-delay-ms",
            "10",
        ])
        .expect("parse");

        assert!(cli.pretty);
        assert_eq!(cli.retry_delay_ms, Some(10));
        let Command::Lookup(args) = &cli.command else {
            panic!("expected lookup");
        };
        assert_eq!(args.max_retries, Some(5));
        assert_eq!(args.start_attempt, 2);
        assert_eq!(cli.command.isin(), "US0378331005");
    }

    #[test]
    fn rejects_zero_max_retries() {
        let parsed =
            Cli::try_parse_from(["figilink", "lookup", "US0378331005", "--max-retries", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn show_defaults_to_five_history_rows() {
        let cli = Cli::try_parse_from(["figilink", "show", "US0378331005"]).expect("parse");
        let Command::Show(args) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(args.history, 5);
    }
}
