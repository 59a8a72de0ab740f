//! CLI argument definitions for growthline.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `reconcile` | Reconcile a snapshot's universe and print the run report |
//! | `sources` | List registered sources with their call budgets |
//!
//! # Examples
//!
//! ```bash
//! growthline reconcile --snapshot snapshot.json --pretty
//! growthline reconcile --snapshot snapshot.json --config growthline.yaml AAPL MSFT
//! growthline sources --snapshot snapshot.json
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Reconciled revenue and EPS history with growth metrics.
#[derive(Debug, Parser)]
#[command(
    name = "growthline",
    author,
    version,
    about = "Reconcile fundamentals across providers and compute growth metrics"
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Fail with exit code 5 when any issue was recorded or any entity was abandoned.
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Log at debug level, ignoring RUST_LOG.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Engine configuration file (YAML). Defaults apply when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcile every entity of a snapshot and print the run report.
    ///
    /// # Examples
    ///
    ///   growthline reconcile --snapshot snapshot.json
    ///   growthline reconcile --snapshot snapshot.json --deadline-secs 30 AAPL
    Reconcile(ReconcileArgs),

    /// List the sources a snapshot registers, with their call budgets.
    Sources(SourcesArgs),
}

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Snapshot file (JSON) holding the universe and provider data.
    #[arg(long)]
    pub snapshot: PathBuf,

    /// Restrict the run to these symbols instead of the snapshot's universe.
    pub symbols: Vec<String>,

    /// Abandon entities still running after this many seconds.
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Reference date (YYYY-MM-DD) for provider lookback windows. Defaults to today.
    #[arg(long)]
    pub as_of: Option<String>,
}

#[derive(Debug, Args)]
pub struct SourcesArgs {
    /// Snapshot file (JSON) whose providers are listed.
    #[arg(long)]
    pub snapshot: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_reconcile_with_global_flags() {
        let cli = Cli::try_parse_from([
            "growthline",
            "reconcile",
            "--snapshot",
            "snap.json",
            "--deadline-secs",
            "5",
            "--strict",
            "AAPL",
        ])
        .expect("valid arguments");

        assert!(cli.strict);
        let Command::Reconcile(args) = cli.command else {
            panic!("expected reconcile");
        };
        assert_eq!(args.symbols, vec![String::from("AAPL")]);
        assert_eq!(args.deadline_secs, Some(5));
    }

    #[test]
    fn reconcile_requires_snapshot() {
        assert!(Cli::try_parse_from(["growthline", "reconcile"]).is_err());
    }
}
