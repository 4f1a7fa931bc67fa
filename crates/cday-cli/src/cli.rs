//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Daily Clockify activity report.
///
/// Lists every active user of a workspace with the time entries they
/// recorded on one local calendar day.
#[derive(Debug, Parser)]
#[command(name = "cday", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Clockify API key (overrides config and `CDAY_API_KEY`).
    #[arg(long, global = true, value_name = "KEY")]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the workspaces the API key can see.
    Workspaces {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show each active user's time entries for one day.
    Report(ReportArgs),
}

/// Options for `cday report`.
#[derive(Debug, Default, Args)]
pub struct ReportArgs {
    /// Workspace ID (run `cday workspaces` to list them).
    #[arg(short, long)]
    pub workspace: Option<String>,

    /// Days before today: 0 is today, 1 is yesterday.
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    pub days_back: i64,

    /// IANA timezone that defines the day (e.g., Asia/Tehran).
    #[arg(long)]
    pub timezone: Option<String>,

    /// Timezone for entry clock times, or `local` for this machine's zone.
    #[arg(long)]
    pub display_timezone: Option<String>,

    /// Maximum number of users fetched at once.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_report_accepts_negative_days_back() {
        let cli = Cli::try_parse_from(["cday", "report", "--days-back", "-1"]).unwrap();
        let Some(Commands::Report(args)) = cli.command else {
            panic!("expected report command");
        };
        assert_eq!(args.days_back, -1);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["cday", "workspaces", "--json", "--api-key", "k", "-v"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.api_key.as_deref(), Some("k"));
        assert!(matches!(cli.command, Some(Commands::Workspaces { json: true })));
    }

    #[test]
    fn test_report_defaults() {
        let cli = Cli::try_parse_from(["cday", "report"]).unwrap();
        let Some(Commands::Report(args)) = cli.command else {
            panic!("expected report command");
        };
        assert_eq!(args.days_back, 0);
        assert_eq!(args.workspace, None);
        assert!(!args.json);
    }
}
