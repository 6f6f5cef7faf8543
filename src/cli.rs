//! CLI definitions for chansnap.
//!
//! Uses clap for argument parsing with derive macros. Connection settings
//! are all env-bindable so the tool drops into a cron job or container
//! without flags.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// chansnap - Mattermost channel occupancy snapshots in TimescaleDB
#[derive(Parser, Debug)]
#[command(name = "chansnap")]
#[command(version)]
#[command(about = "Snapshot Mattermost channel membership and presence into TimescaleDB")]
#[command(long_about = r#"
chansnap takes a point-in-time snapshot of which users are present in which
Mattermost channels, together with each user's presence status, and records
it in a TimescaleDB hypertable for occupancy and attendance analysis.

One invocation is one snapshot: enumerate teams and channels, page through
channel membership, resolve usernames and statuses in bulk, and write the
records in batched commits. Run it from cron for a time series.

Quick start:
  1. export MM_URL, MM_USER, MM_PASSWORD, PG_HOST, PG_USER, PG_PASSWORD, PG_DB
  2. Run: chansnap snapshot
"#)]
pub struct Cli {
    /// Path to a config file (default: ~/.config/chansnap/config.toml)
    #[arg(long, env = "CHANSNAP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Be verbose (show debug info)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Be quiet (suppress non-error output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect one snapshot and persist it (provision → collect → resolve → write)
    Snapshot(SnapshotArgs),

    /// Provision the database schema only (table, hypertable, compression)
    Provision(ProvisionArgs),

    /// Show or scaffold configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Mattermost connection arguments.
#[derive(Args, Debug, Default)]
pub struct MattermostArgs {
    /// Mattermost base URL (e.g. https://chat.example.com)
    #[arg(long, env = "MM_URL")]
    pub url: Option<String>,

    /// Mattermost login id (username or email)
    #[arg(long, env = "MM_USER")]
    pub login_id: Option<String>,

    /// Mattermost password
    #[arg(long, env = "MM_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// PostgreSQL connection arguments.
#[derive(Args, Debug, Default)]
pub struct DatabaseArgs {
    /// PostgreSQL host
    #[arg(long, env = "PG_HOST")]
    pub pg_host: Option<String>,

    /// PostgreSQL port
    #[arg(long, env = "PG_PORT")]
    pub pg_port: Option<u16>,

    /// PostgreSQL user
    #[arg(long, env = "PG_USER")]
    pub pg_user: Option<String>,

    /// PostgreSQL password
    #[arg(long, env = "PG_PASSWORD", hide_env_values = true)]
    pub pg_password: Option<String>,

    /// PostgreSQL database name
    #[arg(long, env = "PG_DB")]
    pub pg_db: Option<String>,
}

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub mattermost: MattermostArgs,

    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Pause between API calls, in milliseconds
    #[arg(long)]
    pub api_delay_ms: Option<u64>,

    /// Channel members fetched per page
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Records per database commit
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Collect and resolve, but skip the database entirely
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Compress data older than this many days
    #[arg(long)]
    pub compress_after_days: Option<u32>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show the effective configuration (secrets redacted)
    #[arg(long)]
    pub show: bool,

    /// Write a default config file to the standard location
    #[arg(long)]
    pub init: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
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
    fn snapshot_flags_parse() {
        let cli = Cli::try_parse_from([
            "chansnap",
            "snapshot",
            "--url",
            "https://chat.example.com",
            "--batch-size",
            "50",
            "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Commands::Snapshot(args) => {
                assert_eq!(args.mattermost.url.as_deref(), Some("https://chat.example.com"));
                assert_eq!(args.batch_size, Some(50));
                assert!(args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
