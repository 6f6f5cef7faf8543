//! chansnap - Mattermost channel occupancy snapshots in TimescaleDB
//!
//! Main entry point for the chansnap command-line tool.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use sqlx::{ConnectOptions, Connection, PgConnection};
use std::io;
use tracing::info;

use chansnap::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_cli_logging(cli.quiet, cli.verbose);

    match &cli.command {
        Commands::Snapshot(args) => cmd_snapshot(&cli, args).await,
        Commands::Provision(args) => cmd_provision(&cli, args).await,
        Commands::Config(args) => cmd_config(&cli, args),
        Commands::Completions(args) => cmd_completions(args.clone()),
    }
}

fn load_config(cli: &Cli) -> Config {
    Config::load_with_file(cli.config.as_ref())
}

fn apply_database_args(config: &mut Config, args: &cli::DatabaseArgs) {
    if let Some(host) = &args.pg_host {
        config.database.host = host.clone();
    }
    if let Some(port) = args.pg_port {
        config.database.port = port;
    }
    if let Some(user) = &args.pg_user {
        config.database.user = Some(user.clone());
    }
    if let Some(password) = &args.pg_password {
        config.database.password = Some(password.clone());
    }
    if let Some(dbname) = &args.pg_db {
        config.database.dbname = Some(dbname.clone());
    }
}

fn apply_snapshot_args(config: &mut Config, args: &cli::SnapshotArgs) {
    if let Some(url) = &args.mattermost.url {
        config.mattermost.url = Some(url.clone());
    }
    if let Some(login_id) = &args.mattermost.login_id {
        config.mattermost.login_id = Some(login_id.clone());
    }
    if let Some(password) = &args.mattermost.password {
        config.mattermost.password = Some(password.clone());
    }
    apply_database_args(config, &args.database);
    if let Some(delay) = args.api_delay_ms {
        config.collect.api_delay_ms = delay;
    }
    if let Some(page_size) = args.page_size {
        config.collect.page_size = page_size;
    }
    if let Some(batch_size) = args.batch_size {
        config.collect.batch_size = batch_size;
    }
}

async fn cmd_snapshot(cli: &Cli, args: &cli::SnapshotArgs) -> Result<()> {
    let mut config = load_config(cli);
    apply_snapshot_args(&mut config, args);

    info!("Starting Mattermost channel snapshot");

    // Provision before spending time on collection, so a broken schema
    // fails the run up front. The same connection carries the write phase.
    let mut conn = if args.dry_run {
        None
    } else {
        let mut conn: PgConnection = config
            .database
            .connect_options()?
            .connect()
            .await
            .context("Failed to connect to PostgreSQL")?;
        schema::provision(
            &mut conn,
            &SchemaConfig {
                compress_after_days: config.schema.compress_after_days,
            },
        )
        .await?;
        Some(conn)
    };

    let client = MattermostClient::login(&config.mattermost).await?;

    let opts = CollectOptions {
        page_size: config.collect.page_size,
        api_delay: config.collect.api_delay(),
    };
    let snapshot = collect_snapshot(&client, &opts).await?;
    let directory = resolve_directory(&client, &snapshot.user_ids, config.collect.api_delay()).await;

    let written = match conn.as_mut() {
        Some(conn) => {
            write_snapshot(
                conn,
                &snapshot.records,
                &directory,
                config.collect.batch_size,
            )
            .await?
        }
        None => 0,
    };

    if let Some(conn) = conn {
        conn.close().await.context("Failed to close connection")?;
    }
    client.logout().await;

    println!();
    println!("{}", "Snapshot complete!".bold().green());
    println!(
        "  Captured at: {}",
        snapshot.captured_at.format("%Y-%m-%d %H:%M:%S UTC").to_string().cyan()
    );
    println!(
        "  Records: {}  Unique users: {}",
        snapshot.records.len().to_string().cyan(),
        snapshot.user_ids.len().to_string().cyan()
    );
    if args.dry_run {
        println!("  {} dry run, nothing written", "-".dimmed());
    } else {
        println!("  Written: {}", written.to_string().cyan());
    }

    Ok(())
}

async fn cmd_provision(cli: &Cli, args: &cli::ProvisionArgs) -> Result<()> {
    let mut config = load_config(cli);
    apply_database_args(&mut config, &args.database);
    if let Some(days) = args.compress_after_days {
        config.schema.compress_after_days = days;
    }

    let mut conn: PgConnection = config
        .database
        .connect_options()?
        .connect()
        .await
        .context("Failed to connect to PostgreSQL")?;

    schema::provision(
        &mut conn,
        &SchemaConfig {
            compress_after_days: config.schema.compress_after_days,
        },
    )
    .await?;
    conn.close().await.context("Failed to close connection")?;

    println!(
        "{} Schema for '{}' provisioned.",
        "✓".green(),
        schema::TABLE
    );
    Ok(())
}

fn cmd_config(cli: &Cli, args: &cli::ConfigArgs) -> Result<()> {
    if args.init {
        let config = Config::default();
        let path = config.save()?;
        println!("{} Wrote default config to {}", "✓".green(), path.display());
        return Ok(());
    }

    if args.show {
        let config = load_config(cli);
        println!("{}", "Effective Configuration".bold().cyan());
        println!("{}", toml::to_string_pretty(&config.redacted())?);
    } else if let Some(path) = Config::user_config_path() {
        println!("Config file: {}", path.display());
        println!("Run {} to create it.", "chansnap config --init".bold());
    }
    Ok(())
}

fn cmd_completions(args: cli::CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "chansnap", &mut io::stdout());
    Ok(())
}
