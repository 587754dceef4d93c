mod commands;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::{Context, Result};
use calverge_core::config::CalvergeConfig;
use calverge_core::store::LocalStore;
use calverge_core::sync_config::SyncConfiguration;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "calverge")]
#[command(about = "Mirror future events from source calendars into one target calendar")]
struct Cli {
    /// Calendar directory (overrides calendar_dir from the config file)
    #[arg(long, global = true)]
    calendar_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available calendars
    Calendars,
    /// Copy future source events into the target calendar
    Sync(SyncArgs),
    /// Preview what a sync would do, without changing anything
    Status(SyncArgs),
}

#[derive(Args)]
struct SyncArgs {
    /// JSON sync configuration file
    #[arg(short, long, conflicts_with_all = ["target", "sources", "name", "mode", "include_details"])]
    config: Option<PathBuf>,

    /// Target calendar id
    #[arg(short, long, required_unless_present = "config")]
    target: Option<String>,

    /// Comma-separated source calendar ids
    #[arg(short, long, required_unless_present = "config")]
    sources: Option<String>,

    /// Sync mode: full or busy-only
    #[arg(short, long, default_value = "full")]
    mode: String,

    /// Copy notes, recurrence and alarms (full mode only)
    #[arg(long)]
    include_details: bool,

    /// Display name recorded in synced events
    #[arg(short, long)]
    name: Option<String>,
}

impl SyncArgs {
    fn into_configuration(self) -> Result<SyncConfiguration> {
        let config = match self.config {
            Some(path) => SyncConfiguration::from_json_file(&path)?,
            None => SyncConfiguration::from_args(
                self.name,
                self.target.as_deref().unwrap_or_default(),
                self.sources.as_deref().unwrap_or_default(),
                &self.mode,
                self.include_details,
            )?,
        };
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = CalvergeConfig::load().context("Failed to load calverge config")?;
    let calendar_dir = cli.calendar_dir.unwrap_or_else(|| config.data_path());
    let store = LocalStore::new(calendar_dir);

    match cli.command {
        Commands::Calendars => commands::calendars::run(&store, config.access_timeout()).await,
        Commands::Sync(args) => {
            let sync_config = args.into_configuration()?;
            commands::sync::run(&store, &sync_config, config.access_timeout()).await
        }
        Commands::Status(args) => {
            let sync_config = args.into_configuration()?;
            commands::status::run(&store, &sync_config, config.access_timeout()).await
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_conflicts_with_inline_sync_flags() {
        for flag in ["--mode=busy-only", "--include-details", "--target=t", "--name=n"] {
            let result = Cli::try_parse_from(["calverge", "sync", "--config", "sync.json", flag]);
            assert!(result.is_err(), "{flag} should conflict with --config");
        }
    }

    #[test]
    fn inline_sync_flags_parse() {
        let cli = Cli::try_parse_from([
            "calverge",
            "status",
            "--target",
            "personal",
            "--sources",
            "work,team",
            "--mode",
            "busy-only",
        ])
        .unwrap();

        let Commands::Status(args) = cli.command else {
            panic!("expected status command");
        };
        let config = args.into_configuration().unwrap();
        assert_eq!(config.source_calendar_ids, vec!["work", "team"]);
    }

    #[test]
    fn config_file_alone_parses() {
        let cli = Cli::try_parse_from(["calverge", "sync", "--config", "sync.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Sync(_)));
    }
}
