//! `tether` - check and watch database connections from a settings file

mod commands;
mod logging;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tether_connection::{ResolvedDatabase, Settings, default_settings_path};

use crate::logging::{LogFormat, LoggingConfig};

#[derive(Parser)]
#[command(
    name = "tether",
    about = "Resilient database connections: check, watch and inspect",
    version,
    propagate_version = true
)]
struct Cli {
    /// Settings file (TOML, or JSON with a .json extension)
    #[arg(short, long, env = "TETHER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Console log format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    /// Also write JSON logs to the log directory
    #[arg(long, global = true)]
    log_file: bool,

    /// Debug output from every tether crate
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to each database once and print its health
    Check {
        /// Only check these aliases
        #[arg(short, long)]
        alias: Vec<String>,
    },
    /// Keep connections validated and report outages until Ctrl-C
    Watch {
        /// Seconds between validations
        #[arg(short, long, default_value_t = 10)]
        interval_secs: u64,

        /// Only watch these aliases
        #[arg(short, long)]
        alias: Vec<String>,
    },
    /// Print the resolved settings with passwords redacted
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    };
    let _log_guard = logging::init(
        logging
            .with_console_format(cli.log_format)
            .with_file_logs(cli.log_file),
    )?;

    let path = match cli.config {
        Some(path) => path,
        None => default_settings_path().context("Could not determine the config directory")?,
    };
    let databases = load_databases(&path)?;

    match cli.command {
        Commands::Check { alias } => {
            let databases = select(databases, &alias)?;
            if !commands::check(databases).await? {
                std::process::exit(1);
            }
        }
        Commands::Watch {
            interval_secs,
            alias,
        } => {
            let databases = select(databases, &alias)?;
            commands::watch(databases, Duration::from_secs(interval_secs.max(1))).await?;
        }
        Commands::ShowConfig => commands::show_config(&databases)?,
    }

    Ok(())
}

fn load_databases(path: &std::path::Path) -> Result<Vec<ResolvedDatabase>> {
    let settings = Settings::load(path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    let databases = settings.resolve().context("Invalid database settings")?;
    if databases.is_empty() {
        bail!("No databases configured in {}", path.display());
    }
    tracing::debug!(path = %path.display(), databases = databases.len(), "Settings loaded");
    Ok(databases)
}

/// Keep only the requested aliases; an empty selection keeps everything.
fn select(databases: Vec<ResolvedDatabase>, aliases: &[String]) -> Result<Vec<ResolvedDatabase>> {
    if aliases.is_empty() {
        return Ok(databases);
    }
    if let Some(missing) = aliases
        .iter()
        .find(|alias| !databases.iter().any(|db| &db.config.alias == *alias))
    {
        bail!("Unknown alias '{}'", missing);
    }
    Ok(databases
        .into_iter()
        .filter(|db| aliases.contains(&db.config.alias))
        .collect())
}
