mod commands;
mod config;

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use release_sync::Mode;

use crate::config::Overrides;

#[derive(Parser)]
#[command(name = "release-sync")]
#[command(about = "Download catalog PDFs that are missing locally from their GitHub releases")]
struct Cli {
    /// Run mode: `build` downloads missing assets, `dry` prints the commands instead
    mode: Option<String>,
    /// Config file (defaults to ./release-sync.toml, then the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory that relative data and asset paths resolve against
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Maximum number of downloads running at once
    #[arg(long)]
    batch_size: Option<NonZeroUsize>,
    /// Per-download time limit in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
    /// Download every cataloged asset, overwriting files already present
    #[arg(long)]
    force: bool,
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(verbose: u8, format: LogFormat) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // stdout carries the command echo, so logs go to stderr.
    match format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let mode = match cli.mode.as_deref() {
        Some(arg) => match Mode::parse(arg) {
            Some(mode) => mode,
            None => bail!("invalid build command '{arg}' (expected `build` or `dry`)"),
        },
        None => bail!("missing build command (expected `build` or `dry`)"),
    };

    let app_config = config::load_config(cli.config.as_deref(), &cli.root)?;
    let settings = app_config.resolve(
        &cli.root,
        Overrides {
            batch_size: cli.batch_size,
            timeout_secs: cli.timeout,
            force: cli.force,
        },
    )?;

    tracing::debug!(?settings, mode = mode.as_str(), "resolved settings");

    commands::sync::run(&settings, mode).await?;
    Ok(())
}
