//! deltasync CLI - Command-line interface for the delta sync engine
//!
//! Provides commands for:
//! - Reading the head of an account's change log
//! - Pulling changes page by page from a cursor
//! - Following the streaming change log
//! - Viewing and validating configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    config::ConfigCommand, latest_cursor::LatestCursorCommand, pull::PullCommand,
    stream::StreamCommand, CommandContext,
};
use deltasync_core::config::Config;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "deltasync", version, about = "Follow an account's change log")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Access token for the account
    #[arg(long, global = true, env = "DELTASYNC_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Override the API base URL from the configuration
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the cursor at the head of the change log
    LatestCursor(LatestCursorCommand),
    /// Pull every change after a cursor through the paginated endpoint
    Pull(PullCommand),
    /// Follow the streaming endpoint until stopped
    Stream(StreamCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Picks the log level: `-v` flags win over the configured level
fn log_level(verbose: u8, configured: &str) -> &str {
    match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load_or_default(&config_path),
    };

    // Setup tracing
    let filter = log_level(cli.verbose, &config.logging.level);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    let ctx = CommandContext::new(config, config_path, cli.token, cli.base_url, format);

    match cli.command {
        Commands::LatestCursor(cmd) => cmd.execute(&ctx).await,
        Commands::Pull(cmd) => cmd.execute(&ctx).await,
        Commands::Stream(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
    }
}
