//! Siphon CLI - Command-line interface for Siphon
//!
//! Provides commands for:
//! - Storing console credentials in the keyring
//! - Running a sync cycle (or the full loop) in the foreground
//! - Listing the organizations visible to the API user
//! - Viewing tracking status
//! - Viewing and editing the configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use siphon_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    auth::AuthCommand, completions::CompletionsCommand, config::ConfigCommand,
    organizations::OrganizationsCommand, status::StatusCommand, sync::SyncCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "siphon",
    version,
    about = "Incremental event sync from a security management console"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true, env = "SIPHON_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage console credentials
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Poll the console and persist new events
    Sync(SyncCommand),
    /// List organizations visible to the API user
    Organizations(OrganizationsCommand),
    /// Show tracking status
    Status(StatusCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
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
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    match cli.command {
        Commands::Auth(cmd) => cmd.execute(format, &config_path).await,
        Commands::Sync(cmd) => cmd.execute(format, &config_path).await,
        Commands::Organizations(cmd) => cmd.execute(format, &config_path).await,
        Commands::Status(cmd) => cmd.execute(format, &config_path).await,
        Commands::Config(cmd) => cmd.execute(format, &config_path).await,
        Commands::Completions(cmd) => cmd.execute(format),
    }
}
