//! CLI subcommands
//!
//! Shared helpers for commands that talk to the console live here.

pub mod auth;
pub mod completions;
pub mod config;
pub mod organizations;
pub mod status;
pub mod sync;

use std::path::Path;

use anyhow::{Context, Result};
use siphon_client::{ConsoleClient, EnvOrKeyringCredentials};
use siphon_core::config::Config;
use siphon_core::ports::ICredentialProvider;

/// Loads the configuration at `path` and rejects it if invalid
pub(crate) fn load_valid_config(path: &Path) -> Result<Config> {
    let config = Config::load(path).with_context(|| {
        format!(
            "No usable configuration at {}. Run 'siphon config set <key> <value>' to create one.",
            path.display()
        )
    })?;

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::bail!(
            "Invalid configuration ({}): {}",
            path.display(),
            details.join("; ")
        );
    }
    Ok(config)
}

/// Resolves credentials and builds a console client for `config`
pub(crate) fn connect(config: &Config) -> Result<ConsoleClient> {
    let credentials = EnvOrKeyringCredentials::new(config.source.username.clone())
        .credentials()
        .context("Failed to resolve console credentials")?;
    ConsoleClient::from_config(&config.source, credentials)
}
