//! Auth commands - Store, remove and inspect console credentials
//!
//! Provides the `siphon auth` CLI subcommands which:
//! 1. `login`  - Reads the API password, optionally verifies it against the
//!    console, and stores it in the system keyring.
//! 2. `logout` - Removes the stored password from the keyring.
//! 3. `status` - Shows which user name and password source would be used.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use siphon_client::auth::{PASSWORD_ENV, USERNAME_ENV};
use siphon_client::{ConsoleClient, KeyringCredentialStore};
use siphon_core::config::Config;
use siphon_core::ports::Credentials;
use tracing::info;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Store the API password in the system keyring
    Login {
        /// API user name (defaults to source.username)
        #[arg(long)]
        username: Option<String>,
        /// Check the credentials against the console before storing them
        #[arg(long)]
        verify: bool,
    },
    /// Remove the stored password
    Logout {
        /// API user name (defaults to source.username)
        #[arg(long)]
        username: Option<String>,
    },
    /// Check which credentials would be used
    Status,
}

impl AuthCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let fmt = get_formatter(format);
        let config = Config::load_or_default(config_path);

        match self {
            AuthCommand::Login { username, verify } => {
                let username = resolve_username(username.as_deref(), &config)?;
                self.execute_login(&username, *verify, &config, &*fmt).await
            }
            AuthCommand::Logout { username } => {
                let username = resolve_username(username.as_deref(), &config)?;
                self.execute_logout(&username, &*fmt)
            }
            AuthCommand::Status => self.execute_status(&config, &*fmt, format),
        }
    }

    /// Reads the password, optionally verifies it, and stores it
    async fn execute_login(
        &self,
        username: &str,
        verify: bool,
        config: &Config,
        fmt: &dyn OutputFormatter,
    ) -> Result<()> {
        let password = read_password(username)?;
        if password.is_empty() {
            anyhow::bail!("Empty password, nothing stored");
        }

        if verify {
            fmt.info("Verifying credentials against the console...");
            let client =
                ConsoleClient::from_config(&config.source, Credentials::new(username, &password))?;
            let organizations = client
                .list_organizations()
                .await
                .context("Console rejected the credentials")?;
            info!(count = organizations.len(), "Credentials verified");
        }

        KeyringCredentialStore::store(username, &password)
            .context("Failed to store password in keyring")?;

        fmt.success(&format!("Stored password for '{}' in the keyring", username));
        if config.source.username.as_deref() != Some(username) {
            fmt.info(&format!(
                "Run 'siphon config set source.username {}' to use it by default",
                username
            ));
        }
        Ok(())
    }

    fn execute_logout(&self, username: &str, fmt: &dyn OutputFormatter) -> Result<()> {
        info!(username, "Logging out");
        KeyringCredentialStore::clear(username)
            .context("Failed to clear password from keyring")?;
        fmt.success(&format!("Removed stored password for '{}'", username));
        Ok(())
    }

    fn execute_status(
        &self,
        config: &Config,
        fmt: &dyn OutputFormatter,
        format: OutputFormat,
    ) -> Result<()> {
        let status = credential_status(config.source.username.as_deref());

        if format.is_json() {
            let json = serde_json::json!({
                "username": status.username(),
                "password": status.password_label(),
                "ready": status.is_ready(),
            });
            fmt.print_json(&json);
            return Ok(());
        }

        if status.is_ready() {
            fmt.success("Credentials available");
        } else {
            fmt.warn("Credentials incomplete");
        }
        fmt.field("API user", status.username().unwrap_or("(not set)"));
        fmt.field("Password", status.password_label());

        match &status {
            CredentialStatus::NoUsername => fmt.info(&format!(
                "Set source.username or {USERNAME_ENV}, then run 'siphon auth login'"
            )),
            CredentialStatus::Missing { .. } => {
                fmt.info(&format!("Run 'siphon auth login' or set {PASSWORD_ENV}"))
            }
            CredentialStatus::KeyringError { error, .. } => {
                fmt.info(&format!("Keyring error: {error}"))
            }
            CredentialStatus::Environment { .. } | CredentialStatus::Keyring { .. } => {}
        }
        Ok(())
    }
}

// ============================================================================
// Credential status
// ============================================================================

/// Where the password for the effective user would come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
    /// No user name configured anywhere
    NoUsername,
    /// Password from the environment
    Environment { username: String },
    /// Password found in the keyring
    Keyring { username: String },
    /// No password in the environment or the keyring
    Missing { username: String },
    /// The keyring could not be queried
    KeyringError { username: String, error: String },
}

impl CredentialStatus {
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::NoUsername => None,
            Self::Environment { username }
            | Self::Keyring { username }
            | Self::Missing { username }
            | Self::KeyringError { username, .. } => Some(username),
        }
    }

    pub fn password_label(&self) -> &'static str {
        match self {
            Self::NoUsername | Self::Missing { .. } => "missing",
            Self::Environment { .. } => "environment",
            Self::Keyring { .. } => "keyring",
            Self::KeyringError { .. } => "keyring unavailable",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Environment { .. } | Self::Keyring { .. })
    }
}

/// Inspects the environment and keyring without revealing the password
pub fn credential_status(configured_username: Option<&str>) -> CredentialStatus {
    classify(
        non_empty_env(USERNAME_ENV),
        non_empty_env(PASSWORD_ENV).is_some(),
        configured_username,
        |user| KeyringCredentialStore::load(user).map(|p| p.is_some()),
    )
}

fn classify<F>(
    env_username: Option<String>,
    env_password: bool,
    configured_username: Option<&str>,
    keyring_has: F,
) -> CredentialStatus
where
    F: FnOnce(&str) -> Result<bool>,
{
    let Some(username) = env_username.or_else(|| {
        configured_username
            .filter(|u| !u.trim().is_empty())
            .map(str::to_string)
    }) else {
        return CredentialStatus::NoUsername;
    };

    if env_password {
        return CredentialStatus::Environment { username };
    }

    match keyring_has(&username) {
        Ok(true) => CredentialStatus::Keyring { username },
        Ok(false) => CredentialStatus::Missing { username },
        Err(e) => CredentialStatus::KeyringError {
            username,
            error: format!("{e:#}"),
        },
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// User name from the flag, else the environment, else the configuration
fn resolve_username(flag: Option<&str>, config: &Config) -> Result<String> {
    flag.map(str::to_string)
        .or_else(|| non_empty_env(USERNAME_ENV))
        .or_else(|| config.source.username.clone())
        .filter(|u| !u.trim().is_empty())
        .with_context(|| {
            format!("No API user given; pass --username or set source.username or {USERNAME_ENV}")
        })
}

/// Password from the environment, else one line of stdin
fn read_password(username: &str) -> Result<String> {
    if let Some(password) = non_empty_env(PASSWORD_ENV) {
        return Ok(password);
    }

    eprint!("Password for {username}: ");
    io::stderr().flush().ok();

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
