//! Credential storage and lookup
//!
//! The console uses HTTP basic authentication. The password is kept in the
//! system keyring under the service name `siphon`, keyed by the API user
//! name; the `SIPHON_USERNAME` / `SIPHON_PASSWORD` environment variables
//! take precedence for unattended deployments.
//!
//! ## Components
//!
//! - [`KeyringCredentialStore`] - Secure password storage using the system keyring
//! - [`EnvOrKeyringCredentials`] - [`ICredentialProvider`] combining both sources

use anyhow::{Context, Result};
use tracing::{debug, info};

use siphon_core::ports::{Credentials, ICredentialProvider};

/// Keyring service name for storing passwords
const KEYRING_SERVICE: &str = "siphon";

/// Environment variable overriding the configured user name
pub const USERNAME_ENV: &str = "SIPHON_USERNAME";

/// Environment variable supplying the password
pub const PASSWORD_ENV: &str = "SIPHON_PASSWORD";

// ============================================================================
// KeyringCredentialStore
// ============================================================================

/// Stores and retrieves API passwords from the system keyring
///
/// Uses the `keyring` crate to store passwords in the OS credential store
/// (e.g., GNOME Keyring, KDE Wallet) with the service name "siphon" and the
/// API user name as the account.
pub struct KeyringCredentialStore;

impl KeyringCredentialStore {
    /// Stores a password in the system keyring
    ///
    /// # Arguments
    /// * `username` - API user name (used as keyring username)
    /// * `password` - Password to store
    pub fn store(username: &str, password: &str) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        entry
            .set_password(password)
            .context("Failed to store password in keyring")?;

        debug!(username, "Stored password in keyring");
        Ok(())
    }

    /// Loads a password from the system keyring
    ///
    /// # Returns
    /// `Some(password)` if found, `None` if no entry exists
    pub fn load(username: &str) -> Result<Option<String>> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        match entry.get_password() {
            Ok(password) => {
                debug!(username, "Loaded password from keyring");
                Ok(Some(password))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(username, "No password found in keyring");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    /// Removes a password from the system keyring
    ///
    /// Removing an entry that does not exist is not an error.
    pub fn clear(username: &str) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        match entry.delete_credential() {
            Ok(()) => {
                info!(username, "Cleared password from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!(username, "No password to clear");
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}

// ============================================================================
// EnvOrKeyringCredentials
// ============================================================================

/// Credential provider reading the environment first, then the keyring
#[derive(Debug, Clone)]
pub struct EnvOrKeyringCredentials {
    /// User name from the configuration file
    configured_username: Option<String>,
}

impl EnvOrKeyringCredentials {
    pub fn new(configured_username: Option<String>) -> Self {
        Self {
            configured_username,
        }
    }
}

impl ICredentialProvider for EnvOrKeyringCredentials {
    fn credentials(&self) -> Result<Credentials> {
        resolve_credentials(
            non_empty_env(USERNAME_ENV),
            non_empty_env(PASSWORD_ENV),
            self.configured_username.as_deref(),
            KeyringCredentialStore::load,
        )
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Combines the credential sources in precedence order
///
/// The user name comes from the environment, else the configuration. The
/// password comes from the environment, else the keyring entry for that
/// user name.
fn resolve_credentials<F>(
    env_username: Option<String>,
    env_password: Option<String>,
    configured_username: Option<&str>,
    keyring_lookup: F,
) -> Result<Credentials>
where
    F: FnOnce(&str) -> Result<Option<String>>,
{
    let username = env_username
        .or_else(|| {
            configured_username
                .filter(|u| !u.trim().is_empty())
                .map(str::to_string)
        })
        .with_context(|| {
            format!("No API user configured; set source.username or {USERNAME_ENV}")
        })?;

    if let Some(password) = env_password {
        debug!(username = %username, "Using password from environment");
        return Ok(Credentials::new(username, password));
    }

    let password = keyring_lookup(&username)?.with_context(|| {
        format!(
            "No password stored for '{username}'; run `siphon auth login` or set {PASSWORD_ENV}"
        )
    })?;

    Ok(Credentials::new(username, password))
}
