//! Configuration module for Siphon.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, saving, validation, defaults, and a builder pattern for
//! programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, OrganizationName};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Siphon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub polling: PollingConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    /// Write a configuration file with the effective settings when the daemon
    /// starts without one.
    pub persist_config: bool,
}

/// Management console connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Console name; expands to `https://<console>.console.ensilo.com/management-rest/`.
    pub console: Option<String>,
    /// Explicit REST base URL, overriding `console`.
    pub base_url: Option<String>,
    /// API user name (the password lives in the keyring).
    pub username: Option<String>,
    /// Organization to retrieve events for.
    pub organization_name: Option<String>,
    /// Fetch each event's raw data items and persist them alongside it.
    pub retrieve_sub_records: bool,
    /// Retrieve events from every organization instead of `organization_name`.
    pub retrieve_all_organizations: bool,
    /// Verify the console's TLS certificate.
    pub verify_tls: bool,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Poll loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Seconds to wait when a poll brought nothing new.
    pub idle_interval_secs: u64,
    /// Seconds to wait after a failed poll.
    pub backoff_interval_secs: u64,
    /// Consecutive failed polls after which the loop gives up.
    pub max_failures: u32,
}

/// Artifact and tracking file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory event artifacts are written to.
    pub event_root: PathBuf,
    /// File listing the ids of already persisted events.
    pub tracking_file: PathBuf,
    /// File artifacts under a per-organization subdirectory of `event_root`.
    pub separate_artifacts_per_organization: bool,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Log to this file instead of stderr.
    pub file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Config::load() / save()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration as YAML to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create configuration directory {}", parent.display())
                })?;
            }
        }
        let yaml = serde_yaml::to_string(self).context("Failed to serialize configuration")?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/siphon/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("siphon")
            .join("config.yaml")
    }
}

impl SourceConfig {
    /// REST base URL with a trailing slash, or `None` when neither
    /// `base_url` nor `console` is set.
    pub fn resolved_base_url(&self) -> Option<String> {
        let raw = match (&self.base_url, &self.console) {
            (Some(url), _) if !url.trim().is_empty() => url.trim().to_string(),
            (_, Some(console)) if !console.trim().is_empty() => format!(
                "https://{}.console.ensilo.com/management-rest/",
                console.trim()
            ),
            _ => return None,
        };
        if raw.ends_with('/') {
            Some(raw)
        } else {
            Some(format!("{raw}/"))
        }
    }

    /// Organization context requests are issued under
    ///
    /// The all-organizations wildcard when `retrieve_all_organizations` is
    /// set, otherwise the configured organization name.
    pub fn organization(&self) -> Result<OrganizationName, DomainError> {
        if self.retrieve_all_organizations {
            return Ok(OrganizationName::all());
        }
        match &self.organization_name {
            Some(name) => OrganizationName::new(name.clone()),
            None => Err(DomainError::InvalidOrganization(String::new())),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            polling: PollingConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            persist_config: true,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            console: None,
            base_url: None,
            username: None,
            organization_name: None,
            retrieve_sub_records: false,
            retrieve_all_organizations: false,
            verify_tls: true,
            timeout_secs: 30,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            idle_interval_secs: 60,
            backoff_interval_secs: 300,
            max_failures: 6,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            event_root: PathBuf::from("./events"),
            tracking_file: PathBuf::from("./tracking/tracking.txt"),
            separate_artifacts_per_organization: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"polling.max_failures"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- source ---
        if self.source.resolved_base_url().is_none() {
            errors.push(ValidationError {
                field: "source.console".into(),
                message: "either source.console or source.base_url must be set".into(),
            });
        }
        if let Some(url) = &self.source.base_url {
            let url = url.trim();
            if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(ValidationError {
                    field: "source.base_url".into(),
                    message: format!("must be an http(s) URL, got '{url}'"),
                });
            }
        }
        if let Some(console) = &self.source.console {
            if console.contains(['/', ':', ' ']) {
                errors.push(ValidationError {
                    field: "source.console".into(),
                    message: format!("'{console}' is not a bare console name"),
                });
            }
        }
        if self
            .source
            .username
            .as_deref()
            .map_or(true, |u| u.trim().is_empty())
        {
            errors.push(ValidationError {
                field: "source.username".into(),
                message: "must be set".into(),
            });
        }
        if self.source.organization().is_err() {
            errors.push(ValidationError {
                field: "source.organization_name".into(),
                message: "must be set unless source.retrieve_all_organizations is true".into(),
            });
        }
        if self.source.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "source.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- polling ---
        if self.polling.idle_interval_secs == 0 {
            errors.push(ValidationError {
                field: "polling.idle_interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.polling.backoff_interval_secs == 0 {
            errors.push(ValidationError {
                field: "polling.backoff_interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.polling.max_failures == 0 {
            errors.push(ValidationError {
                field: "polling.max_failures".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- storage ---
        if self.storage.event_root.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.event_root".into(),
                message: "must not be empty".into(),
            });
        }
        if self.storage.tracking_file.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.tracking_file".into(),
                message: "must not be empty".into(),
            });
        } else if self.storage.tracking_file.is_dir() {
            errors.push(ValidationError {
                field: "storage.tracking_file".into(),
                message: format!("is a directory: {}", self.storage.tracking_file.display()),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use siphon_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .source_console("acme")
///     .source_username("api_user")
///     .source_organization_name("Acme")
///     .polling_idle_interval_secs(30)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- source ---

    pub fn source_console(mut self, console: impl Into<String>) -> Self {
        self.config.source.console = Some(console.into());
        self
    }

    pub fn source_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.source.base_url = Some(url.into());
        self
    }

    pub fn source_username(mut self, username: impl Into<String>) -> Self {
        self.config.source.username = Some(username.into());
        self
    }

    pub fn source_organization_name(mut self, name: impl Into<String>) -> Self {
        self.config.source.organization_name = Some(name.into());
        self
    }

    pub fn source_retrieve_sub_records(mut self, enabled: bool) -> Self {
        self.config.source.retrieve_sub_records = enabled;
        self
    }

    pub fn source_retrieve_all_organizations(mut self, enabled: bool) -> Self {
        self.config.source.retrieve_all_organizations = enabled;
        self
    }

    pub fn source_verify_tls(mut self, verify: bool) -> Self {
        self.config.source.verify_tls = verify;
        self
    }

    pub fn source_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.source.timeout_secs = seconds;
        self
    }

    // --- polling ---

    pub fn polling_idle_interval_secs(mut self, seconds: u64) -> Self {
        self.config.polling.idle_interval_secs = seconds;
        self
    }

    pub fn polling_backoff_interval_secs(mut self, seconds: u64) -> Self {
        self.config.polling.backoff_interval_secs = seconds;
        self
    }

    pub fn polling_max_failures(mut self, n: u32) -> Self {
        self.config.polling.max_failures = n;
        self
    }

    // --- storage ---

    pub fn storage_event_root(mut self, path: PathBuf) -> Self {
        self.config.storage.event_root = path;
        self
    }

    pub fn storage_tracking_file(mut self, path: PathBuf) -> Self {
        self.config.storage.tracking_file = path;
        self
    }

    pub fn storage_separate_artifacts_per_organization(mut self, enabled: bool) -> Self {
        self.config.storage.separate_artifacts_per_organization = enabled;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_file(mut self, file: PathBuf) -> Self {
        self.config.logging.file = Some(file);
        self
    }

    pub fn persist_config(mut self, enabled: bool) -> Self {
        self.config.persist_config = enabled;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
