//! Config command - View and manage Siphon configuration
//!
//! Provides the `siphon config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use siphon_core::config::Config;
use tracing::info;

use crate::output::{get_formatter, OutputFormat};

/// Keys accepted by `siphon config set`, with a short description
const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("source.console", "Console name (https://<name>.console.ensilo.com)"),
    ("source.base_url", "Explicit REST base URL"),
    ("source.username", "API user name"),
    ("source.organization_name", "Organization context"),
    ("source.retrieve_sub_records", "true|false"),
    ("source.retrieve_all_organizations", "true|false"),
    ("source.verify_tls", "true|false"),
    ("source.timeout_secs", "HTTP timeout in seconds"),
    ("polling.idle_interval_secs", "Wait after a quiet poll"),
    ("polling.backoff_interval_secs", "Wait after a failed poll"),
    ("polling.max_failures", "Consecutive failures before giving up"),
    ("storage.event_root", "Artifact directory"),
    ("storage.tracking_file", "Tracking file path"),
    ("storage.separate_artifacts_per_organization", "true|false"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("logging.file", "Log file path (empty for stderr)"),
    ("persist_config", "true|false"),
];

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "polling.idle_interval_secs")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(format, config_path),
            ConfigCommand::Set { key, value } => {
                self.execute_set(key, value, format, config_path)
            }
            ConfigCommand::Validate => self.execute_validate(format, config_path),
        }
    }

    fn execute_show(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let formatter = get_formatter(format);

        let config = if config_path.exists() {
            Config::load(config_path)?
        } else {
            Config::default()
        };

        info!(config_path = %config_path.display(), "Showing configuration");

        if format.is_json() {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            if config_path.exists() {
                formatter.success(&format!("Configuration ({})", config_path.display()));
            } else {
                formatter.warn(&format!(
                    "No configuration at {}; showing defaults",
                    config_path.display()
                ));
            }
            formatter.info("");

            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(())
    }

    /// Sets a configuration value using dot-notation
    ///
    /// The file is created when missing. Only validation errors on the key
    /// being set block the write, so a configuration can be filled in one
    /// key at a time.
    fn execute_set(
        &self,
        key: &str,
        value: &str,
        format: OutputFormat,
        config_path: &Path,
    ) -> Result<()> {
        let formatter = get_formatter(format);

        let mut config = if config_path.exists() {
            Config::load(config_path)?
        } else {
            Config::default()
        };

        info!(key = %key, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if format.is_json() {
                let json = serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                });
                formatter.print_json(&json);
            } else {
                formatter.error(&format!("Failed to set '{}': {}", key, e));
                formatter.info("");
                formatter.info("Supported keys:");
                for (name, description) in SUPPORTED_KEYS {
                    formatter.info(&format!("  {name:<44} - {description}"));
                }
            }
            return Ok(());
        }

        let key_errors: Vec<String> = config
            .validate()
            .into_iter()
            .filter(|e| e.field == key)
            .map(|e| e.message)
            .collect();

        if !key_errors.is_empty() {
            if format.is_json() {
                let json = serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": key_errors,
                });
                formatter.print_json(&json);
            } else {
                formatter.error(&format!(
                    "Invalid value for '{}': {}",
                    key,
                    key_errors.join("; ")
                ));
            }
            return Ok(());
        }

        config.save(config_path)?;

        if format.is_json() {
            let json = serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": config_path.display().to_string(),
            });
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Set {} = {}", key, value));
            formatter.info(&format!("Saved to {}", config_path.display()));
        }

        Ok(())
    }

    fn execute_validate(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let formatter = get_formatter(format);

        if !config_path.exists() {
            if format.is_json() {
                let json = serde_json::json!({
                    "valid": false,
                    "config_path": config_path.display().to_string(),
                    "errors": ["Configuration file not found"],
                });
                formatter.print_json(&json);
            } else {
                formatter.error(&format!(
                    "Configuration file not found at {}",
                    config_path.display()
                ));
                formatter.info("Run 'siphon config set <key> <value>' to create one.");
            }
            return Ok(());
        }

        let config = match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                if format.is_json() {
                    let json = serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [format!("{e:#}")],
                    });
                    formatter.print_json(&json);
                } else {
                    formatter.error(&format!("{e:#}"));
                }
                return Ok(());
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");

        let errors = config.validate();

        if format.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            let json = serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            });
            formatter.print_json(&json);
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => anyhow::bail!("Expected true or false for {key}, got '{value}'"),
    }
}

/// Empty or `none` clears an optional value
fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- source ---
        "source.console" => config.source.console = optional(value),
        "source.base_url" => config.source.base_url = optional(value),
        "source.username" => config.source.username = optional(value),
        "source.organization_name" => config.source.organization_name = optional(value),
        "source.retrieve_sub_records" => {
            config.source.retrieve_sub_records = parse_bool(key, value)?;
        }
        "source.retrieve_all_organizations" => {
            config.source.retrieve_all_organizations = parse_bool(key, value)?;
        }
        "source.verify_tls" => config.source.verify_tls = parse_bool(key, value)?,
        "source.timeout_secs" => {
            config.source.timeout_secs = value
                .parse::<u64>()
                .context("Expected a positive integer for source.timeout_secs")?;
        }

        // --- polling ---
        "polling.idle_interval_secs" => {
            config.polling.idle_interval_secs = value
                .parse::<u64>()
                .context("Expected a positive integer for polling.idle_interval_secs")?;
        }
        "polling.backoff_interval_secs" => {
            config.polling.backoff_interval_secs = value
                .parse::<u64>()
                .context("Expected a positive integer for polling.backoff_interval_secs")?;
        }
        "polling.max_failures" => {
            config.polling.max_failures = value
                .parse::<u32>()
                .context("Expected a positive integer for polling.max_failures")?;
        }

        // --- storage ---
        "storage.event_root" => config.storage.event_root = PathBuf::from(value),
        "storage.tracking_file" => config.storage.tracking_file = PathBuf::from(value),
        "storage.separate_artifacts_per_organization" => {
            config.storage.separate_artifacts_per_organization = parse_bool(key, value)?;
        }

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),
        "logging.file" => config.logging.file = optional(value).map(PathBuf::from),

        "persist_config" => config.persist_config = parse_bool(key, value)?,

        _ => {
            anyhow::bail!("Unknown configuration key: '{}'", key);
        }
    }

    Ok(())
}
