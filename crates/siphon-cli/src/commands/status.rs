//! Status command - Display tracking status
//!
//! Provides the `siphon status` CLI command which shows:
//! 1. Where events come from (console URL, organization context)
//! 2. How many events are tracked and where the tracking file lives
//! 3. How many artifacts are on disk
//! 4. Whether credentials can be resolved (never the password itself)
//!
//! Nothing here talks to the console.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use siphon_core::config::Config;
use siphon_sync::tracking::SyncStateStore;
use tracing::info;

use super::auth::{credential_status, CredentialStatus};
use crate::output::{get_formatter, OutputFormat};

/// Status command options
#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let formatter = get_formatter(format);

        let config_exists = config_path.exists();
        let config = if config_exists {
            Config::load(config_path)?
        } else {
            Config::default()
        };
        info!(config_path = %config_path.display(), config_exists, "Showing status");

        let store = SyncStateStore::load(&config.storage.tracking_file).await?;
        let artifacts = count_artifacts(&config.storage.event_root);
        let organization = config
            .source
            .organization()
            .map(|o| o.to_string())
            .unwrap_or_else(|_| "(not set)".to_string());
        let credentials = credential_status(config.source.username.as_deref());

        if format.is_json() {
            let json = serde_json::json!({
                "config_path": config_path.display().to_string(),
                "config_exists": config_exists,
                "base_url": config.source.resolved_base_url(),
                "organization": organization,
                "tracking_file": config.storage.tracking_file.display().to_string(),
                "tracked": store.len(),
                "first_run": store.is_first_run(),
                "event_root": config.storage.event_root.display().to_string(),
                "artifacts": artifacts,
                "username": credentials.username(),
                "password": credentials.password_label(),
            });
            formatter.print_json(&json);
            return Ok(());
        }

        if config_exists {
            formatter.success(&format!("Configuration ({})", config_path.display()));
        } else {
            formatter.warn(&format!(
                "No configuration at {}; showing defaults",
                config_path.display()
            ));
        }
        formatter.field(
            "Console",
            config
                .source
                .resolved_base_url()
                .as_deref()
                .unwrap_or("(not set)"),
        );
        formatter.field("Organization", &organization);
        formatter.field("Tracking file", &config.storage.tracking_file.display().to_string());
        formatter.field(
            "Tracked",
            &if store.is_first_run() {
                "0 (first run)".to_string()
            } else {
                store.len().to_string()
            },
        );
        formatter.field("Event root", &config.storage.event_root.display().to_string());
        formatter.field("Artifacts", &artifacts.to_string());
        formatter.field("API user", credentials.username().unwrap_or("(not set)"));
        formatter.field("Password", credentials.password_label());

        if let CredentialStatus::KeyringError { error, .. } = &credentials {
            formatter.warn(&format!("Could not read keyring: {error}"));
        }

        Ok(())
    }
}

/// Counts `.json` artifacts directly under `root` and one directory below it
fn count_artifacts(root: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(root) else {
        return 0;
    };

    let mut count = 0;
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if path.is_dir() {
            if let Ok(nested) = std::fs::read_dir(&path) {
                count += nested
                    .filter_map(Result::ok)
                    .filter(|e| is_artifact(&e.path()))
                    .count();
            }
        } else if is_artifact(&path) {
            count += 1;
        }
    }
    count
}

fn is_artifact(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "json")
}
