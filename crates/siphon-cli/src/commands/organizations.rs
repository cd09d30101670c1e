//! Organizations command - List organizations visible to the API user
//!
//! Useful for picking a value for `source.organization_name`. Only the
//! connection settings of the configuration need to be valid.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use siphon_core::config::Config;
use siphon_core::domain::OrganizationName;
use tracing::info;

use super::connect;
use crate::output::{get_formatter, plural, OutputFormat};

/// Organizations command options
#[derive(Debug, Args)]
pub struct OrganizationsCommand {}

impl OrganizationsCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let formatter = get_formatter(format);

        let config = Config::load(config_path)?;
        let client = connect(&config)?;
        info!(base_url = client.base_url(), "Listing organizations");

        let organizations = client
            .list_organizations()
            .await
            .context("Failed to list organizations")?;

        if format.is_json() {
            let json = serde_json::to_value(&organizations)
                .context("Failed to serialize organizations")?;
            formatter.print_json(&json);
            return Ok(());
        }

        formatter.success(&plural(organizations.len(), "organization"));
        for org in &organizations {
            let marker = if config.source.organization_name.as_deref() == Some(org.name.as_str())
            {
                "*"
            } else {
                " "
            };
            match OrganizationName::new(&org.name) {
                Ok(name) if name.sanitized() != org.name => formatter.info(&format!(
                    "{marker} {} (artifacts as {})",
                    org.name,
                    name.sanitized()
                )),
                _ => formatter.info(&format!("{marker} {}", org.name)),
            }
        }
        Ok(())
    }
}
