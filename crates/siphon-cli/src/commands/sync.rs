//! Sync command - Poll the console and persist new events
//!
//! Provides the `siphon sync` CLI command which:
//! 1. Loads and validates the configuration
//! 2. Resolves credentials from the environment or the keyring
//! 3. Wires the console client, artifact writer and tracking store
//! 4. Runs a single poll cycle, or the full loop with `--watch`

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use siphon_client::ConsoleEventSource;
use siphon_sync::engine::{CycleOutcome, PollController};
use siphon_sync::filesystem::ArtifactWriter;
use siphon_sync::tracking::SyncStateStore;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{connect, load_valid_config};
use crate::output::{get_formatter, plural, OutputFormat, OutputFormatter};

/// Sync command options
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Keep polling until interrupted (Ctrl+C) instead of running one cycle
    #[arg(long)]
    pub watch: bool,

    /// Override `source.retrieve_sub_records` for this run
    #[arg(long)]
    pub no_sub_records: bool,
}

impl SyncCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let formatter = get_formatter(format);

        let mut config = load_valid_config(config_path)?;
        if self.no_sub_records {
            config.source.retrieve_sub_records = false;
        }
        info!(config_path = %config_path.display(), "Loaded configuration");

        let client = connect(&config)?;
        let source = Arc::new(ConsoleEventSource::new(client));
        let artifacts = Arc::new(ArtifactWriter::from_config(&config.storage));
        let store = SyncStateStore::load(&config.storage.tracking_file)
            .await
            .context("Failed to load tracking file")?;

        let mut controller = PollController::from_config(&config, source, artifacts, store)?;

        if self.watch {
            formatter.info("Polling until interrupted (Ctrl+C to stop)...");
            let token = CancellationToken::new();
            let ctrl_c_token = token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c_token.cancel();
                }
            });

            controller.run(token).await?;
            formatter.success(&format!(
                "Stopped; {} tracked",
                plural(controller.store().len(), "event")
            ));
            return Ok(());
        }

        let outcome = controller.run_once().await;
        report_cycle(&outcome, controller.store().len(), &*formatter, format);

        if let CycleOutcome::SourceFailure { status, .. } = outcome {
            match status {
                Some(code) => anyhow::bail!("Event listing failed with HTTP {code}"),
                None => anyhow::bail!("Event listing failed: no usable response"),
            }
        }
        Ok(())
    }
}

/// Displays the result of one cycle
fn report_cycle(
    outcome: &CycleOutcome,
    tracked: usize,
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
) {
    if format.is_json() {
        formatter.print_json(&cycle_json(outcome, tracked));
        return;
    }

    match outcome {
        CycleOutcome::Idle { fetched } => {
            formatter.success("Already up to date");
            formatter.field("Listed", &plural(*fetched, "event"));
        }
        CycleOutcome::Processed(summary) => {
            if summary.failed == 0 {
                formatter.success(&format!(
                    "Persisted {}",
                    plural(summary.persisted, "new event")
                ));
            } else {
                formatter.warn(&format!(
                    "Persisted {} of {}",
                    summary.persisted,
                    plural(summary.new, "new event")
                ));
            }
            formatter.field("Listed", &plural(summary.fetched, "event"));
            if summary.sub_records > 0 {
                formatter.field("Raw data", &plural(summary.sub_records, "item"));
            }
            if summary.failed > 0 {
                formatter.error(&format!(
                    "{} will be retried on the next run:",
                    plural(summary.failed, "event")
                ));
                for err in &summary.errors {
                    formatter.info(&format!("  - {}", err));
                }
            }
        }
        CycleOutcome::SourceFailure { .. } => {}
    }
    formatter.field("Tracked", &tracked.to_string());
}

fn cycle_json(outcome: &CycleOutcome, tracked: usize) -> serde_json::Value {
    match outcome {
        CycleOutcome::Idle { fetched } => serde_json::json!({
            "result": "idle",
            "fetched": fetched,
            "tracked": tracked,
        }),
        CycleOutcome::Processed(summary) => serde_json::json!({
            "result": "processed",
            "fetched": summary.fetched,
            "new": summary.new,
            "persisted": summary.persisted,
            "skipped": summary.skipped,
            "failed": summary.failed,
            "sub_records": summary.sub_records,
            "errors": summary.errors,
            "tracked": tracked,
        }),
        CycleOutcome::SourceFailure { status, failures } => serde_json::json!({
            "result": "source_failure",
            "status": status,
            "failures": failures,
            "tracked": tracked,
        }),
    }
}
