//! Siphon Daemon - Background event synchronization service
//!
//! This binary runs unattended (typically as a systemd service) and:
//! - Loads and validates the YAML configuration
//! - Resolves console credentials from the environment or the keyring
//! - Runs the poll controller until shutdown or the failure threshold
//! - Shuts down gracefully on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon wires the console client, the artifact writer and the
//! tracking store into a `PollController` and hands it a
//! `CancellationToken` that is triggered on receipt of SIGTERM or SIGINT.
//! Reaching the consecutive failure threshold ends the process with a
//! non-zero exit status so a supervisor can restart or alert.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use siphon_client::{ConsoleClient, ConsoleEventSource, EnvOrKeyringCredentials};
use siphon_core::config::{Config, LoggingConfig};
use siphon_core::ports::ICredentialProvider;
use siphon_sync::{engine::PollController, filesystem::ArtifactWriter, tracking::SyncStateStore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the configuration file location
const CONFIG_ENV: &str = "SIPHON_CONFIG";

// ============================================================================
// DaemonService
// ============================================================================

/// Main daemon service that wires and runs the sync loop
struct DaemonService {
    /// Validated application configuration
    config: Config,
    /// Token for signalling graceful shutdown
    shutdown: CancellationToken,
}

impl DaemonService {
    fn new(config: Config, shutdown: CancellationToken) -> Self {
        Self { config, shutdown }
    }

    /// Runs the daemon until shutdown
    ///
    /// 1. Resolves credentials
    /// 2. Creates the console client and artifact writer
    /// 3. Loads the tracking store
    /// 4. Runs the poll controller
    async fn run(&self) -> Result<()> {
        let credentials = EnvOrKeyringCredentials::new(self.config.source.username.clone())
            .credentials()
            .context("Failed to resolve console credentials")?;

        let client = ConsoleClient::from_config(&self.config.source, credentials)
            .context("Failed to create console client")?;
        info!(
            base_url = client.base_url(),
            username = client.username(),
            "Console client ready"
        );

        let source = Arc::new(ConsoleEventSource::new(client));
        let artifacts = Arc::new(ArtifactWriter::from_config(&self.config.storage));

        let store = SyncStateStore::load(&self.config.storage.tracking_file)
            .await
            .context("Failed to load tracking file")?;

        let mut controller = PollController::from_config(&self.config, source, artifacts, store)?;

        controller.run(self.shutdown.clone()).await?;

        info!(
            tracked = controller.store().len(),
            "Sync loop terminated"
        );
        Ok(())
    }
}

// ============================================================================
// Startup helpers
// ============================================================================

/// Configuration file location: `$SIPHON_CONFIG` or the platform default
fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path)
}

/// Loads and validates the configuration at `path`
///
/// A missing file yields the defaults; when `persist_config` is set those
/// defaults are written back so the operator has a file to edit. A file
/// that exists but cannot be parsed is an error.
fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        Config::load(path)?
    } else {
        let config = Config::default();
        if config.persist_config {
            config
                .save(path)
                .context("Failed to persist default configuration")?;
        }
        config
    };

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::bail!(
            "Invalid configuration in {}:\n  {}",
            path.display(),
            details.join("\n  ")
        );
    }

    Ok(config)
}

/// Filter from `RUST_LOG`, else the configured level
fn build_env_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
}

/// Installs the global subscriber, writing to `logging.file` when set
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = build_env_filter(logging);

    match &logging.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create log directory {}", parent.display())
                    })?;
                }
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }

    Ok(())
}

// ============================================================================
// Signal handling
// ============================================================================

/// Waits for SIGINT or SIGTERM and cancels `token`
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let path = config_path();
    let config = load_config(&path)?;

    init_logging(&config.logging)?;
    info!(config_path = %path.display(), "Siphon daemon starting (siphond)");

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, shutdown_token);
    let result = service.run().await;

    match &result {
        Ok(()) => info!("Siphon daemon shut down gracefully"),
        Err(e) => {
            let err_msg = format!("{e:#}");
            error!(error = %err_msg, "Siphon daemon exiting with error");
        }
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
