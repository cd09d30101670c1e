//! Siphon Sync - Incremental event synchronization engine
//!
//! Provides:
//! - Durable tracking of already persisted event ids
//! - Delta-driven fetch-and-persist of new events
//! - A poll loop with fixed backoff and a failure threshold
//!
//! ## Modules
//!
//! - [`tracking`] - Append-only store of persisted event ids
//! - [`filesystem`] - Atomic artifact writer (JSON files per event and raw data item)
//! - [`pipeline`] - Per-event enrichment and persistence
//! - [`engine`] - Poll/retry controller driving the loop

pub mod engine;
pub mod filesystem;
pub mod pipeline;
pub mod tracking;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// The tracking file could not be read or appended to
    #[error("Tracking file {}: {source}", .path.display())]
    Tracking {
        /// Path of the tracking file
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Too many consecutive polls failed; the loop has stopped
    #[error(
        "Giving up after {failures} consecutive failed polls (last status: {})",
        status_label(.last_status)
    )]
    FailureThresholdReached {
        /// Number of consecutive failures
        failures: u32,
        /// HTTP status of the last failed poll, if one was received
        last_status: Option<u16>,
    },

    /// The configuration cannot drive a sync run
    #[error("Configuration error: {0}")]
    Config(String),

    /// A domain-level error propagated from siphon-core
    #[error("Domain error: {0}")]
    Domain(#[from] siphon_core::domain::DomainError),
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no response".to_string(),
    }
}
