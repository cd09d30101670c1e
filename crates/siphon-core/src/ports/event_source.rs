//! Event source port (driven/secondary port)
//!
//! This module defines the interface to the remote management console that
//! reports security events. The production implementation lives in
//! `siphon-client` and talks to the console's REST API.
//!
//! ## Design Notes
//!
//! - Unlike the other ports this one returns a typed [`SourceError`]: the
//!   poll controller needs the HTTP status of a failed listing to classify
//!   the poll, which an `anyhow::Error` would hide.
//! - Every call is scoped to an organization. Passing
//!   [`OrganizationName::all`] selects events from every organization.

use thiserror::Error;

use crate::domain::{Event, EventId, Organization, OrganizationName, SubRecord, TimeWindow};

// ============================================================================
// SourceError
// ============================================================================

/// Errors reported by an event source
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source answered with a non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Http {
        /// Response status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// No response was received (connection refused, timeout, TLS failure)
    #[error("Transport error: {0}")]
    Transport(String),

    /// A response was received but could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl SourceError {
    /// HTTP status of the failed response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(_) | Self::InvalidResponse(_) => None,
        }
    }
}

// ============================================================================
// IEventSource trait
// ============================================================================

/// Port trait for the remote event source
#[async_trait::async_trait]
pub trait IEventSource: Send + Sync {
    /// Lists events for an organization
    ///
    /// # Arguments
    /// * `window` - Restrict to events last seen within this window; `None`
    ///   requests the full backlog
    /// * `organization` - Organization context of the request
    ///
    /// # Returns
    /// The events in upstream order (possibly empty)
    async fn list_events(
        &self,
        window: Option<&TimeWindow>,
        organization: &OrganizationName,
    ) -> Result<Vec<Event>, SourceError>;

    /// Lists the raw data items (sub-records) of one event
    ///
    /// # Arguments
    /// * `event_id` - Parent event
    /// * `organization` - Organization context of the request
    async fn list_sub_records(
        &self,
        event_id: EventId,
        organization: &OrganizationName,
    ) -> Result<Vec<SubRecord>, SourceError>;

    /// Lists the organizations visible to the configured credentials
    async fn list_organizations(&self) -> Result<Vec<Organization>, SourceError>;
}
