//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! such as identifier validation and malformed time windows.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An event identifier could not be parsed or was out of range
    #[error("Invalid event ID: {0}")]
    InvalidEventId(String),

    /// A sub-record identifier could not be parsed or was out of range
    #[error("Invalid sub-record ID: {0}")]
    InvalidSubRecordId(String),

    /// Organization name is empty or unusable
    #[error("Invalid organization: {0}")]
    InvalidOrganization(String),

    /// A time window whose lower bound is after its upper bound
    #[error("Invalid time window: {from} is after {to}")]
    InvalidTimeWindow {
        /// Lower bound as rendered for the upstream filter
        from: String,
        /// Upper bound as rendered for the upstream filter
        to: String,
    },
}
