//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for event identifiers and
//! organization names. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Integer identifiers
// ============================================================================

/// Upstream identifier of a single event
///
/// Serialized as a bare integer so it round-trips through the upstream JSON
/// and the line-oriented tracking file unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    /// Create an EventId from its raw integer value
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw integer value
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| DomainError::InvalidEventId(s.to_string()))
    }
}

impl From<u64> for EventId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Upstream identifier of a sub-record (a raw data item of an event)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubRecordId(u64);

impl SubRecordId {
    /// Create a SubRecordId from its raw integer value
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw integer value
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl Display for SubRecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubRecordId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| DomainError::InvalidSubRecordId(s.to_string()))
    }
}

// ============================================================================
// OrganizationName
// ============================================================================

/// Name of an organization on the management console
///
/// Kept exactly as the user or upstream spelled it; use
/// [`sanitized`](OrganizationName::sanitized) whenever the name becomes
/// part of a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrganizationName(String);

impl OrganizationName {
    /// Upstream wildcard that selects events from every organization
    pub const ALL: &'static str = "All";

    /// Fallback path component when sanitization leaves nothing usable
    const UNKNOWN: &'static str = "unknown";

    /// Create a new OrganizationName
    ///
    /// # Errors
    /// Returns `DomainError::InvalidOrganization` if the name is empty or
    /// only whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::InvalidOrganization(name));
        }
        Ok(Self(name))
    }

    /// The wildcard organization used when retrieving from all organizations
    #[must_use]
    pub fn all() -> Self {
        Self(Self::ALL.to_string())
    }

    /// Whether this is the all-organizations wildcard
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.0 == Self::ALL
    }

    /// Get the name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a form of the name that is safe as a single path component
    ///
    /// Whitespace, path separators and any character outside
    /// `[A-Za-z0-9._-]` become `_`; `..` sequences are broken up so the
    /// result can never address a parent directory.
    #[must_use]
    pub fn sanitized(&self) -> String {
        let replaced: String = self
            .0
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        let replaced = replaced.replace("..", "__");

        if replaced.is_empty() || replaced.chars().all(|c| c == '.') {
            Self::UNKNOWN.to_string()
        } else {
            replaced
        }
    }
}

impl Display for OrganizationName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for OrganizationName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrganizationName> for String {
    fn from(value: OrganizationName) -> Self {
        value.0
    }
}

impl AsRef<str> for OrganizationName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
