//! Domain entities and business logic
//!
//! This module contains the core domain types for Siphon:
//! - Newtypes for event and sub-record identifiers and organization names
//! - Event, sub-record and organization entities
//! - Poll cycle state (windows, outcomes, run state)
//! - The delta computation between a poll and the persisted history
//! - Domain-specific error types

pub mod delta;
pub mod errors;
pub mod event;
pub mod newtypes;
pub mod poll;

// Re-export commonly used types
pub use delta::DeltaResult;
pub use errors::DomainError;
pub use event::{Event, Organization, SubRecord};
pub use newtypes::*;
pub use poll::{ControllerState, PollOutcome, SyncRunState, TimeWindow, UPSTREAM_TIME_FORMAT};
