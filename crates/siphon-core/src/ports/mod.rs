//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the sync engine
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IEventSource`] - Remote management console (events, raw data items, organizations)
//! - [`IArtifactStore`] - Persistence of retrieved events as artifacts
//! - [`ICredentialProvider`] - Basic-auth credential lookup

pub mod artifact_store;
pub mod credentials;
pub mod event_source;

pub use artifact_store::IArtifactStore;
pub use credentials::{Credentials, ICredentialProvider};
pub use event_source::{IEventSource, SourceError};
