//! Siphon Client - Management console REST client
//!
//! Provides async client for:
//! - Listing events, optionally restricted to a last-seen time window
//! - Listing the raw data items of an event
//! - Listing the organizations visible to the API user
//! - Basic-auth credential lookup from the environment or the system keyring
//!
//! ## Modules
//!
//! - [`auth`] - Credential storage and lookup
//! - [`client`] - Console REST HTTP client
//! - [`provider`] - [`IEventSource`](siphon_core::ports::IEventSource) implementation

pub mod auth;
pub mod client;
pub mod provider;

pub use auth::{EnvOrKeyringCredentials, KeyringCredentialStore};
pub use client::{ClientOptions, ConsoleClient};
pub use provider::ConsoleEventSource;
