//! Siphon Core - Domain logic and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Event`, `SubRecord`, `Organization`, identifier newtypes
//! - **Sync state** - `PollOutcome`, `DeltaResult`, `TimeWindow`, `SyncRunState`
//! - **Port definitions** - Traits for adapters: `IEventSource`, `IArtifactStore`, `ICredentialProvider`
//! - **Configuration** - YAML configuration with defaults and validation
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.

pub mod config;
pub mod domain;
pub mod ports;
