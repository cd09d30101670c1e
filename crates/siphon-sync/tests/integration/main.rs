//! Integration tests for siphon-sync
//!
//! Drive the poll controller against a scripted event source, a real
//! tracking file and real artifact files in a temporary directory.

mod common;

mod test_config;
mod test_failures;
mod test_incremental;
mod test_shutdown;
