//! Integration tests for siphon-client
//!
//! Uses wiremock to simulate the management console REST API and verifies
//! end-to-end behavior of the ConsoleClient and ConsoleEventSource.

mod common;

mod test_events;
mod test_sub_records;
