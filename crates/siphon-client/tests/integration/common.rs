//! Shared test helpers for console API integration tests
//!
//! Provides wiremock-based mock server setup for the management console.
//! Each helper mounts the necessary mock endpoints and returns a client
//! pointing at the mock server.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use siphon_client::client::{ClientOptions, ConsoleClient};
use siphon_core::ports::Credentials;

pub const USERNAME: &str = "api_user";
pub const PASSWORD: &str = "s3cret";

/// Starts a mock console and returns a (MockServer, ConsoleClient) tuple.
pub async fn setup_console_mock() -> (MockServer, ConsoleClient) {
    let server = MockServer::start().await;
    let client = ConsoleClient::new(
        format!("{}/management-rest", server.uri()),
        Credentials::new(USERNAME, PASSWORD),
        ClientOptions::default(),
    )
    .expect("build client");
    (server, client)
}

/// Mounts the event listing endpoint returning `events` for any query.
pub async fn mount_list_events(server: &MockServer, events: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/management-rest/events/list-events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events))
        .mount(server)
        .await;
}

/// Mounts the raw data item endpoint returning `items` for any query.
pub async fn mount_list_raw_data_items(server: &MockServer, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/management-rest/events/list-raw-data-items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .mount(server)
        .await;
}

/// Expected `Authorization` header for the test credentials.
pub fn basic_auth_header() -> String {
    // base64("api_user:s3cret")
    "Basic YXBpX3VzZXI6czNjcmV0".to_string()
}
