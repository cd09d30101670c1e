//! Integration tests for the event listing endpoint
//!
//! Verifies query construction with and without a time window, the basic
//! auth header, and the mapping of failures onto SourceError.

use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use siphon_client::provider::ConsoleEventSource;
use siphon_core::domain::{EventId, OrganizationName, TimeWindow};
use siphon_core::ports::{IEventSource, SourceError};

use crate::common;

fn acme() -> OrganizationName {
    OrganizationName::new("Acme Corp").unwrap()
}

#[tokio::test]
async fn test_list_events_without_window() {
    let (server, client) = common::setup_console_mock().await;

    Mock::given(method("GET"))
        .and(path("/management-rest/events/list-events"))
        .and(query_param("organization", "Acme Corp"))
        .and(header("authorization", common::basic_auth_header().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"eventId": 101, "lastSeen": "2024-05-01 08:59:00", "process": "a.exe"},
            {"eventId": 102, "lastSeen": "2024-05-01 09:00:00", "process": "b.exe"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let events = client.list_events(None, &acme()).await.expect("list events");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].id, EventId::new(101));
    assert_eq!(events[1].payload["process"], "b.exe");

    let requests = server.received_requests().await.unwrap();
    let url = requests[0].url.clone();
    assert!(url.query_pairs().all(|(k, _)| k != "lastSeenFrom" && k != "lastSeenTo"));
}

#[tokio::test]
async fn test_list_events_with_window_sends_both_bounds() {
    let (server, client) = common::setup_console_mock().await;

    Mock::given(method("GET"))
        .and(path("/management-rest/events/list-events"))
        .and(query_param("lastSeenFrom", "2024-05-01 09:00:00"))
        .and(query_param("lastSeenTo", "2024-05-01 09:01:00"))
        .and(query_param("organization", "All"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let window = TimeWindow::new(
        day.and_hms_opt(9, 0, 0).unwrap(),
        day.and_hms_opt(9, 1, 0).unwrap(),
    )
    .unwrap();

    let events = client
        .list_events(Some(&window), &OrganizationName::all())
        .await
        .expect("list events");
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_blank_body_is_an_empty_batch() {
    let (server, client) = common::setup_console_mock().await;

    Mock::given(method("GET"))
        .and(path("/management-rest/events/list-events"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  \n"))
        .mount(&server)
        .await;

    let events = client.list_events(None, &acme()).await.expect("list events");
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_error_status_maps_to_http_error() {
    let (server, client) = common::setup_console_mock().await;

    Mock::given(method("GET"))
        .and(path("/management-rest/events/list-events"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client.list_events(None, &acme()).await.unwrap_err();
    assert_eq!(
        err,
        SourceError::Http {
            status: 503,
            body: "maintenance".to_string()
        }
    );
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn test_unauthorized_maps_to_http_error() {
    let (server, client) = common::setup_console_mock().await;

    Mock::given(method("GET"))
        .and(path("/management-rest/events/list-events"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.list_events(None, &acme()).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn test_malformed_body_maps_to_invalid_response() {
    let (server, client) = common::setup_console_mock().await;

    Mock::given(method("GET"))
        .and(path("/management-rest/events/list-events"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = client.list_events(None, &acme()).await.unwrap_err();
    assert!(matches!(err, SourceError::InvalidResponse(_)));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_unreachable_server_maps_to_transport_error() {
    let (server, client) = common::setup_console_mock().await;
    drop(server);

    let err = client.list_events(None, &acme()).await.unwrap_err();
    assert!(matches!(err, SourceError::Transport(_)));
}

#[tokio::test]
async fn test_event_source_port_delegates_to_client() {
    let (server, client) = common::setup_console_mock().await;
    common::mount_list_events(&server, json!([{"eventId": 7}])).await;

    let source = ConsoleEventSource::new(client);
    let events = source.list_events(None, &acme()).await.expect("list events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, EventId::new(7));
}
