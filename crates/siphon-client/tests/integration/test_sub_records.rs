//! Integration tests for the raw data item endpoint

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use siphon_core::domain::{EventId, OrganizationName, SubRecordId};
use siphon_core::ports::SourceError;

use crate::common;

#[tokio::test]
async fn test_list_sub_records_sends_event_and_organization() {
    let (server, client) = common::setup_console_mock().await;

    Mock::given(method("GET"))
        .and(path("/management-rest/events/list-raw-data-items"))
        .and(query_param("eventId", "4412"))
        .and(query_param("organization", "Acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"EventId": 4412, "RawEventId": 900001, "Destination": "10.0.0.5"},
            {"EventId": 4412, "RawEventId": 900002, "Destination": "10.0.0.6"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let records = client
        .list_sub_records(EventId::new(4412), &OrganizationName::new("Acme").unwrap())
        .await
        .expect("list raw data items");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, SubRecordId::new(900001));
    assert_eq!(records[0].event_id, Some(EventId::new(4412)));
    assert_eq!(records[1].payload["Destination"], "10.0.0.6");
}

#[tokio::test]
async fn test_list_sub_records_empty() {
    let (server, client) = common::setup_console_mock().await;
    common::mount_list_raw_data_items(&server, json!([])).await;

    let records = client
        .list_sub_records(EventId::new(1), &OrganizationName::all())
        .await
        .expect("list raw data items");
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_list_sub_records_server_error() {
    let (server, client) = common::setup_console_mock().await;

    Mock::given(method("GET"))
        .and(path("/management-rest/events/list-raw-data-items"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client
        .list_sub_records(EventId::new(1), &OrganizationName::all())
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Http { status: 500, .. }));
}
