//! Controllers assembled from application configuration

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use siphon_core::config::{Config, ConfigBuilder};
use siphon_core::domain::DomainError;
use siphon_sync::engine::{CycleOutcome, PollController};
use siphon_sync::filesystem::ArtifactWriter;
use siphon_sync::tracking::SyncStateStore;
use siphon_sync::SyncError;

use crate::common::*;

fn base(dir: &Path) -> ConfigBuilder {
    ConfigBuilder::new()
        .source_console("acme")
        .source_username("api_user")
        .storage_event_root(dir.join("events"))
        .storage_tracking_file(dir.join("state").join("tracking.txt"))
}

fn build(config: &Config, source: Arc<ScriptedSource>) -> Result<PollController, SyncError> {
    PollController::from_config(
        config,
        source,
        Arc::new(ArtifactWriter::from_config(&config.storage)),
        SyncStateStore::empty(&config.storage.tracking_file),
    )
}

#[tokio::test]
async fn test_configured_controller_persists_events() {
    let dir = tempfile::tempdir().unwrap();
    let config = base(dir.path())
        .source_organization_name("Acme")
        .source_retrieve_sub_records(false)
        .polling_idle_interval_secs(5)
        .polling_backoff_interval_secs(10)
        .polling_max_failures(2)
        .build_validated()
        .unwrap();

    let source = ScriptedSource::new(vec![Ok(events(&[7, 8]))]);
    let mut controller = build(&config, source.clone()).unwrap().with_clock(noon);

    assert_eq!(controller.settings().idle_interval, Duration::from_secs(5));
    assert_eq!(controller.settings().backoff_interval, Duration::from_secs(10));
    assert_eq!(controller.settings().max_failures, 2);

    let CycleOutcome::Processed(summary) = controller.run_once().await else {
        panic!("expected a processed cycle");
    };
    assert_eq!(summary.persisted, 2);
    assert_eq!(summary.sub_records, 0);
    assert!(source.sub_record_calls.lock().unwrap().is_empty());
    assert_eq!(*source.organizations.lock().unwrap(), vec!["Acme".to_string()]);

    let reloaded = SyncStateStore::load(&config.storage.tracking_file)
        .await
        .unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(artifact_names(&config.storage.event_root).len(), 2);
}

#[tokio::test]
async fn test_all_organizations_needs_no_name() {
    let dir = tempfile::tempdir().unwrap();
    let config = base(dir.path())
        .source_retrieve_all_organizations(true)
        .build_validated()
        .unwrap();

    assert!(build(&config, ScriptedSource::new(Vec::new())).is_ok());
}

#[test]
fn test_missing_organization_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = base(dir.path()).build();

    let result = build(&config, ScriptedSource::new(Vec::new()));
    assert!(matches!(result, Err(SyncError::Config(_))));
}

#[test]
fn test_blank_organization_is_a_domain_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = base(dir.path()).source_organization_name("   ").build();

    let result = build(&config, ScriptedSource::new(Vec::new()));
    assert!(matches!(
        result,
        Err(SyncError::Domain(DomainError::InvalidOrganization(_)))
    ));
}
