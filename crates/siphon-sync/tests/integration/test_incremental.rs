//! Delta-driven persistence across polls

use std::sync::{Arc, Mutex};

use chrono::Duration;

use siphon_core::domain::EventId;
use siphon_sync::engine::CycleOutcome;
use siphon_sync::filesystem::ArtifactWriter;

use crate::common::*;

#[tokio::test]
async fn test_only_new_ids_are_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("events");
    let store = tracking_with(dir.path(), &[1, 2, 3]).await;

    let source = ScriptedSource::new(vec![Ok(events(&[2, 3, 4]))]);
    let artifacts = Arc::new(ArtifactWriter::new(&root, false));
    let mut controller = controller(source.clone(), artifacts, store, true, 6);

    let CycleOutcome::Processed(summary) = controller.run_once().await else {
        panic!("expected a processed cycle");
    };
    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.new, 1);
    assert_eq!(summary.persisted, 1);
    assert_eq!(summary.sub_records, 1);

    assert_eq!(
        source.sub_record_calls.lock().unwrap().as_slice(),
        &[EventId::new(4)]
    );
    assert_eq!(
        artifact_names(&root),
        vec!["Acme-event_4-sub_400.json", "Acme-event_4.json"]
    );

    let tracking = std::fs::read_to_string(dir.path().join("tracking.txt")).unwrap();
    assert_eq!(tracking, "1\n2\n3\n4\n");
    assert!(controller.store().contains(EventId::new(4)));
}

#[tokio::test]
async fn test_tracked_event_is_not_fetched_again() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("events");
    let store = tracking_with(dir.path(), &[7]).await;

    let source = ScriptedSource::new(vec![Ok(events(&[7]))]);
    let artifacts = Arc::new(ArtifactWriter::new(&root, false));
    let mut controller = controller(source.clone(), artifacts, store, true, 6);

    let outcome = controller.run_once().await;

    assert_eq!(outcome, CycleOutcome::Idle { fetched: 1 });
    assert!(source.sub_record_calls.lock().unwrap().is_empty());
    assert!(artifact_names(&root).is_empty());
}

#[tokio::test]
async fn test_duplicate_ids_in_batch_are_processed_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = tracking_with(dir.path(), &[]).await;

    let source = ScriptedSource::new(vec![Ok(events(&[5, 5, 6]))]);
    let artifacts = Arc::new(ArtifactWriter::new(dir.path().join("events"), false));
    let mut controller = controller(source.clone(), artifacts, store, false, 6);

    let CycleOutcome::Processed(summary) = controller.run_once().await else {
        panic!("expected a processed cycle");
    };
    assert_eq!(summary.new, 2);
    assert_eq!(summary.persisted, 2);

    let tracking = std::fs::read_to_string(dir.path().join("tracking.txt")).unwrap();
    assert_eq!(tracking, "5\n6\n");
}

#[tokio::test]
async fn test_failed_write_is_retried_on_next_poll() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("events");
    let store = tracking_with(dir.path(), &[]).await;

    let source = ScriptedSource::new(vec![Ok(events(&[9])), Ok(events(&[9]))]);
    let artifacts = FlakyArtifacts::new(&root, [9]);
    let mut controller = controller(source.clone(), artifacts.clone(), store, false, 6);

    let CycleOutcome::Processed(first) = controller.run_once().await else {
        panic!("expected a processed cycle");
    };
    assert_eq!(first.failed, 1);
    assert!(first.all_failed());
    assert!(first.errors[0].contains("disk full"));
    assert!(!controller.store().contains(EventId::new(9)));
    assert!(controller.run_state().last_successful_poll().is_none());

    artifacts.heal();

    let CycleOutcome::Processed(second) = controller.run_once().await else {
        panic!("expected a processed cycle");
    };
    assert_eq!(second.persisted, 1);
    assert!(controller.store().contains(EventId::new(9)));
    assert_eq!(artifact_names(&root), vec!["Acme-event_9.json"]);

    // The failed cycle did not advance the window, so both polls asked for the backlog.
    assert_eq!(source.windows.lock().unwrap().as_slice(), &[None, None]);
}

#[tokio::test]
async fn test_window_starts_at_last_successful_poll() {
    let dir = tempfile::tempdir().unwrap();
    let store = tracking_with(dir.path(), &[]).await;

    let now = Arc::new(Mutex::new(noon()));
    let clock = {
        let now = Arc::clone(&now);
        move || *now.lock().unwrap()
    };

    let source = ScriptedSource::new(vec![Ok(events(&[1])), Ok(Vec::new())]);
    let artifacts = Arc::new(ArtifactWriter::new(dir.path().join("events"), false));
    let mut controller = controller(source.clone(), artifacts, store, false, 6).with_clock(clock);

    controller.run_once().await;
    assert_eq!(controller.run_state().last_successful_poll(), Some(noon()));
    assert!(!controller.run_state().is_first_run());

    let later = noon() + Duration::minutes(5);
    *now.lock().unwrap() = later;
    assert_eq!(controller.run_once().await, CycleOutcome::Idle { fetched: 0 });

    let windows = source.windows.lock().unwrap();
    assert_eq!(windows.len(), 2);
    assert!(windows[0].is_none());
    let window = windows[1].expect("second poll carries a window");
    assert_eq!(window.from(), noon());
    assert_eq!(window.to(), later);
    assert_eq!(controller.run_state().last_successful_poll(), Some(later));
}

#[tokio::test]
async fn test_clock_going_backwards_requests_backlog() {
    let dir = tempfile::tempdir().unwrap();
    let store = tracking_with(dir.path(), &[]).await;

    let now = Arc::new(Mutex::new(noon()));
    let clock = {
        let now = Arc::clone(&now);
        move || *now.lock().unwrap()
    };

    let source = ScriptedSource::new(Vec::new());
    let artifacts = Arc::new(ArtifactWriter::new(dir.path().join("events"), false));
    let mut controller = controller(source.clone(), artifacts, store, false, 6).with_clock(clock);

    controller.run_once().await;
    *now.lock().unwrap() = noon() - Duration::hours(1);
    controller.run_once().await;

    assert_eq!(source.windows.lock().unwrap().as_slice(), &[None, None]);
}

#[tokio::test]
async fn test_listing_uses_organization_context() {
    let dir = tempfile::tempdir().unwrap();
    let store = tracking_with(dir.path(), &[]).await;

    let source = ScriptedSource::new(Vec::new());
    let artifacts = Arc::new(ArtifactWriter::new(dir.path().join("events"), false));
    let mut controller = controller(source.clone(), artifacts, store, false, 6);

    controller.run_once().await;
    assert_eq!(
        source.organizations.lock().unwrap().as_slice(),
        &["Acme".to_string()]
    );
}
