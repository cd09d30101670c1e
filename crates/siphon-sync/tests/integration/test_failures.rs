//! Backoff and failure threshold

use std::sync::Arc;

use siphon_core::domain::ControllerState;
use siphon_sync::engine::CycleOutcome;
use siphon_sync::filesystem::ArtifactWriter;
use siphon_sync::SyncError;
use tokio_util::sync::CancellationToken;

use crate::common::*;

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_max_consecutive_failures() {
    let dir = tempfile::tempdir().unwrap();
    let store = tracking_with(dir.path(), &[]).await;

    let source = ScriptedSource::new((0..10).map(|_| Err(unavailable())).collect());
    let artifacts = Arc::new(ArtifactWriter::new(dir.path().join("events"), false));
    let mut controller = controller(source.clone(), artifacts, store, false, 6);

    let result = controller.run(CancellationToken::new()).await;

    match result {
        Err(SyncError::FailureThresholdReached {
            failures,
            last_status,
        }) => {
            assert_eq!(failures, 6);
            assert_eq!(last_status, Some(503));
        }
        other => panic!("expected threshold error, got {other:?}"),
    }
    assert_eq!(source.list_calls(), 6);
    assert_eq!(controller.state(), ControllerState::Failed);
}

#[tokio::test]
async fn test_success_resets_failure_counter() {
    let dir = tempfile::tempdir().unwrap();
    let store = tracking_with(dir.path(), &[]).await;

    let source = ScriptedSource::new(vec![
        Err(unavailable()),
        Err(unavailable()),
        Ok(Vec::new()),
        Err(unavailable()),
    ]);
    let artifacts = Arc::new(ArtifactWriter::new(dir.path().join("events"), false));
    let mut controller = controller(source, artifacts, store, false, 3);

    assert_eq!(
        controller.run_once().await,
        CycleOutcome::SourceFailure {
            status: Some(503),
            failures: 1
        }
    );
    assert_eq!(controller.state(), ControllerState::Backoff);
    controller.run_once().await;
    assert_eq!(controller.run_state().failure_count(), 2);

    assert_eq!(controller.run_once().await, CycleOutcome::Idle { fetched: 0 });
    assert_eq!(controller.run_state().failure_count(), 0);
    assert_eq!(controller.state(), ControllerState::Polling);

    assert_eq!(
        controller.run_once().await,
        CycleOutcome::SourceFailure {
            status: Some(503),
            failures: 1
        }
    );
}

#[tokio::test]
async fn test_failed_poll_does_not_touch_tracking() {
    let dir = tempfile::tempdir().unwrap();
    let store = tracking_with(dir.path(), &[1]).await;

    let source = ScriptedSource::new(vec![Err(unavailable())]);
    let artifacts = Arc::new(ArtifactWriter::new(dir.path().join("events"), false));
    let mut controller = controller(source, artifacts, store, false, 6);

    controller.run_once().await;

    assert_eq!(controller.store().len(), 1);
    assert!(controller.run_state().last_successful_poll().is_none());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("tracking.txt")).unwrap(),
        "1\n"
    );
}

#[tokio::test(start_paused = true)]
async fn test_recovers_after_transient_failures() {
    let dir = tempfile::tempdir().unwrap();
    let store = tracking_with(dir.path(), &[]).await;

    let source = ScriptedSource::new(vec![
        Err(unavailable()),
        Err(unavailable()),
        Ok(events(&[12])),
    ]);
    let artifacts = Arc::new(ArtifactWriter::new(dir.path().join("events"), false));
    let mut controller = controller(source.clone(), artifacts, store, false, 3);

    let token = CancellationToken::new();
    let stopper = token.clone();
    let (result, _) = tokio::join!(controller.run(token), async move {
        // Two backoffs (600s) plus one idle wait.
        tokio::time::sleep(std::time::Duration::from_secs(700)).await;
        stopper.cancel();
    });

    assert!(result.is_ok());
    assert!(controller
        .store()
        .contains(siphon_core::domain::EventId::new(12)));
    assert!(source.list_calls() >= 3);
}
