//! Cooperative shutdown

use std::sync::Arc;
use std::time::Duration;

use siphon_sync::filesystem::ArtifactWriter;
use tokio_util::sync::CancellationToken;

use crate::common::*;

#[tokio::test]
async fn test_cancelled_before_start_issues_no_request() {
    let dir = tempfile::tempdir().unwrap();
    let store = tracking_with(dir.path(), &[]).await;

    let source = ScriptedSource::new(vec![Ok(events(&[1]))]);
    let artifacts = Arc::new(ArtifactWriter::new(dir.path().join("events"), false));
    let mut controller = controller(source.clone(), artifacts, store, false, 6);

    let token = CancellationToken::new();
    token.cancel();

    controller.run(token).await.unwrap();
    assert_eq!(source.list_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_idle_wait() {
    let dir = tempfile::tempdir().unwrap();
    let store = tracking_with(dir.path(), &[]).await;

    let source = ScriptedSource::new(Vec::new());
    let artifacts = Arc::new(ArtifactWriter::new(dir.path().join("events"), false));
    let mut controller = controller(source.clone(), artifacts, store, false, 6);

    let token = CancellationToken::new();
    let stopper = token.clone();
    let (result, _) = tokio::join!(controller.run(token), async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        stopper.cancel();
    });

    result.unwrap();
    // One poll, then the 60s idle wait was cut short.
    assert_eq!(source.list_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_idle_loop_polls_once_per_interval() {
    let dir = tempfile::tempdir().unwrap();
    let store = tracking_with(dir.path(), &[]).await;

    let source = ScriptedSource::new(Vec::new());
    let artifacts = Arc::new(ArtifactWriter::new(dir.path().join("events"), false));
    let mut controller = controller(source.clone(), artifacts, store, false, 6);

    let token = CancellationToken::new();
    let stopper = token.clone();
    let (result, _) = tokio::join!(controller.run(token), async move {
        tokio::time::sleep(Duration::from_secs(150)).await;
        stopper.cancel();
    });

    result.unwrap();
    // Polls at t=0, 60 and 120.
    assert_eq!(source.list_calls(), 3);
}
