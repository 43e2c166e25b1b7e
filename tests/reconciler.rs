// tests/reconciler.rs

mod common;
use crate::common::builders::{deployment_event, modified};
use crate::common::{init_tracing, with_timeout};

use pipewatch::errors::PipewatchError;
use pipewatch::store::{MemoryStatusStore, SqliteStatusStore, StatusStore};
use pipewatch::types::RunStatus;
use pipewatch::watch::{EventType, Reconciler, ResourceRef};
use pipewatch_test_utils::{ScriptedEventSource, ScriptedTracker};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

fn resource() -> ResourceRef {
    ResourceRef {
        group: "machinelearning.seldon.io".into(),
        version: "v1alpha2".into(),
        namespace: "anonymous".into(),
        plural: "seldondeployments".into(),
    }
}

fn store_with(ids: &[&str]) -> MemoryStatusStore {
    let store = MemoryStatusStore::new();
    for id in ids {
        store.insert_deployment(id, RunStatus::Pending);
    }
    store
}

#[tokio::test]
async fn creating_and_available_are_normalised() {
    init_tracing();

    let cancel = CancellationToken::new();
    let store = store_with(&["d1", "d2"]);
    let source = ScriptedEventSource::new(cancel.clone()).then_stream(vec![
        Ok(modified("d1", "Creating", "11")),
        Ok(modified("d2", "Available", "12")),
    ]);

    let reconciler = Reconciler::new(ScriptedTracker::new(["10"]), source, store.clone(), resource());
    let stats = with_timeout(reconciler.run(cancel)).await.unwrap();

    assert_eq!(store.status_of("d1").unwrap(), Some(RunStatus::Pending));
    assert_eq!(store.status_of("d2").unwrap(), Some(RunStatus::Succeeded));
    assert_eq!(stats.events, 2);
    assert_eq!(stats.updates, 2);
}

#[tokio::test]
async fn event_without_status_still_commits() {
    init_tracing();

    let cancel = CancellationToken::new();
    let store = store_with(&["d1"]);
    store.insert_deployment("d1", RunStatus::Failed);
    let source = ScriptedEventSource::new(cancel.clone()).then_stream(vec![Ok(
        deployment_event(EventType::Modified, "d1", None, "11"),
    )]);

    let reconciler = Reconciler::new(ScriptedTracker::new(["10"]), source, store.clone(), resource());
    let stats = with_timeout(reconciler.run(cancel)).await.unwrap();

    assert_eq!(store.status_of("d1").unwrap(), Some(RunStatus::Failed));
    assert_eq!(store.commit_count(), 1);
    assert_eq!(stats.updates, 0);
}

#[tokio::test]
async fn unknown_deployment_is_not_created() {
    let cancel = CancellationToken::new();
    let store = MemoryStatusStore::new();
    let source = ScriptedEventSource::new(cancel.clone())
        .then_stream(vec![Ok(modified("ghost", "Available", "11"))]);

    let reconciler = Reconciler::new(ScriptedTracker::new(["10"]), source, store.clone(), resource());
    with_timeout(reconciler.run(cancel)).await.unwrap();

    assert_eq!(store.status_of("ghost").unwrap(), None);
    assert_eq!(store.commit_count(), 1);
}

#[tokio::test]
async fn gone_mid_stream_relists_once_and_resumes() {
    init_tracing();

    let cancel = CancellationToken::new();
    let store = store_with(&["d1", "d2"]);
    let tracker = ScriptedTracker::new(["10", "20"]);
    let source = ScriptedEventSource::new(cancel.clone())
        .then_stream(vec![
            Ok(modified("d1", "Creating", "11")),
            Err(PipewatchError::Stale("too old resource version".into())),
            // Never reached: the stream is dropped after the stale error.
            Ok(modified("d1", "Failed", "12")),
        ])
        .then_stream(vec![
            Ok(modified("d1", "Available", "21")),
            Ok(modified("d2", "Failed", "22")),
        ]);

    let reconciler = Reconciler::new(tracker.clone(), source.clone(), store.clone(), resource());
    let stats = with_timeout(reconciler.run(cancel)).await.unwrap();

    assert_eq!(tracker.list_calls(), 2);
    assert_eq!(stats.relists, 1);
    assert_eq!(stats.events, 3);
    assert_eq!(source.opened_at(), vec!["10", "20", "22"]);
    assert_eq!(store.status_of("d1").unwrap(), Some(RunStatus::Succeeded));
    assert_eq!(store.status_of("d2").unwrap(), Some(RunStatus::Failed));
    assert_eq!(store.commit_count(), 3);
}

#[tokio::test]
async fn gone_on_open_relists_before_retrying() {
    let cancel = CancellationToken::new();
    let store = store_with(&["d1"]);
    let tracker = ScriptedTracker::new(["10", "30"]);
    let source = ScriptedEventSource::new(cancel.clone())
        .then_reject(PipewatchError::Stale("expired".into()))
        .then_stream(vec![Ok(modified("d1", "Available", "31"))]);

    let reconciler = Reconciler::new(tracker.clone(), source.clone(), store.clone(), resource());
    let stats = with_timeout(reconciler.run(cancel)).await.unwrap();

    assert_eq!(stats.relists, 1);
    assert_eq!(source.opened_at(), vec!["10", "30", "31"]);
    assert_eq!(store.status_of("d1").unwrap(), Some(RunStatus::Succeeded));
}

#[tokio::test]
async fn closed_stream_resumes_from_last_event() {
    let cancel = CancellationToken::new();
    let store = store_with(&["d1"]);
    let tracker = ScriptedTracker::new(["10"]);
    let source = ScriptedEventSource::new(cancel.clone())
        .then_stream(vec![
            Ok(modified("d1", "Creating", "11")),
            Ok(deployment_event(EventType::Bookmark, "", None, "15")),
        ])
        .then_stream(vec![Ok(modified("d1", "Available", "16"))]);

    let reconciler = Reconciler::new(tracker.clone(), source.clone(), store.clone(), resource());
    let stats = with_timeout(reconciler.run(cancel)).await.unwrap();

    assert_eq!(tracker.list_calls(), 1);
    assert_eq!(stats.relists, 0);
    assert_eq!(source.opened_at(), vec!["10", "15", "16"]);
    assert_eq!(store.status_of("d1").unwrap(), Some(RunStatus::Succeeded));
}

#[tokio::test]
async fn other_stream_errors_stop_the_loop() {
    let cancel = CancellationToken::new();
    let store = store_with(&["d1"]);
    let source = ScriptedEventSource::new(cancel.clone()).then_stream(vec![
        Ok(modified("d1", "Creating", "11")),
        Err(PipewatchError::Engine {
            status: 500,
            message: "internal".into(),
        }),
        Ok(modified("d1", "Available", "12")),
    ]);

    let tracker = ScriptedTracker::new(["10"]);
    let reconciler = Reconciler::new(tracker.clone(), source, store.clone(), resource());
    let result = with_timeout(reconciler.run(cancel)).await;

    assert!(matches!(result, Err(PipewatchError::Engine { status: 500, .. })));
    assert_eq!(tracker.list_calls(), 1);
    assert_eq!(store.status_of("d1").unwrap(), Some(RunStatus::Pending));
}

#[tokio::test]
async fn cancelled_before_start_does_nothing() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let tracker = ScriptedTracker::new(["10"]);
    let source = ScriptedEventSource::new(cancel.clone());
    let reconciler = Reconciler::new(tracker.clone(), source.clone(), MemoryStatusStore::new(), resource());
    let stats = with_timeout(reconciler.run(cancel)).await.unwrap();

    assert_eq!(stats.events, 0);
    assert!(source.opened_at().is_empty());
}

#[tokio::test]
async fn cancel_during_hanging_relist_stops_the_loop() {
    let cancel = CancellationToken::new();
    let store = store_with(&["d1"]);
    let tracker = ScriptedTracker::new(["10"]).hang_after(1, cancel.clone());
    let source = ScriptedEventSource::new(cancel.clone())
        .then_stream(vec![
            Ok(modified("d1", "Creating", "11")),
            Err(PipewatchError::Stale("too old resource version".into())),
        ])
        .then_stream(vec![Ok(modified("d1", "Available", "21"))]);

    let reconciler = Reconciler::new(tracker.clone(), source.clone(), store.clone(), resource());
    let stats = with_timeout(reconciler.run(cancel)).await.unwrap();

    assert_eq!(tracker.list_calls(), 2);
    assert_eq!(stats.relists, 0);
    assert_eq!(stats.events, 1);
    assert_eq!(source.opened_at(), vec!["10"]);
    assert_eq!(store.status_of("d1").unwrap(), Some(RunStatus::Pending));
}

#[tokio::test]
async fn sqlite_store_persists_reconciled_status() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("state").join("pipewatch.db");

    {
        let mut store = SqliteStatusStore::open(&db).unwrap();
        store.insert_deployment("d1", "my deployment").unwrap();

        let cancel = CancellationToken::new();
        let source = ScriptedEventSource::new(cancel.clone())
            .then_stream(vec![Ok(modified("d1", "Available", "11"))]);
        let reconciler = Reconciler::new(ScriptedTracker::new(["10"]), source, store, resource());
        with_timeout(reconciler.run(cancel)).await.unwrap();
    }

    let reopened = SqliteStatusStore::open(&db).unwrap();
    assert_eq!(reopened.status_of("d1").unwrap(), Some(RunStatus::Succeeded));
}
