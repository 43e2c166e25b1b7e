// src/watch/reconciler.rs

use std::fmt;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{PipewatchError, Result};
use crate::store::StatusStore;
use crate::watch::event::WatchEvent;
use crate::watch::mapping::status_update;
use crate::watch::source::{EventSource, ResourceRef, ResourceVersionTracker};

/// Resume point of a watch subscription.
///
/// Starts at the version token of a list call and follows the
/// `resourceVersion` of every event seen since, so a stream that closes
/// cleanly can be reopened without replaying or skipping events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchCursor {
    resource_version: String,
}

impl WatchCursor {
    pub fn new(resource_version: impl Into<String>) -> Self {
        Self {
            resource_version: resource_version.into(),
        }
    }

    pub fn resource_version(&self) -> &str {
        &self.resource_version
    }

    /// Move past `event`. Events without a version leave the cursor alone.
    pub fn advance(&mut self, event: &WatchEvent) {
        if let Some(rv) = event.resource_version() {
            self.resource_version = rv.to_string();
        }
    }
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcilerStats {
    /// Events taken off the stream (each followed by a commit).
    pub events: usize,
    /// Status writes that hit an existing deployment record.
    pub updates: usize,
    /// Re-list calls made after a stale resource version.
    pub relists: usize,
}

/// Long-running loop that keeps deployment status in sync with the
/// orchestration system.
///
/// - Lists the collection once to get a baseline version token.
/// - Watches from the cursor and applies every event to the store,
///   committing after each one.
/// - On `Stale`, re-lists exactly once and reopens the stream from the
///   fresh token. Any other error stops the loop and is returned.
/// - Stops when `cancel` fires.
pub struct Reconciler<T, S, St>
where
    T: ResourceVersionTracker,
    S: EventSource,
    St: StatusStore,
{
    tracker: T,
    source: S,
    store: St,
    resource: ResourceRef,
    stats: ReconcilerStats,
}

impl<T, S, St> fmt::Debug for Reconciler<T, S, St>
where
    T: ResourceVersionTracker,
    S: EventSource,
    St: StatusStore,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("resource", &self.resource)
            .field("store", &self.store)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<T, S, St> Reconciler<T, S, St>
where
    T: ResourceVersionTracker,
    S: EventSource,
    St: StatusStore,
{
    pub fn new(tracker: T, source: S, store: St, resource: ResourceRef) -> Self {
        Self {
            tracker,
            source,
            store,
            resource,
            stats: ReconcilerStats::default(),
        }
    }

    /// Main watch loop. Returns the final counters once `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<ReconcilerStats> {
        info!(collection = %self.resource.collection_path(), "reconciler started");

        let baseline = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(self.stats),
            rv = self.tracker.list_resource_version(&self.resource) => rv?,
        };
        let mut cursor = WatchCursor::new(baseline);

        loop {
            debug!(resource_version = cursor.resource_version(), "opening watch");

            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                opened = self.source.watch(&self.resource, cursor.resource_version()) => opened,
            };

            let mut stream = match opened {
                Ok(stream) => stream,
                Err(PipewatchError::Stale(reason)) => {
                    self.relist(&mut cursor, &reason, &cancel).await?;
                    continue;
                }
                Err(err) => return Err(err),
            };

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!(stats = ?self.stats, "reconciler cancelled");
                        return Ok(self.stats);
                    }
                    next = stream.next() => next,
                };

                match next {
                    Some(Ok(event)) => {
                        self.apply(&event)?;
                        cursor.advance(&event);
                    }
                    Some(Err(PipewatchError::Stale(reason))) => {
                        self.relist(&mut cursor, &reason, &cancel).await?;
                        break;
                    }
                    Some(Err(err)) => return Err(err),
                    None => {
                        debug!(
                            resource_version = cursor.resource_version(),
                            "watch stream closed; resuming from cursor"
                        );
                        break;
                    }
                }
            }
        }

        info!(stats = ?self.stats, "reconciler cancelled");
        Ok(self.stats)
    }

    /// Apply one event to the store and commit.
    ///
    /// The commit happens even when the event carries no status, which
    /// flushes anything staged earlier.
    pub fn apply(&mut self, event: &WatchEvent) -> Result<()> {
        info!(kind = ?event.kind, deployment = %event.name(), "watch event");
        self.stats.events += 1;

        match status_update(event) {
            Some(update) => {
                let hit = self
                    .store
                    .update_status(&update.deployment_id, &update.status)?;
                if hit {
                    self.stats.updates += 1;
                    debug!(
                        deployment = %update.deployment_id,
                        status = %update.status,
                        "deployment status staged"
                    );
                } else {
                    debug!(deployment = %update.deployment_id, "no such deployment; skipped");
                }
            }
            None => debug!(deployment = %event.name(), "event carries no state; skipped"),
        }

        self.store.commit()
    }

    /// Replace the cursor with a fresh list version. Leaves it untouched if
    /// `cancel` fires first; the caller's next select sees the cancellation.
    async fn relist(
        &mut self,
        cursor: &mut WatchCursor,
        reason: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        warn!(
            resource_version = cursor.resource_version(),
            reason, "resource version expired; re-listing"
        );
        let fresh = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            rv = self.tracker.list_resource_version(&self.resource) => rv?,
        };
        self.stats.relists += 1;
        *cursor = WatchCursor::new(fresh);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::event::{EventType, ObjectMeta, ResourceObject};

    fn bookmark(rv: &str) -> WatchEvent {
        WatchEvent {
            kind: EventType::Bookmark,
            object: ResourceObject {
                metadata: ObjectMeta {
                    name: String::new(),
                    resource_version: Some(rv.to_string()),
                },
                status: None,
            },
        }
    }

    #[test]
    fn cursor_follows_event_versions() {
        let mut cursor = WatchCursor::new("10");
        cursor.advance(&bookmark("11"));
        assert_eq!(cursor.resource_version(), "11");

        let mut unversioned = bookmark("x");
        unversioned.object.metadata.resource_version = None;
        cursor.advance(&unversioned);
        assert_eq!(cursor.resource_version(), "11");
    }
}
