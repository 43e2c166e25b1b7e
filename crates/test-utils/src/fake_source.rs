use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use pipewatch::errors::{PipewatchError, Result};
use pipewatch::watch::{
    EventSource, EventStream, ResourceRef, ResourceVersionTracker, WatchEvent, WatchFuture,
};
use tokio_util::sync::CancellationToken;

/// Hands out scripted resource versions and counts list calls.
///
/// Once the script is used up, the last version is repeated.
#[derive(Debug, Clone)]
pub struct ScriptedTracker {
    versions: Arc<Mutex<VecDeque<String>>>,
    calls: Arc<Mutex<usize>>,
    hang: Option<(usize, CancellationToken)>,
}

impl ScriptedTracker {
    pub fn new<I, S>(versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            versions: Arc::new(Mutex::new(versions.into_iter().map(Into::into).collect())),
            calls: Arc::new(Mutex::new(0)),
            hang: None,
        }
    }

    /// List calls after the first `calls` never complete. The first one to
    /// hang cancels `done`.
    pub fn hang_after(mut self, calls: usize, done: CancellationToken) -> Self {
        self.hang = Some((calls, done));
        self
    }

    pub fn list_calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl ResourceVersionTracker for ScriptedTracker {
    fn list_resource_version<'a>(&'a self, _resource: &'a ResourceRef) -> WatchFuture<'a, String> {
        Box::pin(async move {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if let Some((limit, done)) = &self.hang {
                if call > *limit {
                    done.cancel();
                    std::future::pending::<()>().await;
                }
            }

            let mut versions = self.versions.lock().unwrap();
            let version = if versions.len() > 1 {
                versions.pop_front()
            } else {
                versions.front().cloned()
            };
            version.ok_or_else(|| PipewatchError::NotFound("no scripted resource version".into()))
        })
    }
}

enum WatchScript {
    Reject(PipewatchError),
    Stream(Vec<Result<WatchEvent>>),
}

/// Replays one scripted response per `watch` call.
///
/// When the scripts run out, the given token is cancelled and a stream that
/// never yields is returned, so a reconciler under test stops cleanly.
#[derive(Clone)]
pub struct ScriptedEventSource {
    scripts: Arc<Mutex<VecDeque<WatchScript>>>,
    opened_at: Arc<Mutex<Vec<String>>>,
    done: CancellationToken,
}

impl ScriptedEventSource {
    pub fn new(done: CancellationToken) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(VecDeque::new())),
            opened_at: Arc::new(Mutex::new(Vec::new())),
            done,
        }
    }

    /// Next `watch` call succeeds and yields `items`, then ends.
    pub fn then_stream(self, items: Vec<Result<WatchEvent>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .push_back(WatchScript::Stream(items));
        self
    }

    /// Next `watch` call fails with `err`.
    pub fn then_reject(self, err: PipewatchError) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .push_back(WatchScript::Reject(err));
        self
    }

    /// Resource versions passed to every `watch` call so far.
    pub fn opened_at(&self) -> Vec<String> {
        self.opened_at.lock().unwrap().clone()
    }
}

impl EventSource for ScriptedEventSource {
    fn watch<'a>(
        &'a self,
        _resource: &'a ResourceRef,
        resource_version: &'a str,
    ) -> WatchFuture<'a, EventStream> {
        Box::pin(async move {
            self.opened_at
                .lock()
                .unwrap()
                .push(resource_version.to_string());

            let next = self.scripts.lock().unwrap().pop_front();
            match next {
                Some(WatchScript::Reject(err)) => Err(err),
                Some(WatchScript::Stream(items)) => {
                    Ok(Box::pin(futures::stream::iter(items)) as EventStream)
                }
                None => {
                    self.done.cancel();
                    Ok(Box::pin(futures::stream::pending()) as EventStream)
                }
            }
        })
    }
}
