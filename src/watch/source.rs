// src/watch/source.rs

//! Pluggable sources of resource versions and change events.
//!
//! The reconciler talks to these traits instead of an HTTP client, so tests
//! can script event streams (including 410 Gone) without a cluster.

use std::future::Future;
use std::pin::Pin;

use futures::Stream;

use crate::config::{ClusterSection, WatchSection};
use crate::errors::Result;
use crate::watch::event::WatchEvent;

/// Boxed future returned by watch calls.
pub type WatchFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Stream of change events.
///
/// A history-expired condition is delivered as `Err(PipewatchError::Stale)`.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<WatchEvent>> + Send>>;

/// Identifies the watched custom resource collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub group: String,
    pub version: String,
    pub namespace: String,
    pub plural: String,
}

impl ResourceRef {
    pub fn from_config(cluster: &ClusterSection, watch: &WatchSection) -> Self {
        Self {
            group: watch.group.clone(),
            version: watch.version.clone(),
            namespace: cluster.namespace.clone(),
            plural: watch.plural.clone(),
        }
    }

    /// API path of the collection, without a leading slash.
    pub fn collection_path(&self) -> String {
        format!(
            "apis/{}/{}/namespaces/{}/{}",
            self.group, self.version, self.namespace, self.plural
        )
    }
}

/// Fetches the current version token of a resource collection.
///
/// The token comes from the list envelope, not from any item in it.
pub trait ResourceVersionTracker: Send + Sync {
    fn list_resource_version<'a>(&'a self, resource: &'a ResourceRef) -> WatchFuture<'a, String>;
}

/// Opens change-event subscriptions.
pub trait EventSource: Send + Sync {
    /// Subscribe to changes after `resource_version`.
    ///
    /// May fail with `Stale` right away if the version is already too old.
    fn watch<'a>(
        &'a self,
        resource: &'a ResourceRef,
        resource_version: &'a str,
    ) -> WatchFuture<'a, EventStream>;
}
