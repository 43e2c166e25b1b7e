// src/watch/mod.rs

//! Deployment status reconciliation.
//!
//! This module is responsible for:
//! - Decoding change events for the watched custom resource collection.
//! - Translating the orchestration system's state vocabulary into
//!   [`RunStatus`](crate::types::RunStatus).
//! - Keeping a watch subscription alive across expired resource versions
//!   and writing every status change to a [`StatusStore`](crate::store::StatusStore).
//!
//! It does **not** know about pipeline runs; run views are projected from
//! engine manifests in `runs`.

pub mod event;
pub mod kube;
pub mod mapping;
pub mod reconciler;
pub mod source;

pub use event::{EventType, ObjectMeta, ResourceObject, ResourceStatus, WatchEvent};
pub use kube::KubeWatchSource;
pub use mapping::{map_deployment_state, status_update, StatusUpdate};
pub use reconciler::{Reconciler, ReconcilerStats, WatchCursor};
pub use source::{EventSource, EventStream, ResourceRef, ResourceVersionTracker, WatchFuture};
