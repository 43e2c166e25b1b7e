// src/store/mod.rs

//! Persisted deployment status.
//!
//! The reconciler writes through a [`StatusStore`] session: updates are
//! staged by [`StatusStore::update_status`] and become durable on
//! [`StatusStore::commit`]. Updates only touch existing deployment records;
//! a missing record is left missing.

pub mod memory;
pub mod sqlite;

use std::fmt::Debug;

use crate::errors::Result;
use crate::types::RunStatus;

pub use memory::MemoryStatusStore;
pub use sqlite::SqliteStatusStore;

/// Keyed status sink for deployment records.
pub trait StatusStore: Send + Debug {
    /// Stage `deployment.status = status`.
    ///
    /// Returns `false` if no deployment with that id exists.
    fn update_status(&mut self, deployment_id: &str, status: &RunStatus) -> Result<bool>;

    /// Make all staged updates durable. A commit with nothing staged is a
    /// no-op.
    fn commit(&mut self) -> Result<()>;

    /// Committed status of a deployment, if the record exists.
    fn status_of(&self, deployment_id: &str) -> Result<Option<RunStatus>>;
}
