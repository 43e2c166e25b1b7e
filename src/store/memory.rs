// src/store/memory.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::errors::Result;
use crate::store::StatusStore;
use crate::types::RunStatus;

#[derive(Debug, Default)]
struct Inner {
    committed: HashMap<String, RunStatus>,
    staged: HashMap<String, RunStatus>,
    commits: usize,
}

/// In-memory status store with the same staging semantics as the SQLite
/// store.
///
/// Clones share state, so a test can hand one clone to the reconciler and
/// inspect another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStatusStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a committed deployment record.
    pub fn insert_deployment(&self, deployment_id: &str, status: RunStatus) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.committed.insert(deployment_id.to_string(), status);
    }

    /// Number of `commit` calls so far.
    pub fn commit_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).commits
    }

    /// Number of updates staged but not yet committed.
    pub fn staged_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).staged.len()
    }
}

impl StatusStore for MemoryStatusStore {
    fn update_status(&mut self, deployment_id: &str, status: &RunStatus) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if !inner.committed.contains_key(deployment_id) {
            return Ok(false);
        }
        inner.staged.insert(deployment_id.to_string(), status.clone());
        Ok(true)
    }

    fn commit(&mut self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let staged: Vec<(String, RunStatus)> = inner.staged.drain().collect();
        inner.committed.extend(staged);
        inner.commits += 1;
        Ok(())
    }

    fn status_of(&self, deployment_id: &str) -> Result<Option<RunStatus>> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.committed.get(deployment_id).cloned())
    }
}
