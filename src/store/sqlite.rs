// src/store/sqlite.rs

use std::fmt;
use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::errors::Result;
use crate::store::StatusStore;
use crate::types::RunStatus;

/// SQLite-backed deployment status store.
///
/// Owns one connection for its whole lifetime. A transaction is opened by
/// the first staged update and closed by [`StatusStore::commit`].
pub struct SqliteStatusStore {
    conn: Connection,
}

impl fmt::Debug for SqliteStatusStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStatusStore")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl SqliteStatusStore {
    /// Open or create the database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Self::from_connection(Connection::open(db_path)?)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS deployments (
                uuid TEXT PRIMARY KEY,
                name TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'Pending',
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self { conn })
    }

    /// Register a deployment record. Existing records are left untouched.
    pub fn insert_deployment(&mut self, deployment_id: &str, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO deployments (uuid, name, status, updated_at)
             VALUES (?1, ?2, 'Pending', ?3)",
            params![deployment_id, name, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl StatusStore for SqliteStatusStore {
    fn update_status(&mut self, deployment_id: &str, status: &RunStatus) -> Result<bool> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }

        let changed = self.conn.execute(
            "UPDATE deployments SET status = ?1, updated_at = ?2 WHERE uuid = ?3",
            params![status.as_str(), Utc::now().to_rfc3339(), deployment_id],
        )?;

        debug!(deployment = %deployment_id, %status, changed, "staged deployment status");
        Ok(changed > 0)
    }

    fn commit(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn status_of(&self, deployment_id: &str) -> Result<Option<RunStatus>> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM deployments WHERE uuid = ?1",
                params![deployment_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status.map(RunStatus::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_then_commit_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("pipewatch.db");

        {
            let mut store = SqliteStatusStore::open(&path).unwrap();
            store.insert_deployment("d1", "my deployment").unwrap();
            assert!(store.update_status("d1", &RunStatus::Succeeded).unwrap());
            store.commit().unwrap();
        }

        let store = SqliteStatusStore::open(&path).unwrap();
        assert_eq!(store.status_of("d1").unwrap(), Some(RunStatus::Succeeded));
    }

    #[test]
    fn update_of_missing_record_does_not_create_it() {
        let mut store = SqliteStatusStore::open_in_memory().unwrap();
        assert!(!store.update_status("ghost", &RunStatus::Failed).unwrap());
        store.commit().unwrap();
        assert_eq!(store.status_of("ghost").unwrap(), None);
    }

    #[test]
    fn commit_without_updates_is_noop() {
        let mut store = SqliteStatusStore::open_in_memory().unwrap();
        store.commit().unwrap();
        store.commit().unwrap();
    }

    #[test]
    fn new_records_start_pending() {
        let mut store = SqliteStatusStore::open_in_memory().unwrap();
        store.insert_deployment("d1", "").unwrap();
        assert_eq!(store.status_of("d1").unwrap(), Some(RunStatus::Pending));
    }
}
