//! SQLite storage implementation
//!
//! This module provides a SQLite-backed implementation of the DedupStore trait,
//! so seen URLs survive process restarts.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DedupScope, DedupStore, StorageError, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Persistent dedup store for one scope
pub struct SqliteDedupStore {
    conn: Mutex<Connection>,
    scope: DedupScope,
}

impl SqliteDedupStore {
    /// Opens (or creates) the database at `path` for the given scope
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `scope` - Which URL family this handle reads and writes
    pub fn open(path: &Path, scope: DedupScope) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            scope,
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory(scope: DedupScope) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            scope,
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl DedupStore for SqliteDedupStore {
    fn seen(&self, url: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM seen_urls WHERE scope = ?1 AND url = ?2",
                params![self.scope.as_str(), url],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn mark_seen(&self, url: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO seen_urls (scope, url, first_seen_at) VALUES (?1, ?2, ?3)",
            params![self.scope.as_str(), url, Utc::now().to_rfc3339()],
        )?;
        Ok(inserted == 1)
    }

    fn forget(&self, url: &str) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM seen_urls WHERE scope = ?1 AND url = ?2",
            params![self.scope.as_str(), url],
        )?;
        Ok(())
    }

    fn len(&self) -> StorageResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM seen_urls WHERE scope = ?1",
            params![self.scope.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
