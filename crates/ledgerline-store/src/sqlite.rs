//! SQLite implementation of the KvStore trait.
//!
//! This is the primary persistence backend. It uses rusqlite with bundled
//! SQLite. Calls are short single-row statements, so they run inline on the
//! calling thread.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::KvStore;

/// Key/value store over a single `kv_entries` table.
pub struct SqliteKv {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKv {
    /// Open (or create) the file at `path` and upgrade its layout.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// A private in-memory database, gone when dropped.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute an operation on the connection.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Poisoned(format!("sqlite connection: {}", e)))?;
        f(&conn)
    }
}

impl KvStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv_entries WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now_millis()],
            )?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_kv_basic() {
        let kv = SqliteKv::open_memory().unwrap();
        assert_eq!(kv.get("offline_goals").unwrap(), None);

        kv.set("offline_goals", "[]").unwrap();
        kv.set("offline_goals", "[{\"id\":\"g1\"}]").unwrap();
        assert_eq!(
            kv.get("offline_goals").unwrap().as_deref(),
            Some("[{\"id\":\"g1\"}]")
        );

        kv.remove("offline_goals").unwrap();
        assert_eq!(kv.get("offline_goals").unwrap(), None);
    }

    #[test]
    fn test_sqlite_kv_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledgerline.db");

        {
            let kv = SqliteKv::open(&path).unwrap();
            kv.set("sync_queue_tags", "[1,2,3]").unwrap();
        }

        let kv = SqliteKv::open(&path).unwrap();
        assert_eq!(kv.get("sync_queue_tags").unwrap().as_deref(), Some("[1,2,3]"));
    }
}
