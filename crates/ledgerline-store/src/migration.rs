//! Versioned layout of the SQLite key/value file.
//!
//! Steps are applied in order inside one transaction; the highest applied
//! step is the file's layout version.

use rusqlite::{params, Connection, Transaction};

use crate::error::{Result, StoreError};

/// Layout steps, indexed from version 1.
const STEPS: &[&str] = &[
    // 1: snapshots and outbox queues share one table, keyed by KeyLayout.
    "CREATE TABLE kv_entries (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    );",
];

/// Layout version this build writes.
pub const LAYOUT_VERSION: u32 = STEPS.len() as u32;

/// Bring `conn` up to [`LAYOUT_VERSION`]. Safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv_layout (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );",
    )?;

    let found = layout_version(conn)?;
    if found > LAYOUT_VERSION {
        return Err(StoreError::Migration(format!(
            "kv file has layout {}, this build understands up to {}",
            found, LAYOUT_VERSION
        )));
    }
    if found == LAYOUT_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for version in (found + 1)..=LAYOUT_VERSION {
        apply_step(&tx, version)?;
    }
    tx.commit()?;

    tracing::debug!(from = found, to = LAYOUT_VERSION, "upgraded kv layout");
    Ok(())
}

fn layout_version(conn: &Connection) -> Result<u32> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM kv_layout",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn apply_step(tx: &Transaction<'_>, version: u32) -> Result<()> {
    let sql = STEPS
        .get(version as usize - 1)
        .ok_or_else(|| StoreError::Migration(format!("no layout step {}", version)))?;
    tx.execute_batch(sql)?;
    tx.execute(
        "INSERT INTO kv_layout (version, applied_at) VALUES (?1, ?2)",
        params![version, now_millis()],
    )?;
    Ok(())
}

/// Wall clock in Unix milliseconds; 0 if the clock is before the epoch.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
