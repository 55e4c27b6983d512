//! The durable SQLite-backed store underlying the Hook Registry and Event
//! Queue: schema, connection ownership, and row <-> domain-type mapping.
//!
//! A single serialized connection guarded by a mutex is used rather than a
//! connection pool — writes are inherently sequential here (one worker pool
//! draining one queue) and `PRAGMA journal_mode = WAL` lets readers proceed
//! without blocking on the write lock.

pub mod db;
pub mod error;
pub mod rows;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

pub use error::{Result, StoreError};

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (creating if absent) the SQLite database at `path` and
    /// initialise the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        db::init_db(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory store, used by tests across this workspace.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        db::init_db(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Acquire the connection lock. Held only for the duration of one SQL
    /// statement or transaction by callers.
    pub fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("hookrunner store connection poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_creates_all_tables() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.lock();
        for table in ["hooks", "hook_executions", "events", "event_hook_executions", "file_watchers"] {
            let count: i64 = conn
                .query_row(
                    "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.lock();
        let err = conn
            .execute(
                "INSERT INTO hook_executions (hook_id, success, duration_ms, executed_at) \
                 VALUES ('missing-hook', 1, 1, 0)",
                [],
            )
            .unwrap_err();
        assert!(matches!(err, rusqlite::Error::SqliteFailure(_, _)));
    }

    #[test]
    fn deleting_hook_cascades_to_executions() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.lock();
        conn.execute(
            "INSERT INTO hooks (id, name, event_type, file_path, created_at, updated_at) \
             VALUES ('h1', 'h1', 'custom', '/tmp/h1.lua', 0, 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO hook_executions (hook_id, success, duration_ms, executed_at) \
             VALUES ('h1', 1, 1, 0)",
            [],
        )
        .unwrap();
        conn.execute("DELETE FROM hooks WHERE id = 'h1'", []).unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM hook_executions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
