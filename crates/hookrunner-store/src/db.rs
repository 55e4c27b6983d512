use rusqlite::Connection;

use crate::error::Result;

/// Initialise the full hook-subsystem schema in `conn` (idempotent).
///
/// Creates `hooks`, `hook_executions`, `events`, `event_hook_executions` and
/// the auxiliary `file_watchers` table, plus every index named in §4.1 of
/// the subsystem spec. Foreign keys cascade: deleting a hook removes its
/// `hook_executions` and `event_hook_executions`; deleting an event removes
/// its `event_hook_executions`.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS hooks (
            id          TEXT    NOT NULL PRIMARY KEY,
            name        TEXT    NOT NULL UNIQUE,
            event_type  TEXT    NOT NULL,
            stack       TEXT,
            file_path   TEXT    NOT NULL,
            enabled     INTEGER NOT NULL DEFAULT 1,
            description TEXT    NOT NULL DEFAULT '',
            created_at  INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL,
            last_run    INTEGER,
            run_count   INTEGER NOT NULL DEFAULT 0
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_hooks_event_type ON hooks (event_type);
        CREATE INDEX IF NOT EXISTS idx_hooks_enabled ON hooks (enabled);
        CREATE INDEX IF NOT EXISTS idx_hooks_stack ON hooks (stack);

        CREATE TABLE IF NOT EXISTS hook_executions (
            id          INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            hook_id     TEXT    NOT NULL REFERENCES hooks (id) ON DELETE CASCADE,
            success     INTEGER NOT NULL,
            output      TEXT    NOT NULL DEFAULT '',
            error       TEXT,
            duration_ms INTEGER NOT NULL,
            executed_at INTEGER NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_hook_executions_hook_id ON hook_executions (hook_id);
        CREATE INDEX IF NOT EXISTS idx_hook_executions_executed_at ON hook_executions (executed_at);

        CREATE TABLE IF NOT EXISTS events (
            id           TEXT    NOT NULL PRIMARY KEY,
            event_type   TEXT    NOT NULL,
            data         TEXT    NOT NULL,
            stack        TEXT,
            agent        TEXT,
            run_id       TEXT,
            timestamp    INTEGER NOT NULL,
            created_at   INTEGER NOT NULL,
            processed_at INTEGER,
            status       TEXT    NOT NULL DEFAULT 'pending',
            error        TEXT
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_events_status ON events (status);
        CREATE INDEX IF NOT EXISTS idx_events_type ON events (event_type);
        CREATE INDEX IF NOT EXISTS idx_events_created_at ON events (created_at);

        CREATE TABLE IF NOT EXISTS event_hook_executions (
            id          INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            event_id    TEXT    NOT NULL REFERENCES events (id) ON DELETE CASCADE,
            hook_id     TEXT    NOT NULL REFERENCES hooks (id) ON DELETE CASCADE,
            hook_name   TEXT    NOT NULL,
            success     INTEGER NOT NULL,
            output      TEXT    NOT NULL DEFAULT '',
            error       TEXT,
            duration_ms INTEGER NOT NULL,
            executed_at INTEGER NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_ehe_event_id ON event_hook_executions (event_id);
        CREATE INDEX IF NOT EXISTS idx_ehe_hook_id ON event_hook_executions (hook_id);

        -- File-system watcher bindings. Same CRUD shape as hooks; no watcher
        -- engine is implemented against this table (open question, see
        -- DESIGN.md) but the schema is kept so a future watcher loop can
        -- persist its bindings without a migration.
        CREATE TABLE IF NOT EXISTS file_watchers (
            id          TEXT    NOT NULL PRIMARY KEY,
            name        TEXT    NOT NULL UNIQUE,
            path        TEXT    NOT NULL,
            events      TEXT    NOT NULL DEFAULT '[]',
            enabled     INTEGER NOT NULL DEFAULT 1,
            created_at  INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL
        ) STRICT;
        ",
    )?;
    Ok(())
}
