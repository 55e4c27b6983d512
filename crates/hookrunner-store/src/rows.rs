//! Row <-> domain-type mapping shared by the registry and queue crates, so
//! the column order lives in exactly one place.

use hookrunner_core::{Event, EventHookExecution, EventStatus, EventType, Hook};
use rusqlite::Row;

use crate::error::{Result, StoreError};

pub const HOOK_COLUMNS: &str = "id, name, event_type, stack, file_path, enabled, \
     description, created_at, updated_at, last_run, run_count";

pub fn hook_from_row(row: &Row) -> rusqlite::Result<Hook> {
    let event_type_str: String = row.get("event_type")?;
    let event_type: EventType = event_type_str.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            "unknown event_type in hooks row".into(),
        )
    })?;

    Ok(Hook {
        id: row.get("id")?,
        name: row.get("name")?,
        event_type,
        stack: row.get("stack")?,
        file_path: row.get("file_path")?,
        enabled: row.get::<_, i64>("enabled")? != 0,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        last_run: row.get("last_run")?,
        run_count: row.get::<_, i64>("run_count")? as u64,
    })
}

pub const EVENT_COLUMNS: &str = "id, event_type, data, stack, agent, run_id, \
     timestamp, created_at, processed_at, status, error";

pub fn event_from_row(row: &Row) -> Result<Event> {
    let event_type_str: String = row.get("event_type")?;
    let event_type: EventType = event_type_str
        .parse()
        .map_err(|_| StoreError::Database(rusqlite::Error::InvalidQuery))?;

    let data_str: String = row.get("data")?;
    let data = serde_json::from_str(&data_str)?;

    let status_str: String = row.get("status")?;
    let status: EventStatus = status_str
        .parse()
        .map_err(|_| StoreError::Database(rusqlite::Error::InvalidQuery))?;

    Ok(Event {
        id: row.get("id")?,
        event_type,
        data,
        stack: row.get("stack")?,
        agent: row.get("agent")?,
        run_id: row.get("run_id")?,
        timestamp: row.get("timestamp")?,
        created_at: row.get("created_at")?,
        processed_at: row.get("processed_at")?,
        status,
        error: row.get("error")?,
    })
}

pub const EVENT_HOOK_EXECUTION_COLUMNS: &str = "id, event_id, hook_id, hook_name, \
     success, output, error, duration_ms, executed_at";

pub fn event_hook_execution_from_row(row: &Row) -> rusqlite::Result<EventHookExecution> {
    Ok(EventHookExecution {
        id: row.get("id")?,
        event_id: row.get("event_id")?,
        hook_id: row.get("hook_id")?,
        hook_name: row.get("hook_name")?,
        success: row.get::<_, i64>("success")? != 0,
        output: row.get("output")?,
        error: row.get("error")?,
        duration_ms: row.get::<_, i64>("duration_ms")? as u64,
        executed_at: row.get("executed_at")?,
    })
}
