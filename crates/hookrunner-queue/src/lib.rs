//! The Event Queue: a persistent, recoverable FIFO of events with status
//! tracking (§4.3). Owns the `events` and `event_hook_executions` tables.

pub mod error;

use std::sync::Arc;

use hookrunner_core::{now_secs, Event, EventHookExecution, EventStatus, EventType, HookResult};
use hookrunner_store::rows::{
    event_from_row, event_hook_execution_from_row, EVENT_COLUMNS, EVENT_HOOK_EXECUTION_COLUMNS,
};
use hookrunner_store::Store;
use tracing::error;
use uuid::Uuid;

pub use error::{QueueError, Result};

pub struct EventQueue {
    store: Arc<Store>,
}

impl EventQueue {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Insert a new event. Assigns `id` if empty, defaults `status` to
    /// `pending`, stamps `created_at`.
    pub fn enqueue(&self, mut event: Event) -> Result<Event> {
        if event.id.is_empty() {
            event.id = Uuid::new_v4().to_string();
        }
        event.status = EventStatus::Pending;
        event.created_at = now_secs();
        event.processed_at = None;

        let data_json = serde_json::to_string(&event.data)?;
        let conn = self.store.lock();
        conn.execute(
            "INSERT INTO events (id, event_type, data, stack, agent, run_id, timestamp, \
             created_at, processed_at, status, error) \
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,NULL,?9,NULL)",
            rusqlite::params![
                event.id,
                event.event_type.as_str(),
                data_json,
                event.stack,
                event.agent,
                event.run_id,
                event.timestamp,
                event.created_at,
                event.status.to_string(),
            ],
        )?;
        Ok(event)
    }

    /// Pending events, oldest first.
    pub fn get_pending_events(&self, limit: u32) -> Result<Vec<Event>> {
        self.query_events(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE status = 'pending' ORDER BY created_at ASC LIMIT ?1"),
            rusqlite::params![limit],
        )
    }

    /// `processing` events whose `processed_at` predates `now - age_seconds`
    /// — orphaned by a crash or restart, presumed stuck.
    pub fn get_stuck_processing_events(&self, age_seconds: i64, limit: u32) -> Result<Vec<Event>> {
        let cutoff = now_secs() - age_seconds;
        self.query_events(
            &format!(
                "SELECT {EVENT_COLUMNS} FROM events \
                 WHERE status = 'processing' AND processed_at IS NOT NULL AND processed_at < ?1 \
                 ORDER BY processed_at ASC LIMIT ?2"
            ),
            rusqlite::params![cutoff, limit],
        )
    }

    /// All events matching the optional filters, newest first. Empty
    /// strings mean "no filter"; `limit = 0` returns an empty slice.
    pub fn list_events(
        &self,
        type_filter: Option<EventType>,
        status_filter: Option<EventStatus>,
        limit: u32,
    ) -> Result<Vec<Event>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let type_str = type_filter.map(|t| t.as_str().to_string());
        let status_str = status_filter.map(|s| s.to_string());
        self.query_events(
            &format!(
                "SELECT {EVENT_COLUMNS} FROM events \
                 WHERE (?1 IS NULL OR event_type = ?1) AND (?2 IS NULL OR status = ?2) \
                 ORDER BY created_at DESC LIMIT ?3"
            ),
            rusqlite::params![type_str, status_str, limit],
        )
    }

    /// Same filter semantics as [`Self::list_events`], scoped to one agent.
    pub fn list_events_by_agent(
        &self,
        agent: &str,
        type_filter: Option<EventType>,
        status_filter: Option<EventStatus>,
        limit: u32,
    ) -> Result<Vec<Event>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let type_str = type_filter.map(|t| t.as_str().to_string());
        let status_str = status_filter.map(|s| s.to_string());
        self.query_events(
            &format!(
                "SELECT {EVENT_COLUMNS} FROM events \
                 WHERE agent = ?1 AND (?2 IS NULL OR event_type = ?2) AND (?3 IS NULL OR status = ?3) \
                 ORDER BY created_at DESC LIMIT ?4"
            ),
            rusqlite::params![agent, type_str, status_str, limit],
        )
    }

    pub fn get_event(&self, id: &str) -> Result<Event> {
        let conn = self.store.lock();
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(event_from_row(row)?),
            None => Err(QueueError::NotFound(id.to_string())),
        }
    }

    /// Move `id` to `status`, stamping `processed_at = now`.
    pub fn update_event_status(&self, id: &str, status: EventStatus, error_msg: &str) -> Result<()> {
        let conn = self.store.lock();
        let err = if error_msg.is_empty() { None } else { Some(error_msg) };
        let n = conn.execute(
            "UPDATE events SET status = ?1, processed_at = ?2, error = ?3 WHERE id = ?4",
            rusqlite::params![status.to_string(), now_secs(), err, id],
        )?;
        if n == 0 {
            return Err(QueueError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn delete_event(&self, id: &str) -> Result<()> {
        let conn = self.store.lock();
        let n = conn.execute("DELETE FROM events WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(QueueError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Removes terminal events older than `older_than_secs`; `pending` and
    /// `processing` rows are preserved regardless of age. Returns the
    /// number of rows removed.
    pub fn cleanup_old_events(&self, older_than_secs: i64) -> Result<u64> {
        let cutoff = now_secs() - older_than_secs;
        let conn = self.store.lock();
        let n = conn.execute(
            "DELETE FROM events WHERE status IN ('completed','failed') AND processed_at < ?1",
            [cutoff],
        )?;
        Ok(n as u64)
    }

    pub fn record_event_hook_execution(
        &self,
        event_id: &str,
        hook_id: &str,
        hook_name: &str,
        result: &HookResult,
    ) -> Result<()> {
        let conn = self.store.lock();
        conn.execute(
            "INSERT INTO event_hook_executions \
             (event_id, hook_id, hook_name, success, output, error, duration_ms, executed_at) \
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            rusqlite::params![
                event_id,
                hook_id,
                hook_name,
                result.success as i64,
                result.output,
                result.error,
                result.duration_ms as i64,
                result.executed_at,
            ],
        )?;
        Ok(())
    }

    /// Join records for one event, oldest first.
    pub fn get_event_hook_executions(&self, event_id: &str) -> Result<Vec<EventHookExecution>> {
        let conn = self.store.lock();
        let sql = format!(
            "SELECT {EVENT_HOOK_EXECUTION_COLUMNS} FROM event_hook_executions \
             WHERE event_id = ?1 ORDER BY executed_at ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([event_id], event_hook_execution_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Join `events` -> `event_hook_executions` filtered by event agent,
    /// most-recent-first.
    pub fn get_hook_executions_by_agent(&self, agent: &str, limit: u32) -> Result<Vec<EventHookExecution>> {
        let conn = self.store.lock();
        let sql = "SELECT ehe.id, ehe.event_id, ehe.hook_id, ehe.hook_name, ehe.success, \
             ehe.output, ehe.error, ehe.duration_ms, ehe.executed_at \
             FROM event_hook_executions ehe \
             JOIN events e ON e.id = ehe.event_id \
             WHERE e.agent = ?1 ORDER BY ehe.executed_at DESC LIMIT ?2";
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(rusqlite::params![agent, limit], event_hook_execution_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Runs `sql` and maps every row, skipping (and logging) rows whose
    /// JSON `data` column fails to deserialize rather than failing the
    /// whole read.
    fn query_events(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Event>> {
        let conn = self.store.lock();
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            match event_from_row(row) {
                Ok(event) => events.push(event),
                Err(e) => {
                    error!("skipping unreadable event row: {e}");
                }
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn queue() -> EventQueue {
        EventQueue::new(Arc::new(Store::open_in_memory().unwrap()))
    }

    #[test]
    fn enqueue_get_round_trip() {
        let q = queue();
        let event = Event::new(EventType::TaskStarted, json!({"task": {"task_name": "t"}}));
        let enqueued = q.enqueue(event).unwrap();
        let got = q.get_event(&enqueued.id).unwrap();
        assert_eq!(got.event_type, EventType::TaskStarted);
        assert_eq!(got.status, EventStatus::Pending);
        assert_eq!(got.data, json!({"task": {"task_name": "t"}}));
    }

    #[test]
    fn list_events_empty_filters_zero_limit_is_empty() {
        let q = queue();
        q.enqueue(Event::new(EventType::Custom, json!({}))).unwrap();
        let rows = q.list_events(None, None, 0).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn status_transition_stamps_processed_at() {
        let q = queue();
        let e = q.enqueue(Event::new(EventType::Custom, json!({}))).unwrap();
        q.update_event_status(&e.id, EventStatus::Processing, "").unwrap();
        let mid = q.get_event(&e.id).unwrap();
        assert_eq!(mid.status, EventStatus::Processing);
        assert!(mid.processed_at.is_some());

        q.update_event_status(&e.id, EventStatus::Completed, "").unwrap();
        let done = q.get_event(&e.id).unwrap();
        assert_eq!(done.status, EventStatus::Completed);
        assert!(done.error.is_none());
    }

    #[test]
    fn cleanup_preserves_pending_and_processing() {
        let q = queue();
        let pending = q.enqueue(Event::new(EventType::Custom, json!({}))).unwrap();
        let processing = q.enqueue(Event::new(EventType::Custom, json!({}))).unwrap();
        q.update_event_status(&processing.id, EventStatus::Processing, "").unwrap();
        let completed = q.enqueue(Event::new(EventType::Custom, json!({}))).unwrap();
        q.update_event_status(&completed.id, EventStatus::Completed, "").unwrap();

        let removed = q.cleanup_old_events(-1).unwrap();
        assert_eq!(removed, 1);
        assert!(q.get_event(&pending.id).is_ok());
        assert!(q.get_event(&processing.id).is_ok());
        assert!(q.get_event(&completed.id).is_err());
    }

    #[test]
    fn stuck_processing_events_detected_by_age() {
        let q = queue();
        let e = q.enqueue(Event::new(EventType::Custom, json!({}))).unwrap();
        q.update_event_status(&e.id, EventStatus::Processing, "").unwrap();

        // Freshly marked processing: not yet stuck at a 30s threshold.
        assert!(q.get_stuck_processing_events(30, 10).unwrap().is_empty());
        // But it is stuck against a threshold of -1 (anything is "older").
        assert_eq!(q.get_stuck_processing_events(-1, 10).unwrap().len(), 1);
    }

    #[test]
    fn event_hook_execution_round_trip() {
        let q = queue();
        let e = q.enqueue(Event::new(EventType::Custom, json!({}))).unwrap();
        q.store
            .lock()
            .execute(
                "INSERT INTO hooks (id, name, event_type, file_path, created_at, updated_at) \
                 VALUES ('hook-1', 'h1', 'custom', '/tmp/h1.lua', 0, 0)",
                [],
            )
            .unwrap();
        let result = HookResult {
            hook_id: "hook-1".into(),
            success: true,
            output: "ok".into(),
            error: None,
            duration_ms: 3,
            executed_at: now_secs(),
        };
        q.record_event_hook_execution(&e.id, "hook-1", "h1", &result).unwrap();
        let history = q.get_event_hook_executions(&e.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].hook_name, "h1");
        assert!(history[0].success);
    }
}
