//! The Hook Registry: CRUD over registered hooks, enable/disable, and the
//! by-event-type lookup the dispatcher's hot path uses for fan-out (§4.2).

pub mod error;

use std::sync::Arc;

use hookrunner_core::{now_secs, Hook, HookResult};
use hookrunner_store::rows::{hook_from_row, HOOK_COLUMNS};
use hookrunner_store::Store;
use tracing::debug;
use uuid::Uuid;

pub use error::{RegistryError, Result};

pub struct HookRegistry {
    store: Arc<Store>,
}

impl HookRegistry {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Register a hook. Assigns `id` if empty, stamps timestamps.
    pub fn add(&self, mut hook: Hook) -> Result<Hook> {
        if hook.name.trim().is_empty() {
            return Err(RegistryError::Validation("hook name must not be empty".into()));
        }

        let conn = self.store.lock();
        let existing: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM hooks WHERE name = ?1",
                [&hook.name],
                |row| row.get(0),
            )
            .ok();
        if existing.is_some() {
            return Err(RegistryError::DuplicateName(hook.name));
        }

        if hook.id.is_empty() {
            hook.id = Uuid::new_v4().to_string();
        }
        let now = now_secs();
        hook.created_at = now;
        hook.updated_at = now;

        conn.execute(
            "INSERT INTO hooks (id, name, event_type, stack, file_path, enabled, \
             description, created_at, updated_at, last_run, run_count) \
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,NULL,0)",
            rusqlite::params![
                hook.id,
                hook.name,
                hook.event_type.as_str(),
                hook.stack,
                hook.file_path,
                hook.enabled as i64,
                hook.description,
                hook.created_at,
                hook.updated_at,
            ],
        )?;

        debug!(hook_id = %hook.id, name = %hook.name, "hook registered");
        Ok(hook)
    }

    pub fn get(&self, id: &str) -> Result<Hook> {
        let conn = self.store.lock();
        let sql = format!("SELECT {HOOK_COLUMNS} FROM hooks WHERE id = ?1");
        conn.query_row(&sql, [id], hook_from_row)
            .map_err(|_| RegistryError::NotFound(id.to_string()))
    }

    pub fn get_by_name(&self, name: &str) -> Result<Hook> {
        let conn = self.store.lock();
        let sql = format!("SELECT {HOOK_COLUMNS} FROM hooks WHERE name = ?1");
        conn.query_row(&sql, [name], hook_from_row)
            .map_err(|_| RegistryError::NotFound(name.to_string()))
    }

    /// All hooks, ordered by name ascending.
    pub fn list(&self) -> Result<Vec<Hook>> {
        let conn = self.store.lock();
        let sql = format!("SELECT {HOOK_COLUMNS} FROM hooks ORDER BY name ASC");
        let mut stmt = conn.prepare(&sql)?;
        let hooks = stmt
            .query_map([], hook_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hooks)
    }

    /// Only enabled hooks matching `event_type`, ordered by name. The
    /// dispatcher's hot-path selector.
    pub fn list_by_event_type(&self, event_type: hookrunner_core::EventType) -> Result<Vec<Hook>> {
        let conn = self.store.lock();
        let sql = format!(
            "SELECT {HOOK_COLUMNS} FROM hooks WHERE event_type = ?1 AND enabled = 1 ORDER BY name ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let hooks = stmt
            .query_map([event_type.as_str()], hook_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hooks)
    }

    /// All hooks (enabled and disabled) tagged with `stack`.
    pub fn list_by_stack(&self, stack: &str) -> Result<Vec<Hook>> {
        let conn = self.store.lock();
        let sql = format!("SELECT {HOOK_COLUMNS} FROM hooks WHERE stack = ?1 ORDER BY name ASC");
        let mut stmt = conn.prepare(&sql)?;
        let hooks = stmt
            .query_map([stack], hook_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hooks)
    }

    pub fn update(&self, hook: &Hook) -> Result<()> {
        let conn = self.store.lock();
        let now = now_secs();
        let n = conn.execute(
            "UPDATE hooks SET name=?1, event_type=?2, stack=?3, file_path=?4, \
             enabled=?5, description=?6, updated_at=?7 WHERE id=?8",
            rusqlite::params![
                hook.name,
                hook.event_type.as_str(),
                hook.stack,
                hook.file_path,
                hook.enabled as i64,
                hook.description,
                now,
                hook.id,
            ],
        )?;
        if n == 0 {
            return Err(RegistryError::NotFound(hook.id.clone()));
        }
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let conn = self.store.lock();
        let n = conn.execute("DELETE FROM hooks WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn enable(&self, id: &str) -> Result<()> {
        self.set_enabled(id, true)
    }

    pub fn disable(&self, id: &str) -> Result<()> {
        self.set_enabled(id, false)
    }

    fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let conn = self.store.lock();
        let now = now_secs();
        let n = conn.execute(
            "UPDATE hooks SET enabled = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![enabled as i64, now, id],
        )?;
        if n == 0 {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Atomically bump `run_count`, set `last_run`, and append a
    /// `hook_executions` row.
    pub fn record_execution(&self, result: &HookResult) -> Result<()> {
        let conn = self.store.lock();
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO hook_executions (hook_id, success, output, error, duration_ms, executed_at) \
             VALUES (?1,?2,?3,?4,?5,?6)",
            rusqlite::params![
                result.hook_id,
                result.success as i64,
                result.output,
                result.error,
                result.duration_ms as i64,
                result.executed_at,
            ],
        )?;
        tx.execute(
            "UPDATE hooks SET run_count = run_count + 1, last_run = ?1 WHERE id = ?2",
            rusqlite::params![result.executed_at, result.hook_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Most-recent-first execution history for one hook.
    pub fn get_execution_history(&self, hook_id: &str, limit: u32) -> Result<Vec<HookResult>> {
        let conn = self.store.lock();
        let mut stmt = conn.prepare(
            "SELECT hook_id, success, output, error, duration_ms, executed_at \
             FROM hook_executions WHERE hook_id = ?1 ORDER BY executed_at DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![hook_id, limit], |row| {
                Ok(HookResult {
                    hook_id: row.get(0)?,
                    success: row.get::<_, i64>(1)? != 0,
                    output: row.get(2)?,
                    error: row.get(3)?,
                    duration_ms: row.get::<_, i64>(4)? as u64,
                    executed_at: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookrunner_core::EventType;

    fn registry() -> HookRegistry {
        HookRegistry::new(Arc::new(Store::open_in_memory().unwrap()))
    }

    #[test]
    fn add_then_get_round_trips() {
        let r = registry();
        let hook = Hook::new("h1", EventType::TaskStarted, "/tmp/h1.lua");
        let added = r.add(hook).unwrap();
        let got = r.get(&added.id).unwrap();
        assert_eq!(got.name, "h1");
        assert!(got.enabled);
    }

    #[test]
    fn duplicate_name_rejected() {
        let r = registry();
        r.add(Hook::new("dup", EventType::Custom, "/tmp/a.lua")).unwrap();
        let err = r.add(Hook::new("dup", EventType::Custom, "/tmp/b.lua")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(_)));
        assert_eq!(r.list().unwrap().len(), 1);
    }

    #[test]
    fn list_by_event_type_only_returns_enabled() {
        let r = registry();
        let h1 = r.add(Hook::new("on", EventType::Custom, "/tmp/on.lua")).unwrap();
        let h2 = r
            .add(Hook::new("off", EventType::Custom, "/tmp/off.lua").disabled())
            .unwrap();
        let matching = r.list_by_event_type(EventType::Custom).unwrap();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].id, h1.id);
        assert_ne!(matching[0].id, h2.id);
    }

    #[test]
    fn enable_disable_symmetry() {
        let r = registry();
        let h = r.add(Hook::new("flip", EventType::Custom, "/tmp/flip.lua")).unwrap();
        r.enable(&h.id).unwrap();
        r.disable(&h.id).unwrap();
        r.enable(&h.id).unwrap();
        assert!(r.get(&h.id).unwrap().enabled);

        r.disable(&h.id).unwrap();
        r.enable(&h.id).unwrap();
        r.disable(&h.id).unwrap();
        assert!(!r.get(&h.id).unwrap().enabled);
    }

    #[test]
    fn record_execution_increments_run_count() {
        let r = registry();
        let h = r.add(Hook::new("counted", EventType::Custom, "/tmp/c.lua")).unwrap();
        let result = HookResult {
            hook_id: h.id.clone(),
            success: true,
            output: String::new(),
            error: None,
            duration_ms: 5,
            executed_at: now_secs(),
        };
        r.record_execution(&result).unwrap();
        let updated = r.get(&h.id).unwrap();
        assert_eq!(updated.run_count, 1);
        assert!(updated.last_run.is_some());
        assert_eq!(r.get_execution_history(&h.id, 10).unwrap().len(), 1);
    }

    #[test]
    fn not_found_on_missing_id() {
        let r = registry();
        assert!(matches!(r.get("missing"), Err(RegistryError::NotFound(_))));
        assert!(matches!(r.enable("missing"), Err(RegistryError::NotFound(_))));
        assert!(matches!(r.delete("missing"), Err(RegistryError::NotFound(_))));
    }
}
