//! The Script Executor: runs one hook against one event in a fresh, isolated
//! Lua interpreter (§4.4). Owns no state across invocations and persists
//! nothing — the dispatcher records the returned [`HookResult`].

pub mod convert;
pub mod error;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use hookrunner_core::{now_secs, Event, Hook, HookResult};
use mlua::{Lua, MultiValue};
use tracing::{debug, warn};

pub use error::{ExecutorError, Result};

#[derive(Default)]
pub struct Executor;

impl Executor {
    pub fn new() -> Self {
        Self
    }

    /// Run `hook` against `event`. Never returns `Err` for script-level
    /// failures — those are folded into the returned [`HookResult`] per the
    /// isolation contract; `Err` is reserved for conditions the dispatcher
    /// must treat as infrastructure failure (none currently arise here, but
    /// the signature stays fallible for symmetry with the rest of the stack).
    pub fn execute(&self, hook: &Hook, event: &Event) -> Result<HookResult> {
        let start = Instant::now();
        let executed_at = now_secs();

        if !std::path::Path::new(&hook.file_path).exists() {
            warn!(hook = %hook.name, file_path = %hook.file_path, "hook file not found");
            return Ok(HookResult {
                hook_id: hook.id.clone(),
                success: false,
                output: String::new(),
                error: Some(format!("hook file not found: {}", hook.file_path)),
                duration_ms: start.elapsed().as_millis() as u64,
                executed_at,
            });
        }

        let lua = Lua::new();
        let stdout = Rc::new(RefCell::new(String::new()));
        let stderr = Rc::new(RefCell::new(String::new()));

        if let Err(e) = install_globals(&lua, event, &stdout, &stderr) {
            return Ok(HookResult {
                hook_id: hook.id.clone(),
                success: false,
                output: stdout.borrow().clone(),
                error: Some(e.to_string()),
                duration_ms: start.elapsed().as_millis() as u64,
                executed_at,
            });
        }

        let script = match std::fs::read_to_string(&hook.file_path) {
            Ok(s) => s,
            Err(e) => {
                return Ok(HookResult {
                    hook_id: hook.id.clone(),
                    success: false,
                    output: String::new(),
                    error: Some(format!("hook file not found: {}: {e}", hook.file_path)),
                    duration_ms: start.elapsed().as_millis() as u64,
                    executed_at,
                });
            }
        };

        let success = match lua.load(&script).set_name(&hook.file_path).exec() {
            Err(e) => {
                return Ok(HookResult {
                    hook_id: hook.id.clone(),
                    success: false,
                    output: stdout.borrow().clone(),
                    error: Some(e.to_string()),
                    duration_ms: start.elapsed().as_millis() as u64,
                    executed_at,
                });
            }
            Ok(()) => match lua.globals().get::<_, mlua::Value>("on_event") {
                Ok(mlua::Value::Function(f)) => match f.call::<_, MultiValue>(()) {
                    Ok(ret) => match ret.into_iter().next() {
                        Some(mlua::Value::Boolean(b)) => b,
                        _ => true,
                    },
                    Err(e) => {
                        stderr.borrow_mut().push_str(&e.to_string());
                        false
                    }
                },
                _ => true,
            },
        };

        let output = stdout.borrow().clone();
        let error = if !success && !stderr.borrow().is_empty() {
            Some(stderr.borrow().clone())
        } else {
            None
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(hook = %hook.name, success, duration_ms, "hook executed");

        Ok(HookResult {
            hook_id: hook.id.clone(),
            success,
            output,
            error,
            duration_ms,
            executed_at,
        })
    }
}

fn install_globals(
    lua: &Lua,
    event: &Event,
    stdout: &Rc<RefCell<String>>,
    stderr: &Rc<RefCell<String>>,
) -> mlua::Result<()> {
    let globals = lua.globals();

    let event_table = lua.create_table()?;
    event_table.set("type", event.event_type.as_str())?;
    event_table.set("timestamp", event.timestamp)?;
    event_table.set("data", convert::json_to_lua(lua, &event.data)?)?;
    if let Some(agent) = event.data.get("agent") {
        event_table.set("agent", convert::json_to_lua(lua, agent)?)?;
    }
    if let Some(task) = event.data.get("task") {
        event_table.set("task", convert::json_to_lua(lua, task)?)?;
    }
    globals.set("event", event_table)?;

    let log = lua.create_table()?;
    for (name, prefix, sink) in [
        ("info", "[INFO] ", stdout.clone()),
        ("warn", "[WARN] ", stdout.clone()),
        ("debug", "[DEBUG] ", stdout.clone()),
        ("error", "[ERROR] ", stderr.clone()),
    ] {
        let f = lua.create_function(move |_, msg: String| {
            sink.borrow_mut().push_str(prefix);
            sink.borrow_mut().push_str(&msg);
            sink.borrow_mut().push('\n');
            Ok(())
        })?;
        log.set(name, f)?;
    }
    globals.set("log", log)?;

    let http = lua.create_table()?;
    let http_stdout = stdout.clone();
    let post = lua.create_function(move |_, url: String| {
        http_stdout.borrow_mut().push_str(&format!("[HTTP] POST to {url}\n"));
        Ok(true)
    })?;
    http.set("post", post)?;
    globals.set("http", http)?;

    let contains = lua.create_function(
        |_, (list, value): (mlua::Table, mlua::Value)| {
            let needle = lua_value_to_string(&value);
            for pair in list.sequence_values::<mlua::Value>() {
                let item = pair?;
                if lua_value_to_string(&item) == needle {
                    return Ok(true);
                }
            }
            Ok(false)
        },
    )?;
    globals.set("contains", contains)?;

    Ok(())
}

fn lua_value_to_string(value: &mlua::Value) -> String {
    match value {
        mlua::Value::String(s) => s.to_str().unwrap_or_default().to_string(),
        mlua::Value::Integer(i) => i.to_string(),
        mlua::Value::Number(n) => n.to_string(),
        mlua::Value::Boolean(b) => b.to_string(),
        mlua::Value::Nil => "nil".to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookrunner_core::EventType;
    use serde_json::json;
    use tempfile::tempdir;

    fn write_script(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn runs_on_event_returning_true() {
        let dir = tempdir().unwrap();
        let path = write_script(
            &dir,
            "h.lua",
            "function on_event() log.info(\"hi\") return true end",
        );
        let hook = Hook::new("h1", EventType::TaskStarted, &path);
        let event = Event::new(EventType::TaskStarted, json!({"task": {"task_name": "t"}}));
        let result = Executor::new().execute(&hook, &event).unwrap();
        assert!(result.success);
        assert!(result.output.contains("[INFO] hi\n"));
    }

    #[test]
    fn missing_file_reports_failure() {
        let hook = Hook::new("h2", EventType::Custom, "/nonexistent/hook.lua");
        let event = Event::new(EventType::Custom, json!({}));
        let result = Executor::new().execute(&hook, &event).unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("hook file not found"));
    }

    #[test]
    fn absent_on_event_defaults_to_success() {
        let dir = tempdir().unwrap();
        let path = write_script(&dir, "h.lua", "local x = 1 + 1");
        let hook = Hook::new("h3", EventType::Custom, &path);
        let event = Event::new(EventType::Custom, json!({}));
        let result = Executor::new().execute(&hook, &event).unwrap();
        assert!(result.success);
    }

    #[test]
    fn non_boolean_return_defaults_to_success() {
        let dir = tempdir().unwrap();
        let path = write_script(&dir, "h.lua", "function on_event() return 42 end");
        let hook = Hook::new("h4", EventType::Custom, &path);
        let event = Event::new(EventType::Custom, json!({}));
        let result = Executor::new().execute(&hook, &event).unwrap();
        assert!(result.success);
    }

    #[test]
    fn on_event_returning_false_captures_stderr() {
        let dir = tempdir().unwrap();
        let path = write_script(
            &dir,
            "h.lua",
            "function on_event() log.error(\"boom\") return false end",
        );
        let hook = Hook::new("h5", EventType::Custom, &path);
        let event = Event::new(EventType::Custom, json!({}));
        let result = Executor::new().execute(&hook, &event).unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("boom"));
    }

    #[test]
    fn event_table_exposes_type_and_data() {
        let dir = tempdir().unwrap();
        let path = write_script(
            &dir,
            "h.lua",
            "function on_event() \
                 if event.type ~= \"task.started\" then return false end \
                 if event.task.task_name ~= \"t\" then return false end \
                 return true \
             end",
        );
        let hook = Hook::new("h6", EventType::TaskStarted, &path);
        let event = Event::new(EventType::TaskStarted, json!({"task": {"task_name": "t"}}));
        let result = Executor::new().execute(&hook, &event).unwrap();
        assert!(result.success, "error: {:?}", result.error);
    }

    #[test]
    fn script_parse_error_reports_failure() {
        let dir = tempdir().unwrap();
        let path = write_script(&dir, "h.lua", "this is not lua (((");
        let hook = Hook::new("h7", EventType::Custom, &path);
        let event = Event::new(EventType::Custom, json!({}));
        let result = Executor::new().execute(&hook, &event).unwrap();
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[test]
    fn contains_helper_matches_by_string_form() {
        let dir = tempdir().unwrap();
        let path = write_script(
            &dir,
            "h.lua",
            "function on_event() return contains({1, 2, 3}, 2) end",
        );
        let hook = Hook::new("h8", EventType::Custom, &path);
        let event = Event::new(EventType::Custom, json!({}));
        let result = Executor::new().execute(&hook, &event).unwrap();
        assert!(result.success);
    }
}
