use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::event_type::EventType;

/// Lifecycle state of an [`Event`].
///
/// Transitions form a DAG: `Pending -> Processing -> (Completed | Failed)`.
/// A stuck `Processing` event may be reprocessed (stays `Processing`) but
/// never regresses to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown event status: {other}")),
        }
    }
}

/// A single occurrence to react to.
///
/// `id` and `event_type` never change once the event exists. `data` is an
/// arbitrary JSON mapping handed unchanged to every matching hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub event_type: EventType,
    pub data: Value,
    pub stack: Option<String>,
    pub agent: Option<String>,
    pub run_id: Option<String>,
    /// When the event occurred, epoch seconds. Caller-supplied.
    pub timestamp: i64,
    /// When the event was enqueued, epoch seconds. Server-assigned.
    pub created_at: i64,
    /// When the event reached a terminal status, epoch seconds.
    pub processed_at: Option<i64>,
    pub status: EventStatus,
    pub error: Option<String>,
}

impl Event {
    /// Build a new event with server-assignable fields left blank; the
    /// queue fills in `id` (if empty) and `created_at` on enqueue.
    pub fn new(event_type: EventType, data: Value) -> Self {
        Self {
            id: String::new(),
            event_type,
            data,
            stack: None,
            agent: None,
            run_id: None,
            timestamp: now_secs(),
            created_at: 0,
            processed_at: None,
            status: EventStatus::Pending,
            error: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }
}

/// A registered reaction to events of one type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hook {
    pub id: String,
    pub name: String,
    pub event_type: EventType,
    pub stack: Option<String>,
    pub file_path: String,
    pub enabled: bool,
    pub description: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_run: Option<i64>,
    pub run_count: u64,
}

impl Hook {
    pub fn new(name: impl Into<String>, event_type: EventType, file_path: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            event_type,
            stack: None,
            file_path: file_path.into(),
            enabled: true,
            description: String::new(),
            created_at: 0,
            updated_at: 0,
            last_run: None,
            run_count: 0,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// The outcome of one hook invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookResult {
    pub hook_id: String,
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    /// Wall-clock duration of the invocation in milliseconds.
    pub duration_ms: u64,
    pub executed_at: i64,
}

/// A join record: which event triggered which hook with what result.
///
/// Denormalises `hook_name` and the full [`HookResult`] fields so history
/// survives hook renames or deletions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventHookExecution {
    pub id: i64,
    pub event_id: String,
    pub hook_id: String,
    pub hook_name: String,
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub executed_at: i64,
}

/// Current time as epoch seconds.
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Build the canonical `data` payload for agent-prefixed events: wraps the
/// given fields under a top-level `"agent"` key, as the dispatcher's typed
/// helpers expect (§4.5.6).
pub fn agent_payload(fields: Map<String, Value>) -> Value {
    let mut top = Map::new();
    top.insert("agent".to_string(), Value::Object(fields));
    Value::Object(top)
}

/// Build the canonical `data` payload for task-prefixed events: wraps the
/// given fields under a top-level `"task"` key.
pub fn task_payload(fields: Map<String, Value>) -> Value {
    let mut top = Map::new();
    top.insert("task".to_string(), Value::Object(fields));
    Value::Object(top)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_status_round_trips_through_str() {
        for status in [
            EventStatus::Pending,
            EventStatus::Processing,
            EventStatus::Completed,
            EventStatus::Failed,
        ] {
            let s = status.to_string();
            let parsed: EventStatus = s.parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn agent_payload_wraps_under_agent_key() {
        let mut fields = Map::new();
        fields.insert("agent_id".to_string(), Value::String("a1".to_string()));
        let payload = agent_payload(fields);
        assert_eq!(payload["agent"]["agent_id"], Value::String("a1".to_string()));
    }
}
