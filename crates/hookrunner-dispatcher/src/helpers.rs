//! Typed dispatch convenience methods (§4.5.6): build an [`Event`] of the
//! correct type with its canonical payload shape and dispatch it.

use std::sync::Arc;

use hookrunner_core::{agent_payload, task_payload, Event, EventType};
use serde_json::Map;
use serde_json::Value;

use crate::engine::Dispatcher;
use crate::error::Result;

impl Dispatcher {
    fn dispatch_typed(&self, event_type: EventType, data: Value) -> Result<()> {
        self.dispatch(Event::new(event_type, data))
    }

    pub fn dispatch_agent_registered(&self, fields: Map<String, Value>) -> Result<()> {
        self.dispatch_typed(EventType::AgentRegistered, agent_payload(fields))
    }

    pub fn dispatch_agent_disconnected(&self, fields: Map<String, Value>) -> Result<()> {
        self.dispatch_typed(EventType::AgentDisconnected, agent_payload(fields))
    }

    pub fn dispatch_task_started(&self, fields: Map<String, Value>) -> Result<()> {
        self.dispatch_typed(EventType::TaskStarted, task_payload(fields))
    }

    pub fn dispatch_task_completed(&self, fields: Map<String, Value>) -> Result<()> {
        self.dispatch_typed(EventType::TaskCompleted, task_payload(fields))
    }

    pub fn dispatch_task_failed(&self, fields: Map<String, Value>) -> Result<()> {
        self.dispatch_typed(EventType::TaskFailed, task_payload(fields))
    }

    /// A closure of signature `(type_str, data) -> Result<()>` that stamps
    /// the dispatcher's ambient execution context onto each event. Lets
    /// scripting/CLI integrations dispatch without threading `Arc<Dispatcher>`
    /// through every call site.
    pub fn create_event_dispatcher_fn(
        self: &Arc<Self>,
    ) -> impl Fn(&str, Value) -> Result<()> + Clone + 'static {
        let dispatcher = Arc::clone(self);
        move |type_str: &str, data: Value| -> Result<()> {
            // An unrecognized tag is accepted, not rejected — but it must not
            // spuriously match hooks registered for a real type such as
            // `custom`, so it gets the dedicated sentinel instead.
            let event_type: EventType = type_str
                .parse()
                .unwrap_or(EventType::Unrecognized);
            let mut event = Event::new(event_type, data);
            event.stack = dispatcher.current_stack();
            event.agent = dispatcher.current_agent();
            event.run_id = dispatcher.current_run_id();
            dispatcher.dispatch(event)
        }
    }
}
