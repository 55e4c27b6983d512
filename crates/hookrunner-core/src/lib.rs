//! Shared data model, error types and configuration for the event hook
//! subsystem: [`Event`], [`Hook`], [`HookResult`], [`EventHookExecution`],
//! the closed [`event_type::EventType`] enumeration, and [`config::HookRunnerConfig`].

pub mod config;
pub mod error;
pub mod event_type;
pub mod types;

pub use error::{CoreError, Result};
pub use event_type::{EventType, UnknownEventType};
pub use types::{
    agent_payload, now_millis, now_secs, task_payload, Event, EventHookExecution, EventStatus,
    Hook, HookResult,
};
