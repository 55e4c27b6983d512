//! The Dispatcher: wires the registry, queue and executor into a durable
//! hot path plus a crash-tolerant fallback poller (§4.5).

pub mod context;
pub mod engine;
pub mod error;
mod global;
mod helpers;

pub use context::ExecutionContext;
pub use engine::Dispatcher;
pub use error::{DispatcherError, Result};
pub use global::{cleanup_global_dispatcher, global_dispatcher, initialize_global_dispatcher};

#[cfg(test)]
mod tests;
