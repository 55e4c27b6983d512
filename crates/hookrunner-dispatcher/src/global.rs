//! Process-wide [`Dispatcher`] singleton (§4.5.7), so upstream subsystems can
//! reach it without threading an `Arc<Dispatcher>` through every call site.
//! Initialization and cleanup are idempotent; concurrent init/get/cleanup is
//! safe via [`OnceLock`] plus the dispatcher's own `RwLock` discipline.

use std::sync::{Arc, OnceLock};

use crate::engine::Dispatcher;
use crate::error::{DispatcherError, Result};

static GLOBAL_DISPATCHER: OnceLock<Arc<Dispatcher>> = OnceLock::new();

/// Install `dispatcher` as the process-wide instance. A second call is a
/// no-op success — it does not replace the existing instance.
pub fn initialize_global_dispatcher(dispatcher: Arc<Dispatcher>) -> Result<()> {
    match GLOBAL_DISPATCHER.set(dispatcher) {
        Ok(()) => Ok(()),
        Err(_) => Ok(()),
    }
}

pub fn global_dispatcher() -> Result<Arc<Dispatcher>> {
    GLOBAL_DISPATCHER
        .get()
        .cloned()
        .ok_or(DispatcherError::NotInitialized)
}

/// Stop the processor on the global dispatcher, if one was ever initialized.
pub async fn cleanup_global_dispatcher() {
    if let Some(dispatcher) = GLOBAL_DISPATCHER.get() {
        dispatcher.stop_event_processor().await;
    }
}
