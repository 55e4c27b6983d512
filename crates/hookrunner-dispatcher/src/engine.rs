use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use hookrunner_core::config::DispatcherConfig;
use hookrunner_core::{Event, EventStatus};
use hookrunner_executor::Executor;
use hookrunner_queue::EventQueue;
use hookrunner_registry::HookRegistry;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, warn};

use crate::context::ExecutionContext;
use crate::error::Result;

/// Dispatches events to matching enabled hooks, owning a worker pool plus a
/// fallback poller that guarantees at-least-once delivery (§4.5).
pub struct Dispatcher {
    registry: Arc<HookRegistry>,
    queue: Arc<EventQueue>,
    executor: Arc<Executor>,
    config: DispatcherConfig,
    enabled: RwLock<bool>,
    context: RwLock<ExecutionContext>,
    processing: RwLock<bool>,
    event_tx: RwLock<Option<mpsc::Sender<Event>>>,
    stop_tx: RwLock<Option<watch::Sender<bool>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<HookRegistry>,
        queue: Arc<EventQueue>,
        executor: Arc<Executor>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            registry,
            queue,
            executor,
            config,
            enabled: RwLock::new(true),
            context: RwLock::new(ExecutionContext::default()),
            processing: RwLock::new(false),
            event_tx: RwLock::new(None),
            stop_tx: RwLock::new(None),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled.read().expect("dispatcher lock poisoned")
    }

    pub fn enable(&self) {
        *self.enabled.write().expect("dispatcher lock poisoned") = true;
    }

    pub fn disable(&self) {
        *self.enabled.write().expect("dispatcher lock poisoned") = false;
    }

    pub fn is_processing(&self) -> bool {
        *self.processing.read().expect("dispatcher lock poisoned")
    }

    pub fn set_execution_context(
        &self,
        stack: Option<String>,
        agent: Option<String>,
        run_id: Option<String>,
    ) {
        let mut ctx = self.context.write().expect("dispatcher lock poisoned");
        *ctx = ExecutionContext { stack, agent, run_id };
    }

    pub fn current_stack(&self) -> Option<String> {
        self.context.read().expect("dispatcher lock poisoned").stack.clone()
    }

    pub fn current_agent(&self) -> Option<String> {
        self.context.read().expect("dispatcher lock poisoned").agent.clone()
    }

    pub fn current_run_id(&self) -> Option<String> {
        self.context.read().expect("dispatcher lock poisoned").run_id.clone()
    }

    /// Enqueue `event`, stamping any ambient-context fields it left unset,
    /// then hand it to the hot path non-blockingly. A no-op when disabled.
    pub fn dispatch(&self, mut event: Event) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        {
            let ctx = self.context.read().expect("dispatcher lock poisoned");
            event.stack = event.stack.or_else(|| ctx.stack.clone());
            event.agent = event.agent.or_else(|| ctx.agent.clone());
            event.run_id = event.run_id.or_else(|| ctx.run_id.clone());
        }

        let enqueued = self.queue.enqueue(event)?;

        let tx_guard = self.event_tx.read().expect("dispatcher lock poisoned");
        if let Some(tx) = tx_guard.as_ref() {
            match tx.try_send(enqueued) {
                Ok(()) => debug!("event handed to hot path"),
                Err(_) => warn!("event channel full, relying on fallback poller"),
            }
        }
        Ok(())
    }

    /// Launch `max_workers` worker tasks plus one fallback poller. Repeat
    /// calls are a no-op.
    pub fn start_event_processor(self: &Arc<Self>) {
        let mut processing = self.processing.write().expect("dispatcher lock poisoned");
        if *processing {
            return;
        }

        let (tx, rx) = mpsc::channel(self.config.channel_buffer);
        *self.event_tx.write().expect("dispatcher lock poisoned") = Some(tx);
        let (stop_tx, stop_rx) = watch::channel(false);
        *self.stop_tx.write().expect("dispatcher lock poisoned") = Some(stop_tx);

        let rx = Arc::new(AsyncMutex::new(rx));
        let mut handles = Vec::with_capacity(self.config.max_workers + 1);
        for _ in 0..self.config.max_workers {
            let dispatcher = Arc::clone(self);
            let rx = Arc::clone(&rx);
            handles.push(tokio::spawn(async move {
                worker_loop(dispatcher, rx).await;
            }));
        }

        let dispatcher = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            poller_loop(dispatcher, stop_rx).await;
        }));

        self.tasks.lock().expect("dispatcher lock poisoned").extend(handles);
        *processing = true;
        debug!(workers = self.config.max_workers, "event processor started");
    }

    /// Signal shutdown, close the hot-path sender, and wait for every worker
    /// and the poller to drain and exit.
    pub async fn stop_event_processor(&self) {
        if !self.is_processing() {
            return;
        }

        if let Some(stop_tx) = self.stop_tx.write().expect("dispatcher lock poisoned").take() {
            let _ = stop_tx.send(true);
        }
        self.event_tx.write().expect("dispatcher lock poisoned").take();

        let handles: Vec<JoinHandle<()>> =
            std::mem::take(&mut *self.tasks.lock().expect("dispatcher lock poisoned"));
        for handle in handles {
            let _ = handle.await;
        }

        *self.processing.write().expect("dispatcher lock poisoned") = false;
        debug!("event processor stopped");
    }

    /// Drains pending events in batches of 10 (so a flooded queue converges
    /// within a single tick rather than waiting out one batch per tick).
    /// Only when a tick finds no pending events at all does it fall through
    /// to sweeping stuck `processing` events left behind by a crash — a
    /// backlog of fresh work takes priority over crash recovery on the same
    /// tick.
    async fn poll_once(&self) -> Result<()> {
        let mut found_pending = false;
        loop {
            let pending = self.queue.get_pending_events(10)?;
            if pending.is_empty() {
                break;
            }
            found_pending = true;
            for event in pending {
                self.process_event(event).await;
            }
        }

        if found_pending {
            return Ok(());
        }

        let stuck = self
            .queue
            .get_stuck_processing_events(self.config.stuck_threshold_secs, 10)?;
        for event in stuck {
            self.process_event(event).await;
        }
        Ok(())
    }

    /// Transition `event` through `processing` to a terminal status, running
    /// every enabled hook matching its type concurrently (§4.5.4).
    async fn process_event(&self, event: Event) {
        if let Err(e) = self.queue.update_event_status(&event.id, EventStatus::Processing, "") {
            error!("failed to mark event processing: {e}");
            return;
        }

        let hooks = match self.registry.list_by_event_type(event.event_type) {
            Ok(hooks) => hooks,
            Err(e) => {
                error!("failed to look up hooks: {e}");
                return;
            }
        };

        if hooks.is_empty() {
            if let Err(e) = self.queue.update_event_status(&event.id, EventStatus::Completed, "") {
                error!("failed to mark event completed: {e}");
            }
            return;
        }

        let mut set = JoinSet::new();
        for hook in hooks {
            let executor = Arc::clone(&self.executor);
            let queue = Arc::clone(&self.queue);
            let registry = Arc::clone(&self.registry);
            let event = event.clone();
            set.spawn(async move {
                let hook_for_exec = hook.clone();
                let event_for_exec = event.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    executor.execute(&hook_for_exec, &event_for_exec)
                })
                .await;

                match outcome {
                    Ok(Ok(result)) => {
                        if let Err(e) =
                            queue.record_event_hook_execution(&event.id, &hook.id, &hook.name, &result)
                        {
                            error!("failed to record event-hook execution: {e}");
                        }
                        if let Err(e) = registry.record_execution(&result) {
                            error!("failed to record hook execution: {e}");
                        }
                        if result.success {
                            None
                        } else {
                            Some(format!(
                                "{}: {}",
                                hook.name,
                                result.error.unwrap_or_default()
                            ))
                        }
                    }
                    Ok(Err(e)) => Some(format!("{}: {e}", hook.name)),
                    Err(join_err) => Some(format!("{}: {join_err}", hook.name)),
                }
            });
        }

        let mut errors = Vec::new();
        while let Some(outcome) = set.join_next().await {
            match outcome {
                Ok(Some(msg)) => errors.push(msg),
                Ok(None) => {}
                Err(join_err) => errors.push(join_err.to_string()),
            }
        }

        let result = if errors.is_empty() {
            self.queue.update_event_status(&event.id, EventStatus::Completed, "")
        } else {
            self.queue
                .update_event_status(&event.id, EventStatus::Failed, &errors.join("; "))
        };
        if let Err(e) = result {
            error!("failed to finalize event status: {e}");
        }
    }
}

async fn worker_loop(dispatcher: Arc<Dispatcher>, rx: Arc<AsyncMutex<mpsc::Receiver<Event>>>) {
    loop {
        let event = rx.lock().await.recv().await;
        match event {
            Some(event) => dispatcher.process_event(event).await,
            None => break,
        }
    }
}

async fn poller_loop(dispatcher: Arc<Dispatcher>, mut stop_rx: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(Duration::from_secs(dispatcher.config.poll_interval_secs));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = dispatcher.poll_once().await {
                    error!("poller tick error: {e}");
                }
            }
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    break;
                }
            }
        }
    }
}
