use std::sync::Arc;
use std::time::Duration;

use hookrunner_core::config::DispatcherConfig;
use hookrunner_core::{Event, EventStatus, EventType, Hook};
use hookrunner_executor::Executor;
use hookrunner_queue::EventQueue;
use hookrunner_registry::HookRegistry;
use hookrunner_store::Store;
use serde_json::json;
use tempfile::tempdir;

use crate::Dispatcher;

fn write_script(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, body).unwrap();
    path.to_string_lossy().to_string()
}

fn build(config: DispatcherConfig) -> (Arc<Dispatcher>, Arc<HookRegistry>, Arc<EventQueue>, Arc<Store>) {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let registry = Arc::new(HookRegistry::new(Arc::clone(&store)));
    let queue = Arc::new(EventQueue::new(Arc::clone(&store)));
    let executor = Arc::new(Executor::new());
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&registry),
        Arc::clone(&queue),
        executor,
        config,
    ));
    (dispatcher, registry, queue, store)
}

fn fast_config() -> DispatcherConfig {
    DispatcherConfig {
        channel_buffer: 1000,
        max_workers: 4,
        poll_interval_secs: 1,
        stuck_threshold_secs: 30,
    }
}

#[tokio::test]
async fn simple_success() {
    let dir = tempdir().unwrap();
    let path = write_script(&dir, "h1.lua", "function on_event() log.info(\"hi\") return true end");
    let (dispatcher, registry, queue, _store) = build(fast_config());
    let hook = registry.add(Hook::new("h1", EventType::TaskStarted, &path)).unwrap();

    dispatcher.start_event_processor();
    dispatcher
        .dispatch(Event::new(EventType::TaskStarted, json!({"task": {"task_name": "t"}})))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    dispatcher.stop_event_processor().await;

    let events = queue.list_events(Some(EventType::TaskStarted), None, 10).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Completed);

    let history = queue.get_event_hook_executions(&events[0].id).unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].success);
    assert!(history[0].output.contains("[INFO] hi\n"));

    let updated_hook = registry.get(&hook.id).unwrap();
    assert_eq!(updated_hook.run_count, 1);
    assert!(updated_hook.last_run.is_some());
}

#[tokio::test]
async fn missing_file_marks_event_failed() {
    let (dispatcher, registry, queue, _store) = build(fast_config());
    let hook = registry
        .add(Hook::new("h2", EventType::Custom, "/nonexistent/hook.lua"))
        .unwrap();

    dispatcher.start_event_processor();
    dispatcher.dispatch(Event::new(EventType::Custom, json!({}))).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    dispatcher.stop_event_processor().await;

    let events = queue.list_events(Some(EventType::Custom), None, 10).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Failed);

    let history = queue.get_event_hook_executions(&events[0].id).unwrap();
    assert_eq!(history.len(), 1);
    assert!(!history[0].success);
    assert!(history[0].error.as_ref().unwrap().contains("hook file not found"));

    assert_eq!(registry.get(&hook.id).unwrap().run_count, 1);
}

#[tokio::test]
async fn disabled_dispatcher_is_a_no_op() {
    let (dispatcher, _registry, queue, _store) = build(fast_config());
    dispatcher.disable();

    dispatcher.dispatch(Event::new(EventType::Custom, json!({}))).unwrap();

    assert!(queue.list_events(None, None, 10).unwrap().is_empty());
}

#[tokio::test]
async fn channel_overflow_recovers_via_fallback_poller() {
    let mut config = fast_config();
    config.max_workers = 0;
    config.poll_interval_secs = 1;
    let (dispatcher, _registry, queue, _store) = build(config);

    for _ in 0..1500 {
        dispatcher.dispatch(Event::new(EventType::Custom, json!({}))).unwrap();
    }
    let all = queue.list_events(None, None, 2000).unwrap();
    assert_eq!(all.len(), 1500);
    assert!(all.iter().all(|e| e.status == EventStatus::Pending));

    dispatcher.start_event_processor();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    dispatcher.stop_event_processor().await;

    let all = queue.list_events(None, None, 2000).unwrap();
    assert!(all.iter().all(|e| e.status != EventStatus::Pending));
}

#[tokio::test]
async fn crash_recovery_picks_up_stuck_events() {
    let (dispatcher, _registry, queue, store) = build(fast_config());

    let enqueued = queue.enqueue(Event::new(EventType::Custom, json!({}))).unwrap();
    queue
        .update_event_status(&enqueued.id, EventStatus::Processing, "")
        .unwrap();
    // Backdate processed_at so the stuck-events sweep (threshold 30s) picks
    // it up as abandoned by a crash rather than genuinely in flight.
    store
        .lock()
        .execute(
            "UPDATE events SET processed_at = processed_at - 60 WHERE id = ?1",
            [&enqueued.id],
        )
        .unwrap();

    dispatcher.start_event_processor();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    dispatcher.stop_event_processor().await;

    let got = queue.get_event(&enqueued.id).unwrap();
    assert_eq!(got.status, EventStatus::Completed);
}

#[tokio::test]
async fn concurrent_fan_out_runs_every_enabled_hook() {
    let dir = tempdir().unwrap();
    let (dispatcher, registry, queue, _store) = build(fast_config());
    for name in ["a", "b", "c"] {
        let path = write_script(&dir, &format!("{name}.lua"), "function on_event() return true end");
        registry.add(Hook::new(name, EventType::Custom, &path)).unwrap();
    }

    dispatcher.start_event_processor();
    dispatcher.dispatch(Event::new(EventType::Custom, json!({}))).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    dispatcher.stop_event_processor().await;

    let events = queue.list_events(Some(EventType::Custom), None, 10).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Completed);

    let history = queue.get_event_hook_executions(&events[0].id).unwrap();
    assert_eq!(history.len(), 3);
    let mut hook_ids: Vec<_> = history.iter().map(|h| h.hook_id.clone()).collect();
    hook_ids.sort();
    hook_ids.dedup();
    assert_eq!(hook_ids.len(), 3);
}

#[tokio::test]
async fn dispatcher_fn_accepts_unknown_tag_without_matching_custom_hooks() {
    let dir = tempdir().unwrap();
    let path = write_script(&dir, "h.lua", "function on_event() return true end");
    let (dispatcher, registry, queue, _store) = build(fast_config());
    registry.add(Hook::new("h", EventType::Custom, &path)).unwrap();

    dispatcher.start_event_processor();
    let dispatch_fn = dispatcher.create_event_dispatcher_fn();
    dispatch_fn("agent.teleported", json!({})).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    dispatcher.stop_event_processor().await;

    let events = queue.list_events(None, None, 10).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Unrecognized);
    // Completed with zero executions: the custom hook must not have matched.
    assert_eq!(events[0].status, EventStatus::Completed);
    assert!(queue.get_event_hook_executions(&events[0].id).unwrap().is_empty());
}
