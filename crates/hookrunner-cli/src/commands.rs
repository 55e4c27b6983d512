use std::sync::Arc;

use hookrunner_core::{EventStatus, EventType, Hook};
use hookrunner_dispatcher::Dispatcher;
use hookrunner_executor::Executor;
use hookrunner_queue::EventQueue;
use hookrunner_registry::HookRegistry;

use crate::cli::{EventCommand, HookCommand};

pub fn hook_command(registry: &HookRegistry, command: HookCommand) -> anyhow::Result<()> {
    match command {
        HookCommand::Add { name, event_type, file_path, stack, description } => {
            let event_type: EventType = event_type
                .parse()
                .map_err(|e: hookrunner_core::UnknownEventType| anyhow::anyhow!(e.to_string()))?;
            let mut hook = Hook::new(name, event_type, file_path);
            if let Some(stack) = stack {
                hook = hook.with_stack(stack);
            }
            if !description.is_empty() {
                hook = hook.with_description(description);
            }
            let hook = registry.add(hook)?;
            println!("registered hook {} ({})", hook.name, hook.id);
        }
        HookCommand::List => {
            for hook in registry.list()? {
                println!(
                    "{}\t{}\t{}\t{}\trun_count={}",
                    hook.id,
                    hook.name,
                    hook.event_type,
                    if hook.enabled { "enabled" } else { "disabled" },
                    hook.run_count,
                );
            }
        }
        HookCommand::Enable { id } => {
            registry.enable(&id)?;
            println!("enabled {id}");
        }
        HookCommand::Disable { id } => {
            registry.disable(&id)?;
            println!("disabled {id}");
        }
        HookCommand::Rm { id } => {
            registry.delete(&id)?;
            println!("removed {id}");
        }
    }
    Ok(())
}

pub fn event_command(queue: &EventQueue, command: EventCommand) -> anyhow::Result<()> {
    match command {
        EventCommand::List { event_type, status, limit } => {
            let type_filter = event_type
                .map(|t| t.parse())
                .transpose()
                .map_err(|e: hookrunner_core::UnknownEventType| anyhow::anyhow!(e.to_string()))?;
            let status_filter: Option<EventStatus> = status
                .map(|s| s.parse())
                .transpose()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            for event in queue.list_events(type_filter, status_filter, limit)? {
                println!(
                    "{}\t{}\t{}\tcreated_at={}",
                    event.id, event.event_type, event.status, event.created_at
                );
            }
        }
        EventCommand::Show { id } => {
            let event = queue.get_event(&id)?;
            println!("id:         {}", event.id);
            println!("type:       {}", event.event_type);
            println!("status:     {}", event.status);
            println!("created_at: {}", event.created_at);
            if let Some(error) = &event.error {
                println!("error:      {error}");
            }
            println!("executions:");
            for execution in queue.get_event_hook_executions(&id)? {
                println!(
                    "  {}\t{}\tsuccess={}\tduration_ms={}",
                    execution.hook_name, execution.hook_id, execution.success, execution.duration_ms
                );
            }
        }
    }
    Ok(())
}

pub async fn run_command(
    registry: Arc<HookRegistry>,
    queue: Arc<EventQueue>,
    config: hookrunner_core::config::DispatcherConfig,
) -> anyhow::Result<()> {
    let executor = Arc::new(Executor::new());
    let dispatcher = Arc::new(Dispatcher::new(registry, queue, executor, config));
    dispatcher.start_event_processor();
    tracing::info!("dispatcher running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    dispatcher.stop_event_processor().await;
    Ok(())
}
