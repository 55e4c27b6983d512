mod cli;
mod commands;

use std::sync::Arc;

use clap::Parser;
use hookrunner_core::config::HookRunnerConfig;
use hookrunner_queue::EventQueue;
use hookrunner_registry::HookRegistry;
use hookrunner_store::Store;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "hookrunner=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = HookRunnerConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({e}), using defaults");
        HookRunnerConfig::default()
    });

    let store = Arc::new(Store::open(&config.store.db_path)?);
    let registry = Arc::new(HookRegistry::new(Arc::clone(&store)));
    let queue = Arc::new(EventQueue::new(Arc::clone(&store)));

    match cli.command {
        Command::Hook { command } => commands::hook_command(&registry, command)?,
        Command::Event { command } => commands::event_command(&queue, command)?,
        Command::Run => commands::run_command(registry, queue, config.dispatcher).await?,
    }

    Ok(())
}
