use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "hookrunner", about = "Event hook subsystem: registry, queue and dispatcher")]
pub struct Cli {
    /// Path to a hookrunner.toml config file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage registered hooks.
    Hook {
        #[command(subcommand)]
        command: HookCommand,
    },
    /// Inspect the event queue.
    Event {
        #[command(subcommand)]
        command: EventCommand,
    },
    /// Run the dispatcher's worker pool and fallback poller until Ctrl-C.
    Run,
}

#[derive(Subcommand)]
pub enum HookCommand {
    /// Register a new hook.
    Add {
        name: String,
        /// Event type tag, e.g. task.started.
        event_type: String,
        /// Path to the Lua script this hook runs.
        file_path: String,
        #[arg(long)]
        stack: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List all registered hooks.
    List,
    Enable { id: String },
    Disable { id: String },
    /// Remove a hook.
    Rm { id: String },
}

#[derive(Subcommand)]
pub enum EventCommand {
    /// List recent events.
    List {
        #[arg(long)]
        event_type: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Show one event plus its per-hook execution history.
    Show { id: String },
}
