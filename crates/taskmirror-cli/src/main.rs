//! taskmirror CLI
//!
//! Command-line and terminal interface for a shared task list mirrored
//! live from a remote collection server.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use taskmirror_core::{Config, MemoryCollection, WsCollection};

mod commands;
mod filter;
mod output;
mod tui;

use filter::TaskFilter;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "taskmirror")]
#[command(about = "taskmirror - A shared task list, mirrored live")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the TUI interface (default)
    Tui {
        /// Use an in-process collection instead of a server (for trying out
        /// the interface; nothing is persisted)
        #[arg(long)]
        memory: bool,
    },
    /// Add a new task
    Add {
        /// Task text
        text: String,
    },
    /// List tasks
    #[command(alias = "ls")]
    List {
        /// Which tasks to show
        #[arg(short, long, value_enum, default_value = "active")]
        filter: FilterArg,
    },
    /// Show task details
    Show {
        /// Task id (full key or prefix)
        id: String,
    },
    /// Toggle a task between active and completed
    Toggle {
        /// Task id (full key or prefix)
        id: String,
    },
    /// Delete a task (completed tasks are never deleted)
    #[command(alias = "rm")]
    Delete {
        /// Task id (full key or prefix)
        id: String,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (server_url, collection, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
    /// Print the config file path
    Path,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FilterArg {
    All,
    Active,
    Completed,
}

impl From<FilterArg> for TaskFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => TaskFilter::All,
            FilterArg::Active => TaskFilter::Active,
            FilterArg::Completed => TaskFilter::Completed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // TUI is the default when no command is given
    let command = cli.command.unwrap_or(Commands::Tui { memory: false });

    match command {
        // Config never needs a server connection
        Commands::Config { command } => commands::config(command, &output),

        Commands::Tui { memory } => {
            let config = Config::load()?;
            if memory {
                tui::run(Arc::new(MemoryCollection::new()), &config).await
            } else {
                let remote = open_remote(&config).await?;
                tui::run(Arc::new(remote), &config).await
            }
        }

        one_shot => {
            // One-shot commands log to stderr
            init_logging();

            let config = Config::load()?;
            let remote = open_remote(&config).await?;

            match one_shot {
                Commands::Tui { .. } | Commands::Config { .. } => unreachable!(),
                Commands::Add { text } => commands::add(&remote, &text, &output).await,
                Commands::List { filter } => commands::list(&remote, filter.into(), &output).await,
                Commands::Show { id } => commands::show(&remote, &id, &output).await,
                Commands::Toggle { id } => commands::toggle(&remote, &id, &output).await,
                Commands::Delete { id } => commands::delete(&remote, &id, &output).await,
            }
        }
    }
}

/// Connect to the configured collection server
async fn open_remote(config: &Config) -> Result<WsCollection> {
    let Some(ref url) = config.server_url else {
        bail!(
            "Server URL not configured. Set it with:\n  \
             taskmirror config set server_url ws://your-server:4040"
        );
    };

    WsCollection::connect(url, &config.collection)
        .await
        .with_context(|| format!("Failed to open collection '{}' on {}", config.collection, url))
}

/// Initialize stderr logging for one-shot commands
///
/// Level comes from TASKMIRROR_LOG; warnings and up by default.
fn init_logging() {
    let env_filter = EnvFilter::try_from_env("TASKMIRROR_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
