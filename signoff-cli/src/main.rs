mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::session::{config_path, Session};
use cli::{definition_handlers, handlers, instance_handlers, task_handlers};
use signoff_core::models::Configuration;
use signoff_core::services::logging::init_logging;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "signoff")]
#[command(version = "0.1.0")]
#[command(about = "Approval workflow engine: definitions, instances and approval tasks")]
#[command(
    help_template = "{name} - {version}\n{about}\n\n{usage-heading}\n  {usage}\n\n{all-args}{options}\n"
)]
struct Cli {
    /// Path to configuration file (default: ~/.config/signoff/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: cli::config::ConfigCommands,
    },

    #[command(flatten)]
    Store(StoreCommands),
}

/// Commands that work against the workflow store
#[derive(Subcommand)]
enum StoreCommands {
    /// Process definition commands
    Definition {
        #[command(subcommand)]
        command: cli::definition::DefinitionCommands,
    },

    /// Workflow instance commands
    Instance {
        #[command(subcommand)]
        command: cli::instance::InstanceCommands,
    },

    /// Approval task commands
    Task {
        #[command(subcommand)]
        command: cli::task::TaskCommands,
    },

    /// Show definition, instance and task counts
    Stats {
        /// Count only this user's pending tasks
        #[arg(short, long)]
        user: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = config_path(cli.config)?;

    match cli.command {
        // Config commands must work even when the file is missing or broken
        Commands::Config { command } => handlers::handle_config_commands(&config_path, command).await,
        Commands::Store(command) => run_store_command(&config_path, command).await,
    }
}

async fn run_store_command(config_path: &Path, command: StoreCommands) -> Result<()> {
    let config = Configuration::load_from_file(config_path)?;
    if let Err(e) = init_logging(config.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    tracing::debug!(
        config = %config_path.display(),
        store = %config.store_path.display(),
        "Loaded configuration"
    );
    let session = Session::from_config(config)?;

    match command {
        StoreCommands::Definition { command } => {
            definition_handlers::handle_definition_commands(&session, command).await?;
        }
        StoreCommands::Instance { command } => {
            instance_handlers::handle_instance_commands(&session, command).await?;
        }
        StoreCommands::Task { command } => {
            task_handlers::handle_task_commands(&session, command).await?;
        }
        StoreCommands::Stats { user, json } => {
            handlers::handle_stats(&session, user, json).await?;
        }
    }

    Ok(())
}
