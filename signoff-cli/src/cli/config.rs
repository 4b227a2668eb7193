//! Configuration CLI commands

use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a configuration file with defaults
    Init {
        /// JSON store file for definitions, instances and tasks
        #[arg(long)]
        store_path: Option<String>,

        /// Logging level (error, warn, info, debug, trace)
        #[arg(long)]
        log_level: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Show {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}
