//! Definition CLI commands

use clap::Subcommand;

#[derive(Subcommand)]
pub enum DefinitionCommands {
    /// Import a definition from a JSON or YAML file
    ///
    /// The document carries `name`, `category`, an optional `description`
    /// and the nested `node_tree`. Imported definitions start as drafts.
    ///
    /// Examples:
    ///   signoff definition import leave.yaml --activate
    ///   signoff definition import purchase.json --creator alice --json
    Import {
        /// Path to the definition file (.json, .yaml or .yml)
        file: String,

        /// Creator identity
        #[arg(short, long, default_value = "cli-user")]
        creator: String,

        /// Activate the definition right after import
        #[arg(long)]
        activate: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List definitions
    List {
        /// Only definitions in this status (draft, active, inactive)
        #[arg(short, long)]
        status: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show a definition and its flattened nodes
    Show {
        /// Definition ID (UUID)
        definition_id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Allow new instances of a definition
    Activate {
        /// Definition ID (UUID)
        definition_id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Stop new instances of a definition; running ones continue
    Deactivate {
        /// Definition ID (UUID)
        definition_id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Create the next version of a definition from a node tree file
    NewVersion {
        /// Definition ID (UUID) of any existing version
        definition_id: String,

        /// Path to the node tree file (.json, .yaml or .yml)
        file: String,

        /// Creator identity
        #[arg(short, long, default_value = "cli-user")]
        creator: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}
