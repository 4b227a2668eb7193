//! Instance CLI commands

use clap::Subcommand;

#[derive(Subcommand)]
pub enum InstanceCommands {
    /// Start an instance of an active definition
    ///
    /// Form values and variables are JSON objects, given inline or as
    /// `@path` to read them from a file. Branch conditions see the form
    /// values first, then the variables.
    ///
    /// Examples:
    ///   signoff instance start <DEFINITION_ID> --title "Trip to Berlin" --form '{"amount": 420}'
    ///   signoff instance start <DEFINITION_ID> --title "Laptop" --form @form.json --json
    Start {
        /// Definition ID (UUID)
        definition_id: String,

        /// Instance title
        #[arg(short, long)]
        title: String,

        /// Business key of the subject under approval
        #[arg(short, long, default_value = "")]
        business_key: String,

        /// Business type of the subject under approval
        #[arg(long, default_value = "")]
        business_type: String,

        /// Submitted form values (JSON object or @file)
        #[arg(short, long)]
        form: Option<String>,

        /// Seed process variables (JSON object or @file)
        #[arg(long)]
        variables: Option<String>,

        /// Initiator identity
        #[arg(short, long, default_value = "cli-user")]
        initiator: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show an instance with its tasks
    Show {
        /// Instance ID (UUID)
        instance_id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List instances, newest first
    List {
        /// Only instances in this status
        #[arg(short, long)]
        status: Option<String>,

        /// Only instances started by this user
        #[arg(long)]
        initiator: Option<String>,

        /// Only instances this user started or holds a task on
        #[arg(long)]
        involving: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Cancel a running instance
    Cancel {
        /// Instance ID (UUID)
        instance_id: String,

        /// Operator identity
        #[arg(short, long, default_value = "cli-user")]
        operator: String,

        /// Reason recorded in the history
        #[arg(short, long, default_value = "")]
        comment: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Pause a running instance
    Suspend {
        /// Instance ID (UUID)
        instance_id: String,

        /// Operator identity
        #[arg(short, long, default_value = "cli-user")]
        operator: String,

        /// Reason recorded in the history
        #[arg(short, long, default_value = "")]
        comment: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Resume a suspended instance
    Resume {
        /// Instance ID (UUID)
        instance_id: String,

        /// Operator identity
        #[arg(short, long, default_value = "cli-user")]
        operator: String,

        /// Reason recorded in the history
        #[arg(short, long, default_value = "")]
        comment: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the audit history of an instance
    History {
        /// Instance ID (UUID)
        instance_id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}
