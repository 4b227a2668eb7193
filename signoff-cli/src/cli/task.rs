use clap::Subcommand;

#[derive(Subcommand)]
pub enum TaskCommands {
    /// List your pending tasks, highest priority first
    Mine {
        /// Assignee identity
        #[arg(short, long, default_value = "cli-user")]
        user: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show task details
    Show {
        /// Task ID (UUID)
        task_id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Approve a pending task
    ///
    /// Examples:
    ///   signoff task approve <TASK_ID> --user boss --comment "enjoy"
    ///   signoff task approve <TASK_ID> --user boss --form '{"approved_days": 2}'
    Approve {
        /// Task ID (UUID)
        task_id: String,

        /// Assignee identity
        #[arg(short, long, default_value = "cli-user")]
        user: String,

        /// Comment recorded on the task and in the history
        #[arg(short, long, default_value = "")]
        comment: String,

        /// Form values submitted with the approval (JSON object or @file)
        #[arg(short, long)]
        form: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Reject a pending task, which rejects the whole instance
    Reject {
        /// Task ID (UUID)
        task_id: String,

        /// Assignee identity
        #[arg(short, long, default_value = "cli-user")]
        user: String,

        /// Comment recorded on the task and in the history
        #[arg(short, long, default_value = "")]
        comment: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}
