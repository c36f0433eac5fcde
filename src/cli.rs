use clap::{Parser, Subcommand};

use docket::subscribe::{DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL_MS};

#[derive(Parser)]
#[command(name = "docket", about = "Shared task lists for a small law office")]
pub struct Cli {
    /// Path to the SQLite list store [default: config override, else ~/.docket/docket.db]
    #[arg(long, env = "DOCKET_DB", global = true)]
    pub db: Option<String>,

    /// Session standing in for a browser tab [default: this terminal]
    #[arg(long, env = "DOCKET_SESSION", global = true)]
    pub session: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show all lists, newest first (opens the overview)
    Lists {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a list
    New {
        /// List title
        title: String,
    },

    /// Delete a list and all its tasks
    Delete {
        /// List id (or unique prefix)
        list: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show one list
    Show {
        /// List id (or unique prefix)
        list: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Open a link fragment such as `#/` or `#/list/<id>`
    Open {
        /// Fragment; empty means the overview
        #[arg(default_value = "")]
        fragment: String,
    },

    /// Add a task to a list
    Add {
        /// List id (or unique prefix)
        list: String,
        /// Task description
        description: String,
        /// Person responsible
        #[arg(short, long)]
        assignee: String,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },

    /// Edit fields of a task
    Edit {
        /// List id (or unique prefix)
        list: String,
        /// Task id (or unique prefix)
        task: String,
        /// New description
        #[arg(short, long)]
        desc: Option<String>,
        /// New assignee
        #[arg(short, long)]
        assignee: Option<String>,
        /// New due date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },

    /// Mark a task completed, or pending again
    Toggle {
        /// List id (or unique prefix)
        list: String,
        /// Task id (or unique prefix)
        task: String,
    },

    /// Remove a task
    Rm {
        /// List id (or unique prefix)
        list: String,
        /// Task id (or unique prefix)
        task: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Ask the suggestion service for tasks and add them
    Suggest {
        /// List id (or unique prefix)
        list: String,
    },

    /// Print the link for sharing a list
    Share {
        /// List id (or unique prefix)
        list: String,
    },

    /// Print a view and reprint it on every change
    Watch {
        /// Fragment; empty means the overview
        #[arg(default_value = "")]
        fragment: String,
        /// Poll interval in milliseconds (safety net; changes are watched)
        #[arg(
            long,
            default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64,
            value_parser = clap::value_parser!(u64).range(MIN_POLL_INTERVAL_MS..)
        )]
        poll_interval: u64,
    },

    /// Launch interactive TUI
    Ui {
        /// Fragment to start at; empty means the overview
        #[arg(default_value = "")]
        fragment: String,
        /// Poll interval in milliseconds (safety net; changes are watched)
        #[arg(
            long,
            default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64,
            value_parser = clap::value_parser!(u64).range(MIN_POLL_INTERVAL_MS..)
        )]
        poll_interval: u64,
    },

    /// Inspect or reset this session's owner status
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Inspect or change the local configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Show the session id and whether it is marked as owner
    Show,
    /// Drop the owner marker for this session
    Forget,
    /// List sessions that have state on disk
    List,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Point at a different list store (takes effect on the next start)
    SetStore {
        /// Path of the SQLite list store
        path: String,
    },
    /// Go back to the built-in store location
    Reset,
}
