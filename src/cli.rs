//! CLI argument definitions for taskdeck.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// taskdeck - file-backed task and epic tracking.
///
/// Records live as plain JSON files under the tasks and epics roots, so the
/// whole tracker can be committed alongside the code it describes.
#[derive(Parser, Debug)]
#[command(name = "td")]
#[command(author, version, about = "A file-backed CLI task tracker", long_about = None)]
pub struct Cli {
    /// Root directory for task storage.
    /// Can also be set via the TD_TASKS_ROOT environment variable.
    #[arg(long = "tasks-root", global = true, env = "TD_TASKS_ROOT", default_value = ".tasks")]
    pub tasks_root: PathBuf,

    /// Root directory for epic storage.
    /// Can also be set via the TD_EPICS_ROOT environment variable.
    #[arg(long = "epics-root", global = true, env = "TD_EPICS_ROOT", default_value = ".epics")]
    pub epics_root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Queue management commands
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },

    /// Task management commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Epic management commands
    Epic {
        #[command(subcommand)]
        command: EpicCommands,
    },

    /// Repair link symmetry and report in-progress tasks and invalid epics
    Verify,

    /// Repair link symmetry and epic hierarchy back-references
    Repair,

    /// Export all tasks to a single JSON file
    Export {
        /// Output file path
        #[arg(long, default_value = "tasks.json")]
        output: PathBuf,
    },

    /// Fetch task records from GitHub repositories
    Github {
        /// Repositories in owner/repo form (repeatable)
        #[arg(long = "repo", required = true)]
        repos: Vec<String>,

        /// GitHub token for authenticated requests
        #[arg(long, env = "GITHUB_TOKEN")]
        token: Option<String>,
    },
}

/// Queue subcommands
#[derive(Subcommand, Debug)]
pub enum QueueCommands {
    /// List all queues
    List,

    /// Add a new queue
    Add {
        /// Queue name (directory name, filesystem-safe)
        #[arg(long)]
        name: String,

        /// Queue title
        #[arg(long)]
        title: String,

        /// Queue description
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Delete a queue and every task in it
    Delete {
        /// Queue name
        #[arg(long)]
        name: String,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// List tasks
    List {
        /// Filter by status (todo, in_progress, done)
        #[arg(long)]
        status: Option<String>,

        /// Filter by queue
        #[arg(long)]
        queue: Option<String>,

        /// Filter by epic membership
        #[arg(long)]
        epic: Option<String>,
    },

    /// Add a new task
    Add {
        /// Task title
        #[arg(long)]
        title: String,

        /// Task description
        #[arg(long, default_value = "")]
        description: String,

        /// Queue name
        #[arg(long)]
        queue: String,
    },

    /// Show task details
    Show {
        /// Task ID
        #[arg(long)]
        id: String,
    },

    /// Update a task field (title, description, status)
    Update {
        /// Task ID
        #[arg(long)]
        id: String,

        /// Field to update
        #[arg(long)]
        field: String,

        /// New value
        #[arg(long)]
        value: String,
    },

    /// Mark a task in progress
    Start {
        /// Task ID
        #[arg(long)]
        id: String,
    },

    /// Mark a task done
    Done {
        /// Task ID
        #[arg(long)]
        id: String,
    },

    /// Delete a task
    Delete {
        /// Task ID
        #[arg(long)]
        id: String,
    },

    /// Task comment management
    Comment {
        #[command(subcommand)]
        command: CommentCommands,
    },

    /// Task link management
    Link {
        #[command(subcommand)]
        command: LinkCommands,
    },

    /// List epics a task belongs to
    Epics {
        /// Task ID
        #[arg(long)]
        id: String,
    },
}

/// Comment subcommands
#[derive(Subcommand, Debug)]
pub enum CommentCommands {
    /// Add a comment to a task
    Add {
        /// Task ID
        #[arg(long)]
        id: String,

        /// Comment text
        #[arg(long)]
        comment: String,
    },

    /// Edit an existing comment
    Edit {
        /// Task ID
        #[arg(long)]
        id: String,

        /// Comment ID
        #[arg(long = "comment-id")]
        comment_id: u64,

        /// New comment text
        #[arg(long)]
        comment: String,
    },

    /// Remove a comment from a task
    Remove {
        /// Task ID
        #[arg(long)]
        id: String,

        /// Comment ID
        #[arg(long = "comment-id")]
        comment_id: u64,
    },

    /// List task comments
    List {
        /// Task ID
        #[arg(long)]
        id: String,
    },
}

/// Link subcommands
#[derive(Subcommand, Debug)]
pub enum LinkCommands {
    /// Link two tasks
    Add {
        /// Task ID
        #[arg(long)]
        id: String,

        /// Target task ID
        #[arg(long)]
        target: String,

        /// Link type
        #[arg(long = "type", default_value = crate::manager::links::DEFAULT_LINK_TYPE)]
        link_type: String,
    },

    /// Remove a link between two tasks
    Remove {
        /// Task ID
        #[arg(long)]
        id: String,

        /// Target task ID
        #[arg(long)]
        target: String,

        /// Link type
        #[arg(long = "type", default_value = crate::manager::links::DEFAULT_LINK_TYPE)]
        link_type: String,
    },

    /// List a task's links
    List {
        /// Task ID
        #[arg(long)]
        id: String,
    },
}

/// Epic subcommands
#[derive(Subcommand, Debug)]
pub enum EpicCommands {
    /// List all epics
    List,

    /// Add a new epic
    Add {
        /// Epic title
        #[arg(long)]
        title: String,

        /// Epic description
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Show epic details
    Show {
        /// Epic ID
        #[arg(long)]
        id: String,
    },

    /// Update an epic field (title, description, status)
    Update {
        /// Epic ID
        #[arg(long)]
        id: String,

        /// Field to update
        #[arg(long)]
        field: String,

        /// New value
        #[arg(long)]
        value: String,
    },

    /// Close an epic (requires all children complete)
    Done {
        /// Epic ID
        #[arg(long)]
        id: String,
    },

    /// Delete an epic
    Delete {
        /// Epic ID
        #[arg(long)]
        id: String,
    },

    /// Add a task to an epic
    AddTask {
        /// Epic ID
        #[arg(long)]
        id: String,

        /// Task ID
        #[arg(long = "task-id")]
        task_id: String,
    },

    /// Remove a task from an epic
    RemoveTask {
        /// Epic ID
        #[arg(long)]
        id: String,

        /// Task ID
        #[arg(long = "task-id")]
        task_id: String,
    },

    /// Nest a child epic under this epic
    AddEpic {
        /// Parent epic ID
        #[arg(long)]
        id: String,

        /// Child epic ID
        #[arg(long = "child-id")]
        child_id: String,
    },

    /// Unnest a child epic from this epic
    RemoveEpic {
        /// Parent epic ID
        #[arg(long)]
        id: String,

        /// Child epic ID
        #[arg(long = "child-id")]
        child_id: String,
    },
}
