//! Taskdeck - a zero-server work tracker over a plain file tree.
//!
//! This library provides the core functionality for the `td` CLI tool:
//! queues of tasks, a two-level epic hierarchy, a symmetric link graph
//! between tasks, and the consistency engine that keeps all of it honest.

pub mod cache;
pub mod cli;
pub mod export;
pub mod github;
pub mod manager;
pub mod models;
pub mod storage;

/// Library-level error type for taskdeck operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Queue '{0}' not found")]
    QueueNotFound(String),

    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    #[error("Epic '{0}' not found")]
    EpicNotFound(String),

    #[error("Epic '{child}' not found in epic '{parent}'")]
    EpicChildNotFound { parent: String, child: String },

    #[error("Comment with ID {comment_id} not found in task '{task_id}'")]
    CommentNotFound { task_id: String, comment_id: u64 },

    #[error("Link between {0} and {1} not found")]
    LinkNotFound(String, String),

    #[error("Queue '{0}' already exists")]
    QueueExists(String),

    #[error("Link between {0} and {1} already exists")]
    LinkExists(String, String),

    #[error("{0}")]
    InvalidField(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for taskdeck operations.
pub type Result<T> = std::result::Result<T, Error>;
