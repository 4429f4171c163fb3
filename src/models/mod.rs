//! Data models for taskdeck entities.
//!
//! This module defines the core data structures:
//! - `Queue` - Named container for sequentially numbered tasks
//! - `Task` - Work items with status, comments, links, and epic memberships
//! - `Epic` - Grouping entity over tasks and/or child epics
//! - `Comment` - Per-task note with a monotonic integer id
//!
//! Records are persisted one file per entity; serde defaults keep older
//! records readable when optional fields are missing. Timestamps are
//! epoch-second floats to stay compatible with the existing on-disk format.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::storage::now;

/// Task status in the workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// All valid status values, in workflow order.
    pub fn all() -> &'static [TaskStatus] {
        &[TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done]
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            _ => Err(crate::Error::InvalidField(format!(
                "Invalid status '{}'. Valid statuses: todo, in_progress, done",
                s
            ))),
        }
    }
}

/// Epic status: open until every child is complete, then closable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpicStatus {
    #[default]
    Open,
    Closed,
}

impl fmt::Display for EpicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EpicStatus::Open => "open",
            EpicStatus::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for EpicStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "open" => Ok(EpicStatus::Open),
            "closed" => Ok(EpicStatus::Closed),
            _ => Err(crate::Error::InvalidField(format!(
                "Invalid status '{}'. Valid statuses: open, closed",
                s
            ))),
        }
    }
}

/// Queue metadata as persisted in `<queue>/meta.json`.
///
/// The queue name is the directory name, not part of the record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueMeta {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// A task queue: directory name plus its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Queue {
    pub name: String,
    pub title: String,
    pub description: String,
}

impl Queue {
    /// Build a queue from its directory name and stored metadata.
    pub fn from_meta(name: &str, meta: QueueMeta) -> Self {
        Self {
            name: name.to_string(),
            title: meta.title,
            description: meta.description,
        }
    }

    pub fn meta(&self) -> QueueMeta {
        QueueMeta {
            title: self.title.clone(),
            description: self.description.clone(),
        }
    }
}

/// A comment on a task. Ids are per-task monotonic and never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub created_at: f64,
    /// Set on first edit, absent until then.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<f64>,
}

/// A work item tracked by taskdeck.
///
/// Field order matches the persisted record layout; do not reorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier `<queue>-<n>` (immutable)
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: TaskStatus,

    /// Comments in insertion order
    #[serde(default)]
    pub comments: Vec<Comment>,

    /// Symmetric typed links: link type -> target task ids
    #[serde(default)]
    pub links: BTreeMap<String, Vec<String>>,

    /// Denormalized epic back-references; authoritative data lives on the Epic
    #[serde(default)]
    pub epics: Vec<String>,

    #[serde(default)]
    pub created_at: f64,

    #[serde(default)]
    pub updated_at: f64,

    /// Set on first transition to in_progress, never overwritten
    #[serde(default)]
    pub started_at: Option<f64>,

    /// Set on first transition to done, never overwritten
    #[serde(default)]
    pub closed_at: Option<f64>,
}

impl Task {
    /// Create a new task with the given id, title, and description.
    pub fn new(id: String, title: String, description: String) -> Self {
        let ts = now();
        Self {
            id,
            title,
            description,
            status: TaskStatus::default(),
            comments: Vec::new(),
            links: BTreeMap::new(),
            epics: Vec::new(),
            created_at: ts,
            updated_at: ts,
            started_at: None,
            closed_at: None,
        }
    }

    /// The queue this task belongs to, derived from its id prefix.
    pub fn queue_name(&self) -> Option<&str> {
        self.id.rsplit_once('-').map(|(queue, _)| queue)
    }
}

/// An epic grouping tasks and child epics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Epic {
    /// Unique identifier `epic-<n>`
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: EpicStatus,

    /// Ordered child task ids
    #[serde(default)]
    pub child_tasks: Vec<String>,

    /// Ordered child epic ids
    #[serde(default)]
    pub child_epics: Vec<String>,

    /// Back-reference to the most recent epic that adopted this one
    #[serde(default)]
    pub parent_epic: Option<String>,

    #[serde(default)]
    pub created_at: f64,

    #[serde(default)]
    pub updated_at: f64,
}

impl Epic {
    /// Create a new open epic with the given id, title, and description.
    pub fn new(id: String, title: String, description: String) -> Self {
        let ts = now();
        Self {
            id,
            title,
            description,
            status: EpicStatus::default(),
            child_tasks: Vec::new(),
            child_epics: Vec::new(),
            parent_epic: None,
            created_at: ts,
            updated_at: ts,
        }
    }
}

/// Filter tuple for task listings; doubles as the listing-cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub queue: Option<String>,
    pub epic: Option<String>,
}

impl TaskFilter {
    pub fn by_status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// A validated task field update.
///
/// One arm per allowed field, so an invalid field cannot be constructed.
/// The status arm carries an already-parsed enum value.
#[derive(Debug, Clone)]
pub enum TaskUpdate {
    Title(String),
    Description(String),
    Status(TaskStatus),
}

impl TaskUpdate {
    /// Parse a `--field`/`--value` pair from the CLI surface.
    pub fn parse(field: &str, value: &str) -> crate::Result<Self> {
        match field {
            "title" => Ok(TaskUpdate::Title(value.to_string())),
            "description" => Ok(TaskUpdate::Description(value.to_string())),
            "status" => Ok(TaskUpdate::Status(value.parse()?)),
            _ => Err(crate::Error::InvalidField(format!(
                "Field '{}' is not allowed. Allowed fields: title, description, status",
                field
            ))),
        }
    }
}

/// A validated epic field update.
#[derive(Debug, Clone)]
pub enum EpicUpdate {
    Title(String),
    Description(String),
    Status(EpicStatus),
}

impl EpicUpdate {
    /// Parse a `--field`/`--value` pair from the CLI surface.
    pub fn parse(field: &str, value: &str) -> crate::Result<Self> {
        match field {
            "title" => Ok(EpicUpdate::Title(value.to_string())),
            "description" => Ok(EpicUpdate::Description(value.to_string())),
            "status" => Ok(EpicUpdate::Status(value.parse()?)),
            _ => Err(crate::Error::InvalidField(format!(
                "Field '{}' is not allowed. Allowed fields: title, description, status",
                field
            ))),
        }
    }
}
