//! Bulk export of the task tree to a single JSON document.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::manager::TaskManager;
use crate::models::TaskFilter;
use crate::{Error, Result};

/// Export every task (across all queues) to one pretty-printed JSON array.
/// Parent directories of the output path are created as needed. Returns the
/// path written.
pub fn export_tasks(tm: &mut TaskManager, output: &Path) -> Result<PathBuf> {
    let tasks = tm.task_list(&TaskFilter::default())?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(&tasks)
        .map_err(|e| Error::Storage(format!("Failed to serialize export: {}", e)))?;
    fs::write(output, json)?;

    info!(path = %output.display(), count = tasks.len(), "tasks exported");
    Ok(output.to_path_buf())
}
