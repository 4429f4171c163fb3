//! Storage codec and file-tree layout for taskdeck records.
//!
//! One JSON file per record:
//! - `<tasks_root>/<queue>/meta.json` - queue metadata
//! - `<tasks_root>/<queue>/<queue>-<n>.json` - task records
//! - `<epics_root>/epic-<n>.json` - epic records
//!
//! The codec is deliberately tolerant: any read failure (missing file,
//! unreadable file, bad JSON) yields absence, and the caller decides whether
//! that means not-found or corruption. Writes report plain success/failure.
//! No cross-file atomicity is attempted.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Current time as epoch seconds, the timestamp unit of the record format.
pub fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Load a single record, returning `None` on any I/O or parse failure.
pub fn load_record<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "record read failed");
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(record) => Some(record),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "record parse failed");
            None
        }
    }
}

/// Save a single record pretty-printed, returning `false` on any failure.
pub fn save_record<T: Serialize>(path: &Path, record: &T) -> bool {
    let json = match serde_json::to_string_pretty(record) {
        Ok(json) => json,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "record serialize failed");
            return false;
        }
    };
    match fs::write(path, json) {
        Ok(()) => true,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "record write failed");
            false
        }
    }
}

/// Path of a task record, derived from the `<queue>-<n>` id. `None` when the
/// id has no queue prefix at all.
pub fn task_path(tasks_root: &Path, task_id: &str) -> Option<PathBuf> {
    let (queue, _) = task_id.rsplit_once('-')?;
    Some(tasks_root.join(queue).join(format!("{}.json", task_id)))
}

/// Path of an epic record. `None` when the id is not of the `epic-<n>` form.
pub fn epic_path(epics_root: &Path, epic_id: &str) -> Option<PathBuf> {
    if !epic_id.starts_with("epic-") {
        return None;
    }
    Some(epics_root.join(format!("{}.json", epic_id)))
}

/// Next task sequence number for a queue: one past the highest existing.
///
/// Numbers are parsed out of `<queue>-<n>.json` filenames; deleted tasks are
/// never renumbered, so ids stay unique for the life of the queue.
pub fn next_task_number(tasks_root: &Path, queue: &str) -> u64 {
    let queue_dir = tasks_root.join(queue);
    let prefix = format!("{}-", queue);
    max_sequence_number(&queue_dir, &prefix) + 1
}

/// Next epic sequence number: one past the highest existing `epic-<n>`.
pub fn next_epic_number(epics_root: &Path) -> u64 {
    max_sequence_number(epics_root, "epic-") + 1
}

fn max_sequence_number(dir: &Path, prefix: &str) -> u64 {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut max_num = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(stem) = name.strip_suffix(".json") else {
            continue;
        };
        let Some(num_str) = stem.strip_prefix(prefix) else {
            continue;
        };
        if let Ok(num) = num_str.parse::<u64>() {
            max_num = max_num.max(num);
        }
    }
    max_num
}

/// Queue directories under the tasks root, in directory-iteration order.
pub fn queue_dirs(tasks_root: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(entries) = fs::read_dir(tasks_root) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
    }
    dirs
}

/// Task record files in a queue directory (every `.json` except `meta.json`).
pub fn task_files(queue_dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = fs::read_dir(queue_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.ends_with(".json") && name != "meta.json" {
                files.push(path);
            }
        }
    }
    files
}

/// Epic record files under the epics root.
pub fn epic_files(epics_root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = fs::read_dir(epics_root) {
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with("epic-") && name.ends_with(".json") {
                files.push(path);
            }
        }
    }
    files
}
