//! The manager facade: composes the storage codec, entity model, cache
//! layer, and relationship engine into the operations consumed by the CLI
//! and export collaborators.
//!
//! `TaskManager` is synchronous and single-threaded. The file tree is the
//! single source of truth; the listing cache is instance-scoped and every
//! mutator invalidates the affected kind.

pub mod epics;
pub mod links;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cache::{CacheKind, ListingCache};
use crate::models::{Comment, Queue, QueueMeta, Task, TaskFilter, TaskStatus, TaskUpdate};
use crate::storage;
use crate::{Error, Result};

/// Result of the composed readiness check: a link repair pass, the set of
/// still in-progress tasks, and any epics closed in violation of their
/// children's state.
#[derive(Debug)]
pub struct VerifyReport {
    /// Records rewritten by the link repair pass
    pub links_repaired: usize,
    /// Tasks still marked in_progress
    pub in_progress: Vec<Task>,
    /// Ids of epics marked closed with incomplete children
    pub invalid_epics: Vec<String>,
}

impl VerifyReport {
    pub fn passed(&self) -> bool {
        self.in_progress.is_empty() && self.invalid_epics.is_empty()
    }
}

/// Facade over the task/epic file tree.
pub struct TaskManager {
    tasks_root: PathBuf,
    epics_root: PathBuf,
    cache: ListingCache,
}

impl TaskManager {
    /// Open (creating if needed) the task and epic roots.
    pub fn new(tasks_root: impl Into<PathBuf>, epics_root: impl Into<PathBuf>) -> Result<Self> {
        let tasks_root = tasks_root.into();
        let epics_root = epics_root.into();
        fs::create_dir_all(&tasks_root)?;
        fs::create_dir_all(&epics_root)?;
        Ok(Self {
            tasks_root,
            epics_root,
            cache: ListingCache::new(),
        })
    }

    pub fn tasks_root(&self) -> &Path {
        &self.tasks_root
    }

    pub fn epics_root(&self) -> &Path {
        &self.epics_root
    }

    pub(crate) fn invalidate(&mut self, kind: CacheKind) {
        self.cache.invalidate(kind);
    }

    // ------------------------------------------------------------------
    // Queues
    // ------------------------------------------------------------------

    /// List all queues, in directory-iteration order. Corrupted metadata
    /// files are logged and skipped.
    pub fn queue_list(&mut self) -> Vec<Queue> {
        if let Some(cached) = self.cache.queues() {
            return cached.clone();
        }

        let mut queues = Vec::new();
        for queue_dir in storage::queue_dirs(&self.tasks_root) {
            let meta_file = queue_dir.join("meta.json");
            if !meta_file.exists() {
                continue;
            }
            let Some(meta) = storage::load_record::<QueueMeta>(&meta_file) else {
                warn!(path = %meta_file.display(), "skipping unreadable queue metadata");
                continue;
            };
            let Some(name) = queue_dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            queues.push(Queue::from_meta(name, meta));
        }

        self.cache.store_queues(queues.clone());
        queues
    }

    /// Create a new queue directory with its metadata record.
    pub fn queue_add(&mut self, name: &str, title: &str, description: &str) -> Result<()> {
        validate_queue_name(name)?;

        let queue_dir = self.tasks_root.join(name);
        if queue_dir.exists() {
            return Err(Error::QueueExists(name.to_string()));
        }

        fs::create_dir_all(&queue_dir)
            .map_err(|e| Error::Storage(format!("Error creating queue '{}': {}", name, e)))?;

        let meta = QueueMeta {
            title: title.to_string(),
            description: description.to_string(),
        };
        if !storage::save_record(&queue_dir.join("meta.json"), &meta) {
            return Err(Error::Storage(format!(
                "Error saving metadata for queue '{}'",
                name
            )));
        }

        info!(queue = name, "queue created");
        self.invalidate(CacheKind::Queues);
        Ok(())
    }

    /// Delete a queue and all tasks in it.
    pub fn queue_delete(&mut self, name: &str) -> Result<()> {
        let queue_dir = self.tasks_root.join(name);
        if !queue_dir.is_dir() {
            return Err(Error::QueueNotFound(name.to_string()));
        }

        fs::remove_dir_all(&queue_dir)
            .map_err(|e| Error::Storage(format!("Error deleting queue '{}': {}", name, e)))?;

        info!(queue = name, "queue deleted");
        self.invalidate(CacheKind::Queues);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Create a new task in an existing queue, returning its id.
    pub fn task_add(&mut self, title: &str, description: &str, queue: &str) -> Result<String> {
        let queue_dir = self.tasks_root.join(queue);
        if !queue_dir.exists() {
            return Err(Error::QueueNotFound(queue.to_string()));
        }

        let task_num = storage::next_task_number(&self.tasks_root, queue);
        let task_id = format!("{}-{}", queue, task_num);
        let task_file = queue_dir.join(format!("{}.json", task_id));

        let task = Task::new(
            task_id.clone(),
            title.to_string(),
            description.to_string(),
        );
        if !storage::save_record(&task_file, &task) {
            return Err(Error::Storage(format!(
                "Failed to save task '{}' to file",
                task_id
            )));
        }

        info!(task = %task_id, "task created");
        self.invalidate(CacheKind::Tasks);
        Ok(task_id)
    }

    /// List tasks matching a filter, sorted by creation time. Corrupted
    /// records are logged and skipped; a missing queue filter yields an
    /// empty listing, but a missing epic filter is an error since the epic
    /// was explicitly targeted.
    pub fn task_list(&mut self, filter: &TaskFilter) -> Result<Vec<Task>> {
        if let Some(cached) = self.cache.tasks(filter) {
            return Ok(cached.clone());
        }

        let epic_members: Option<HashSet<String>> = match &filter.epic {
            Some(epic_id) => {
                let epic = self.load_epic(epic_id)?;
                Some(epic.child_tasks.into_iter().collect())
            }
            None => None,
        };

        let queue_dirs = match &filter.queue {
            Some(queue) => {
                let dir = self.tasks_root.join(queue);
                if dir.exists() { vec![dir] } else { Vec::new() }
            }
            None => storage::queue_dirs(&self.tasks_root),
        };

        let mut tasks = Vec::new();
        for queue_dir in queue_dirs {
            for task_file in storage::task_files(&queue_dir) {
                let Some(task) = storage::load_record::<Task>(&task_file) else {
                    warn!(path = %task_file.display(), "skipping unreadable task record");
                    continue;
                };
                if let Some(status) = filter.status {
                    if task.status != status {
                        continue;
                    }
                }
                if let Some(members) = &epic_members {
                    if !members.contains(&task.id) {
                        continue;
                    }
                }
                tasks.push(task);
            }
        }

        tasks.sort_by(|a, b| a.created_at.total_cmp(&b.created_at));
        self.cache.store_tasks(filter.clone(), tasks.clone());
        Ok(tasks)
    }

    /// Show a task, with its epic memberships derived from the
    /// authoritative epic records rather than the stored back-references.
    pub fn task_show(&self, task_id: &str) -> Result<Task> {
        let mut task = self.load_task(task_id)?;
        task.epics = self
            .task_parent_epics(task_id)
            .into_iter()
            .map(|e| e.id)
            .collect();
        Ok(task)
    }

    /// Apply a validated field update. Unlike `task_start`/`task_done`,
    /// this path never touches `started_at`/`closed_at`: it is the
    /// low-ceremony escape hatch for arbitrary (including backward) status
    /// assignment.
    pub fn task_update(&mut self, task_id: &str, update: TaskUpdate) -> Result<()> {
        let mut task = self.load_task(task_id)?;

        let closes = matches!(update, TaskUpdate::Status(TaskStatus::Done));
        match update {
            TaskUpdate::Title(title) => task.title = title,
            TaskUpdate::Description(description) => task.description = description,
            TaskUpdate::Status(status) => task.status = status,
        }

        self.save_task(&mut task)?;
        info!(task = task_id, "task updated");

        if closes {
            self.auto_close_parent_epics(task_id)?;
        }
        Ok(())
    }

    /// Start a task. `started_at` is stamped on the first transition only.
    pub fn task_start(&mut self, task_id: &str) -> Result<()> {
        let mut task = self.load_task(task_id)?;
        task.status = TaskStatus::InProgress;
        if task.started_at.is_none() {
            task.started_at = Some(storage::now());
        }
        self.save_task(&mut task)?;
        info!(task = task_id, "task started");
        Ok(())
    }

    /// Complete a task and propagate auto-close to any parent epics.
    /// `closed_at` is stamped on the first transition only.
    pub fn task_done(&mut self, task_id: &str) -> Result<()> {
        let mut task = self.load_task(task_id)?;
        task.status = TaskStatus::Done;
        if task.closed_at.is_none() {
            task.closed_at = Some(storage::now());
        }
        self.save_task(&mut task)?;
        info!(task = task_id, "task done");
        self.auto_close_parent_epics(task_id)?;
        Ok(())
    }

    /// Delete a task record. Dangling link or epic references to it are
    /// left in place; the repair pass and membership removal handle them.
    pub fn task_delete(&mut self, task_id: &str) -> Result<()> {
        let task_file = self
            .find_task_file(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;

        fs::remove_file(&task_file)
            .map_err(|e| Error::Storage(format!("Error deleting task '{}': {}", task_id, e)))?;

        info!(task = task_id, "task deleted");
        self.invalidate(CacheKind::Tasks);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    /// Add a comment, returning its id. Ids are max(existing)+1 and are
    /// never reused after deletion.
    pub fn comment_add(&mut self, task_id: &str, text: &str) -> Result<u64> {
        let mut task = self.load_task(task_id)?;

        let comment_id = task.comments.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        task.comments.push(Comment {
            id: comment_id,
            text: text.to_string(),
            created_at: storage::now(),
            updated_at: None,
        });

        self.save_task(&mut task)?;
        info!(task = task_id, comment = comment_id, "comment added");
        Ok(comment_id)
    }

    /// Replace a comment's text, stamping its `updated_at`.
    pub fn comment_edit(&mut self, task_id: &str, comment_id: u64, text: &str) -> Result<()> {
        let mut task = self.load_task(task_id)?;

        let comment = task
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or(Error::CommentNotFound {
                task_id: task_id.to_string(),
                comment_id,
            })?;
        comment.text = text.to_string();
        comment.updated_at = Some(storage::now());

        self.save_task(&mut task)?;
        info!(task = task_id, comment = comment_id, "comment edited");
        Ok(())
    }

    pub fn comment_remove(&mut self, task_id: &str, comment_id: u64) -> Result<()> {
        let mut task = self.load_task(task_id)?;

        let original_count = task.comments.len();
        task.comments.retain(|c| c.id != comment_id);
        if task.comments.len() == original_count {
            return Err(Error::CommentNotFound {
                task_id: task_id.to_string(),
                comment_id,
            });
        }

        self.save_task(&mut task)?;
        info!(task = task_id, comment = comment_id, "comment removed");
        Ok(())
    }

    pub fn comment_list(&self, task_id: &str) -> Result<Vec<Comment>> {
        Ok(self.load_task(task_id)?.comments)
    }

    // ------------------------------------------------------------------
    // Readiness check
    // ------------------------------------------------------------------

    /// Composed readiness check: self-heal link symmetry, then report any
    /// in-progress tasks and invalidly closed epics.
    pub fn verify(&mut self) -> Result<VerifyReport> {
        let links_repaired = self.repair_links()?;
        let in_progress = self.task_list(&TaskFilter::by_status(TaskStatus::InProgress))?;
        let invalid_epics = self.invalid_closed_epics()?;
        Ok(VerifyReport {
            links_repaired,
            in_progress,
            invalid_epics,
        })
    }

    // ------------------------------------------------------------------
    // Record access shared with the relationship engine
    // ------------------------------------------------------------------

    fn find_task_file(&self, task_id: &str) -> Option<PathBuf> {
        let path = storage::task_path(&self.tasks_root, task_id)?;
        path.exists().then_some(path)
    }

    /// Load one task. Absence is `TaskNotFound`; an unreadable record at an
    /// existing path is a `Storage` error since the caller targeted it.
    pub(crate) fn load_task(&self, task_id: &str) -> Result<Task> {
        let task_file = self
            .find_task_file(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        storage::load_record(&task_file)
            .ok_or_else(|| Error::Storage(format!("Failed to read task '{}'", task_id)))
    }

    /// Persist a task, refreshing `updated_at` and invalidating the task
    /// listing cache. The record must already exist.
    pub(crate) fn save_task(&mut self, task: &mut Task) -> Result<()> {
        let task_file = self
            .find_task_file(&task.id)
            .ok_or_else(|| Error::TaskNotFound(task.id.clone()))?;

        task.updated_at = storage::now();
        if !storage::save_record(&task_file, task) {
            return Err(Error::Storage(format!("Failed to save task '{}'", task.id)));
        }
        self.invalidate(CacheKind::Tasks);
        Ok(())
    }

    /// Every readable task in the tree, unfiltered and unsorted.
    pub(crate) fn all_tasks(&self) -> Vec<Task> {
        let mut tasks = Vec::new();
        for queue_dir in storage::queue_dirs(&self.tasks_root) {
            for task_file in storage::task_files(&queue_dir) {
                let Some(task) = storage::load_record::<Task>(&task_file) else {
                    warn!(path = %task_file.display(), "skipping unreadable task record");
                    continue;
                };
                tasks.push(task);
            }
        }
        tasks
    }
}

fn validate_queue_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidField("Queue name cannot be empty".to_string()));
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::InvalidField(format!(
            "Queue name '{}' is not filesystem-safe",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager() -> (TempDir, TaskManager) {
        let dir = TempDir::new().unwrap();
        let tm = TaskManager::new(dir.path().join(".tasks"), dir.path().join(".epics")).unwrap();
        (dir, tm)
    }

    #[test]
    fn test_queue_add_and_list() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Queue", "Desc").unwrap();

        let queues = tm.queue_list();
        assert_eq!(queues.len(), 1);
        assert_eq!(queues[0].name, "q");
        assert_eq!(queues[0].title, "Queue");
    }

    #[test]
    fn test_queue_add_duplicate() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Queue", "").unwrap();
        assert!(matches!(
            tm.queue_add("q", "Again", ""),
            Err(Error::QueueExists(_))
        ));
    }

    #[test]
    fn test_queue_name_validation() {
        let (_dir, mut tm) = manager();
        assert!(matches!(
            tm.queue_add("", "T", ""),
            Err(Error::InvalidField(_))
        ));
        assert!(matches!(
            tm.queue_add("a/b", "T", ""),
            Err(Error::InvalidField(_))
        ));
    }

    #[test]
    fn test_queue_delete_cascades_tasks() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        tm.task_add("T", "D", "q").unwrap();
        tm.queue_delete("q").unwrap();

        assert!(tm.queue_list().is_empty());
        assert!(matches!(
            tm.load_task("q-1"),
            Err(Error::TaskNotFound(_))
        ));
    }

    #[test]
    fn test_queue_delete_missing() {
        let (_dir, mut tm) = manager();
        assert!(matches!(
            tm.queue_delete("ghost"),
            Err(Error::QueueNotFound(_))
        ));
    }

    #[test]
    fn test_task_add_sequences_ids() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        assert_eq!(tm.task_add("A", "", "q").unwrap(), "q-1");
        assert_eq!(tm.task_add("B", "", "q").unwrap(), "q-2");

        // Deleting q-2 must not cause its number to be reused.
        tm.task_delete("q-2").unwrap();
        assert_eq!(tm.task_add("C", "", "q").unwrap(), "q-3");
    }

    #[test]
    fn test_task_add_requires_queue() {
        let (_dir, mut tm) = manager();
        assert!(matches!(
            tm.task_add("T", "", "ghost"),
            Err(Error::QueueNotFound(_))
        ));
    }

    #[test]
    fn test_task_lifecycle_timestamps_set_once() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        let id = tm.task_add("T", "D", "q").unwrap();

        let task = tm.load_task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(task.started_at.is_none());

        tm.task_start(&id).unwrap();
        let task = tm.load_task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        let first_start = task.started_at.unwrap();

        // Repeat start leaves the timestamp untouched.
        tm.task_start(&id).unwrap();
        assert_eq!(tm.load_task(&id).unwrap().started_at, Some(first_start));

        tm.task_done(&id).unwrap();
        let task = tm.load_task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        let first_close = task.closed_at.unwrap();

        tm.task_done(&id).unwrap();
        assert_eq!(tm.load_task(&id).unwrap().closed_at, Some(first_close));
    }

    #[test]
    fn test_task_done_reachable_from_todo() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        let id = tm.task_add("T", "", "q").unwrap();
        tm.task_done(&id).unwrap();
        assert_eq!(tm.load_task(&id).unwrap().status, TaskStatus::Done);
    }

    #[test]
    fn test_task_update_escape_hatch_skips_timestamps() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        let id = tm.task_add("T", "", "q").unwrap();

        tm.task_update(&id, TaskUpdate::Status(TaskStatus::Done))
            .unwrap();
        let task = tm.load_task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert!(task.closed_at.is_none());

        // Backward assignment is allowed through this path.
        tm.task_update(&id, TaskUpdate::Status(TaskStatus::Todo))
            .unwrap();
        assert_eq!(tm.load_task(&id).unwrap().status, TaskStatus::Todo);
    }

    #[test]
    fn test_task_update_title_and_description() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        let id = tm.task_add("T", "", "q").unwrap();

        tm.task_update(&id, TaskUpdate::Title("New".to_string()))
            .unwrap();
        tm.task_update(&id, TaskUpdate::Description("Body".to_string()))
            .unwrap();

        let task = tm.load_task(&id).unwrap();
        assert_eq!(task.title, "New");
        assert_eq!(task.description, "Body");
    }

    #[test]
    fn test_task_list_filters() {
        let (_dir, mut tm) = manager();
        tm.queue_add("a", "A", "").unwrap();
        tm.queue_add("b", "B", "").unwrap();
        tm.task_add("T1", "", "a").unwrap();
        tm.task_add("T2", "", "b").unwrap();
        tm.task_done("a-1").unwrap();

        let all = tm.task_list(&TaskFilter::default()).unwrap();
        assert_eq!(all.len(), 2);

        let done = tm.task_list(&TaskFilter::by_status(TaskStatus::Done)).unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, "a-1");

        let in_b = tm
            .task_list(&TaskFilter {
                queue: Some("b".to_string()),
                ..TaskFilter::default()
            })
            .unwrap();
        assert_eq!(in_b.len(), 1);
        assert_eq!(in_b[0].id, "b-1");

        let in_ghost = tm
            .task_list(&TaskFilter {
                queue: Some("ghost".to_string()),
                ..TaskFilter::default()
            })
            .unwrap();
        assert!(in_ghost.is_empty());
    }

    #[test]
    fn test_task_list_epic_filter() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        tm.task_add("T1", "", "q").unwrap();
        tm.task_add("T2", "", "q").unwrap();
        let epic_id = tm.epic_add("E", "").unwrap();
        tm.epic_add_task(&epic_id, "q-2").unwrap();

        let members = tm
            .task_list(&TaskFilter {
                epic: Some(epic_id.clone()),
                ..TaskFilter::default()
            })
            .unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, "q-2");

        let missing = tm.task_list(&TaskFilter {
            epic: Some("epic-99".to_string()),
            ..TaskFilter::default()
        });
        assert!(matches!(missing, Err(Error::EpicNotFound(_))));
    }

    #[test]
    fn test_task_list_cache_reflects_new_task() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        tm.task_add("T1", "", "q").unwrap();

        // Populate the cache for the unfiltered listing.
        assert_eq!(tm.task_list(&TaskFilter::default()).unwrap().len(), 1);

        tm.task_add("T2", "", "q").unwrap();
        assert_eq!(tm.task_list(&TaskFilter::default()).unwrap().len(), 2);
    }

    #[test]
    fn test_task_listings_stay_fresh_across_mutators() {
        // Every task mutator must leave the cached listings invalidated;
        // a re-read through the same filter reflects the mutation.
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        tm.task_add("A", "", "q").unwrap();
        tm.task_add("B", "", "q").unwrap();

        let all = TaskFilter::default();
        let in_progress = TaskFilter::by_status(TaskStatus::InProgress);
        let listed = |tm: &mut TaskManager, id: &str| {
            tm.task_list(&TaskFilter::default())
                .unwrap()
                .into_iter()
                .find(|t| t.id == id)
                .unwrap()
        };

        tm.task_list(&all).unwrap();
        tm.task_update("q-1", TaskUpdate::Title("Renamed".to_string()))
            .unwrap();
        assert_eq!(listed(&mut tm, "q-1").title, "Renamed");

        tm.task_list(&in_progress).unwrap();
        tm.task_start("q-1").unwrap();
        assert_eq!(tm.task_list(&in_progress).unwrap().len(), 1);

        tm.task_done("q-1").unwrap();
        assert!(tm.task_list(&in_progress).unwrap().is_empty());

        tm.task_list(&all).unwrap();
        tm.comment_add("q-2", "note").unwrap();
        assert_eq!(listed(&mut tm, "q-2").comments.len(), 1);

        tm.comment_edit("q-2", 1, "edited").unwrap();
        assert_eq!(listed(&mut tm, "q-2").comments[0].text, "edited");

        tm.comment_remove("q-2", 1).unwrap();
        assert!(listed(&mut tm, "q-2").comments.is_empty());

        tm.link_add("q-1", "q-2", "related").unwrap();
        assert!(listed(&mut tm, "q-1").links.contains_key("related"));

        tm.link_remove("q-1", "q-2", "related").unwrap();
        assert!(listed(&mut tm, "q-1").links.is_empty());

        tm.task_delete("q-2").unwrap();
        assert_eq!(tm.task_list(&all).unwrap().len(), 1);
    }

    #[test]
    fn test_queue_delete_refreshes_listings() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        tm.task_add("T", "", "q").unwrap();

        // Populate both listings, then delete through them.
        assert_eq!(tm.queue_list().len(), 1);
        assert_eq!(tm.task_list(&TaskFilter::default()).unwrap().len(), 1);

        tm.queue_delete("q").unwrap();
        assert!(tm.queue_list().is_empty());
        assert!(tm.task_list(&TaskFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_task_list_skips_corrupt_records() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        tm.task_add("T1", "", "q").unwrap();
        fs::write(tm.tasks_root().join("q").join("q-2.json"), "{broken").unwrap();

        let tasks = tm.task_list(&TaskFilter::default()).unwrap();
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn test_load_task_corrupt_is_storage_error() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        tm.task_add("T1", "", "q").unwrap();
        fs::write(tm.tasks_root().join("q").join("q-1.json"), "{broken").unwrap();

        assert!(matches!(tm.load_task("q-1"), Err(Error::Storage(_))));
    }

    #[test]
    fn test_comment_ids_never_reused() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        let id = tm.task_add("T", "", "q").unwrap();

        assert_eq!(tm.comment_add(&id, "first").unwrap(), 1);
        assert_eq!(tm.comment_add(&id, "second").unwrap(), 2);
        tm.comment_remove(&id, 1).unwrap();
        assert_eq!(tm.comment_add(&id, "third").unwrap(), 3);

        let comments = tm.comment_list(&id).unwrap();
        assert_eq!(
            comments.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[test]
    fn test_comment_edit_sets_updated_at() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        let id = tm.task_add("T", "", "q").unwrap();
        tm.comment_add(&id, "first").unwrap();

        tm.comment_edit(&id, 1, "revised").unwrap();
        let comments = tm.comment_list(&id).unwrap();
        assert_eq!(comments[0].text, "revised");
        assert!(comments[0].updated_at.is_some());

        assert!(matches!(
            tm.comment_edit(&id, 9, "nope"),
            Err(Error::CommentNotFound { .. })
        ));
    }

    #[test]
    fn test_comment_remove_missing() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        let id = tm.task_add("T", "", "q").unwrap();
        assert!(matches!(
            tm.comment_remove(&id, 1),
            Err(Error::CommentNotFound { .. })
        ));
    }

    #[test]
    fn test_task_show_derives_epic_memberships() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        let id = tm.task_add("T", "", "q").unwrap();
        let epic_id = tm.epic_add("E", "").unwrap();
        tm.epic_add_task(&epic_id, &id).unwrap();

        let task = tm.task_show(&id).unwrap();
        assert_eq!(task.epics, vec![epic_id]);
    }

    #[test]
    fn test_verify_clean_tree_passes() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        tm.task_add("T", "", "q").unwrap();
        tm.task_done("q-1").unwrap();

        let report = tm.verify().unwrap();
        assert!(report.passed());
        assert_eq!(report.links_repaired, 0);
    }

    #[test]
    fn test_verify_reports_in_progress() {
        let (_dir, mut tm) = manager();
        tm.queue_add("q", "Q", "").unwrap();
        tm.task_add("T", "", "q").unwrap();
        tm.task_start("q-1").unwrap();

        let report = tm.verify().unwrap();
        assert!(!report.passed());
        assert_eq!(report.in_progress.len(), 1);
        assert_eq!(report.in_progress[0].id, "q-1");
    }
}
