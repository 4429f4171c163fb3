//! The two-level epic hierarchy and its consistency rules.
//!
//! Epics own their membership: `child_tasks` and `child_epics` on the epic
//! record are authoritative, while `parent_epic` on a child and `epics` on a
//! task are denormalized back-references. Closing is gated on every child
//! being complete, and completing the last child auto-closes the chain
//! upward.

use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use super::TaskManager;
use crate::cache::CacheKind;
use crate::models::{Epic, EpicStatus, EpicUpdate, TaskStatus};
use crate::storage;
use crate::{Error, Result};

impl TaskManager {
    // ------------------------------------------------------------------
    // Epic CRUD
    // ------------------------------------------------------------------

    /// Create a new open epic, returning its id.
    pub fn epic_add(&mut self, title: &str, description: &str) -> Result<String> {
        let epic_num = storage::next_epic_number(self.epics_root());
        let epic_id = format!("epic-{}", epic_num);
        let epic_file = self.epics_root().join(format!("{}.json", epic_id));

        let epic = Epic::new(epic_id.clone(), title.to_string(), description.to_string());
        if !storage::save_record(&epic_file, &epic) {
            return Err(Error::Storage(format!(
                "Failed to save epic '{}' to file",
                epic_id
            )));
        }

        info!(epic = %epic_id, "epic created");
        self.invalidate(CacheKind::Epics);
        Ok(epic_id)
    }

    /// List all epics, sorted by creation time. Corrupted records are
    /// logged and skipped.
    pub fn epic_list(&mut self) -> Vec<Epic> {
        if let Some(cached) = self.cache.epics() {
            return cached.clone();
        }

        let mut epics = self.all_epics();
        epics.sort_by(|a, b| a.created_at.total_cmp(&b.created_at));
        self.cache.store_epics(epics.clone());
        epics
    }

    pub fn epic_show(&self, epic_id: &str) -> Result<Epic> {
        self.load_epic(epic_id)
    }

    /// Apply a validated field update. Closing through this path is gated
    /// the same as `epic_done` and propagates upward the same way.
    pub fn epic_update(&mut self, epic_id: &str, update: EpicUpdate) -> Result<()> {
        let mut epic = self.load_epic(epic_id)?;

        let closes = matches!(update, EpicUpdate::Status(EpicStatus::Closed));
        match update {
            EpicUpdate::Title(title) => epic.title = title,
            EpicUpdate::Description(description) => epic.description = description,
            EpicUpdate::Status(status) => {
                if status == EpicStatus::Closed && !self.can_close_epic(epic_id)? {
                    return Err(Error::InvalidField(format!(
                        "Cannot close epic '{}': it has incomplete children",
                        epic_id
                    )));
                }
                epic.status = status;
            }
        }

        self.save_epic(&mut epic)?;
        info!(epic = epic_id, "epic updated");

        if closes && epic.parent_epic.is_some() {
            let listers = self.epic_listers(epic_id);
            self.auto_close_chain(listers)?;
        }
        Ok(())
    }

    /// Close an epic, gated on every child task being done and every child
    /// epic closed. The gate applies even when the record already reads
    /// closed, so a forced-invalid record cannot be laundered through a
    /// re-close; a valid re-close is a no-op. Closing propagates upward
    /// through every listing epic.
    pub fn epic_done(&mut self, epic_id: &str) -> Result<()> {
        let mut epic = self.load_epic(epic_id)?;

        if !self.can_close_epic(epic_id)? {
            return Err(Error::InvalidField(format!(
                "Cannot close epic '{}': it has incomplete children",
                epic_id
            )));
        }
        if epic.status == EpicStatus::Closed {
            return Ok(());
        }

        epic.status = EpicStatus::Closed;
        self.save_epic(&mut epic)?;
        info!(epic = epic_id, "epic closed");

        if epic.parent_epic.is_some() {
            let listers = self.epic_listers(epic_id);
            self.auto_close_chain(listers)?;
        }
        Ok(())
    }

    /// Delete an epic record. References to it from children and listings
    /// are left dangling; `repair_epic_parents` clears them.
    pub fn epic_delete(&mut self, epic_id: &str) -> Result<()> {
        let epic_file = storage::epic_path(self.epics_root(), epic_id)
            .filter(|p| p.exists())
            .ok_or_else(|| Error::EpicNotFound(epic_id.to_string()))?;

        std::fs::remove_file(&epic_file)
            .map_err(|e| Error::Storage(format!("Error deleting epic '{}': {}", epic_id, e)))?;

        info!(epic = epic_id, "epic deleted");
        self.invalidate(CacheKind::Epics);
        // Drop any task listings filtered by the deleted epic.
        self.invalidate(CacheKind::Tasks);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Add a task to an epic. Only the epic's `child_tasks` list is
    /// written; the task's back-reference is derived on read. Adding a
    /// task that is already a member is a no-op.
    pub fn epic_add_task(&mut self, epic_id: &str, task_id: &str) -> Result<()> {
        let mut epic = self.load_epic(epic_id)?;
        self.load_task(task_id)?;

        if !epic.child_tasks.iter().any(|id| id == task_id) {
            epic.child_tasks.push(task_id.to_string());
            self.save_epic(&mut epic)?;
            // Epic-filtered task listings key off this membership.
            self.invalidate(CacheKind::Tasks);
            info!(epic = epic_id, task = task_id, "task added to epic");
        }
        Ok(())
    }

    /// Remove a task from an epic. Removing a non-member is a silent
    /// no-op, so cleanup after task deletion is idempotent.
    pub fn epic_remove_task(&mut self, epic_id: &str, task_id: &str) -> Result<()> {
        let mut epic = self.load_epic(epic_id)?;

        let original = epic.child_tasks.len();
        epic.child_tasks.retain(|id| id != task_id);
        if epic.child_tasks.len() != original {
            self.save_epic(&mut epic)?;
            self.invalidate(CacheKind::Tasks);
            info!(epic = epic_id, task = task_id, "task removed from epic");
        }
        Ok(())
    }

    /// Nest a child epic under a parent. The child's `parent_epic`
    /// back-reference is last-writer-wins: adopting an epic that already
    /// has a different parent re-points it (with a warning) without
    /// removing it from the old parent's child list.
    pub fn epic_add_epic(&mut self, parent_id: &str, child_id: &str) -> Result<()> {
        if parent_id == child_id {
            return Err(Error::InvalidField(format!(
                "Epic '{}' cannot be its own parent",
                parent_id
            )));
        }

        let mut parent = self.load_epic(parent_id)?;
        let mut child = self.load_epic(child_id)?;

        if !parent.child_epics.iter().any(|id| id == child_id) {
            parent.child_epics.push(child_id.to_string());
            self.save_epic(&mut parent)?;
        }

        if let Some(old_parent) = &child.parent_epic {
            if old_parent != parent_id {
                warn!(
                    epic = child_id,
                    old_parent = %old_parent,
                    new_parent = parent_id,
                    "re-parenting epic"
                );
            }
        }
        child.parent_epic = Some(parent_id.to_string());
        self.save_epic(&mut child)?;

        info!(parent = parent_id, child = child_id, "epic nested");
        Ok(())
    }

    /// Unnest a child epic. Both records must exist and the child must be
    /// listed by the parent. The back-reference is cleared only if it
    /// still points at this parent, so a later re-parenting is not
    /// clobbered.
    pub fn epic_remove_epic(&mut self, parent_id: &str, child_id: &str) -> Result<()> {
        let mut parent = self.load_epic(parent_id)?;
        let mut child = self.load_epic(child_id)?;

        if !parent.child_epics.iter().any(|id| id == child_id) {
            return Err(Error::EpicChildNotFound {
                parent: parent_id.to_string(),
                child: child_id.to_string(),
            });
        }
        parent.child_epics.retain(|id| id != child_id);
        self.save_epic(&mut parent)?;

        if child.parent_epic.as_deref() == Some(parent_id) {
            child.parent_epic = None;
            self.save_epic(&mut child)?;
        }

        info!(parent = parent_id, child = child_id, "epic unnested");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Consistency rules
    // ------------------------------------------------------------------

    /// Whether an epic is closable: every child task done and every child
    /// epic closed. A missing child blocks closing; an unreadable one is
    /// an error.
    pub fn can_close_epic(&self, epic_id: &str) -> Result<bool> {
        let epic = self.load_epic(epic_id)?;

        for task_id in &epic.child_tasks {
            match self.load_task(task_id) {
                Ok(task) => {
                    if task.status != TaskStatus::Done {
                        return Ok(false);
                    }
                }
                Err(Error::TaskNotFound(_)) => return Ok(false),
                Err(e) => return Err(e),
            }
        }

        for child_id in &epic.child_epics {
            match self.load_epic(child_id) {
                Ok(child) => {
                    if child.status != EpicStatus::Closed {
                        return Ok(false);
                    }
                }
                Err(Error::EpicNotFound(_)) => return Ok(false),
                Err(e) => return Err(e),
            }
        }

        Ok(true)
    }

    /// Auto-close propagation entry point after a task completes: every
    /// epic listing the task among its children is a candidate, and each
    /// close makes its own listers candidates in turn. Stale `task.epics`
    /// back-references do not count; only membership lists do.
    pub fn auto_close_parent_epics(&mut self, task_id: &str) -> Result<()> {
        let candidates: Vec<String> = self
            .task_parent_epics(task_id)
            .into_iter()
            .map(|e| e.id)
            .collect();
        self.auto_close_chain(candidates)
    }

    /// Worklist-driven upward closing. When an adopted epic closes, every
    /// epic listing it in `child_epics` becomes a candidate, not just the
    /// one named by the `parent_epic` back-reference; a multi-lister close
    /// must reach all of them. The visited set guarantees termination even
    /// if membership records form a cycle.
    fn auto_close_chain(&mut self, mut worklist: Vec<String>) -> Result<()> {
        let mut visited = HashSet::new();

        while let Some(epic_id) = worklist.pop() {
            if !visited.insert(epic_id.clone()) {
                continue;
            }
            let mut epic = match self.load_epic(&epic_id) {
                Ok(epic) => epic,
                Err(Error::EpicNotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            if epic.status == EpicStatus::Closed {
                continue;
            }
            if !self.can_close_epic(&epic_id)? {
                continue;
            }

            epic.status = EpicStatus::Closed;
            self.save_epic(&mut epic)?;
            info!(epic = %epic_id, "epic auto-closed");

            if epic.parent_epic.is_some() {
                worklist.extend(self.epic_listers(&epic_id));
            }
        }
        Ok(())
    }

    /// Ids of epics whose `child_epics` list names the given epic.
    fn epic_listers(&self, epic_id: &str) -> Vec<String> {
        self.all_epics()
            .into_iter()
            .filter(|epic| epic.child_epics.iter().any(|id| id == epic_id))
            .map(|epic| epic.id)
            .collect()
    }

    /// Epics listing a task among their children. Membership lists are
    /// authoritative here; stale back-references on the task do not count.
    pub fn task_parent_epics(&self, task_id: &str) -> Vec<Epic> {
        let mut epics: Vec<Epic> = self
            .all_epics()
            .into_iter()
            .filter(|epic| epic.child_tasks.iter().any(|id| id == task_id))
            .collect();
        epics.sort_by(|a, b| a.created_at.total_cmp(&b.created_at));
        epics
    }

    /// Ids of epics marked closed whose children are not all complete.
    /// Detection only: closing decisions were deliberate, so no record is
    /// rewritten here.
    pub fn invalid_closed_epics(&mut self) -> Result<Vec<String>> {
        let mut invalid = Vec::new();
        for epic in self.epic_list() {
            if epic.status == EpicStatus::Closed && !self.can_close_epic(&epic.id)? {
                invalid.push(epic.id);
            }
        }
        Ok(invalid)
    }

    /// Self-healing pass over the hierarchy back-references: deduplicates
    /// child lists, points an orphaned child at the first epic listing it
    /// (lowest epic number), and clears `parent_epic` references to epics
    /// that no longer exist. Returns the number of records rewritten.
    pub fn repair_epic_parents(&mut self) -> Result<usize> {
        let mut epics = self.all_epics();
        epics.sort_by_key(|e| epic_number(&e.id));

        let existing: HashSet<String> = epics.iter().map(|e| e.id.clone()).collect();
        let mut first_lister: HashMap<String, String> = HashMap::new();
        for epic in &epics {
            for child_id in &epic.child_epics {
                first_lister
                    .entry(child_id.clone())
                    .or_insert_with(|| epic.id.clone());
            }
        }

        let mut written = 0;
        for mut epic in epics {
            let mut changed = false;

            let deduped = dedupe(&epic.child_tasks);
            if deduped != epic.child_tasks {
                epic.child_tasks = deduped;
                changed = true;
            }
            let deduped = dedupe(&epic.child_epics);
            if deduped != epic.child_epics {
                epic.child_epics = deduped;
                changed = true;
            }

            match &epic.parent_epic {
                Some(parent_id) if !existing.contains(parent_id) => {
                    warn!(epic = %epic.id, parent = %parent_id, "clearing dangling parent reference");
                    epic.parent_epic = None;
                    changed = true;
                }
                None => {
                    if let Some(lister) = first_lister.get(&epic.id) {
                        epic.parent_epic = Some(lister.clone());
                        changed = true;
                    }
                }
                _ => {}
            }

            if changed {
                self.save_epic(&mut epic)?;
                written += 1;
            }
        }

        if written > 0 {
            info!(written, "hierarchy repair rewrote records");
        }
        Ok(written)
    }

    // ------------------------------------------------------------------
    // Record access
    // ------------------------------------------------------------------

    /// Load one epic. Absence is `EpicNotFound`; an unreadable record at
    /// an existing path is a `Storage` error since the caller targeted it.
    pub(crate) fn load_epic(&self, epic_id: &str) -> Result<Epic> {
        let epic_file = storage::epic_path(self.epics_root(), epic_id)
            .filter(|p| p.exists())
            .ok_or_else(|| Error::EpicNotFound(epic_id.to_string()))?;
        storage::load_record(&epic_file)
            .ok_or_else(|| Error::Storage(format!("Failed to read epic '{}'", epic_id)))
    }

    /// Persist an epic, refreshing `updated_at` and invalidating the epic
    /// listing cache. The record must already exist.
    pub(crate) fn save_epic(&mut self, epic: &mut Epic) -> Result<()> {
        let epic_file = storage::epic_path(self.epics_root(), &epic.id)
            .filter(|p| p.exists())
            .ok_or_else(|| Error::EpicNotFound(epic.id.clone()))?;

        epic.updated_at = storage::now();
        if !storage::save_record(&epic_file, epic) {
            return Err(Error::Storage(format!("Failed to save epic '{}'", epic.id)));
        }
        self.invalidate(CacheKind::Epics);
        Ok(())
    }

    /// Every readable epic, unfiltered and unsorted.
    pub(crate) fn all_epics(&self) -> Vec<Epic> {
        let mut epics = Vec::new();
        for epic_file in storage::epic_files(self.epics_root()) {
            let Some(epic) = storage::load_record::<Epic>(&epic_file) else {
                warn!(path = %epic_file.display(), "skipping unreadable epic record");
                continue;
            };
            epics.push(epic);
        }
        epics
    }
}

fn epic_number(epic_id: &str) -> u64 {
    epic_id
        .strip_prefix("epic-")
        .and_then(|n| n.parse().ok())
        .unwrap_or(u64::MAX)
}

fn dedupe(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert((*id).clone()))
        .cloned()
        .collect()
}
