//! The symmetric link graph between tasks.
//!
//! A link is a typed, bidirectional relation: task A lists B under type T
//! iff B lists A under type T, with no duplicates within a list. The two
//! writes of `link_add`/`link_remove` are not atomic; a failure between
//! them leaves the graph transiently asymmetric until the next
//! `repair_links` pass restores the invariant.

use std::collections::HashSet;
use tracing::info;

use super::TaskManager;
use crate::{Error, Result};

/// Default link type when none is given on the CLI.
pub const DEFAULT_LINK_TYPE: &str = "related";

impl TaskManager {
    /// Link two tasks symmetrically under a type.
    ///
    /// Errors with `LinkExists` only when the pair already holds on both
    /// sides; a half-present link (from an earlier partial failure) is
    /// completed instead.
    pub fn link_add(&mut self, task_id: &str, target_id: &str, link_type: &str) -> Result<()> {
        let mut task = self.load_task(task_id)?;
        let mut target = self.load_task(target_id)?;

        let has_forward = task
            .links
            .get(link_type)
            .is_some_and(|targets| targets.iter().any(|id| id == target_id));
        let has_reverse = target
            .links
            .get(link_type)
            .is_some_and(|targets| targets.iter().any(|id| id == task_id));

        if has_forward && has_reverse {
            return Err(Error::LinkExists(
                task_id.to_string(),
                target_id.to_string(),
            ));
        }

        if !has_forward {
            task.links
                .entry(link_type.to_string())
                .or_default()
                .push(target_id.to_string());
        }
        if !has_reverse {
            target
                .links
                .entry(link_type.to_string())
                .or_default()
                .push(task_id.to_string());
        }

        self.save_task(&mut task)?;
        self.save_task(&mut target)?;
        info!(task = task_id, target = target_id, link_type, "link added");
        Ok(())
    }

    /// Remove a link from both sides. An emptied type entry is dropped
    /// entirely rather than kept as an empty list. Errors with
    /// `LinkNotFound` when neither side held the relation.
    pub fn link_remove(&mut self, task_id: &str, target_id: &str, link_type: &str) -> Result<()> {
        let mut task = self.load_task(task_id)?;
        let mut target = self.load_task(target_id)?;

        let removed_forward = remove_link_entry(&mut task.links, link_type, target_id);
        let removed_reverse = remove_link_entry(&mut target.links, link_type, task_id);

        if !removed_forward && !removed_reverse {
            return Err(Error::LinkNotFound(
                task_id.to_string(),
                target_id.to_string(),
            ));
        }

        self.save_task(&mut task)?;
        self.save_task(&mut target)?;
        info!(task = task_id, target = target_id, link_type, "link removed");
        Ok(())
    }

    /// The link map of one task.
    pub fn link_list(
        &self,
        task_id: &str,
    ) -> Result<std::collections::BTreeMap<String, Vec<String>>> {
        Ok(self.load_task(task_id)?.links)
    }

    /// Self-healing pass over link symmetry: deduplicates every type list
    /// (preserving first-seen order) and inserts missing reciprocals.
    /// Writes only records that actually changed and returns the number of
    /// records written, so an immediate second run returns 0.
    ///
    /// Targets that no longer exist are left in place; removal is an
    /// explicit `link_remove`/`task_delete` decision, not a repair.
    pub fn repair_links(&mut self) -> Result<usize> {
        let mut written = 0;

        let mut roster = self.all_tasks();
        roster.sort_by(|a, b| a.created_at.total_cmp(&b.created_at));

        for entry in roster {
            // Reload: an earlier reciprocal insertion may have touched this
            // record since the roster scan.
            let mut task = match self.load_task(&entry.id) {
                Ok(task) => task,
                Err(Error::TaskNotFound(_)) => continue,
                Err(e) => return Err(e),
            };

            let mut changed = false;
            let link_types: Vec<String> = task.links.keys().cloned().collect();
            for link_type in link_types {
                let targets = task.links.get(&link_type).cloned().unwrap_or_default();

                let mut seen = HashSet::new();
                let unique: Vec<String> = targets
                    .iter()
                    .filter(|id| seen.insert((*id).clone()))
                    .cloned()
                    .collect();
                if unique != targets {
                    task.links.insert(link_type.clone(), unique.clone());
                    changed = true;
                }

                for target_id in &unique {
                    let mut target = match self.load_task(target_id) {
                        Ok(target) => target,
                        Err(Error::TaskNotFound(_)) => continue,
                        Err(e) => return Err(e),
                    };
                    let reciprocal = target.links.entry(link_type.clone()).or_default();
                    if !reciprocal.iter().any(|id| id == &task.id) {
                        reciprocal.push(task.id.clone());
                        self.save_task(&mut target)?;
                        written += 1;
                    }
                }
            }

            if changed {
                self.save_task(&mut task)?;
                written += 1;
            }
        }

        if written > 0 {
            info!(written, "link repair rewrote records");
        }
        Ok(written)
    }
}

fn remove_link_entry(
    links: &mut std::collections::BTreeMap<String, Vec<String>>,
    link_type: &str,
    id: &str,
) -> bool {
    let Some(targets) = links.get_mut(link_type) else {
        return false;
    };
    let original = targets.len();
    targets.retain(|t| t != id);
    let removed = targets.len() != original;
    if targets.is_empty() {
        links.remove(link_type);
    }
    removed
}
