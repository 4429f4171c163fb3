//! Per-instance memoization of listings.
//!
//! Three independent memoizations: the queue listing, task listings keyed by
//! their filter tuple, and the epic listing. Every mutating operation on an
//! entity kind must call `invalidate` for that kind; a queue mutation also
//! drops the task listings, since deleting a queue removes its tasks.
//!
//! The cache is pure read-through and instance-scoped. There is no
//! cross-process invalidation: correctness assumes this process is the sole
//! writer for the lifetime of the caching instance.

use std::collections::HashMap;

use crate::models::{Epic, Queue, Task, TaskFilter};

/// Which listing a mutation invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Queues,
    Tasks,
    Epics,
}

/// Memoized listings owned by a `TaskManager` instance.
#[derive(Debug, Default)]
pub struct ListingCache {
    queues: Option<Vec<Queue>>,
    tasks: HashMap<TaskFilter, Vec<Task>>,
    epics: Option<Vec<Epic>>,
}

impl ListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the cached listing for a kind. Queue mutations cascade to tasks.
    pub fn invalidate(&mut self, kind: CacheKind) {
        match kind {
            CacheKind::Queues => {
                self.queues = None;
                self.tasks.clear();
            }
            CacheKind::Tasks => self.tasks.clear(),
            CacheKind::Epics => self.epics = None,
        }
    }

    pub fn queues(&self) -> Option<&Vec<Queue>> {
        self.queues.as_ref()
    }

    pub fn store_queues(&mut self, queues: Vec<Queue>) {
        self.queues = Some(queues);
    }

    pub fn tasks(&self, filter: &TaskFilter) -> Option<&Vec<Task>> {
        self.tasks.get(filter)
    }

    pub fn store_tasks(&mut self, filter: TaskFilter, tasks: Vec<Task>) {
        self.tasks.insert(filter, tasks);
    }

    pub fn epics(&self) -> Option<&Vec<Epic>> {
        self.epics.as_ref()
    }

    pub fn store_epics(&mut self, epics: Vec<Epic>) {
        self.epics = Some(epics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;

    #[test]
    fn test_starts_empty() {
        let cache = ListingCache::new();
        assert!(cache.queues().is_none());
        assert!(cache.tasks(&TaskFilter::default()).is_none());
        assert!(cache.epics().is_none());
    }

    #[test]
    fn test_task_cache_keyed_by_filter() {
        let mut cache = ListingCache::new();
        cache.store_tasks(TaskFilter::default(), vec![]);
        assert!(cache.tasks(&TaskFilter::default()).is_some());
        assert!(
            cache
                .tasks(&TaskFilter::by_status(TaskStatus::Done))
                .is_none()
        );
    }

    #[test]
    fn test_invalidate_is_kind_scoped() {
        let mut cache = ListingCache::new();
        cache.store_queues(vec![]);
        cache.store_tasks(TaskFilter::default(), vec![]);
        cache.store_epics(vec![]);

        cache.invalidate(CacheKind::Epics);
        assert!(cache.epics().is_none());
        assert!(cache.queues().is_some());
        assert!(cache.tasks(&TaskFilter::default()).is_some());

        cache.invalidate(CacheKind::Tasks);
        assert!(cache.tasks(&TaskFilter::default()).is_none());
        assert!(cache.queues().is_some());
    }

    #[test]
    fn test_queue_invalidation_cascades_to_tasks() {
        let mut cache = ListingCache::new();
        cache.store_queues(vec![]);
        cache.store_tasks(TaskFilter::default(), vec![]);

        cache.invalidate(CacheKind::Queues);
        assert!(cache.queues().is_none());
        assert!(cache.tasks(&TaskFilter::default()).is_none());
    }
}
