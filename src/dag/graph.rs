// src/dag/graph.rs

//! Queued/running job maps with mirrored dependency edges.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::dag::job::JobDescriptor;
use crate::types::JobId;

/// Active jobs of a grid master.
///
/// Every active job lives in exactly one of `queued` or `running`. Finished,
/// failed and cancelled jobs are removed entirely; no history is kept.
#[derive(Debug, Default)]
pub struct JobGraph {
    queued: BTreeMap<JobId, JobDescriptor>,
    running: BTreeMap<JobId, JobDescriptor>,
}

impl JobGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty() && self.running.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queued.len() + self.running.len()
    }

    pub fn is_queued(&self, id: JobId) -> bool {
        self.queued.contains_key(&id)
    }

    pub fn is_running(&self, id: JobId) -> bool {
        self.running.contains_key(&id)
    }

    pub fn get(&self, id: JobId) -> Option<&JobDescriptor> {
        self.queued.get(&id).or_else(|| self.running.get(&id))
    }

    pub fn queued(&self) -> impl Iterator<Item = &JobDescriptor> {
        self.queued.values()
    }

    pub fn running(&self) -> impl Iterator<Item = &JobDescriptor> {
        self.running.values()
    }

    pub fn queued_ids(&self) -> Vec<JobId> {
        self.queued.keys().copied().collect()
    }

    pub fn running_ids(&self) -> Vec<JobId> {
        self.running.keys().copied().collect()
    }

    /// Queued ids followed by running ids.
    pub fn active_ids(&self) -> Vec<JobId> {
        self.queued.keys().chain(self.running.keys()).copied().collect()
    }

    /// Sum of `thread_count` over running jobs.
    pub fn running_threads(&self) -> usize {
        self.running.values().map(|job| job.thread_count).sum()
    }

    fn active_mut(&mut self, id: JobId) -> Option<&mut JobDescriptor> {
        if self.queued.contains_key(&id) {
            self.queued.get_mut(&id)
        } else {
            self.running.get_mut(&id)
        }
    }

    /// Insert a freshly submitted job into `queued`.
    ///
    /// The job is registered as a child of every dependency that is still
    /// queued or running. Dependencies on anything else are already
    /// resolved (or gone) and are dropped from the job's set.
    pub fn insert_queued(&mut self, mut job: JobDescriptor) {
        let id = job.id;
        job.dependencies.retain(|&dep| match self.active_mut(dep) {
            Some(parent) => {
                parent.children.insert(id);
                true
            }
            None => {
                debug!(job_id = id, dependency = dep, "dependency not active; treating as resolved");
                false
            }
        });
        self.queued.insert(id, job);
    }

    /// Move a queued job to `running`. Returns the promoted job.
    pub fn promote(&mut self, id: JobId) -> Option<&JobDescriptor> {
        let job = self.queued.remove(&id)?;
        if !job.is_runnable() {
            warn!(job_id = id, deps = ?job.dependencies, "refusing to promote job with unresolved dependencies");
            self.queued.insert(id, job);
            return None;
        }
        Some(self.running.entry(id).or_insert(job))
    }

    pub fn remove_running(&mut self, id: JobId) -> Option<JobDescriptor> {
        self.running.remove(&id)
    }

    pub fn remove_queued(&mut self, id: JobId) -> Option<JobDescriptor> {
        self.queued.remove(&id)
    }

    /// Resolve `job` as a dependency of each of its queued children.
    pub fn release_children(&mut self, job: &JobDescriptor) {
        for child_id in &job.children {
            if let Some(child) = self.queued.get_mut(child_id) {
                if !child.dependencies.remove(&job.id) {
                    warn!(job_id = job.id, child = child_id, "job missing from child dependencies");
                } else {
                    debug!(job_id = job.id, child = child_id, "removed from child dependencies");
                }
            }
        }
    }

    /// Drop `job` from the children set of every parent that is still active.
    pub fn detach_from_parents(&mut self, job: &JobDescriptor) {
        for &parent_id in &job.dependencies {
            if let Some(parent) = self.active_mut(parent_id) {
                parent.children.remove(&job.id);
            }
        }
    }

    /// Remove every still-queued descendant of `job`.
    ///
    /// Running descendants, and anything reachable only through them, are
    /// left alone. Returns the removed ids in visiting order.
    pub fn cascade_remove(&mut self, job: &JobDescriptor) -> Vec<JobId> {
        let mut removed = Vec::new();
        let mut visited: HashSet<JobId> = HashSet::new();
        let mut stack: Vec<JobId> = job.children.iter().rev().copied().collect();

        while let Some(child_id) = stack.pop() {
            if !visited.insert(child_id) {
                continue;
            }
            let Some(child) = self.queued.remove(&child_id) else {
                continue;
            };

            debug!(job_id = child_id, root = job.id, "removing queued descendant");
            self.detach_from_parents(&child);
            stack.extend(child.children.iter().rev().copied());
            removed.push(child_id);
        }

        removed
    }

    /// Whether every dependency edge between active jobs has its mirror
    /// edge and no active job references an inactive parent.
    pub fn edges_mirrored(&self) -> bool {
        let all = || self.queued.values().chain(self.running.values());
        all().all(|job| {
            let deps_ok = job.dependencies.iter().all(|dep| {
                self.get(*dep)
                    .is_some_and(|parent| parent.children.contains(&job.id))
            });
            let children_ok = job.children.iter().all(|child| {
                self.get(*child)
                    .is_none_or(|c| c.dependencies.contains(&job.id))
            });
            deps_ok && children_ok
        })
    }
}
