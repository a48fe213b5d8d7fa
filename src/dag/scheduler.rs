// src/dag/scheduler.rs

use tracing::{debug, info};

use crate::dag::graph::JobGraph;
use crate::dag::job::JobDescriptor;
use crate::types::JobId;

/// Slot accounting for one machine.
///
/// Between master steps `available + running threads == total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPool {
    total: usize,
    available: usize,
}

impl SlotPool {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            available: total,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn available(&self) -> usize {
        self.available
    }

    pub fn fits(&self, threads: usize) -> bool {
        threads <= self.available
    }

    fn acquire(&mut self, threads: usize) {
        debug_assert!(self.fits(threads), "acquiring more slots than available");
        self.available -= threads;
    }

    fn release(&mut self, threads: usize) {
        debug_assert!(
            self.available + threads <= self.total,
            "releasing more slots than were acquired"
        );
        self.available += threads;
    }
}

/// Picks runnable jobs and hands out slots.
///
/// Queued jobs are ordered by `(unresolved dependency count, id)`. A pass
/// promotes the first runnable job that fits and then starts over, so a
/// large job at the head of the order does not block smaller ones behind
/// it, but slots are not packed optimally either.
#[derive(Debug)]
pub struct Scheduler {
    slots: SlotPool,
}

impl Scheduler {
    pub fn new(slots_total: usize) -> Self {
        Self {
            slots: SlotPool::new(slots_total),
        }
    }

    pub fn slots(&self) -> SlotPool {
        self.slots
    }

    /// Return the slots of a job that left the running set.
    pub fn release(&mut self, job: &JobDescriptor) {
        self.slots.release(job.thread_count);
        debug!(
            job_id = job.id,
            threads = job.thread_count,
            slots_available = self.slots.available,
            "slots returned"
        );
    }

    /// The job a single scheduling pass would promote, if any.
    pub fn next_runnable(&self, graph: &JobGraph) -> Option<JobId> {
        let mut order: Vec<(usize, JobId, usize)> = graph
            .queued()
            .map(|job| {
                let (deps, id) = job.schedule_key();
                (deps, id, job.thread_count)
            })
            .collect();
        order.sort_unstable();

        for (deps, id, threads) in order {
            if deps > 0 {
                // Dependency count is the primary key; nothing after this
                // point can be runnable.
                break;
            }
            if self.slots.fits(threads) {
                return Some(id);
            }
        }
        None
    }

    /// Promote runnable jobs until nothing else fits.
    ///
    /// Returns the promoted descriptors, in promotion order, for the caller
    /// to launch.
    pub fn schedule(&mut self, graph: &mut JobGraph) -> Vec<JobDescriptor> {
        info!(
            slots_available = self.slots.available,
            slots_total = self.slots.total,
            queued = graph.queued().count(),
            "running scheduler"
        );

        let mut promoted = Vec::new();
        while self.slots.available > 0 {
            let Some(id) = self.next_runnable(graph) else {
                debug!("no runnable job fits the free slots");
                break;
            };
            let Some(job) = graph.promote(id) else {
                break;
            };

            self.slots.acquire(job.thread_count);
            info!(
                job_id = id,
                threads = job.thread_count,
                slots_available = self.slots.available,
                "promoting job to running"
            );
            promoted.push(job.clone());
        }
        promoted
    }
}
