// src/engine/core.rs

//! Pure core state machine of the grid master.
//!
//! [`MasterCore`] consumes [`MasterEvent`]s and produces a [`CoreStep`]:
//! an optional reply, the commands the IO shell has to run (launch,
//! reclaim, terminate), and whether the loop continues.
//!
//! It has no channels, no Tokio types, and spawns no processes, so the
//! whole scheduling behaviour can be driven synchronously from tests.

use tracing::info;

use crate::dag::{JobGraph, Scheduler, SlotPool};
use crate::engine::MasterEvent;
use crate::engine::handlers::{
    CoreStep, handle_cancel, handle_completed, handle_exit, handle_failed, handle_list,
    handle_submit,
};
use crate::types::JobId;

#[derive(Debug)]
pub struct MasterCore {
    graph: JobGraph,
    scheduler: Scheduler,
    draining: bool,
    last_id: JobId,
}

impl MasterCore {
    pub fn new(slots_total: usize) -> Self {
        info!(slots_total, "grid master initialised");
        Self {
            graph: JobGraph::new(),
            scheduler: Scheduler::new(slots_total),
            draining: false,
            last_id: 0,
        }
    }

    pub fn graph(&self) -> &JobGraph {
        &self.graph
    }

    pub fn slots(&self) -> SlotPool {
        self.scheduler.slots()
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    /// Whether the loop would stop right now because of drain mode.
    pub fn drained(&self) -> bool {
        self.draining && self.graph.is_empty()
    }

    fn next_id(&mut self) -> JobId {
        self.last_id += 1;
        self.last_id
    }

    /// Handle a single event, updating state and returning what the shell
    /// should do next.
    pub fn step(&mut self, event: MasterEvent) -> CoreStep {
        let mut step = match event {
            MasterEvent::Submit(job) => {
                let id = self.next_id();
                handle_submit(&mut self.graph, &mut self.scheduler, id, job)
            }
            MasterEvent::List => handle_list(&self.graph),
            MasterEvent::Drain => {
                if !self.draining {
                    info!("drain requested; exiting once all jobs are gone");
                    self.draining = true;
                }
                CoreStep {
                    reply: None,
                    commands: Vec::new(),
                    keep_running: true,
                }
            }
            MasterEvent::Exit => handle_exit(&self.graph),
            MasterEvent::Cancel(id) => handle_cancel(&mut self.graph, &mut self.scheduler, id),
            MasterEvent::Completed { id, exit_code } => {
                handle_completed(&mut self.graph, &mut self.scheduler, id, exit_code)
            }
            MasterEvent::Failed { id, error } => {
                handle_failed(&mut self.graph, &mut self.scheduler, id, &error)
            }
        };

        if step.keep_running && self.drained() {
            info!("drained; no queued or running jobs left");
            step.keep_running = false;
        }
        step
    }
}
