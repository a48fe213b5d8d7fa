// src/dag/mod.rs

//! Job graph and scheduling.
//!
//! - [`job`] defines the descriptor the master keeps per job.
//! - [`graph`] holds the queued/running maps, the mirrored dependency
//!   edges, and cascade removal.
//! - [`scheduler`] owns slot accounting and decides which queued jobs are
//!   promoted to running.

pub mod graph;
pub mod job;
pub mod scheduler;

pub use graph::JobGraph;
pub use job::JobDescriptor;
pub use scheduler::{Scheduler, SlotPool};
