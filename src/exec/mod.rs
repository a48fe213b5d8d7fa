// src/exec/mod.rs

//! Process execution layer.
//!
//! Runs job commands with `tokio::process::Command` and reports the outcome
//! back to the grid master as `GridMessage`s.
//!
//! - [`job_runner`] supervises one job process from launch to report.
//! - [`terminate`] implements the SIGTERM → backoff → SIGKILL protocol.
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `RealExecutorBackend` the master uses in production, and which tests
//!   can replace with a fake implementation.

pub mod backend;
pub mod job_runner;
pub mod terminate;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use job_runner::{exit_code_of, run_job};
pub use terminate::{DEFAULT_BACKOFF_MS, TerminationPolicy, terminate_child};
