// src/cluster/mod.rs

//! Client-side cluster interface.
//!
//! [`Cluster`] is the narrow contract a pipeline engine submits through.
//! [`LocalCluster`] implements it by running a grid master on the current
//! machine; adapters for real batch systems would implement the same trait.

pub mod job;
pub mod local;

pub use job::{Job, JobRef};
pub use local::LocalCluster;

use crate::errors::Result;
use crate::types::{BoxFuture, JobId};

pub trait Cluster: Send {
    /// Submit `job` and return it with its id assigned.
    fn submit(&mut self, job: Job) -> BoxFuture<'_, Result<Job>>;

    /// Ask for `job` to be cancelled. Does not wait.
    fn cancel(&mut self, job: &Job) -> Result<()>;

    /// Ids of all jobs that are queued or running.
    fn list(&mut self) -> BoxFuture<'_, Result<Vec<JobId>>>;

    /// Block until every submitted job is gone, then stop.
    fn wait(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Stop now, terminating running jobs.
    fn shutdown(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Substitute the job id into a log path template.
    fn resolve_log(&self, job: &Job, path: &str) -> String {
        job.resolve_log(path)
    }
}
