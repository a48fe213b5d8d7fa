// src/dag/job.rs

//! Job descriptors as held by the grid master.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::types::{JobId, resolve_job_path};

/// Id carried by a descriptor before the master has assigned one.
pub const UNASSIGNED_JOB_ID: JobId = 0;

/// One unit of work inside the master.
///
/// `dependencies` only ever holds ids of jobs that are still queued or
/// running; the master drops anything else on submission and removes ids
/// as parents finish. `children` is the mirrored back edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub id: JobId,
    pub command: String,
    pub working_directory: PathBuf,
    /// Stdout path; may contain the job id placeholder until submission.
    pub stdout_path: PathBuf,
    /// Stderr path; may contain the job id placeholder until submission.
    pub stderr_path: PathBuf,
    /// Number of slots the job occupies while running. Always >= 1.
    pub thread_count: usize,
    pub dependencies: BTreeSet<JobId>,
    pub children: BTreeSet<JobId>,
}

impl JobDescriptor {
    pub fn new(
        command: impl Into<String>,
        working_directory: impl Into<PathBuf>,
        stdout_path: impl Into<PathBuf>,
        stderr_path: impl Into<PathBuf>,
        thread_count: usize,
        dependencies: impl IntoIterator<Item = JobId>,
    ) -> Self {
        Self {
            id: UNASSIGNED_JOB_ID,
            command: command.into(),
            working_directory: working_directory.into(),
            stdout_path: stdout_path.into(),
            stderr_path: stderr_path.into(),
            thread_count,
            dependencies: dependencies.into_iter().collect(),
            children: BTreeSet::new(),
        }
    }

    /// Give the descriptor its final id and resolve the log path templates.
    pub fn assign_id(&mut self, id: JobId) {
        self.id = id;
        self.stdout_path = resolve_job_path(&self.stdout_path, id);
        self.stderr_path = resolve_job_path(&self.stderr_path, id);
    }

    /// Number of parents that have not finished yet.
    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_runnable(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Scheduling order: fewer unresolved dependencies first, then lower id.
    pub fn schedule_key(&self) -> (usize, JobId) {
        (self.dependency_count(), self.id)
    }
}
