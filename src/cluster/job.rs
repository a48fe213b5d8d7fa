// src/cluster/job.rs

//! Caller-side job objects.

use std::path::PathBuf;

use crate::types::{JobId, resolve_job_placeholder};

/// Reference to another job that a submission depends on.
///
/// Only references whose job already has an id are honoured; the rest are
/// skipped at submission time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobRef {
    pub id: Option<JobId>,
}

impl From<&Job> for JobRef {
    fn from(job: &Job) -> Self {
        Self { id: job.id }
    }
}

impl From<JobId> for JobRef {
    fn from(id: JobId) -> Self {
        Self { id: Some(id) }
    }
}

/// A job as seen by callers of a [`Cluster`](super::Cluster).
///
/// `id` is filled in by a successful submit. `stdout` / `stderr` are path
/// templates that may contain the `%J` placeholder; when left empty the
/// cluster picks defaults on submission and writes them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: Option<JobId>,
    pub command: String,
    pub working_directory: Option<PathBuf>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    /// Slots the job occupies while running. Must be positive.
    pub threads: usize,
    pub dependencies: Vec<JobRef>,
}

impl Job {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            id: None,
            command: command.into(),
            working_directory: None,
            stdout: None,
            stderr: None,
            threads: 1,
            dependencies: Vec::new(),
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn stdout(mut self, template: impl Into<String>) -> Self {
        self.stdout = Some(template.into());
        self
    }

    pub fn stderr(mut self, template: impl Into<String>) -> Self {
        self.stderr = Some(template.into());
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Depend on `other`.
    pub fn after(mut self, other: impl Into<JobRef>) -> Self {
        self.dependencies.push(other.into());
        self
    }

    /// Ids of the dependencies that have been assigned one.
    pub fn dependency_ids(&self) -> Vec<JobId> {
        self.dependencies.iter().filter_map(|dep| dep.id).collect()
    }

    /// `path` with the job id placeholder substituted; unchanged while the
    /// job has no id.
    pub fn resolve_log(&self, path: &str) -> String {
        match self.id {
            Some(id) => resolve_job_placeholder(path, id),
            None => path.to_string(),
        }
    }
}
