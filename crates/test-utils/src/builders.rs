#![allow(dead_code)]

use std::collections::BTreeMap;

use localgrid::config::{BatchFile, GridSettings, JobConfig, RawBatchFile};
use localgrid::dag::JobDescriptor;
use localgrid::types::JobId;

/// Builder for `BatchFile` to simplify test setup.
pub struct BatchFileBuilder {
    batch: RawBatchFile,
}

impl BatchFileBuilder {
    pub fn new() -> Self {
        Self {
            batch: RawBatchFile {
                grid: GridSettings::default(),
                job: BTreeMap::new(),
            },
        }
    }

    pub fn slots(mut self, slots: usize) -> Self {
        self.batch.grid.slots = slots;
        self
    }

    pub fn with_job(mut self, name: &str, job: JobConfig) -> Self {
        self.batch.job.insert(name.to_string(), job);
        self
    }

    pub fn raw(self) -> RawBatchFile {
        self.batch
    }

    pub fn build(self) -> BatchFile {
        BatchFile::try_from(self.batch).expect("Failed to build valid batch from builder")
    }
}

impl Default for BatchFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `JobConfig`.
pub struct JobConfigBuilder {
    job: JobConfig,
}

impl JobConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            job: JobConfig {
                cmd: cmd.to_string(),
                cwd: None,
                threads: 1,
                stdout: None,
                stderr: None,
                after: vec![],
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.job.after.push(dep.to_string());
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.job.threads = threads;
        self
    }

    pub fn stdout(mut self, template: &str) -> Self {
        self.job.stdout = Some(template.to_string());
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}

/// Builder for master-side `JobDescriptor`s that never touch the disk.
pub struct DescriptorBuilder {
    command: String,
    threads: usize,
    deps: Vec<JobId>,
}

impl DescriptorBuilder {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            threads: 1,
            deps: vec![],
        }
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn after(mut self, dep: JobId) -> Self {
        self.deps.push(dep);
        self
    }

    pub fn build(self) -> JobDescriptor {
        JobDescriptor::new(
            self.command,
            "/tmp",
            "/tmp/localgrid-test-%J.out",
            "/tmp/localgrid-test-%J.err",
            self.threads,
            self.deps,
        )
    }
}

/// Shorthand for `DescriptorBuilder::new(command).build()`.
pub fn descriptor(command: &str) -> JobDescriptor {
    DescriptorBuilder::new(command).build()
}
