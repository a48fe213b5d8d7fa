// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::exec::{DEFAULT_BACKOFF_MS, TerminationPolicy};

/// Job batch as read from a TOML file, before validation.
///
/// ```toml
/// [grid]
/// slots = 4
/// log_dir = "logs"
///
/// [job.align]
/// cmd = "bwa mem ref.fa reads.fq > out.sam"
/// threads = 2
///
/// [job.sort]
/// cmd = "samtools sort out.sam"
/// after = ["align"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBatchFile {
    /// Grid settings from `[grid]`.
    #[serde(default)]
    pub grid: GridSettings,

    /// All jobs from `[job.<name>]`, keyed by name.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
}

/// A validated job batch.
///
/// Can only be obtained through `TryFrom<RawBatchFile>` (or the loader),
/// so every dependency names a known job and the dependency graph is
/// acyclic.
#[derive(Debug, Clone)]
pub struct BatchFile {
    pub grid: GridSettings,
    pub job: BTreeMap<String, JobConfig>,
}

impl BatchFile {
    pub(crate) fn new_unchecked(grid: GridSettings, job: BTreeMap<String, JobConfig>) -> Self {
        Self { grid, job }
    }
}

/// `[grid]` section; also what a [`LocalCluster`](crate::cluster::LocalCluster)
/// is started with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GridSettings {
    /// Number of slots. `0` means "one per available CPU".
    #[serde(default)]
    pub slots: usize,

    /// Directory for default stdout/stderr files. Defaults to each job's
    /// working directory.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Delays between exit polls after SIGTERM, in milliseconds.
    #[serde(default = "default_termination_backoff_ms")]
    pub termination_backoff_ms: Vec<u64>,
}

fn default_termination_backoff_ms() -> Vec<u64> {
    DEFAULT_BACKOFF_MS.to_vec()
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            slots: 0,
            log_dir: None,
            termination_backoff_ms: default_termination_backoff_ms(),
        }
    }
}

impl GridSettings {
    pub fn with_slots(slots: usize) -> Self {
        Self {
            slots,
            ..Self::default()
        }
    }

    /// Slot count with `0` resolved to the machine's available parallelism.
    pub fn resolved_slots(&self) -> usize {
        if self.slots == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.slots
        }
    }

    pub fn termination_policy(&self) -> TerminationPolicy {
        TerminationPolicy::from_millis(&self.termination_backoff_ms)
    }
}

/// `[job.<name>]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobConfig {
    /// Shell command to run.
    pub cmd: String,

    /// Working directory, relative to the batch file's directory.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Slots the job occupies.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Stdout path template (`%J` is replaced by the job id).
    #[serde(default)]
    pub stdout: Option<String>,

    /// Stderr path template (`%J` is replaced by the job id).
    #[serde(default)]
    pub stderr: Option<String>,

    /// Names of jobs that must finish successfully first.
    #[serde(default)]
    pub after: Vec<String>,
}

fn default_threads() -> usize {
    1
}
