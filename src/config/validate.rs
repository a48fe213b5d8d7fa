// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{BatchFile, JobConfig, RawBatchFile};
use crate::errors::{GridError, Result};

impl TryFrom<RawBatchFile> for BatchFile {
    type Error = GridError;

    fn try_from(raw: RawBatchFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_batch(&raw)?;
        Ok(BatchFile::new_unchecked(raw.grid, raw.job))
    }
}

fn validate_raw_batch(batch: &RawBatchFile) -> Result<()> {
    ensure_has_jobs(batch)?;
    validate_threads(batch)?;
    validate_job_dependencies(batch)?;
    dependency_order(&batch.job)?;
    Ok(())
}

fn ensure_has_jobs(batch: &RawBatchFile) -> Result<()> {
    if batch.job.is_empty() {
        return Err(GridError::ConfigError(
            "batch must contain at least one [job.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_threads(batch: &RawBatchFile) -> Result<()> {
    for (name, job) in batch.job.iter() {
        if job.threads == 0 {
            return Err(GridError::ConfigError(format!(
                "job '{}' must request at least one thread",
                name
            )));
        }
    }
    ensure_jobs_fit(&batch.job, batch.grid.slots)
}

/// Reject jobs that need more slots than a grid of `slots` has.
///
/// `slots == 0` (auto-detect) is not checked here; the master warns about
/// such jobs at submission time instead.
pub fn ensure_jobs_fit<'a>(
    jobs: impl IntoIterator<Item = (&'a String, &'a JobConfig)>,
    slots: usize,
) -> Result<()> {
    if slots == 0 {
        return Ok(());
    }
    for (name, job) in jobs {
        if job.threads > slots {
            return Err(GridError::ConfigError(format!(
                "job '{}' needs {} threads but the grid only has {} slots",
                name, job.threads, slots
            )));
        }
    }
    Ok(())
}

fn validate_job_dependencies(batch: &RawBatchFile) -> Result<()> {
    for (name, job) in batch.job.iter() {
        for dep in job.after.iter() {
            if !batch.job.contains_key(dep) {
                return Err(GridError::ConfigError(format!(
                    "job '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(GridError::ConfigError(format!(
                    "job '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

/// Job names ordered so that every job comes after its dependencies.
///
/// Edge direction is dependency -> dependent: for
///
/// ```toml
/// [job.B]
/// after = ["A"]
/// ```
///
/// the graph has an edge A -> B.
pub fn dependency_order<'a>(
    jobs: &'a std::collections::BTreeMap<String, JobConfig>,
) -> Result<Vec<&'a str>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in jobs.keys() {
        graph.add_node(name.as_str());
    }

    for (name, job) in jobs.iter() {
        for dep in job.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    // A topological sort fails if there is a cycle.
    toposort(&graph, None).map_err(|cycle| {
        GridError::DependencyCycle(format!(
            "cycle detected in job dependencies involving job '{}'",
            cycle.node_id()
        ))
    })
}
