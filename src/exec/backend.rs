// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The master talks to an `ExecutorBackend` instead of spawning processes
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production implementation in [`job_runner`].
//!
//! - `RealExecutorBackend` spawns one supervisory Tokio task per job and
//!   keeps its join handle plus a termination trigger, keyed by job id,
//!   for as long as the job runs.
//! - Tests can provide their own `ExecutorBackend` that, for example,
//!   records launches and emits `Completed` messages directly.
//!
//! [`job_runner`]: super::job_runner

use std::collections::HashMap;

use anyhow::anyhow;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dag::JobDescriptor;
use crate::engine::GridMessage;
use crate::errors::Result;
use crate::types::{BoxFuture, JobId};

use super::job_runner::run_job;
use super::terminate::TerminationPolicy;

/// Trait abstracting how promoted jobs are executed and stopped.
///
/// Production code uses [`RealExecutorBackend`]; tests can provide their
/// own implementation that doesn't spawn real processes.
pub trait ExecutorBackend: Send {
    /// Start running `job`. The outcome is reported later as a
    /// `Completed` / `Failed` message on the master's inbound channel.
    fn launch(&mut self, job: JobDescriptor) -> BoxFuture<'_, Result<()>>;

    /// Release the executor of a job whose outcome has been reported.
    fn reclaim(&mut self, id: JobId) -> BoxFuture<'_, Result<()>>;

    /// Stop a running job and wait until its executor is gone.
    fn terminate(&mut self, id: JobId) -> BoxFuture<'_, Result<()>>;

    /// Stop every running job and wait for all of them.
    fn terminate_all(&mut self) -> BoxFuture<'_, Result<()>>;
}

/// Internal handle for a currently-running job.
///
/// Dropping `terminate` without sending also makes the executor terminate
/// its process, so dropping the backend stops every job it still owns.
struct ActiveExecutor {
    terminate: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Real executor backend used in production.
pub struct RealExecutorBackend {
    master_tx: mpsc::UnboundedSender<GridMessage>,
    policy: TerminationPolicy,
    active: HashMap<JobId, ActiveExecutor>,
}

impl RealExecutorBackend {
    /// Create a backend whose executors report to `master_tx`.
    pub fn new(master_tx: mpsc::UnboundedSender<GridMessage>, policy: TerminationPolicy) -> Self {
        Self {
            master_tx,
            policy,
            active: HashMap::new(),
        }
    }

    /// Number of executors currently owned by the backend.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

async fn join_executor(id: JobId, handle: JoinHandle<()>) {
    if let Err(e) = handle.await {
        warn!(job_id = id, error = %e, "executor task ended abnormally");
    } else {
        debug!(job_id = id, "executor joined");
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn launch(&mut self, job: JobDescriptor) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let id = job.id;
            if self.active.contains_key(&id) {
                return Err(anyhow!("an executor for job {id} is already running").into());
            }

            let (terminate_tx, terminate_rx) = oneshot::channel::<()>();
            let handle = tokio::spawn(run_job(
                job,
                self.master_tx.clone(),
                terminate_rx,
                self.policy.clone(),
            ));

            self.active.insert(
                id,
                ActiveExecutor {
                    terminate: terminate_tx,
                    handle,
                },
            );
            Ok(())
        })
    }

    fn reclaim(&mut self, id: JobId) -> BoxFuture<'_, Result<()>> {
        let active = self.active.remove(&id);
        Box::pin(async move {
            match active {
                Some(active) => join_executor(id, active.handle).await,
                None => debug!(job_id = id, "no executor to reclaim"),
            }
            Ok(())
        })
    }

    fn terminate(&mut self, id: JobId) -> BoxFuture<'_, Result<()>> {
        let active = self.active.remove(&id);
        Box::pin(async move {
            let Some(active) = active else {
                debug!(job_id = id, "no executor to terminate");
                return Ok(());
            };
            if active.terminate.send(()).is_err() {
                debug!(job_id = id, "executor already finished while terminating");
            }
            join_executor(id, active.handle).await;
            Ok(())
        })
    }

    fn terminate_all(&mut self) -> BoxFuture<'_, Result<()>> {
        let active: Vec<(JobId, ActiveExecutor)> = self.active.drain().collect();
        Box::pin(async move {
            if !active.is_empty() {
                info!(count = active.len(), "terminating all running jobs");
            }

            // Signal everything first so the grace periods overlap.
            let mut handles = Vec::with_capacity(active.len());
            for (id, executor) in active {
                warn!(job_id = id, "terminating job");
                let _ = executor.terminate.send(());
                handles.push((id, executor.handle));
            }
            for (id, handle) in handles {
                join_executor(id, handle).await;
            }
            Ok(())
        })
    }
}
