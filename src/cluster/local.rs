// src/cluster/local.rs

//! Cluster implementation backed by a grid master on this machine.

use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::cluster::{Cluster, Job};
use crate::config::GridSettings;
use crate::dag::JobDescriptor;
use crate::engine::{GridMessage, Master, MasterCore};
use crate::errors::{GridError, Result};
use crate::exec::RealExecutorBackend;
use crate::types::{BoxFuture, JobId};

/// Default stdout template, relative to the log directory.
pub const DEFAULT_STDOUT_TEMPLATE: &str = "localgrid-%J.out";
/// Default stderr template, relative to the log directory.
pub const DEFAULT_STDERR_TEMPLATE: &str = "localgrid-%J.err";

struct MasterHandle {
    requests: mpsc::UnboundedSender<GridMessage>,
    task: JoinHandle<Result<()>>,
}

/// Client-side proxy for a local grid master.
///
/// The master runs as a Tokio task and owns all scheduling state; this
/// struct only holds the sending half of its inbound channel and the task
/// handle. Dropping a cluster whose master is still running sends it
/// `Exit`, so no job outlives the cluster.
pub struct LocalCluster {
    settings: GridSettings,
    master: Option<MasterHandle>,
}

impl std::fmt::Debug for LocalCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCluster")
            .field("settings", &self.settings)
            .field("running", &self.is_running())
            .finish()
    }
}

impl LocalCluster {
    /// Create a cluster without starting its master.
    pub fn new(settings: GridSettings) -> Self {
        Self {
            settings,
            master: None,
        }
    }

    /// Create a cluster and start its master. Must be called from within a
    /// Tokio runtime.
    pub fn start_new(settings: GridSettings) -> Self {
        let mut cluster = Self::new(settings);
        cluster.start();
        cluster
    }

    pub fn settings(&self) -> &GridSettings {
        &self.settings
    }

    /// Whether a master task exists and has not finished.
    pub fn is_running(&self) -> bool {
        self.master
            .as_ref()
            .is_some_and(|master| !master.task.is_finished())
    }

    /// Launch the master unless one is already running.
    pub fn start(&mut self) {
        if self.is_running() {
            debug!("grid master already running");
            return;
        }
        if self.master.take().is_some() {
            warn!("previous grid master exited on its own; starting a new one");
        }

        let slots = self.settings.resolved_slots();
        info!(slots, "starting local grid master");

        let (requests, inbox) = mpsc::unbounded_channel::<GridMessage>();
        let executor =
            RealExecutorBackend::new(requests.clone(), self.settings.termination_policy());
        let master = Master::new(MasterCore::new(slots), inbox, executor);
        let task = tokio::spawn(master.run());

        self.master = Some(MasterHandle { requests, task });
    }

    fn requests(&self) -> Option<&mpsc::UnboundedSender<GridMessage>> {
        self.master.as_ref().map(|master| &master.requests)
    }

    /// Send `Exit` and wait for the master to stop.
    pub async fn shutdown(&mut self) -> Result<()> {
        let Some(master) = self.master.as_mut() else {
            return Ok(());
        };
        info!("requesting grid master shutdown");
        if master.requests.send(GridMessage::Exit).is_err() {
            debug!("grid master already gone");
        }
        let outcome = (&mut master.task).await;
        self.master = None;
        master_outcome(outcome)
    }

    /// Send `Drain` and wait for the master to run out of jobs and stop.
    pub async fn wait(&mut self) -> Result<()> {
        let Some(master) = self.master.as_mut() else {
            return Ok(());
        };
        info!("waiting for grid master to drain");
        if master.requests.send(GridMessage::Drain).is_err() {
            debug!("grid master already gone");
        }
        let outcome = (&mut master.task).await;
        self.master = None;
        master_outcome(outcome)
    }

    /// Ids of queued and running jobs; empty when no master is running.
    pub async fn list(&self) -> Result<Vec<JobId>> {
        let Some(requests) = self.requests() else {
            return Ok(Vec::new());
        };
        let (reply, response) = oneshot::channel();
        requests
            .send(GridMessage::List { reply })
            .map_err(|_| GridError::MasterFailed("grid master is not accepting requests".into()))?;
        response
            .await
            .map_err(|_| GridError::MasterFailed("grid master exited before listing jobs".into()))
    }

    /// Submit `job` and return it with its id assigned.
    ///
    /// Missing stdout/stderr templates default to `localgrid-%J.out` /
    /// `localgrid-%J.err` in the configured log directory, or the job's
    /// working directory. The chosen templates are written back to the
    /// returned job. Jobs needing more threads than the grid has slots are
    /// rejected, since the master could never start them.
    pub async fn submit(&self, mut job: Job) -> Result<Job> {
        let Some(requests) = self.requests() else {
            return Err(GridError::Submission("no grid master running".into()));
        };
        if job.threads == 0 {
            return Err(GridError::Submission(
                "job must request at least one thread".into(),
            ));
        }
        let slots = self.settings.resolved_slots();
        if job.threads > slots {
            return Err(GridError::Submission(format!(
                "job requests {} threads but the grid has {slots} slots",
                job.threads
            )));
        }

        let cwd = match &job.working_directory {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        let log_dir = self.settings.log_dir.clone().unwrap_or_else(|| cwd.clone());
        let stdout = job
            .stdout
            .get_or_insert_with(|| default_log(&log_dir, DEFAULT_STDOUT_TEMPLATE))
            .clone();
        let stderr = job
            .stderr
            .get_or_insert_with(|| default_log(&log_dir, DEFAULT_STDERR_TEMPLATE))
            .clone();

        let descriptor = JobDescriptor::new(
            job.command.clone(),
            cwd,
            stdout,
            stderr,
            job.threads,
            job.dependency_ids(),
        );

        let (reply, response) = oneshot::channel();
        requests
            .send(GridMessage::Submit {
                job: descriptor,
                reply,
            })
            .map_err(|_| GridError::Submission("grid master is not accepting requests".into()))?;
        let id = response.await.map_err(|_| {
            GridError::Submission("grid master exited before assigning a job id".into())
        })?;

        info!(job_id = id, "submitted new job");
        job.id = Some(id);
        Ok(job)
    }

    /// Request cancellation of `job`. Does not wait for it to stop.
    pub fn cancel(&self, job: &Job) {
        let (Some(requests), Some(id)) = (self.requests(), job.id) else {
            return;
        };
        info!(job_id = id, "sending cancel request");
        if requests.send(GridMessage::Cancel { id }).is_err() {
            warn!(job_id = id, "grid master gone; cancel request dropped");
        }
    }
}

impl Drop for LocalCluster {
    fn drop(&mut self) {
        if let Some(master) = self.master.take() {
            if !master.task.is_finished() {
                debug!("cluster dropped with a running master; sending exit");
                let _ = master.requests.send(GridMessage::Exit);
            }
        }
    }
}

fn default_log(dir: &std::path::Path, template: &str) -> String {
    PathBuf::from(dir).join(template).to_string_lossy().into_owned()
}

fn master_outcome(outcome: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(GridError::MasterFailed(err.to_string())),
        Err(join_err) => Err(GridError::MasterFailed(join_err.to_string())),
    }
}

impl Cluster for LocalCluster {
    fn submit(&mut self, job: Job) -> BoxFuture<'_, Result<Job>> {
        Box::pin(LocalCluster::submit(self, job))
    }

    fn cancel(&mut self, job: &Job) -> Result<()> {
        LocalCluster::cancel(self, job);
        Ok(())
    }

    fn list(&mut self) -> BoxFuture<'_, Result<Vec<JobId>>> {
        Box::pin(LocalCluster::list(self))
    }

    fn wait(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(LocalCluster::wait(self))
    }

    fn shutdown(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(LocalCluster::shutdown(self))
    }
}
