// src/engine/handlers.rs

//! Per-message handling logic for the master core.

use tracing::{error, info, warn};

use crate::dag::{JobDescriptor, JobGraph, Scheduler};
use crate::engine::Reply;
use crate::types::JobId;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasterCommand {
    /// Start an executor for a job that was just promoted to running.
    Launch(JobDescriptor),
    /// The job's executor reported its outcome; join it.
    Reclaim(JobId),
    /// Stop a running job with the escalating termination protocol and wait
    /// for its executor.
    Terminate(JobId),
    /// Stop every running job (used on exit).
    TerminateAll,
}

/// Decision returned by the core after handling a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    /// Reply for `Submit` / `List` requests.
    pub reply: Option<Reply>,
    /// Commands the IO shell executes, in order.
    pub commands: Vec<MasterCommand>,
    /// Whether the master loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn empty() -> Self {
        Self {
            reply: None,
            commands: Vec::new(),
            keep_running: true,
        }
    }
}

/// Run a scheduling pass and turn every promotion into a launch command.
fn schedule(graph: &mut JobGraph, scheduler: &mut Scheduler) -> Vec<MasterCommand> {
    scheduler
        .schedule(graph)
        .into_iter()
        .map(MasterCommand::Launch)
        .collect()
}

/// Bookkeeping for a job that left the running set.
///
/// Slots go back to the pool and the job stops blocking its children. On a
/// failure, its still-queued descendants are pruned as well.
fn retire_running(
    graph: &mut JobGraph,
    scheduler: &mut Scheduler,
    job: &JobDescriptor,
    failed: bool,
) {
    scheduler.release(job);
    graph.release_children(job);
    if failed {
        prune_descendants(graph, job);
    }
    graph.detach_from_parents(job);
}

fn prune_descendants(graph: &mut JobGraph, job: &JobDescriptor) {
    let removed = graph.cascade_remove(job);
    if !removed.is_empty() {
        warn!(job_id = job.id, ?removed, "removed queued descendants");
    }
}

pub fn handle_submit(
    graph: &mut JobGraph,
    scheduler: &mut Scheduler,
    id: JobId,
    mut job: JobDescriptor,
) -> CoreStep {
    job.assign_id(id);

    if job.thread_count > scheduler.slots().total() {
        warn!(
            job_id = id,
            threads = job.thread_count,
            slots_total = scheduler.slots().total(),
            "job needs more slots than the grid has; it will never run"
        );
    }

    info!(
        job_id = id,
        threads = job.thread_count,
        deps = ?job.dependencies,
        "queued new job"
    );
    graph.insert_queued(job);

    CoreStep {
        reply: Some(Reply::Submitted(id)),
        commands: schedule(graph, scheduler),
        keep_running: true,
    }
}

pub fn handle_list(graph: &JobGraph) -> CoreStep {
    CoreStep {
        reply: Some(Reply::Jobs(graph.active_ids())),
        ..CoreStep::empty()
    }
}

pub fn handle_exit(graph: &JobGraph) -> CoreStep {
    info!(running = ?graph.running_ids(), "exit requested; shutting down");
    CoreStep {
        reply: None,
        commands: vec![MasterCommand::TerminateAll],
        keep_running: false,
    }
}

pub fn handle_completed(
    graph: &mut JobGraph,
    scheduler: &mut Scheduler,
    id: JobId,
    exit_code: i32,
) -> CoreStep {
    let Some(job) = graph.remove_running(id) else {
        warn!(job_id = id, exit_code, "completion for a job that is not running; ignoring");
        return CoreStep::empty();
    };

    let failed = exit_code != 0;
    if failed {
        error!(job_id = id, exit_code, "job failed");
    } else {
        info!(job_id = id, "job finished");
    }

    let mut commands = vec![MasterCommand::Reclaim(id)];
    retire_running(graph, scheduler, &job, failed);
    commands.extend(schedule(graph, scheduler));

    CoreStep {
        commands,
        ..CoreStep::empty()
    }
}

pub fn handle_failed(
    graph: &mut JobGraph,
    scheduler: &mut Scheduler,
    id: JobId,
    error: &str,
) -> CoreStep {
    let Some(job) = graph.remove_running(id) else {
        warn!(job_id = id, error, "failure for a job that is not running; ignoring");
        return CoreStep::empty();
    };

    error!(job_id = id, error, "execution of job failed");

    let mut commands = vec![MasterCommand::Reclaim(id)];
    retire_running(graph, scheduler, &job, true);
    commands.extend(schedule(graph, scheduler));

    CoreStep {
        commands,
        ..CoreStep::empty()
    }
}

pub fn handle_cancel(graph: &mut JobGraph, scheduler: &mut Scheduler, id: JobId) -> CoreStep {
    let mut commands = Vec::new();

    if let Some(job) = graph.remove_running(id) {
        warn!(job_id = id, "cancelling running job");
        commands.push(MasterCommand::Terminate(id));
        retire_running(graph, scheduler, &job, true);
    } else if let Some(job) = graph.remove_queued(id) {
        warn!(job_id = id, "cancelling queued job");
        prune_descendants(graph, &job);
        graph.detach_from_parents(&job);
    } else {
        warn!(job_id = id, "cancellation for unknown job; ignoring");
        return CoreStep::empty();
    }

    commands.extend(schedule(graph, scheduler));
    CoreStep {
        commands,
        ..CoreStep::empty()
    }
}
