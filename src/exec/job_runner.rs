// src/exec/job_runner.rs

//! Supervision of a single job process.

use std::fs::{self, File};
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::dag::JobDescriptor;
use crate::engine::GridMessage;
use crate::exec::terminate::{TerminationPolicy, terminate_child};
use crate::types::JobId;

/// Exit code reported after a launch or supervision fault.
pub const FAULT_EXIT_CODE: i32 = -1;

/// Exit code reported for a terminated job whose process still exited 0.
pub const TERMINATED_EXIT_CODE: i32 = 1;

/// Run one job to completion and report the outcome to the master.
///
/// Exactly one of the following reaches the master:
/// - `Completed { exit_code }` when the process exits on its own;
/// - `Completed` with a nonzero code after a termination request (or after
///   the backend that owns `terminate_rx` went away);
/// - `Failed` followed by `Completed { exit_code: -1 }` when the process
///   could not be launched or waited on. The trailing completion is a stale
///   notice for the master and keeps the protocol terminal.
pub async fn run_job(
    job: JobDescriptor,
    master_tx: mpsc::UnboundedSender<GridMessage>,
    terminate_rx: oneshot::Receiver<()>,
    policy: TerminationPolicy,
) {
    let id = job.id;
    if let Err(err) = run_job_inner(&job, &master_tx, terminate_rx, &policy).await {
        let error = format!("{err:#}");
        error!(job_id = id, error = %error, "job execution error");
        notify(&master_tx, id, GridMessage::Failed { id, error });
        notify(
            &master_tx,
            id,
            GridMessage::Completed {
                id,
                exit_code: FAULT_EXIT_CODE,
            },
        );
    }
}

async fn run_job_inner(
    job: &JobDescriptor,
    master_tx: &mpsc::UnboundedSender<GridMessage>,
    mut terminate_rx: oneshot::Receiver<()>,
    policy: &TerminationPolicy,
) -> Result<()> {
    info!(
        job_id = job.id,
        cmd = %job.command,
        cwd = %job.working_directory.display(),
        "starting job process"
    );

    let mut child = spawn_job_process(job)?;

    let exit_code = tokio::select! {
        status = child.wait() => {
            let status = status
                .with_context(|| format!("waiting for process of job {}", job.id))?;
            let code = exit_code_of(status);
            info!(job_id = job.id, exit_code = code, "job process exited");
            code
        }

        request = &mut terminate_rx => {
            match request {
                Ok(()) => info!(job_id = job.id, "termination requested for running job"),
                Err(_) => debug!(job_id = job.id, "executor backend dropped; terminating job"),
            }
            let status = terminate_child(&mut child, job.id, policy).await;
            let code = status.map(exit_code_of).unwrap_or(FAULT_EXIT_CODE);
            if code == 0 { TERMINATED_EXIT_CODE } else { code }
        }
    };

    notify(
        master_tx,
        job.id,
        GridMessage::Completed {
            id: job.id,
            exit_code,
        },
    );
    Ok(())
}

/// Open the log files and start the job's command through the shell.
fn spawn_job_process(job: &JobDescriptor) -> Result<Child> {
    let stdout = create_log_file(&job.stdout_path)?;
    let stderr = create_log_file(&job.stderr_path)?;

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&job.command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&job.command);
        c
    };

    cmd.current_dir(&job.working_directory)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    cmd.spawn()
        .with_context(|| format!("spawning process for job {}", job.id))
}

fn create_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
    }
    File::create(path).with_context(|| format!("creating log file {}", path.display()))
}

/// Exit code of a finished process; `128 + signal` when it was killed by a
/// signal.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    FAULT_EXIT_CODE
}

fn notify(master_tx: &mpsc::UnboundedSender<GridMessage>, id: JobId, message: GridMessage) {
    if master_tx.send(message).is_err() {
        debug!(job_id = id, "grid master gone; dropping notice");
    }
}
