// src/exec/terminate.rs

//! Escalating termination of job processes.
//!
//! A job is first asked to stop with SIGTERM. Its exit is then polled on a
//! backoff schedule (a few short polls, then progressively longer ones);
//! if it is still alive after the last poll it gets SIGKILL. Jobs run in
//! their own process group and signals go to the whole group, so anything
//! the job's shell started is stopped with it.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tracing::{debug, info, warn};

use crate::types::JobId;

/// Default poll delays in milliseconds (about 8.3 s in total).
pub const DEFAULT_BACKOFF_MS: &[u64] = &[10, 10, 10, 20, 20, 20, 20, 20, 20, 100, 1000, 2000, 5000];

/// How long to wait for a job to honour SIGTERM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationPolicy {
    delays: Vec<Duration>,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self::from_millis(DEFAULT_BACKOFF_MS)
    }
}

impl TerminationPolicy {
    pub fn from_millis(delays: &[u64]) -> Self {
        Self {
            delays: delays.iter().copied().map(Duration::from_millis).collect(),
        }
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Upper bound on the grace period before SIGKILL.
    pub fn grace_period(&self) -> Duration {
        self.delays.iter().sum()
    }
}

/// Stop `child`, escalating from SIGTERM to SIGKILL.
///
/// Always reaps the process. Returns its exit status, or `None` when the
/// status could not be collected.
pub async fn terminate_child(
    child: &mut Child,
    job_id: JobId,
    policy: &TerminationPolicy,
) -> Option<ExitStatus> {
    match child.try_wait() {
        Ok(Some(status)) => return Some(status),
        Ok(None) => {}
        Err(e) => warn!(job_id, error = %e, "failed to poll job process before termination"),
    }

    info!(job_id, "sending SIGTERM");
    if let Err(e) = signal_group(child, Signal::Terminate) {
        warn!(job_id, error = %e, "failed to send SIGTERM");
    }

    for delay in policy.delays() {
        tokio::time::sleep(*delay).await;
        match child.try_wait() {
            Ok(Some(status)) => {
                info!(job_id, "job process terminated after SIGTERM");
                return Some(status);
            }
            Ok(None) => debug!(job_id, ?delay, "job process still alive"),
            Err(e) => warn!(job_id, error = %e, "failed to poll job process"),
        }
    }

    warn!(job_id, "job process still running; sending SIGKILL");
    if let Err(e) = signal_group(child, Signal::Kill) {
        warn!(job_id, error = %e, "failed to signal process group; killing leader only");
        if let Err(e) = child.start_kill() {
            warn!(job_id, error = %e, "failed to kill job process");
        }
    }

    match child.wait().await {
        Ok(status) => Some(status),
        Err(e) => {
            warn!(job_id, error = %e, "failed to reap job process");
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Terminate,
    Kill,
}

#[cfg(unix)]
fn signal_group(child: &mut Child, signal: Signal) -> io::Result<()> {
    // Already reaped.
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pgid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    let signo = match signal {
        Signal::Terminate => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };

    // SAFETY: kill(2) has no memory-safety preconditions. The child was
    // spawned as leader of its own process group, and it has not been
    // reaped (`id()` returned Some), so the group id is still ours.
    let rc = unsafe { libc::kill(-pgid, signo) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn signal_group(child: &mut Child, _signal: Signal) -> io::Result<()> {
    child.start_kill()
}
