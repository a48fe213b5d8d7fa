use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use localgrid::dag::JobDescriptor;
use localgrid::engine::GridMessage;
use localgrid::errors::Result;
use localgrid::exec::ExecutorBackend;
use localgrid::types::{BoxFuture, JobId};

/// What the fake executor was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Launch(JobId),
    Reclaim(JobId),
    Terminate(JobId),
    TerminateAll,
}

/// A fake executor that:
/// - records every backend call
/// - optionally reports `Completed` for launched jobs straight away, with
///   an exit code looked up by command (default 0).
///
/// Without auto-completion, tests drive completions themselves by sending
/// messages on the master's channel.
pub struct FakeExecutor {
    master_tx: mpsc::UnboundedSender<GridMessage>,
    calls: Arc<Mutex<Vec<FakeCall>>>,
    auto_complete: bool,
    exit_codes: HashMap<String, i32>,
}

impl FakeExecutor {
    pub fn new(
        master_tx: mpsc::UnboundedSender<GridMessage>,
        calls: Arc<Mutex<Vec<FakeCall>>>,
    ) -> Self {
        Self {
            master_tx,
            calls,
            auto_complete: false,
            exit_codes: HashMap::new(),
        }
    }

    /// Report `Completed` right after each launch.
    pub fn auto_complete(mut self) -> Self {
        self.auto_complete = true;
        self
    }

    /// Exit code reported for jobs running `command`.
    pub fn exit_code(mut self, command: &str, code: i32) -> Self {
        self.exit_codes.insert(command.to_string(), code);
        self
    }

    fn record(&self, call: FakeCall) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Ids of all `Launch` calls, in order.
pub fn launched(calls: &Arc<Mutex<Vec<FakeCall>>>) -> Vec<JobId> {
    calls
        .lock()
        .unwrap()
        .iter()
        .filter_map(|call| match call {
            FakeCall::Launch(id) => Some(*id),
            _ => None,
        })
        .collect()
}

impl ExecutorBackend for FakeExecutor {
    fn launch(&mut self, job: JobDescriptor) -> BoxFuture<'_, Result<()>> {
        self.record(FakeCall::Launch(job.id));
        if self.auto_complete {
            let exit_code = self.exit_codes.get(&job.command).copied().unwrap_or(0);
            let _ = self.master_tx.send(GridMessage::Completed {
                id: job.id,
                exit_code,
            });
        }
        Box::pin(async { Ok(()) })
    }

    fn reclaim(&mut self, id: JobId) -> BoxFuture<'_, Result<()>> {
        self.record(FakeCall::Reclaim(id));
        Box::pin(async { Ok(()) })
    }

    fn terminate(&mut self, id: JobId) -> BoxFuture<'_, Result<()>> {
        self.record(FakeCall::Terminate(id));
        Box::pin(async { Ok(()) })
    }

    fn terminate_all(&mut self) -> BoxFuture<'_, Result<()>> {
        self.record(FakeCall::TerminateAll);
        Box::pin(async { Ok(()) })
    }
}
