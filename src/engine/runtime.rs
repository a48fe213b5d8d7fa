// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::MasterCore;
use super::{GridMessage, MasterCommand};

/// The grid master actor.
///
/// Reads [`GridMessage`]s one at a time, feeds them into [`MasterCore`],
/// delivers replies, and executes the resulting commands against an
/// [`ExecutorBackend`]. Executors report back through a clone of the same
/// inbound sender the clients use.
pub struct Master<E: ExecutorBackend> {
    core: MasterCore,
    inbox: mpsc::UnboundedReceiver<GridMessage>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Master<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Master")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Master<E> {
    pub fn new(
        core: MasterCore,
        inbox: mpsc::UnboundedReceiver<GridMessage>,
        executor: E,
    ) -> Self {
        Self {
            core,
            inbox,
            executor,
        }
    }

    /// Main loop.
    ///
    /// Ends on `Exit`, when drain mode empties the grid, or when every
    /// sender is gone. A command that fails to execute ends the loop with
    /// that error; the master holds nothing worth recovering afterwards.
    pub async fn run(mut self) -> Result<()> {
        info!(
            slots_total = self.core.slots().total(),
            "grid master loop started"
        );

        loop {
            let Some(message) = self.inbox.recv().await else {
                info!("inbound channel closed; exiting");
                break;
            };

            debug!(?message, "master received message");

            let (event, responder) = message.into_parts();
            let step = self.core.step(event);

            if let (Some(responder), Some(reply)) = (responder, step.reply) {
                responder.respond(reply);
            }

            for command in step.commands {
                if let Err(err) = self.execute_command(command).await {
                    error!(error = %err, "error while handling master command; terminating loop");
                    return Err(err);
                }
            }

            if !step.keep_running {
                break;
            }
        }

        info!("grid master loop terminated");
        Ok(())
    }

    async fn execute_command(&mut self, command: MasterCommand) -> Result<()> {
        match command {
            MasterCommand::Launch(job) => {
                debug!(job_id = job.id, "launching executor");
                self.executor.launch(job).await
            }
            MasterCommand::Reclaim(id) => self.executor.reclaim(id).await,
            MasterCommand::Terminate(id) => {
                info!(job_id = id, "terminating running job");
                self.executor.terminate(id).await
            }
            MasterCommand::TerminateAll => self.executor.terminate_all().await,
        }
    }
}
