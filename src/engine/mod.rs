// src/engine/mod.rs

//! The grid master.
//!
//! The master is a single actor that owns every piece of mutable scheduling
//! state. Clients and executors talk to it only through [`GridMessage`]s on
//! one inbound channel, so handlers never run concurrently and the job graph
//! needs no locking.
//!
//! The pure core state machine lives in [`core`] (with the per-message
//! handlers in [`handlers`]); the async IO shell that owns the channel and
//! the executor backend is implemented in [`runtime`].

use tokio::sync::oneshot;
use tracing::warn;

use crate::dag::JobDescriptor;
use crate::types::JobId;

/// Requests accepted by the master.
///
/// `Submit` and `List` carry the sender their reply goes to; everything
/// else is fire-and-forget.
#[derive(Debug)]
pub enum GridMessage {
    /// Queue a new job. Replies with the assigned id.
    Submit {
        job: JobDescriptor,
        reply: oneshot::Sender<JobId>,
    },
    /// Snapshot of active ids, queued first, then running.
    List { reply: oneshot::Sender<Vec<JobId>> },
    /// Exit once no queued or running jobs remain.
    Drain,
    /// Terminate all running jobs and stop.
    Exit,
    Cancel { id: JobId },
    /// Sent by an executor when its process exited.
    Completed { id: JobId, exit_code: i32 },
    /// Sent by an executor when it could not run or supervise its process.
    Failed { id: JobId, error: String },
}

/// A [`GridMessage`] with its reply channel split off, as consumed by the
/// pure core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasterEvent {
    Submit(JobDescriptor),
    List,
    Drain,
    Exit,
    Cancel(JobId),
    Completed { id: JobId, exit_code: i32 },
    Failed { id: JobId, error: String },
}

/// Reply produced by the core for a blocking request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Submitted(JobId),
    Jobs(Vec<JobId>),
}

/// Where a [`Reply`] has to be delivered.
#[derive(Debug)]
pub enum Responder {
    Submitted(oneshot::Sender<JobId>),
    Jobs(oneshot::Sender<Vec<JobId>>),
}

impl Responder {
    /// Deliver `reply`. A caller that stopped waiting is not an error.
    pub fn respond(self, reply: Reply) {
        let delivered = match (self, reply) {
            (Responder::Submitted(tx), Reply::Submitted(id)) => tx.send(id).is_ok(),
            (Responder::Jobs(tx), Reply::Jobs(ids)) => tx.send(ids).is_ok(),
            (responder, reply) => {
                warn!(?responder, ?reply, "reply does not match request kind; dropping");
                return;
            }
        };
        if !delivered {
            warn!("requester went away before the reply was delivered");
        }
    }
}

impl GridMessage {
    pub fn into_parts(self) -> (MasterEvent, Option<Responder>) {
        match self {
            GridMessage::Submit { job, reply } => {
                (MasterEvent::Submit(job), Some(Responder::Submitted(reply)))
            }
            GridMessage::List { reply } => (MasterEvent::List, Some(Responder::Jobs(reply))),
            GridMessage::Drain => (MasterEvent::Drain, None),
            GridMessage::Exit => (MasterEvent::Exit, None),
            GridMessage::Cancel { id } => (MasterEvent::Cancel(id), None),
            GridMessage::Completed { id, exit_code } => {
                (MasterEvent::Completed { id, exit_code }, None)
            }
            GridMessage::Failed { id, error } => (MasterEvent::Failed { id, error }, None),
        }
    }
}

pub mod core;
pub mod handlers;
pub mod runtime;

pub use self::core::MasterCore;
pub use self::handlers::{CoreStep, MasterCommand};
pub use self::runtime::Master;
