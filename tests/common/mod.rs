#![allow(dead_code, unused_imports)]

pub use localgrid_test_utils::{builders, fake_executor, init_tracing, with_timeout};

use localgrid::dag::JobDescriptor;
use localgrid::engine::{CoreStep, MasterCommand, MasterCore, MasterEvent, Reply};
use localgrid::types::JobId;

/// Submit `job` to `core` and return the assigned id with the step.
pub fn submit(core: &mut MasterCore, job: JobDescriptor) -> (JobId, CoreStep) {
    let step = core.step(MasterEvent::Submit(job));
    match step.reply {
        Some(Reply::Submitted(id)) => (id, step),
        ref other => panic!("expected a Submitted reply, got {other:?}"),
    }
}

/// Ids of the `Launch` commands in `step`, in order.
pub fn launches(step: &CoreStep) -> Vec<JobId> {
    step.commands
        .iter()
        .filter_map(|cmd| match cmd {
            MasterCommand::Launch(job) => Some(job.id),
            _ => None,
        })
        .collect()
}

/// Active ids as `List` reports them.
pub fn list(core: &mut MasterCore) -> Vec<JobId> {
    match core.step(MasterEvent::List).reply {
        Some(Reply::Jobs(ids)) => ids,
        other => panic!("expected a Jobs reply, got {other:?}"),
    }
}

pub fn completed(id: JobId, exit_code: i32) -> MasterEvent {
    MasterEvent::Completed { id, exit_code }
}

/// Slot accounting and edge symmetry hold, and nothing runs with
/// unresolved dependencies.
pub fn assert_invariants(core: &MasterCore) {
    let slots = core.slots();
    let running = core.graph().running_threads();
    assert!(running <= slots.total(), "running threads exceed total slots");
    assert_eq!(
        slots.available() + running,
        slots.total(),
        "slot accounting drifted"
    );
    assert!(core.graph().edges_mirrored(), "dependency edges are not mirrored");
    for job in core.graph().running() {
        assert!(job.dependencies.is_empty(), "job {} runs with deps", job.id);
    }
}
