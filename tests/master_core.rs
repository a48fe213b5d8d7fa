// tests/master_core.rs

mod common;
use crate::common::builders::{DescriptorBuilder, descriptor};
use crate::common::{assert_invariants, completed, init_tracing, launches, list, submit};

use std::collections::BTreeSet;

use localgrid::engine::{MasterCommand, MasterCore, MasterEvent};

#[test]
fn chain_runs_in_order_on_one_slot() {
    init_tracing();
    let mut core = MasterCore::new(1);

    let (a, step) = submit(&mut core, descriptor("echo A"));
    assert_eq!(a, 1);
    assert_eq!(launches(&step), vec![1]);

    let (b, step) = submit(&mut core, DescriptorBuilder::new("echo B").after(a).build());
    assert_eq!(b, 2);
    assert!(launches(&step).is_empty());
    assert_eq!(core.graph().get(b).unwrap().dependencies.len(), 1);
    assert!(core.graph().get(a).unwrap().children.contains(&b));
    assert_invariants(&core);

    let step = core.step(completed(a, 0));
    assert_eq!(step.commands[0], MasterCommand::Reclaim(a));
    assert_eq!(launches(&step), vec![b]);
    assert_invariants(&core);

    let step = core.step(completed(b, 0));
    assert_eq!(step.commands, vec![MasterCommand::Reclaim(b)]);
    assert!(core.graph().is_empty());
    assert_eq!(core.slots().available(), 1);
}

#[test]
fn failure_prunes_whole_queued_chain() {
    init_tracing();
    let mut core = MasterCore::new(1);

    let (a, _) = submit(&mut core, descriptor("exit 3"));
    let (b, _) = submit(&mut core, DescriptorBuilder::new("echo B").after(a).build());
    let (_c, _) = submit(&mut core, DescriptorBuilder::new("echo C").after(b).build());
    assert_eq!(list(&mut core).len(), 3);

    let step = core.step(completed(a, 3));
    assert_eq!(step.commands, vec![MasterCommand::Reclaim(a)]);
    assert!(core.graph().is_empty());
    assert!(list(&mut core).is_empty());
    assert_eq!(core.slots().available(), 1);
}

#[test]
fn failure_prunes_descendants_but_keeps_unrelated_queued_jobs() {
    init_tracing();
    let mut core = MasterCore::new(1);

    let (a, _) = submit(&mut core, descriptor("exit 1"));
    let (u, _) = submit(&mut core, descriptor("echo U"));
    let (b, _) = submit(&mut core, DescriptorBuilder::new("echo B").after(a).build());
    let (d, _) = submit(
        &mut core,
        DescriptorBuilder::new("echo D").after(b).after(u).build(),
    );
    let (e, _) = submit(&mut core, DescriptorBuilder::new("echo E").after(u).build());
    assert_eq!(list(&mut core), vec![u, b, d, e, a]);
    assert_eq!(core.graph().len(), 5);
    assert_eq!(core.graph().queued_ids(), vec![u, b, d, e]);
    assert_eq!(
        core.graph().get(u).unwrap().children,
        BTreeSet::from([d, e])
    );
    assert_invariants(&core);

    let step = core.step(completed(a, 1));
    assert_eq!(step.commands[0], MasterCommand::Reclaim(a));
    assert_eq!(launches(&step), vec![u]);

    assert!(core.graph().get(b).is_none());
    assert!(core.graph().get(d).is_none());
    assert!(core.graph().is_running(u));
    assert_eq!(core.graph().queued_ids(), vec![e]);
    assert_eq!(core.graph().len(), 2);
    // The pruned job no longer counts among the surviving parent's children.
    assert_eq!(core.graph().get(u).unwrap().children, BTreeSet::from([e]));
    assert_eq!(core.graph().get(e).unwrap().dependencies, BTreeSet::from([u]));
    assert_eq!(list(&mut core), vec![e, u]);
    assert_invariants(&core);

    let step = core.step(completed(u, 0));
    assert_eq!(launches(&step), vec![e]);
    assert_invariants(&core);
}

#[test]
fn independent_jobs_share_the_grid() {
    init_tracing();
    let mut core = MasterCore::new(2);

    let (a, step_a) = submit(&mut core, descriptor("sleep 1"));
    let (b, step_b) = submit(&mut core, descriptor("sleep 1"));
    assert_eq!(launches(&step_a), vec![a]);
    assert_eq!(launches(&step_b), vec![b]);
    assert_eq!(core.slots().available(), 0);
    assert_invariants(&core);
}

#[test]
fn second_job_waits_for_a_free_slot() {
    init_tracing();
    let mut core = MasterCore::new(1);

    let (a, _) = submit(&mut core, descriptor("sleep 1"));
    let (b, step) = submit(&mut core, descriptor("sleep 1"));
    assert!(launches(&step).is_empty());
    assert!(core.graph().is_queued(b));

    let step = core.step(completed(a, 0));
    assert_eq!(launches(&step), vec![b]);
    assert!(core.graph().is_running(b));
}

#[test]
fn cancelling_queued_job_removes_its_children() {
    init_tracing();
    let mut core = MasterCore::new(1);

    let (blocker, _) = submit(&mut core, descriptor("sleep 10"));
    let (queued, _) = submit(&mut core, descriptor("echo Q"));
    submit(&mut core, DescriptorBuilder::new("echo C1").after(queued).build());
    submit(&mut core, DescriptorBuilder::new("echo C2").after(queued).build());
    assert_eq!(list(&mut core), vec![2, 3, 4, 1]);

    let step = core.step(MasterEvent::Cancel(queued));
    assert!(step.commands.is_empty());
    assert_eq!(list(&mut core), vec![blocker]);
    assert!(core.graph().get(blocker).unwrap().children.is_empty());
    assert_invariants(&core);
}

#[test]
fn cancelling_running_job_terminates_it_and_prunes_queued_children() {
    init_tracing();
    let mut core = MasterCore::new(2);

    let (a, _) = submit(&mut core, descriptor("sleep 10"));
    let (b, _) = submit(&mut core, DescriptorBuilder::new("echo B").after(a).build());
    let (d, _) = submit(&mut core, descriptor("sleep 10"));
    assert!(core.graph().is_running(d));

    let step = core.step(MasterEvent::Cancel(a));
    assert_eq!(step.commands[0], MasterCommand::Terminate(a));
    assert!(core.graph().get(b).is_none());
    assert!(core.graph().is_running(d));
    assert_eq!(core.slots().available(), 1);
    assert_invariants(&core);

    // The executor reports the terminated process afterwards.
    let step = core.step(completed(a, 143));
    assert!(step.commands.is_empty());
    assert!(step.keep_running);
    assert_eq!(list(&mut core), vec![d]);
}

#[test]
fn cancelling_unknown_job_is_ignored() {
    init_tracing();
    let mut core = MasterCore::new(1);
    submit(&mut core, descriptor("sleep 10"));

    let step = core.step(MasterEvent::Cancel(42));
    assert!(step.commands.is_empty());
    assert!(step.keep_running);
    assert_eq!(list(&mut core), vec![1]);
}

#[test]
fn drain_stops_once_last_job_finishes() {
    init_tracing();
    let mut core = MasterCore::new(1);

    let (a, _) = submit(&mut core, descriptor("echo A"));
    let step = core.step(MasterEvent::Drain);
    assert!(step.keep_running);
    assert!(core.is_draining());

    let step = core.step(completed(a, 0));
    assert!(!step.keep_running);
    assert!(core.drained());
}

#[test]
fn drain_on_empty_grid_stops_immediately() {
    let mut core = MasterCore::new(4);
    let step = core.step(MasterEvent::Drain);
    assert!(!step.keep_running);
}

#[test]
fn exit_terminates_everything() {
    init_tracing();
    let mut core = MasterCore::new(1);
    submit(&mut core, descriptor("sleep 10"));

    let step = core.step(MasterEvent::Exit);
    assert_eq!(step.commands, vec![MasterCommand::TerminateAll]);
    assert!(!step.keep_running);
}

#[test]
fn stale_notices_are_ignored() {
    init_tracing();
    let mut core = MasterCore::new(1);

    let step = core.step(completed(99, 0));
    assert!(step.commands.is_empty());
    assert!(step.keep_running);

    let step = core.step(MasterEvent::Failed {
        id: 99,
        error: "spawn failed".into(),
    });
    assert!(step.commands.is_empty());
    assert_eq!(core.slots().available(), 1);
}

#[test]
fn failure_notice_behaves_like_nonzero_exit() {
    init_tracing();
    let mut core = MasterCore::new(1);

    let (a, _) = submit(&mut core, descriptor("missing-binary"));
    submit(&mut core, DescriptorBuilder::new("echo B").after(a).build());

    let step = core.step(MasterEvent::Failed {
        id: a,
        error: "spawn failed".into(),
    });
    assert_eq!(step.commands, vec![MasterCommand::Reclaim(a)]);
    assert!(core.graph().is_empty());

    // Trailing completion from the same executor.
    let step = core.step(completed(a, -1));
    assert!(step.commands.is_empty());
    assert_eq!(core.slots().available(), 1);
}

#[test]
fn oversized_job_stays_queued_without_blocking_others() {
    init_tracing();
    let mut core = MasterCore::new(2);

    let (big, step) = submit(&mut core, DescriptorBuilder::new("big").threads(3).build());
    assert!(launches(&step).is_empty());

    let (small, step) = submit(&mut core, descriptor("small"));
    assert_eq!(launches(&step), vec![small]);

    let step = core.step(completed(small, 0));
    assert!(launches(&step).is_empty());
    assert!(core.graph().is_queued(big));
    assert_eq!(core.slots().available(), 2);
}

#[test]
fn big_job_at_the_head_does_not_block_smaller_ones() {
    init_tracing();
    let mut core = MasterCore::new(2);

    let (a, _) = submit(&mut core, descriptor("one slot"));
    let (b, step) = submit(&mut core, DescriptorBuilder::new("two slots").threads(2).build());
    assert!(launches(&step).is_empty());
    let (c, step) = submit(&mut core, descriptor("one slot"));
    assert_eq!(launches(&step), vec![c]);

    core.step(completed(a, 0));
    let step = core.step(completed(c, 0));
    assert_eq!(launches(&step), vec![b]);
    assert_invariants(&core);
}

#[test]
fn lower_ids_are_promoted_first() {
    init_tracing();
    let mut core = MasterCore::new(1);

    let (x, _) = submit(&mut core, descriptor("sleep 1"));
    let (y, _) = submit(&mut core, DescriptorBuilder::new("after x").after(x).build());
    let (z, _) = submit(&mut core, descriptor("independent"));

    let step = core.step(completed(x, 0));
    assert_eq!(launches(&step), vec![y]);

    let step = core.step(completed(y, 0));
    assert_eq!(launches(&step), vec![z]);
}

#[test]
fn dependency_on_finished_job_is_already_satisfied() {
    init_tracing();
    let mut core = MasterCore::new(1);

    let (a, _) = submit(&mut core, descriptor("echo A"));
    core.step(completed(a, 0));

    let (b, step) = submit(&mut core, DescriptorBuilder::new("echo B").after(a).build());
    assert_eq!(launches(&step), vec![b]);
    assert!(core.graph().get(b).unwrap().dependencies.is_empty());
}

#[test]
fn ids_are_never_reused() {
    let mut core = MasterCore::new(1);
    let (a, _) = submit(&mut core, descriptor("echo A"));
    core.step(MasterEvent::Cancel(a));
    let (b, _) = submit(&mut core, descriptor("echo B"));
    assert!(b > a);
}

#[test]
fn log_templates_get_the_assigned_id() {
    let mut core = MasterCore::new(1);
    let (id, step) = submit(&mut core, descriptor("echo A"));
    let MasterCommand::Launch(job) = &step.commands[0] else {
        panic!("expected a launch");
    };
    assert_eq!(job.id, id);
    assert_eq!(
        job.stdout_path.to_string_lossy(),
        format!("/tmp/localgrid-test-{id}.out")
    );
    assert_eq!(
        job.stderr_path.to_string_lossy(),
        format!("/tmp/localgrid-test-{id}.err")
    );
}
