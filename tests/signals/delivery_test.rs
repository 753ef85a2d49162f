/*!
 * Delivery Tests
 * Routing, thread selection and the consume-side decision
 */

use crate::support::{manager_with_parent, spawn_group, user};
use pretty_assertions::assert_eq;
use signal_kernel::signals::{
    ActionFlags, ChildEvent, HandlerToken, SigPayload, SignalActions, SignalConsumer,
    SignalDelivery, SignalMasking, SignalStateManager,
};
use signal_kernel::{
    DeliveryDecision, Disposition, MaskHow, PendingTarget, Sender, Signal, SignalConfig,
    SignalInfo, SignalManager, SignalSet,
};
use std::time::Duration;

fn handler_signal(decision: &DeliveryDecision) -> Signal {
    match decision {
        DeliveryDecision::Handler { info, .. } => info.signal,
        other => panic!("expected a handler decision, got {:?}", other),
    }
}

#[test]
fn test_fatal_group_signal_kills_every_thread() {
    let (manager, parent) = manager_with_parent(SignalConfig::default());
    let tids = spawn_group(&manager, user(1000, 100), 3);
    let leader = tids[0];

    manager
        .set_blocked_mask(tids[1], MaskHow::Block, SignalSet::single(Signal::SIGUSR1))
        .unwrap();
    manager
        .send_to_group(Sender::Kernel, leader, SignalInfo::user(Signal::SIGUSR1, 0, 0))
        .unwrap();

    let snapshot = manager.group_snapshot(leader).unwrap();
    assert!(snapshot.group_exit_requested);
    assert_eq!(snapshot.group_exit_code, Signal::SIGUSR1.number() as i32);

    let mut last = Vec::new();
    for tid in &tids {
        let decision = manager.consume_next_deliverable(*tid).unwrap();
        assert_eq!(
            decision,
            DeliveryDecision::Terminate {
                signal: Signal::SIGUSR1,
                core_dumped: false
            }
        );
        last.push(manager.exit_thread(*tid, 0).unwrap());
    }

    assert_eq!(last, vec![false, false, true]);
    assert!(manager.group_snapshot(leader).unwrap().is_dead());
    assert_eq!(parent.events(), vec![(leader, ChildEvent::Killed, 10)]);
    assert!(manager.release_group(leader).unwrap());
}

#[test]
fn test_thread_private_queue_served_first() {
    let (manager, _) = manager_with_parent(SignalConfig::default());
    let tgid = spawn_group(&manager, user(1000, 100), 1)[0];
    manager
        .set_disposition(tgid, Signal::SIGUSR1, Disposition::handler(HandlerToken(1)))
        .unwrap();
    manager
        .set_disposition(tgid, Signal::SIGUSR2, Disposition::handler(HandlerToken(2)))
        .unwrap();

    manager
        .send_to_group(Sender::Kernel, tgid, SignalInfo::kernel(Signal::SIGUSR1))
        .unwrap();
    manager
        .send_to_thread(Sender::Kernel, tgid, SignalInfo::tkill(Signal::SIGUSR2, tgid, 1000))
        .unwrap();

    let first = manager.consume_next_deliverable(tgid).unwrap();
    assert_eq!(handler_signal(&first), Signal::SIGUSR2);
    let second = manager.consume_next_deliverable(tgid).unwrap();
    assert_eq!(handler_signal(&second), Signal::SIGUSR1);
    assert_eq!(manager.consume_next_deliverable(tgid).unwrap(), DeliveryDecision::None);
}

#[test]
fn test_realtime_signals_ordered_and_queued() {
    let (manager, _) = manager_with_parent(SignalConfig::default());
    let tgid = spawn_group(&manager, user(1000, 100), 1)[0];
    let rt0 = Signal::realtime(0).unwrap();
    let rt1 = Signal::realtime(1).unwrap();
    let both = SignalSet::single(rt0) | SignalSet::single(rt1);
    manager.set_blocked_mask(tgid, MaskHow::Block, both).unwrap();

    for (signal, value) in [(rt1, 1), (rt0, 2), (rt0, 3)] {
        manager
            .send_to_group(Sender::Kernel, tgid, SignalInfo::queued(signal, 7, 1000, value))
            .unwrap();
    }

    let mut received = Vec::new();
    for _ in 0..3 {
        let info = manager
            .wait_for_signal_blocking(tgid, both, Some(Duration::ZERO))
            .unwrap();
        received.push((info.signal, info.payload));
    }
    assert_eq!(
        received,
        vec![
            (rt0, SigPayload::Value(2)),
            (rt0, SigPayload::Value(3)),
            (rt1, SigPayload::Value(1)),
        ]
    );
    assert_eq!(manager.queued_by(1000), 0);
}

#[test]
fn test_legacy_signals_coalesce() {
    let (manager, _) = manager_with_parent(SignalConfig::default());
    let tgid = spawn_group(&manager, user(1000, 100), 1)[0];
    manager
        .set_blocked_mask(tgid, MaskHow::Block, SignalSet::single(Signal::SIGUSR1))
        .unwrap();

    for pid in 0..3 {
        manager
            .send_to_group(Sender::Kernel, tgid, SignalInfo::user(Signal::SIGUSR1, pid, 0))
            .unwrap();
    }

    let allowed = SignalSet::single(Signal::SIGUSR1);
    let info = manager
        .wait_for_signal_blocking(tgid, allowed, Some(Duration::ZERO))
        .unwrap();
    assert_eq!(info.pid, 0);
    assert!(manager
        .wait_for_signal_blocking(tgid, allowed, Some(Duration::ZERO))
        .is_err());
    assert_eq!(manager.stats().total_signals_coalesced, 2);

    // Fully drained, so the next raise queues a fresh instance
    manager
        .send_to_group(Sender::Kernel, tgid, SignalInfo::user(Signal::SIGUSR1, 9, 0))
        .unwrap();
    let info = manager
        .wait_for_signal_blocking(tgid, allowed, Some(Duration::ZERO))
        .unwrap();
    assert_eq!(info.pid, 9);
}

#[test]
fn test_leader_preferred_then_round_robin() {
    let (manager, _) = manager_with_parent(SignalConfig::default());
    let tids = spawn_group(&manager, user(1000, 100), 3);
    let leader = tids[0];
    manager
        .set_disposition(leader, Signal::SIGUSR1, Disposition::handler(HandlerToken(1)))
        .unwrap();

    manager
        .send_to_group(Sender::Kernel, leader, SignalInfo::kernel(Signal::SIGUSR1))
        .unwrap();
    let snapshot = manager.group_snapshot(leader).unwrap();
    assert!(snapshot.thread(leader).unwrap().sigpending);
    assert!(!snapshot.thread(tids[1]).unwrap().sigpending);
    assert!(!snapshot.thread(tids[2]).unwrap().sigpending);
    handler_signal(&manager.consume_next_deliverable(leader).unwrap());

    manager
        .set_blocked_mask(leader, MaskHow::Block, SignalSet::single(Signal::SIGUSR1))
        .unwrap();
    manager
        .send_to_group(Sender::Kernel, leader, SignalInfo::kernel(Signal::SIGUSR1))
        .unwrap();
    let snapshot = manager.group_snapshot(leader).unwrap();
    let woken: Vec<_> = snapshot
        .threads
        .iter()
        .filter(|t| t.sigpending)
        .map(|t| t.tid)
        .collect();
    assert_eq!(woken.len(), 1);
    assert_ne!(woken[0], leader);
    assert_eq!(snapshot.curr_target, woken[0]);
}

#[test]
fn test_handler_mask_applied_and_restored() {
    let (manager, _) = manager_with_parent(SignalConfig::default());
    let tgid = spawn_group(&manager, user(1000, 100), 1)[0];
    let action = Disposition::handler(HandlerToken(9))
        .with_mask(SignalSet::single(Signal::SIGHUP))
        .with_flags(ActionFlags::SIGINFO);
    manager.set_disposition(tgid, Signal::SIGUSR1, action).unwrap();

    manager
        .send_to_thread(Sender::Kernel, tgid, SignalInfo::kernel(Signal::SIGUSR1))
        .unwrap();
    let decision = manager.consume_next_deliverable(tgid).unwrap();
    let DeliveryDecision::Handler {
        handler, saved_mask, ..
    } = decision
    else {
        panic!("expected handler, got {:?}", decision);
    };
    assert_eq!(handler, HandlerToken(9));
    assert_eq!(saved_mask, SignalSet::empty());

    let during = manager.get_blocked_mask(tgid).unwrap();
    assert!(during.contains(Signal::SIGUSR1));
    assert!(during.contains(Signal::SIGHUP));

    manager.signal_return(tgid, saved_mask).unwrap();
    assert_eq!(manager.get_blocked_mask(tgid).unwrap(), SignalSet::empty());
}

#[test]
fn test_resethand_restores_default() {
    let (manager, _) = manager_with_parent(SignalConfig::default());
    let tgid = spawn_group(&manager, user(1000, 100), 1)[0];
    let action = Disposition::handler(HandlerToken(3)).with_flags(ActionFlags::RESETHAND);
    manager.set_disposition(tgid, Signal::SIGUSR2, action).unwrap();

    manager
        .send_to_thread(Sender::Kernel, tgid, SignalInfo::kernel(Signal::SIGUSR2))
        .unwrap();
    handler_signal(&manager.consume_next_deliverable(tgid).unwrap());
    assert!(manager
        .get_disposition(tgid, Signal::SIGUSR2)
        .unwrap()
        .is_default());
}

#[test]
fn test_kill_ignores_full_mask() {
    let (manager, _) = manager_with_parent(SignalConfig::default());
    let tgid = spawn_group(&manager, user(1000, 100), 1)[0];
    manager
        .set_blocked_mask(tgid, MaskHow::SetAll, SignalSet::full())
        .unwrap();
    assert!(!manager.get_blocked_mask(tgid).unwrap().contains(Signal::SIGKILL));

    manager
        .send_to_group(Sender::Kernel, tgid, SignalInfo::kernel(Signal::SIGKILL))
        .unwrap();
    assert_eq!(
        manager.consume_next_deliverable(tgid).unwrap(),
        DeliveryDecision::Terminate {
            signal: Signal::SIGKILL,
            core_dumped: false
        }
    );
}

#[test]
fn test_default_ignored_signal_never_queued() {
    let (manager, _) = manager_with_parent(SignalConfig::default());
    let tgid = spawn_group(&manager, user(1000, 100), 1)[0];
    manager
        .set_disposition(tgid, Signal::SIGCHLD, Disposition::default_action())
        .unwrap();

    for _ in 0..2 {
        manager
            .send_to_group(Sender::Kernel, tgid, SignalInfo::kernel(Signal::SIGCHLD))
            .unwrap();
        assert_eq!(
            manager.get_pending(PendingTarget::Group(tgid)).unwrap(),
            SignalSet::empty()
        );
    }
    assert_eq!(manager.consume_next_deliverable(tgid).unwrap(), DeliveryDecision::None);
    assert_eq!(manager.stats().total_signals_ignored, 2);
}

#[test]
fn test_blocked_ignored_signal_stays_pending() {
    let (manager, _) = manager_with_parent(SignalConfig::default());
    let tgid = spawn_group(&manager, user(1000, 100), 1)[0];
    manager
        .set_blocked_mask(tgid, MaskHow::Block, SignalSet::single(Signal::SIGCHLD))
        .unwrap();
    manager
        .send_to_group(Sender::Kernel, tgid, SignalInfo::kernel(Signal::SIGCHLD))
        .unwrap();
    assert!(manager
        .get_pending(PendingTarget::Group(tgid))
        .unwrap()
        .contains(Signal::SIGCHLD));

    // Unblocking makes it deliverable; the default action drops it
    manager
        .set_blocked_mask(tgid, MaskHow::Unblock, SignalSet::single(Signal::SIGCHLD))
        .unwrap();
    assert_eq!(manager.consume_next_deliverable(tgid).unwrap(), DeliveryDecision::None);
    assert_eq!(
        manager.get_pending(PendingTarget::Group(tgid)).unwrap(),
        SignalSet::empty()
    );
}

#[test]
fn test_pending_views() {
    let (manager, _) = manager_with_parent(SignalConfig::default());
    let tids = spawn_group(&manager, user(1000, 100), 2);
    let all = SignalSet::single(Signal::SIGUSR1) | SignalSet::single(Signal::SIGUSR2);
    for tid in &tids {
        manager.set_blocked_mask(*tid, MaskHow::Block, all).unwrap();
    }

    manager
        .send_to_group(Sender::Kernel, tids[0], SignalInfo::kernel(Signal::SIGUSR1))
        .unwrap();
    manager
        .send_to_thread(Sender::Kernel, tids[1], SignalInfo::kernel(Signal::SIGUSR2))
        .unwrap();

    assert_eq!(
        manager.get_pending(PendingTarget::Thread(tids[0])).unwrap(),
        SignalSet::single(Signal::SIGUSR1)
    );
    assert_eq!(manager.get_pending(PendingTarget::Thread(tids[1])).unwrap(), all);
    assert_eq!(manager.get_pending(PendingTarget::Group(tids[0])).unwrap(), all);
}

#[test]
fn test_reset_handlers_keeps_ignore() {
    let (manager, _) = manager_with_parent(SignalConfig::default());
    let tgid = spawn_group(&manager, user(1000, 100), 1)[0];
    manager
        .set_disposition(tgid, Signal::SIGUSR1, Disposition::handler(HandlerToken(1)))
        .unwrap();
    manager
        .set_disposition(tgid, Signal::SIGHUP, Disposition::ignore())
        .unwrap();

    assert_eq!(manager.reset_handlers(tgid).unwrap(), 1);
    assert!(manager.get_disposition(tgid, Signal::SIGUSR1).unwrap().is_default());
    assert_eq!(
        manager.get_disposition(tgid, Signal::SIGHUP).unwrap(),
        Disposition::ignore()
    );
}

#[test]
fn test_group_signal_reaches_worker_after_leader_exit() {
    let (manager, parent) = manager_with_parent(SignalConfig::default());
    let tids = spawn_group(&manager, user(1000, 100), 2);
    let (tgid, worker) = (tids[0], tids[1]);

    assert!(!manager.exit_thread(tgid, 0).unwrap());
    manager
        .send_to_group(Sender::Kernel, tgid, SignalInfo::kernel(Signal::SIGTERM))
        .unwrap();

    let snapshot = manager.group_snapshot(tgid).unwrap();
    assert!(snapshot.group_exit_requested);
    assert!(snapshot.thread(worker).unwrap().sigpending);

    let decision = manager.consume_next_deliverable(worker).unwrap();
    assert_eq!(decision.signal(), Some(Signal::SIGTERM));
    assert!(decision.is_fatal());
    assert!(manager.exit_thread(worker, 0).unwrap());
    assert_eq!(parent.events(), vec![(tgid, ChildEvent::Killed, 15)]);
}

#[test]
fn test_caught_group_signal_served_by_worker_after_leader_exit() {
    let manager = SignalManager::new();
    let tids = spawn_group(&manager, user(1000, 100), 3);
    let tgid = tids[0];
    manager
        .set_disposition(tgid, Signal::SIGUSR1, Disposition::handler(HandlerToken(4)))
        .unwrap();
    manager.exit_thread(tgid, 0).unwrap();

    manager
        .send_to_group(Sender::Kernel, tgid, SignalInfo::kernel(Signal::SIGUSR1))
        .unwrap();
    let snapshot = manager.group_snapshot(tgid).unwrap();
    let woken: Vec<_> = tids[1..]
        .iter()
        .copied()
        .filter(|tid| snapshot.thread(*tid).unwrap().sigpending)
        .collect();
    assert_eq!(woken.len(), 1);
    assert_eq!(
        handler_signal(&manager.consume_next_deliverable(woken[0]).unwrap()),
        Signal::SIGUSR1
    );
}

#[test]
fn test_ignore_flushes_every_member_queue() {
    let manager = SignalManager::new();
    let tids = spawn_group(&manager, user(1000, 100), 3);
    let tgid = tids[0];
    let usr1 = SignalSet::single(Signal::SIGUSR1);
    for tid in &tids {
        manager.set_blocked_mask(*tid, MaskHow::Block, usr1).unwrap();
    }

    for tid in &tids[1..] {
        manager
            .send_to_thread(Sender::Kernel, *tid, SignalInfo::kernel(Signal::SIGUSR1))
            .unwrap();
    }
    manager
        .send_to_group(Sender::Kernel, tgid, SignalInfo::kernel(Signal::SIGUSR1))
        .unwrap();
    assert_eq!(manager.get_pending(PendingTarget::Group(tgid)).unwrap(), usr1);

    manager
        .set_disposition(tgid, Signal::SIGUSR1, Disposition::ignore())
        .unwrap();
    for tid in &tids {
        assert_eq!(
            manager.get_pending(PendingTarget::Thread(*tid)).unwrap(),
            SignalSet::empty()
        );
    }
    assert_eq!(
        manager.get_pending(PendingTarget::Group(tgid)).unwrap(),
        SignalSet::empty()
    );
}

#[test]
fn test_default_on_ignored_class_flushes_every_member_queue() {
    let manager = SignalManager::new();
    let tids = spawn_group(&manager, user(1000, 100), 3);
    let tgid = tids[0];
    let chld = SignalSet::single(Signal::SIGCHLD);
    manager
        .set_disposition(tgid, Signal::SIGCHLD, Disposition::handler(HandlerToken(7)))
        .unwrap();
    for tid in &tids {
        manager.set_blocked_mask(*tid, MaskHow::Block, chld).unwrap();
    }

    for tid in &tids[1..] {
        manager
            .send_to_thread(Sender::Kernel, *tid, SignalInfo::kernel(Signal::SIGCHLD))
            .unwrap();
    }
    manager
        .send_to_group(Sender::Kernel, tgid, SignalInfo::kernel(Signal::SIGCHLD))
        .unwrap();
    assert_eq!(manager.get_pending(PendingTarget::Group(tgid)).unwrap(), chld);

    manager
        .set_disposition(tgid, Signal::SIGCHLD, Disposition::default_action())
        .unwrap();
    for tid in &tids {
        assert!(manager
            .get_pending(PendingTarget::Thread(*tid))
            .unwrap()
            .is_empty());
    }
    assert!(manager
        .get_pending(PendingTarget::Group(tgid))
        .unwrap()
        .is_empty());
}
