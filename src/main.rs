/*!
 * sigdemo - Signal Kernel Walkthrough
 *
 * Drives a SignalManager through three scenarios:
 * - a fatal group-directed signal taking down a multi-threaded group
 * - a caught signal running a registered handler
 * - a job-control stop and continue across OS threads
 */

use miette::{miette, IntoDiagnostic, Result};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;

use signal_kernel::monitoring::span_operation;
use signal_kernel::signals::{
    ChildEvent, ParentNotifier, RunState, SignalActions, SignalConsumer, SignalDelivery,
    SignalMasking, SignalStateManager,
};
use signal_kernel::{
    init_tracing, DeliveryDecision, Disposition, HandlerRegistry, MaskHow, ProcessIdentity,
    Sender, Signal, SignalConfig, SignalInfo, SignalManager, SignalSet, Tgid,
};

/// Parent that only logs what it is told
struct LoggingParent;

impl ParentNotifier for LoggingParent {
    fn notify_parent(&self, child: Tgid, event: ChildEvent, status: i32) {
        info!(child, ?event, status, "parent notified");
    }
}

fn main() -> Result<()> {
    init_tracing();

    let config = SignalConfig::from_env();
    info!(?config, "sigdemo starting");

    let manager = SignalManager::builder()
        .with_config(config)
        .with_notifier(Arc::new(LoggingParent))
        .build();

    group_exit(&manager)?;
    caught_signal(&manager)?;
    stop_and_continue(&manager)?;

    info!("Final statistics:\n{}", serde_json::to_string_pretty(&manager.stats()).into_diagnostic()?);
    Ok(())
}

/// One thread blocks the signal; the group still dies
fn group_exit(manager: &SignalManager) -> Result<()> {
    let span = span_operation("group_exit");
    let _entered = span.enter();

    let leader = manager.create_group(ProcessIdentity::default());
    let worker1 = manager.spawn_thread(leader)?;
    let worker2 = manager.spawn_thread(leader)?;
    manager.set_blocked_mask(worker1, MaskHow::Block, SignalSet::single(Signal::SIGUSR1))?;

    manager.send_to_group(Sender::Kernel, leader, SignalInfo::kernel(Signal::SIGUSR1))?;

    for tid in [leader, worker1, worker2] {
        let decision = manager.consume_next_deliverable(tid)?;
        info!(tid, ?decision, "consumed");
        if decision.is_fatal() {
            manager.exit_thread(tid, 0)?;
        }
    }

    let snapshot = manager.group_snapshot(leader)?;
    info!("Group after exit:\n{}", serde_json::to_string_pretty(&snapshot).into_diagnostic()?);
    manager.release_group(leader)?;
    span.record_result(snapshot.is_dead());
    Ok(())
}

/// A registered handler runs and the mask is restored afterwards
fn caught_signal(manager: &SignalManager) -> Result<()> {
    let span = span_operation("caught_signal");
    let _entered = span.enter();

    let registry = HandlerRegistry::new();
    let token = registry.register(|tid, info| {
        info!(tid, signal = %info.signal, pid = info.pid, "handler running");
    });

    let tgid = manager.create_group(ProcessIdentity::default());
    manager.set_disposition(tgid, Signal::SIGUSR2, Disposition::handler(token))?;
    manager.send_to_thread(Sender::Thread(tgid), tgid, SignalInfo::tkill(Signal::SIGUSR2, tgid, 0))?;

    let decision = manager.consume_next_deliverable(tgid)?;
    let ran = registry.invoke(manager, tgid, &decision)?;
    info!(ran, mask = ?manager.get_blocked_mask(tgid)?, "handler finished");

    manager.exit_thread(tgid, 0)?;
    manager.release_group(tgid)?;
    span.record_result(ran);
    Ok(())
}

/// A worker parks in a group stop until CONT arrives
fn stop_and_continue(manager: &SignalManager) -> Result<()> {
    let span = span_operation("stop_and_continue");
    let _entered = span.enter();

    let tgid = manager.create_group(ProcessIdentity::default());
    manager.send_to_group(Sender::Kernel, tgid, SignalInfo::kernel(Signal::SIGSTOP))?;

    let worker = {
        let manager = manager.clone();
        thread::spawn(move || manager.consume_next_deliverable(tgid))
    };

    while !manager
        .group_snapshot(tgid)?
        .thread(tgid)
        .is_some_and(|t| t.run_state == RunState::Stopped)
    {
        thread::sleep(Duration::from_millis(1));
    }
    info!(tgid, "group stopped, sending SIGCONT");
    manager.send_to_group(Sender::Kernel, tgid, SignalInfo::kernel(Signal::SIGCONT))?;

    let decision = worker
        .join()
        .map_err(|_| miette!("stopped worker panicked"))??;
    info!(?decision, "worker resumed");

    manager.exit_thread(tgid, 0)?;
    manager.release_group(tgid)?;
    span.record_result(decision == DeliveryDecision::None);
    Ok(())
}
