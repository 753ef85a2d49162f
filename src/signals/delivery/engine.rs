/*!
 * Delivery Engine
 * Consume-side loop: pick the next signal for a thread and decide its fate
 */

use crate::core::types::Tid;
use crate::signals::action::{classify_default, ActionFlags, DefaultAction, SigHandler};
use crate::signals::core::sigset::SignalSet;
use crate::signals::core::types::{
    DeliveryDecision, Signal, SignalInfo, SignalResult, TracerVerdict,
};
use crate::signals::group::{GroupState, SignalContext, ThreadGroup};
use crate::signals::thread::RunState;
use log::{debug, info, trace, warn};
use parking_lot::MutexGuard;

/// Decide what thread `tid` must do next.
///
/// Participates in any group stop first (blocking until continued or
/// killed), then dequeues private before shared signals and applies the
/// group's disposition. Lock is dropped only around the tracer, the
/// orphaned-pgrp query and the core dump; state is re-validated afterwards.
pub(crate) fn get_signal(
    ctx: &SignalContext,
    group: &ThreadGroup,
    tid: Tid,
) -> SignalResult<DeliveryDecision> {
    let mut st = group.lock();
    st.live_thread(tid)?;

    loop {
        if st.should_join_group_stop(tid) {
            st.join_group_stop(ctx, tid)?;
            group.wake_all();
            park_while_stopped(group, &mut st, tid)?;
            continue;
        }

        if st.fatal_pending(tid) {
            return Ok(take_fatal(ctx, &mut st, tid));
        }

        let mask = st.live_thread(tid)?.dequeue_mask();
        let Some(mut info) = st.dequeue_for(tid, mask) else {
            st.recalc_sigpending(tid);
            return Ok(DeliveryDecision::None);
        };
        let mut signal = info.signal;
        if signal.is_stop_class() {
            st.live_thread_mut(tid)?.stop_dequeued = true;
        }

        let traced = signal != Signal::SIGKILL && ctx.tracer.is_traced(tid);
        if !traced && st.actions.get(signal).ignores(signal) {
            trace!("Thread {} dropped ignored {}", tid, signal);
            ctx.stats.inc_signals_ignored();
            continue;
        }

        if traced {
            st.live_thread_mut(tid)?.run_state = RunState::Stopped;
            let verdict = MutexGuard::unlocked(&mut st, || ctx.tracer.intercept(tid, &info));
            let thread = st.live_thread_mut(tid)?;
            if thread.run_state == RunState::Stopped {
                thread.run_state = RunState::Running;
            }

            match verdict {
                TracerVerdict::Suppress => {
                    debug!("Tracer suppressed {} for thread {}", signal, tid);
                    continue;
                }
                TracerVerdict::Deliver(substitute) if substitute != signal => {
                    debug!("Tracer replaced {} with {} for thread {}", signal, substitute, tid);
                    info = SignalInfo::kernel(substitute);
                    signal = substitute;
                    thread.stop_dequeued = signal.is_stop_class();
                    if thread.blocked.contains(signal) {
                        thread.pending.enqueue_reserved(info);
                        continue;
                    }
                }
                TracerVerdict::Deliver(_) => {}
            }
            if st.fatal_pending(tid) {
                continue;
            }
        }

        let action = st.actions.get(signal);
        match action.handler {
            SigHandler::Ignore => {
                ctx.stats.inc_signals_ignored();
                continue;
            }
            SigHandler::Handler(handler) => {
                let thread = st.live_thread_mut(tid)?;
                let saved_mask = thread.blocked;
                let mut extra = action.mask;
                if !action.flags.contains(ActionFlags::NODEFER) {
                    extra.insert(signal);
                }
                thread.blocked = (thread.blocked | extra) - SignalSet::unblockable();
                if action.flags.contains(ActionFlags::RESETHAND) {
                    st.actions.set(signal, Default::default())?;
                }
                st.recalc_sigpending(tid);
                ctx.stats.inc_signals_delivered();
                debug!("Thread {} runs handler {:?} for {}", tid, handler, signal);
                return Ok(DeliveryDecision::Handler {
                    info,
                    handler,
                    flags: action.flags,
                    saved_mask,
                });
            }
            SigHandler::Default => {}
        }

        match classify_default(signal) {
            DefaultAction::Ignore => {
                ctx.stats.inc_signals_ignored();
            }
            DefaultAction::Stop => {
                if signal != Signal::SIGSTOP {
                    let pgid = group.identity().pgid;
                    let orphaned = MutexGuard::unlocked(&mut st, || ctx.pgrp.is_orphaned(pgid));
                    if st.stop_raced(tid) {
                        debug!("{} for thread {} overtaken while unlocked", signal, tid);
                        continue;
                    }
                    if orphaned {
                        debug!("Discarding {} for orphaned process group {}", signal, pgid);
                        continue;
                    }
                }
                st.begin_group_stop(ctx, tid, signal);
                group.wake_all();
            }
            DefaultAction::Terminate => {
                st.initiate_group_exit(ctx, signal);
                group.wake_all();
            }
            DefaultAction::Coredump => {
                if !st.begin_coredump(tid, signal) {
                    continue;
                }
                group.wake_all();
                let tgid = group.tgid();
                let dumped = MutexGuard::unlocked(&mut st, || ctx.dumper.dump(tgid, tid, &info));
                if let Err(e) = &dumped {
                    warn!("Core dump of group {} failed: {}", tgid, e);
                }
                st.finish_coredump(ctx, dumped.is_ok());
                group.wake_all();
            }
        }
    }
}

/// Sleep until CONT restarts the thread or a KILL arrives
fn park_while_stopped(
    group: &ThreadGroup,
    st: &mut MutexGuard<'_, GroupState>,
    tid: Tid,
) -> SignalResult<()> {
    loop {
        let thread = st.live_thread_mut(tid)?;
        if thread.run_state != RunState::Stopped {
            return Ok(());
        }
        if thread.kill_pending() {
            thread.run_state = RunState::Running;
            return Ok(());
        }
        group.wait(st);
    }
}

/// Thread leaves user code for good
fn take_fatal(ctx: &SignalContext, st: &mut GroupState, tid: Tid) -> DeliveryDecision {
    let signal = if st.group_exit_requested {
        st.exit_signal()
    } else {
        Signal::SIGKILL
    };
    let core_dumped = st.core_dumped;
    if let Ok(thread) = st.live_thread_mut(tid) {
        thread.pending.remove_matching(SignalSet::single(Signal::SIGKILL));
        thread.killed_by = Some(signal);
        thread.exiting = true;
    }
    ctx.stats.inc_signals_delivered();
    info!("Thread {} terminating on {}", tid, signal);
    DeliveryDecision::Terminate {
        signal,
        core_dumped,
    }
}
