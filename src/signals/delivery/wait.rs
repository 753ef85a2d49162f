/*!
 * Synchronous Signal Wait
 * sigtimedwait-style blocking dequeue of a chosen signal set
 */

use crate::core::types::Tid;
use crate::signals::core::sigset::SignalSet;
use crate::signals::core::types::{SignalError, SignalInfo, SignalResult};
use crate::signals::group::{GroupState, SignalContext, ThreadGroup};
use crate::signals::thread::RunState;
use log::{debug, trace};
use std::time::{Duration, Instant};

/// Block thread `tid` until a signal in `allowed` is pending, then take it.
///
/// KILL and STOP cannot be waited for. While waiting, the signals in
/// `allowed` are temporarily unblocked so routing can pick this thread;
/// the previous mask is parked in `real_blocked` and restored on return.
/// A fatal signal or a group stop ends the wait with `Interrupted`.
pub(crate) fn wait_for_signal(
    ctx: &SignalContext,
    group: &ThreadGroup,
    tid: Tid,
    allowed: SignalSet,
    timeout: Option<Duration>,
) -> SignalResult<SignalInfo> {
    let which = allowed - SignalSet::unblockable();
    let mask = !which;
    let deadline = timeout.map(|t| Instant::now() + t);

    let mut st = group.lock();
    st.live_thread(tid)?;

    if let Some(info) = take(ctx, &mut st, tid, mask) {
        return Ok(info);
    }
    if let Some(err) = interruption(&st, tid) {
        return Err(err);
    }
    if timeout.is_some_and(|t| t.is_zero()) {
        return Err(SignalError::TimedOut);
    }

    {
        let thread = st.live_thread_mut(tid)?;
        thread.real_blocked = thread.blocked;
        thread.blocked = thread.blocked - which;
        thread.run_state = RunState::SleepInterruptible;
    }
    st.recalc_sigpending(tid);
    trace!("Thread {} waiting for {:?}", tid, which);

    let outcome = loop {
        if !(st.pending_for(tid) & which).is_empty() {
            break Ok(());
        }
        if let Some(err) = interruption(&st, tid) {
            break Err(err);
        }
        match deadline {
            Some(deadline) => {
                if group.wait_until(&mut st, deadline) && (st.pending_for(tid) & which).is_empty() {
                    break Err(SignalError::TimedOut);
                }
            }
            None => group.wait(&mut st),
        }
        if let Ok(thread) = st.live_thread_mut(tid) {
            if thread.run_state == RunState::Running {
                thread.run_state = RunState::SleepInterruptible;
            }
        }
    };

    if let Ok(thread) = st.live_thread_mut(tid) {
        thread.blocked = thread.real_blocked;
        thread.real_blocked = SignalSet::empty();
        if thread.run_state == RunState::SleepInterruptible {
            thread.run_state = RunState::Running;
        }
    }

    let taken = take(ctx, &mut st, tid, mask);
    st.recalc_sigpending(tid);
    match (taken, outcome) {
        (Some(info), _) => Ok(info),
        (None, Err(err)) => Err(err),
        (None, Ok(())) => Err(SignalError::TimedOut),
    }
}

fn take(ctx: &SignalContext, st: &mut GroupState, tid: Tid, mask: SignalSet) -> Option<SignalInfo> {
    let info = st.dequeue_for(tid, mask)?;
    ctx.stats.inc_signals_delivered();
    debug!("Thread {} accepted {} synchronously", tid, info.signal);
    Some(info)
}

/// Reason the thread has to go back through normal delivery
fn interruption(st: &GroupState, tid: Tid) -> Option<SignalError> {
    if st.fatal_pending(tid) {
        return Some(SignalError::Interrupted(st.exit_signal()));
    }
    if st.should_join_group_stop(tid) {
        let signal = st.stop_signal?;
        return Some(SignalError::Interrupted(signal));
    }
    None
}
