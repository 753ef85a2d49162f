/*!
 * Signal Routing
 * Raise-side path: filter, queue, pick a thread, wake it
 */

use super::context::SignalContext;
use super::state::GroupState;
use crate::core::types::Tid;
use crate::signals::action::{DefaultAction, SigHandler};
use crate::signals::core::sigset::SignalSet;
use crate::signals::core::types::{Signal, SignalError, SignalInfo, SignalResult};
use crate::signals::queue::QueueFull;
use crate::signals::thread::RunState;
use log::{debug, trace, warn};

/// Queue a signal is raised into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RouteTarget {
    Thread(Tid),
    Group,
}

impl GroupState {
    /// Raise `info` into this group.
    ///
    /// Discarded signals (ignored, coalesced, group already exiting) still
    /// return `Ok`. The caller wakes the group's condition afterwards.
    pub(crate) fn route(
        &mut self,
        ctx: &SignalContext,
        target: RouteTarget,
        info: SignalInfo,
    ) -> SignalResult<()> {
        let signal = info.signal;
        let recipient = match target {
            RouteTarget::Thread(tid) => tid,
            RouteTarget::Group => self.leader,
        };

        if !self.prepare_signal(ctx, recipient, signal) {
            ctx.stats.inc_signals_ignored();
            return Ok(());
        }

        let tgid = self.tgid;
        let queue = match target {
            RouteTarget::Thread(tid) => &mut self.live_thread_mut(tid)?.pending,
            RouteTarget::Group => &mut self.shared,
        };

        if queue.is_coalesced(signal) {
            trace!("{} already pending for group {}, merged", signal, tgid);
            ctx.stats.inc_signals_coalesced();
            return Ok(());
        }

        match queue.enqueue(info, &ctx.quota) {
            Ok(()) => ctx.stats.inc_signals_queued(),
            Err(QueueFull) if signal.is_realtime() && !info.code.is_kill_style() => {
                ctx.stats.inc_queue_overflows();
                warn!("Signal queue full for uid {}, rejecting {}", info.uid, signal);
                return Err(SignalError::QueueFull {
                    uid: info.uid,
                    signal,
                });
            }
            Err(QueueFull) => {
                ctx.stats.inc_queue_overflows();
                debug!("Signal queue full for uid {}, {} pending without info", info.uid, signal);
                queue.mark_present(signal);
            }
        }

        self.complete_signal(ctx, target, signal);
        Ok(())
    }

    /// Apply raise-time side effects and decide whether to keep the signal
    fn prepare_signal(&mut self, ctx: &SignalContext, recipient: Tid, signal: Signal) -> bool {
        if self.group_exit_requested {
            trace!("Group {} exiting, dropping {}", self.tgid, signal);
            return false;
        }

        self.handle_stop_or_continue(ctx, signal);
        !self.sig_ignored(ctx, recipient, signal)
    }

    /// Discardable at raise time: ignored and nobody could observe it
    fn sig_ignored(&self, ctx: &SignalContext, recipient: Tid, signal: Signal) -> bool {
        if let Ok(thread) = self.thread(recipient) {
            if (thread.blocked | thread.real_blocked).contains(signal) {
                return false;
            }
        }
        if signal != Signal::SIGKILL && ctx.tracer.is_traced(recipient) {
            return false;
        }
        self.actions.get(signal).ignores(signal)
    }

    /// Thread is a good candidate to take `signal` now
    pub(crate) fn wants_signal(&self, tid: Tid, signal: Signal) -> bool {
        let Some(thread) = self.threads.get(&tid) else {
            return false;
        };
        if thread.blocked.contains(signal) || !thread.is_active() {
            return false;
        }
        if signal == Signal::SIGKILL {
            return true;
        }
        if thread.run_state == RunState::Stopped {
            return false;
        }
        thread.run_state == RunState::Running || !thread.sigpending
    }

    /// Pick a thread for a group-directed signal: the leader first, then
    /// round-robin from the cursor
    fn select_target(&mut self, signal: Signal) -> Option<Tid> {
        if self.wants_signal(self.leader, signal) {
            return Some(self.leader);
        }
        let leader = self.leader;
        if !self.threads.iter().any(|(tid, t)| *tid != leader && t.is_active()) {
            return None;
        }

        if !self.threads.get(&self.curr_target).is_some_and(|t| t.is_alive()) {
            self.curr_target = self.leader;
        }
        let start = self.curr_target;
        let chosen = self
            .threads
            .range(start..)
            .chain(self.threads.range(..start))
            .map(|(tid, _)| *tid)
            .filter(|tid| *tid != self.leader)
            .find(|tid| self.wants_signal(*tid, signal))?;

        self.curr_target = chosen;
        Some(chosen)
    }

    /// Pick a thread to handle `signal` and wake it, or take the whole
    /// group down when the signal is fatal
    fn complete_signal(&mut self, ctx: &SignalContext, target: RouteTarget, signal: Signal) {
        let chosen = match target {
            RouteTarget::Thread(tid) => Some(tid).filter(|tid| self.wants_signal(*tid, signal)),
            RouteTarget::Group => self.select_target(signal),
        };
        let Some(tid) = chosen else {
            trace!("No thread wants {} in group {} yet", signal, self.tgid);
            return;
        };

        if self.is_fatal_now(ctx, tid, signal) {
            self.initiate_group_exit(ctx, signal);
            return;
        }

        if let Some(thread) = self.threads.get_mut(&tid) {
            thread.signal_wake_up(signal == Signal::SIGKILL);
        }
    }

    /// Default disposition terminates, nothing can intercept it, and no
    /// group exit is underway
    fn is_fatal_now(&self, ctx: &SignalContext, tid: Tid, signal: Signal) -> bool {
        if self.group_exit_requested {
            return false;
        }
        let action = self.actions.get(signal);
        if action.handler != SigHandler::Default || signal.default_action() != DefaultAction::Terminate {
            return false;
        }
        let Some(thread) = self.threads.get(&tid) else {
            return false;
        };
        if thread.real_blocked.contains(signal) {
            return false;
        }
        signal == Signal::SIGKILL || !ctx.tracer.is_traced(tid)
    }

    /// `leaving` can no longer take the signals in `which`; find other
    /// threads for the shared ones and wake them
    pub(crate) fn retarget_shared_pending(&mut self, leaving: Tid, which: SignalSet) {
        let mut retarget = self.shared.present() & which;
        if retarget.is_empty() {
            return;
        }

        for (tid, thread) in self.threads.iter_mut() {
            if *tid == leaving || !thread.is_active() {
                continue;
            }
            let takes = retarget - thread.blocked;
            if takes.is_empty() {
                continue;
            }
            retarget = retarget - takes;
            if !thread.sigpending {
                thread.signal_wake_up(false);
            }
            if retarget.is_empty() {
                break;
            }
        }
    }
}
