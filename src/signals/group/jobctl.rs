/*!
 * Job Control
 * Group stop, continue, group exit and thread exit bookkeeping
 */

use super::context::SignalContext;
use super::state::GroupState;
use crate::core::types::Tid;
use crate::signals::action::SigHandler;
use crate::signals::core::sigset::SignalSet;
use crate::signals::core::types::{ChildEvent, Signal, SignalInfo, SignalResult};
use crate::signals::thread::RunState;
use log::{debug, info};

impl GroupState {
    /// Raise-time effects of stop-class signals and CONT
    pub(crate) fn handle_stop_or_continue(&mut self, ctx: &SignalContext, signal: Signal) {
        if signal.is_stop_class() {
            self.flush_everywhere(SignalSet::single(Signal::SIGCONT));
        } else if signal == Signal::SIGCONT {
            self.resume_group(ctx);
        }
    }

    /// CONT raised: cancel any stop, restart stopped threads, report
    fn resume_group(&mut self, ctx: &SignalContext) {
        self.flush_everywhere(SignalSet::stop_class());

        let was_stopping = self.group_stop_count > 0;
        let was_stopped = self.stopped;
        self.group_stop_count = 0;
        self.stopped = false;

        let cont_handled = matches!(self.actions.get(Signal::SIGCONT).handler, SigHandler::Handler(_));
        for thread in self.threads.values_mut().filter(|t| t.is_alive()) {
            thread.stop_pending = false;
            thread.stop_dequeued = false;
            if thread.run_state == RunState::Stopped {
                thread.run_state = RunState::Running;
            }
            if cont_handled && !thread.blocked.contains(Signal::SIGCONT) {
                thread.signal_wake_up(false);
            }
        }

        let stop_status = self.stop_signal.map_or(0, |s| s.number() as i32);
        let cont_status = Signal::SIGCONT.number() as i32;
        if was_stopping {
            debug!("Group {} continued before its stop completed", self.tgid);
            ctx.report(self.tgid, ChildEvent::Stopped, stop_status);
            ctx.report(self.tgid, ChildEvent::Continued, cont_status);
        } else if was_stopped {
            debug!("Group {} continued", self.tgid);
            ctx.report(self.tgid, ChildEvent::Continued, cont_status);
        }
    }

    /// Start taking the whole group down with `signal`.
    /// Returns false if a group exit is already underway.
    pub(crate) fn initiate_group_exit(&mut self, ctx: &SignalContext, signal: Signal) -> bool {
        if self.group_exit_requested {
            return false;
        }
        self.group_exit_requested = true;
        self.group_exit_code = signal.number() as i32;
        self.zap_threads();
        ctx.stats.inc_group_exits();
        info!("Group {} exiting on {}", self.tgid, signal);
        true
    }

    /// Force a KILL into every live thread and restart it
    fn zap_threads(&mut self) {
        self.group_stop_count = 0;
        self.notify_count = 0;
        for thread in self.threads.values_mut().filter(|t| t.is_alive()) {
            thread.stop_pending = false;
            thread.pending.enqueue_reserved(SignalInfo::kernel(Signal::SIGKILL));
            thread.signal_wake_up(true);
            self.notify_count += 1;
        }
    }

    /// Mark the group exiting on a coredump signal and make every other
    /// thread stop while `tid` writes the dump.
    /// Returns false if a group exit is already underway.
    pub(crate) fn begin_coredump(&mut self, tid: Tid, signal: Signal) -> bool {
        if self.group_exit_requested {
            return false;
        }
        self.group_exit_requested = true;
        self.group_exit_code = signal.number() as i32;
        self.group_exit_initiator = Some(tid);
        self.stop_signal = Some(signal);
        self.group_stop_count = 0;

        for (other, thread) in self.threads.iter_mut() {
            if *other == tid || !thread.is_active() || thread.run_state == RunState::Stopped {
                continue;
            }
            thread.stop_pending = true;
            thread.signal_wake_up(false);
            self.group_stop_count += 1;
        }
        info!(
            "Group {} dumping core on {}, quiescing {} threads",
            self.tgid, signal, self.group_stop_count
        );
        true
    }

    /// Dump finished (or failed); kill everybody
    pub(crate) fn finish_coredump(&mut self, ctx: &SignalContext, dumped: bool) {
        self.group_exit_initiator = None;
        self.core_dumped = dumped;
        self.zap_threads();
        ctx.stats.inc_group_exits();
    }

    /// First thread to act on a stop signal arms the group stop
    pub(crate) fn begin_group_stop(&mut self, ctx: &SignalContext, tid: Tid, signal: Signal) {
        if self.group_exit_requested || self.group_stop_count > 0 {
            return;
        }
        self.stop_signal = Some(signal);

        let mut count = 0;
        for (other, thread) in self.threads.iter_mut() {
            if !thread.is_active() {
                continue;
            }
            if *other == tid {
                thread.stop_pending = true;
                count += 1;
            } else if thread.run_state != RunState::Stopped {
                thread.stop_pending = true;
                thread.signal_wake_up(false);
                count += 1;
            }
        }
        self.group_stop_count = count;
        ctx.stats.inc_group_stops();
        debug!("Group {} stopping on {} ({} threads)", self.tgid, signal, count);
    }

    /// Thread owes its share of a group stop
    pub(crate) fn should_join_group_stop(&self, tid: Tid) -> bool {
        self.group_stop_count > 0
            && self.group_exit_initiator != Some(tid)
            && self.threads.get(&tid).is_some_and(|t| t.stop_pending && t.is_active())
    }

    /// Pay this thread's share and put it to sleep. The last thread in
    /// reports the stop unless the group is exiting.
    pub(crate) fn join_group_stop(&mut self, ctx: &SignalContext, tid: Tid) -> SignalResult<()> {
        let thread = self.live_thread_mut(tid)?;
        thread.stop_pending = false;
        thread.stop_dequeued = false;
        thread.run_state = RunState::Stopped;
        self.complete_stop_share(ctx);
        Ok(())
    }

    fn complete_stop_share(&mut self, ctx: &SignalContext) {
        self.group_stop_count = self.group_stop_count.saturating_sub(1);
        if self.group_stop_count > 0 || self.group_exit_requested {
            return;
        }
        self.stopped = true;
        let status = self.stop_signal.map_or(0, |s| s.number() as i32);
        info!("Group {} stopped", self.tgid);
        ctx.report(self.tgid, ChildEvent::Stopped, status);
    }

    /// A stop decision made with the lock dropped is stale
    pub(crate) fn stop_raced(&self, tid: Tid) -> bool {
        let Some(thread) = self.threads.get(&tid) else {
            return true;
        };
        let cancellers = SignalSet::single(Signal::SIGCONT) | SignalSet::single(Signal::SIGKILL);
        self.group_exit_requested
            || !thread.stop_dequeued
            || !(self.pending_for(tid) & cancellers).is_empty()
    }

    /// Thread `tid` leaves the group. Returns true when it was the last one.
    pub(crate) fn exit_thread(
        &mut self,
        ctx: &SignalContext,
        tid: Tid,
        status: i32,
    ) -> SignalResult<bool> {
        let leader = self.leader;
        let thread = self.live_thread_mut(tid)?;
        thread.exiting = true;
        thread.pending.clear();
        thread.notifier = None;
        let owed_stop = std::mem::take(&mut thread.stop_pending);
        let could_take = !thread.blocked;
        thread.run_state = if tid == leader {
            RunState::Zombie
        } else {
            RunState::Dead
        };

        if owed_stop && self.group_stop_count > 0 {
            self.complete_stop_share(ctx);
        }
        self.retarget_shared_pending(tid, could_take);
        if self.curr_target == tid {
            self.curr_target = leader;
        }
        if self.group_exit_requested {
            self.notify_count = self.notify_count.saturating_sub(1);
        } else {
            self.exit_status = status;
        }

        if self.has_live_threads() {
            debug!("Thread {} of group {} exited", tid, self.tgid);
            return Ok(false);
        }

        if let Some(leader) = self.threads.get_mut(&leader) {
            leader.run_state = RunState::Dead;
        }
        self.shared.clear();

        let (event, code) = if !self.group_exit_requested {
            (ChildEvent::Exited, self.exit_status)
        } else if self.core_dumped {
            (ChildEvent::Dumped, self.group_exit_code)
        } else {
            (ChildEvent::Killed, self.group_exit_code)
        };
        info!("Group {} is dead ({:?}, {})", self.tgid, event, code);
        ctx.report(self.tgid, event, code);
        Ok(true)
    }
}
