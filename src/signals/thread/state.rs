/*!
 * Thread Signal State
 * Per-thread run state, blocked mask and private pending queue
 */

use crate::core::types::Tid;
use crate::signals::core::sigset::SignalSet;
use crate::signals::core::traits::SignalNotifier;
use crate::signals::core::types::Signal;
use crate::signals::queue::PendingQueue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Scheduling state of a thread as the signal subsystem sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunState {
    Running,
    SleepInterruptible,
    SleepUninterruptible,
    Stopped,
    Zombie,
    Dead,
}

impl RunState {
    #[inline]
    pub fn is_alive(self) -> bool {
        !matches!(self, RunState::Zombie | RunState::Dead)
    }
}

/// Installed block-all override
#[derive(Clone)]
pub(crate) struct NotifierHook {
    pub mask: SignalSet,
    pub notifier: Arc<dyn SignalNotifier>,
}

impl fmt::Debug for NotifierHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifierHook").field("mask", &self.mask).finish()
    }
}

/// Signal state of one thread, guarded by its group's signal lock
#[derive(Debug)]
pub struct ThreadState {
    pub(crate) tid: Tid,
    pub(crate) blocked: SignalSet,
    /// Mask saved while a blocking wait narrows `blocked`
    pub(crate) real_blocked: SignalSet,
    pub(crate) pending: PendingQueue,
    pub(crate) run_state: RunState,
    /// Thread has been told to look for signals
    pub(crate) sigpending: bool,
    /// Thread still owes its share of a group stop
    pub(crate) stop_pending: bool,
    /// A stop-class signal was dequeued and no CONT has cancelled it since
    pub(crate) stop_dequeued: bool,
    /// Thread has started exiting
    pub(crate) exiting: bool,
    pub(crate) notifier: Option<NotifierHook>,
    /// Set when a signal ended this thread
    pub(crate) killed_by: Option<Signal>,
}

impl ThreadState {
    pub(crate) fn new(tid: Tid, blocked: SignalSet) -> Self {
        Self {
            tid,
            blocked: blocked - SignalSet::unblockable(),
            real_blocked: SignalSet::empty(),
            pending: PendingQueue::new(),
            run_state: RunState::Running,
            sigpending: false,
            stop_pending: false,
            stop_dequeued: false,
            exiting: false,
            notifier: None,
            killed_by: None,
        }
    }

    #[inline]
    pub fn tid(&self) -> Tid {
        self.tid
    }

    #[inline]
    pub fn blocked(&self) -> SignalSet {
        self.blocked
    }

    #[inline]
    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    #[inline]
    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.run_state.is_alive()
    }

    /// Alive and not on its way out
    #[inline]
    pub fn is_active(&self) -> bool {
        self.is_alive() && !self.exiting
    }

    /// Blocked mask plus signals held back by an installed notifier
    pub(crate) fn dequeue_mask(&self) -> SignalSet {
        match &self.notifier {
            Some(hook) => {
                let held = hook
                    .mask
                    .iter()
                    .filter(|signal| !hook.notifier.allow(*signal))
                    .collect::<SignalSet>();
                self.blocked | held
            }
            None => self.blocked,
        }
    }

    /// KILL is waiting in the private queue
    #[inline]
    pub(crate) fn kill_pending(&self) -> bool {
        self.pending.contains(Signal::SIGKILL)
    }

    /// Flag the thread and kick it out of an interruptible sleep.
    /// `resume_stopped` also restarts a stopped thread (fatal and CONT wakes).
    pub(crate) fn signal_wake_up(&mut self, resume_stopped: bool) {
        self.sigpending = true;
        match self.run_state {
            RunState::SleepInterruptible => self.run_state = RunState::Running,
            RunState::Stopped if resume_stopped => self.run_state = RunState::Running,
            _ => {}
        }
    }

    /// Public view for snapshots
    pub fn snapshot(&self) -> ThreadSnapshot {
        ThreadSnapshot {
            tid: self.tid,
            run_state: self.run_state,
            blocked: self.blocked,
            pending: self.pending.present(),
            sigpending: self.sigpending,
            stop_pending: self.stop_pending,
            exiting: self.exiting,
            killed_by: self.killed_by,
        }
    }
}

/// Serializable copy of a thread's signal state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    pub tid: Tid,
    pub run_state: RunState,
    pub blocked: SignalSet,
    pub pending: SignalSet,
    pub sigpending: bool,
    pub stop_pending: bool,
    pub exiting: bool,
    pub killed_by: Option<Signal>,
}
