/*!
 * Thread Group
 * Group-wide signal state behind a single lock and wakeup condition
 */

use crate::core::types::{ProcessIdentity, Tgid, Tid};
use crate::signals::action::DispositionTable;
use crate::signals::core::sigset::SignalSet;
use crate::signals::core::types::{Signal, SignalError, SignalInfo, SignalResult};
use crate::signals::queue::PendingQueue;
use crate::signals::thread::{RunState, ThreadSnapshot, ThreadState};
use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// A thread group and its signal lock.
///
/// Every field of [`GroupState`] is read and written with `state` held.
/// Threads sleeping in the signal subsystem (group stop, blocking wait)
/// park on `wakeup` and re-check their own condition after each wake.
pub struct ThreadGroup {
    tgid: Tgid,
    identity: RwLock<ProcessIdentity>,
    state: Mutex<GroupState>,
    wakeup: Condvar,
}

impl ThreadGroup {
    /// New group whose leader thread id equals `tgid`
    pub(crate) fn new(tgid: Tgid, identity: ProcessIdentity, blocked: SignalSet) -> Self {
        Self {
            tgid,
            identity: RwLock::new(identity),
            state: Mutex::new(GroupState::new(tgid, blocked)),
            wakeup: Condvar::new(),
        }
    }

    #[inline]
    pub fn tgid(&self) -> Tgid {
        self.tgid
    }

    pub fn identity(&self) -> ProcessIdentity {
        *self.identity.read()
    }

    pub(crate) fn set_identity(&self, identity: ProcessIdentity) {
        *self.identity.write() = identity;
    }

    #[inline]
    pub(crate) fn lock(&self) -> MutexGuard<'_, GroupState> {
        self.state.lock()
    }

    /// Wake every thread parked on this group
    #[inline]
    pub(crate) fn wake_all(&self) {
        self.wakeup.notify_all();
    }

    #[inline]
    pub(crate) fn wait(&self, guard: &mut MutexGuard<'_, GroupState>) {
        self.wakeup.wait(guard);
    }

    /// Returns true if the deadline passed
    #[inline]
    pub(crate) fn wait_until(&self, guard: &mut MutexGuard<'_, GroupState>, deadline: Instant) -> bool {
        self.wakeup.wait_until(guard, deadline).timed_out()
    }

    pub fn snapshot(&self) -> GroupSnapshot {
        let identity = self.identity();
        self.lock().snapshot(identity)
    }
}

impl std::fmt::Debug for ThreadGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadGroup")
            .field("tgid", &self.tgid)
            .finish_non_exhaustive()
    }
}

/// Signal state shared by all threads of a group
#[derive(Debug)]
pub struct GroupState {
    pub(crate) tgid: Tgid,
    pub(crate) leader: Tid,
    pub(crate) threads: BTreeMap<Tid, ThreadState>,
    pub(crate) shared: PendingQueue,
    pub(crate) actions: DispositionTable,
    /// Threads that still owe their share of the current group stop
    pub(crate) group_stop_count: usize,
    /// Signal that started the current or last group stop
    pub(crate) stop_signal: Option<Signal>,
    /// Group stop completed and was reported
    pub(crate) stopped: bool,
    pub(crate) group_exit_requested: bool,
    pub(crate) group_exit_code: i32,
    /// Thread producing a core dump while the rest of the group stops
    pub(crate) group_exit_initiator: Option<Tid>,
    pub(crate) core_dumped: bool,
    /// Round-robin cursor for group-directed signals
    pub(crate) curr_target: Tid,
    /// Live threads yet to exit after a group exit started
    pub(crate) notify_count: usize,
    /// Status of the last voluntary thread exit
    pub(crate) exit_status: i32,
}

impl GroupState {
    fn new(leader: Tid, blocked: SignalSet) -> Self {
        let mut threads = BTreeMap::new();
        threads.insert(leader, ThreadState::new(leader, blocked));
        Self {
            tgid: leader,
            leader,
            threads,
            shared: PendingQueue::new(),
            actions: DispositionTable::new(),
            group_stop_count: 0,
            stop_signal: None,
            stopped: false,
            group_exit_requested: false,
            group_exit_code: 0,
            group_exit_initiator: None,
            core_dumped: false,
            curr_target: leader,
            notify_count: 0,
            exit_status: 0,
        }
    }

    pub fn thread(&self, tid: Tid) -> SignalResult<&ThreadState> {
        self.threads.get(&tid).ok_or(SignalError::NoSuchThread(tid))
    }

    pub(crate) fn thread_mut(&mut self, tid: Tid) -> SignalResult<&mut ThreadState> {
        self.threads.get_mut(&tid).ok_or(SignalError::NoSuchThread(tid))
    }

    /// Thread that exists and has not died
    pub(crate) fn live_thread(&self, tid: Tid) -> SignalResult<&ThreadState> {
        self.thread(tid)
            .ok()
            .filter(|t| t.is_alive())
            .ok_or(SignalError::NoSuchThread(tid))
    }

    pub(crate) fn live_thread_mut(&mut self, tid: Tid) -> SignalResult<&mut ThreadState> {
        self.threads
            .get_mut(&tid)
            .filter(|t| t.is_alive())
            .ok_or(SignalError::NoSuchThread(tid))
    }

    pub(crate) fn add_thread(&mut self, tid: Tid, blocked: SignalSet) {
        self.threads.insert(tid, ThreadState::new(tid, blocked));
    }

    pub fn live_count(&self) -> usize {
        self.threads.values().filter(|t| t.is_alive()).count()
    }

    #[inline]
    pub fn has_live_threads(&self) -> bool {
        self.threads.values().any(|t| t.is_alive())
    }

    /// Signal recorded as the group's exit cause
    pub(crate) fn exit_signal(&self) -> Signal {
        u32::try_from(self.group_exit_code)
            .ok()
            .and_then(|n| Signal::from_number(n).ok())
            .unwrap_or(Signal::SIGKILL)
    }

    /// The thread must stop executing user code and exit
    pub(crate) fn fatal_pending(&self, tid: Tid) -> bool {
        self.group_exit_requested || self.threads.get(&tid).is_some_and(|t| t.kill_pending())
    }

    /// Signals pending for `tid` in either queue
    pub(crate) fn pending_for(&self, tid: Tid) -> SignalSet {
        let private = self
            .threads
            .get(&tid)
            .map(|t| t.pending.present())
            .unwrap_or_default();
        private | self.shared.present()
    }

    /// Signals pending anywhere in the group
    pub(crate) fn pending_anywhere(&self) -> SignalSet {
        self.threads
            .values()
            .filter(|t| t.is_alive())
            .fold(self.shared.present(), |acc, t| acc | t.pending.present())
    }

    /// Remove `mask` from the shared queue and every private queue
    pub(crate) fn flush_everywhere(&mut self, mask: SignalSet) -> u32 {
        let mut removed = self.shared.remove_matching(mask);
        for thread in self.threads.values_mut() {
            removed += thread.pending.remove_matching(mask);
        }
        removed
    }

    /// Refresh the thread's "look for signals" flag
    pub(crate) fn recalc_sigpending(&mut self, tid: Tid) {
        let stop_owed = self.group_stop_count > 0;
        let exiting = self.group_exit_requested;
        let shared = self.shared.present();
        if let Some(thread) = self.threads.get_mut(&tid) {
            let pending = thread.pending.present() | shared;
            thread.sigpending = pending.any_outside(thread.dequeue_mask())
                || (stop_owed && thread.stop_pending)
                || exiting;
        }
    }

    /// Dequeue the next signal for `tid` outside `mask`, private queue first
    pub(crate) fn dequeue_for(&mut self, tid: Tid, mask: SignalSet) -> Option<SignalInfo> {
        let thread = self.threads.get_mut(&tid)?;
        let entry = thread
            .pending
            .dequeue_first_unblocked(mask)
            .or_else(|| self.shared.dequeue_first_unblocked(mask))?;
        Some(entry.into_info())
    }

    pub(crate) fn snapshot(&self, identity: ProcessIdentity) -> GroupSnapshot {
        GroupSnapshot {
            tgid: self.tgid,
            leader: self.leader,
            identity,
            shared_pending: self.shared.present(),
            group_stop_count: self.group_stop_count,
            stopped: self.stopped,
            group_exit_requested: self.group_exit_requested,
            group_exit_code: self.group_exit_code,
            group_exit_initiator: self.group_exit_initiator,
            core_dumped: self.core_dumped,
            curr_target: self.curr_target,
            notify_count: self.notify_count,
            threads: self.threads.values().map(ThreadState::snapshot).collect(),
        }
    }

    /// Run state of every thread, in tid order
    pub fn run_states(&self) -> Vec<(Tid, RunState)> {
        self.threads.iter().map(|(tid, t)| (*tid, t.run_state)).collect()
    }
}

/// Serializable copy of a group's signal state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub tgid: Tgid,
    pub leader: Tid,
    pub identity: ProcessIdentity,
    pub shared_pending: SignalSet,
    pub group_stop_count: usize,
    pub stopped: bool,
    pub group_exit_requested: bool,
    pub group_exit_code: i32,
    pub group_exit_initiator: Option<Tid>,
    pub core_dumped: bool,
    pub curr_target: Tid,
    pub notify_count: usize,
    pub threads: Vec<ThreadSnapshot>,
}

impl GroupSnapshot {
    pub fn thread(&self, tid: Tid) -> Option<&ThreadSnapshot> {
        self.threads.iter().find(|t| t.tid == tid)
    }

    /// Every thread has died
    pub fn is_dead(&self) -> bool {
        self.threads.iter().all(|t| t.run_state == RunState::Dead)
    }
}
