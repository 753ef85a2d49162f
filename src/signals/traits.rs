/*!
 * Signal Traits
 * Public signal API, split by capability
 */

use super::action::Disposition;
use super::core::sigset::SignalSet;
use super::core::types::{
    DeliveryDecision, MaskHow, PendingTarget, PidSelector, Sender, Signal, SignalInfo,
    SignalResult, SignalStats,
};
use super::group::GroupSnapshot;
use crate::core::types::{ProcessIdentity, Tgid, Tid};
use std::time::Duration;

/// Raising signals
pub trait SignalDelivery: Send + Sync {
    /// Send a signal to one thread's private queue
    fn send_to_thread(&self, sender: Sender, tid: Tid, info: SignalInfo) -> SignalResult<()>;

    /// Send a signal to a thread group's shared queue
    fn send_to_group(&self, sender: Sender, tgid: Tgid, info: SignalInfo) -> SignalResult<()>;

    /// kill()-style send; returns how many groups were signalled
    fn send_by_pid_rule(
        &self,
        sender: Sender,
        selector: PidSelector,
        info: SignalInfo,
    ) -> SignalResult<usize>;

    /// Check whether `sender` may signal `tgid` without raising anything
    fn check_permission(&self, sender: Sender, tgid: Tgid) -> SignalResult<()>;
}

/// Blocked masks and pending sets
pub trait SignalMasking: Send + Sync {
    fn get_blocked_mask(&self, tid: Tid) -> SignalResult<SignalSet>;

    /// Change the blocked mask; returns the previous one
    fn set_blocked_mask(&self, tid: Tid, how: MaskHow, set: SignalSet) -> SignalResult<SignalSet>;

    /// Restore the mask saved when a handler was entered
    fn signal_return(&self, tid: Tid, saved_mask: SignalSet) -> SignalResult<()>;

    fn get_pending(&self, target: PendingTarget) -> SignalResult<SignalSet>;
}

/// Disposition table management
pub trait SignalActions: Send + Sync {
    fn get_disposition(&self, tgid: Tgid, signal: Signal) -> SignalResult<Disposition>;

    /// Install a disposition; returns the previous one
    fn set_disposition(
        &self,
        tgid: Tgid,
        signal: Signal,
        disposition: Disposition,
    ) -> SignalResult<Disposition>;

    /// Exec-style reset of caught signals; returns how many were reset
    fn reset_handlers(&self, tgid: Tgid) -> SignalResult<usize>;
}

/// Taking signals on the receiving side
pub trait SignalConsumer: Send + Sync {
    /// Decide what `tid` must do next; may block in a group stop
    fn consume_next_deliverable(&self, tid: Tid) -> SignalResult<DeliveryDecision>;

    /// Block until a signal in `allowed` arrives or `timeout` passes
    fn wait_for_signal_blocking(
        &self,
        tid: Tid,
        allowed: SignalSet,
        timeout: Option<Duration>,
    ) -> SignalResult<SignalInfo>;
}

/// Thread group lifecycle and inspection
pub trait SignalStateManager: Send + Sync {
    /// Create a group with a single leader thread; returns its tgid
    fn create_group(&self, identity: ProcessIdentity) -> Tgid;

    /// Add a thread to the group of `creator`, inheriting its mask
    fn spawn_thread(&self, creator: Tid) -> SignalResult<Tid>;

    /// Thread leaves its group; returns true when it was the last one
    fn exit_thread(&self, tid: Tid, status: i32) -> SignalResult<bool>;

    /// Forget a group whose threads have all died
    fn release_group(&self, tgid: Tgid) -> SignalResult<bool>;

    fn group_snapshot(&self, tgid: Tgid) -> SignalResult<GroupSnapshot>;

    fn stats(&self) -> SignalStats;
}

/// Combined signal API
pub trait SignalApi:
    SignalDelivery + SignalMasking + SignalActions + SignalConsumer + SignalStateManager + Clone
{
}

impl<T> SignalApi for T where
    T: SignalDelivery
        + SignalMasking
        + SignalActions
        + SignalConsumer
        + SignalStateManager
        + Clone
{
}
