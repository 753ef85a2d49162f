/*!
 * Signal Manager
 * Thread group arena and the public signal API
 */

use super::builder::SignalManagerBuilder;
use crate::core::config::SignalConfig;
use crate::core::limits::INIT_TGID;
use crate::core::shard_manager::{ShardManager, WorkloadProfile};
use crate::core::types::{Pgid, ProcessIdentity, Tgid, Tid, Uid};
use crate::signals::action::Disposition;
use crate::signals::core::sigset::SignalSet;
use crate::signals::core::traits::SignalNotifier;
use crate::signals::core::types::*;
use crate::signals::delivery;
use crate::signals::group::{GroupSnapshot, RouteTarget, SignalContext, ThreadGroup};
use crate::signals::thread::NotifierHook;
use crate::signals::traits::*;
use ahash::RandomState;
use dashmap::DashMap;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Signal manager implementation
///
/// Owns every thread group. Groups are found by tgid, threads through a
/// tid -> tgid index; all signal state of a group lives behind that
/// group's own lock.
///
/// # Performance
/// - Cache-line aligned to prevent false sharing of the id counter
#[repr(C, align(64))]
#[derive(Clone)]
pub struct SignalManager {
    groups: Arc<DashMap<Tgid, Arc<ThreadGroup>, RandomState>>,
    threads: Arc<DashMap<Tid, Tgid, RandomState>>,
    ctx: Arc<SignalContext>,
    next_id: Arc<AtomicU32>,
}

impl SignalManager {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> SignalManagerBuilder {
        SignalManagerBuilder::new()
    }

    pub(crate) fn from_context(ctx: SignalContext) -> Self {
        info!(
            "Signal manager initialized (queue quota {}, stop reports {})",
            ctx.config.queue_quota, ctx.config.stop_report
        );
        Self {
            groups: Arc::new(Self::table()),
            threads: Arc::new(Self::table()),
            ctx: Arc::new(ctx),
            next_id: Arc::new(AtomicU32::new(INIT_TGID)),
        }
    }

    fn table<K: Eq + std::hash::Hash, V>() -> DashMap<K, V, RandomState> {
        DashMap::with_capacity_and_hasher_and_shard_amount(
            0,
            RandomState::new(),
            ShardManager::shards(WorkloadProfile::HighContention),
        )
    }

    pub fn config(&self) -> &SignalConfig {
        &self.ctx.config
    }

    /// Queue entries currently charged to `uid`
    pub fn queued_by(&self, uid: Uid) -> usize {
        self.ctx.quota.outstanding(uid)
    }

    fn group(&self, tgid: Tgid) -> SignalResult<Arc<ThreadGroup>> {
        self.groups
            .get(&tgid)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(SignalError::NoSuchGroup(tgid))
    }

    fn group_of(&self, tid: Tid) -> SignalResult<Arc<ThreadGroup>> {
        let tgid = self
            .threads
            .get(&tid)
            .map(|entry| *entry.value())
            .ok_or(SignalError::NoSuchThread(tid))?;
        self.group(tgid)
    }

    /// Group a thread belongs to
    pub fn tgid_of(&self, tid: Tid) -> SignalResult<Tgid> {
        self.group_of(tid).map(|group| group.tgid())
    }

    /// Replace the identity (process group, session, credentials) of a group
    pub fn set_identity(&self, tgid: Tgid, identity: ProcessIdentity) -> SignalResult<()> {
        self.group(tgid)?.set_identity(identity);
        Ok(())
    }

    /// Route `mask` through `notifier` before `tid` may dequeue it
    pub fn install_notifier(
        &self,
        tid: Tid,
        mask: SignalSet,
        notifier: Arc<dyn SignalNotifier>,
    ) -> SignalResult<()> {
        let group = self.group_of(tid)?;
        let mut st = group.lock();
        st.live_thread_mut(tid)?.notifier = Some(NotifierHook { mask, notifier });
        st.recalc_sigpending(tid);
        debug!("Installed notifier on thread {} for {:?}", tid, mask);
        Ok(())
    }

    /// Returns false if no notifier was installed
    pub fn remove_notifier(&self, tid: Tid) -> SignalResult<bool> {
        let group = self.group_of(tid)?;
        let removed = {
            let mut st = group.lock();
            let removed = st.live_thread_mut(tid)?.notifier.take().is_some();
            st.recalc_sigpending(tid);
            removed
        };
        group.wake_all();
        Ok(removed)
    }

    fn check_kill_permission(
        &self,
        sender: Sender,
        target: &ThreadGroup,
        signal: Signal,
    ) -> SignalResult<()> {
        let Sender::Thread(tid) = sender else {
            return Ok(());
        };
        let from = self.group_of(tid)?;
        if from.tgid() == target.tgid() {
            return Ok(());
        }
        if self
            .ctx
            .permissions
            .may_send(&from.identity(), &target.identity(), signal)
        {
            return Ok(());
        }

        warn!(
            "Group {} may not send {} to group {}",
            from.tgid(),
            signal,
            target.tgid()
        );
        Err(SignalError::PermissionDenied {
            sender: from.tgid(),
            target: target.tgid(),
            signal,
        })
    }

    fn raise(&self, group: &ThreadGroup, target: RouteTarget, info: SignalInfo) -> SignalResult<()> {
        {
            let mut st = group.lock();
            match target {
                RouteTarget::Thread(tid) => {
                    st.live_thread(tid)?;
                }
                RouteTarget::Group if !st.has_live_threads() => {
                    return Err(SignalError::NoSuchGroup(group.tgid()));
                }
                RouteTarget::Group => {}
            }
            st.route(&self.ctx, target, info)?;
        }
        group.wake_all();
        self.ctx.stats.inc_signals_sent();
        debug!(
            "Raised {} from pid {} into group {} ({:?})",
            info.signal,
            info.pid,
            group.tgid(),
            target
        );
        Ok(())
    }

    /// Send to every group in `targets`; succeeds if any send did
    fn send_all(
        &self,
        sender: Sender,
        targets: Vec<Arc<ThreadGroup>>,
        info: SignalInfo,
        none: SignalError,
    ) -> SignalResult<usize> {
        let mut delivered = 0;
        let mut last_error = none;
        for group in targets {
            let sent = self
                .check_kill_permission(sender, &group, info.signal)
                .and_then(|()| self.raise(&group, RouteTarget::Group, info));
            match sent {
                Ok(()) => delivered += 1,
                Err(e) => last_error = e,
            }
        }

        if delivered > 0 {
            Ok(delivered)
        } else {
            Err(last_error)
        }
    }

    fn live_groups<F>(&self, filter: F) -> Vec<Arc<ThreadGroup>>
    where
        F: Fn(&ThreadGroup) -> bool,
    {
        let all: Vec<Arc<ThreadGroup>> = self
            .groups
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        all.into_iter()
            .filter(|group| filter(group.as_ref()))
            .filter(|group| group.lock().has_live_threads())
            .collect()
    }

    fn kill_pgrp(&self, sender: Sender, pgid: Pgid, info: SignalInfo) -> SignalResult<usize> {
        let members = self.live_groups(|group| group.identity().pgid == pgid);
        if members.is_empty() {
            return Err(SignalError::NoSuchProcessGroup(pgid));
        }
        self.send_all(sender, members, info, SignalError::NoSuchProcessGroup(pgid))
    }
}

impl Default for SignalManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SignalManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalManager")
            .field("groups", &self.groups.len())
            .field("threads", &self.threads.len())
            .field("config", &self.ctx.config)
            .finish()
    }
}

impl SignalDelivery for SignalManager {
    #[instrument(skip(self), level = "debug")]
    fn send_to_thread(&self, sender: Sender, tid: Tid, info: SignalInfo) -> SignalResult<()> {
        let group = self.group_of(tid)?;
        self.check_kill_permission(sender, &group, info.signal)?;
        self.raise(&group, RouteTarget::Thread(tid), info)
    }

    #[instrument(skip(self), level = "debug")]
    fn send_to_group(&self, sender: Sender, tgid: Tgid, info: SignalInfo) -> SignalResult<()> {
        let group = self.group(tgid)?;
        self.check_kill_permission(sender, &group, info.signal)?;
        self.raise(&group, RouteTarget::Group, info)
    }

    #[instrument(skip(self), level = "debug")]
    fn send_by_pid_rule(
        &self,
        sender: Sender,
        selector: PidSelector,
        info: SignalInfo,
    ) -> SignalResult<usize> {
        match selector {
            PidSelector::Pid(tgid) => self.send_to_group(sender, tgid, info).map(|()| 1),
            PidSelector::Group(pgid) => self.kill_pgrp(sender, pgid, info),
            PidSelector::ThisGroup => {
                let Sender::Thread(tid) = sender else {
                    return Err(SignalError::NoSuchProcessGroup(0));
                };
                let pgid = self.group_of(tid)?.identity().pgid;
                self.kill_pgrp(sender, pgid, info)
            }
            PidSelector::Broadcast => {
                let own = match sender {
                    Sender::Thread(tid) => Some(self.tgid_of(tid)?),
                    Sender::Kernel => None,
                };
                let targets = self.live_groups(|group| {
                    group.tgid() != INIT_TGID && Some(group.tgid()) != own
                });
                let count = self.send_all(sender, targets, info, SignalError::NoSuchGroup(0))?;
                info!("Broadcast {} to {} groups", info.signal, count);
                Ok(count)
            }
        }
    }

    fn check_permission(&self, sender: Sender, tgid: Tgid) -> SignalResult<()> {
        let group = self.group(tgid)?;
        if !group.lock().has_live_threads() {
            return Err(SignalError::NoSuchGroup(tgid));
        }
        self.check_kill_permission(sender, &group, Signal::SIGKILL)
    }
}

impl SignalMasking for SignalManager {
    fn get_blocked_mask(&self, tid: Tid) -> SignalResult<SignalSet> {
        let group = self.group_of(tid)?;
        let st = group.lock();
        Ok(st.live_thread(tid)?.blocked())
    }

    #[instrument(skip(self), level = "debug")]
    fn set_blocked_mask(&self, tid: Tid, how: MaskHow, set: SignalSet) -> SignalResult<SignalSet> {
        let set = set - SignalSet::unblockable();
        let group = self.group_of(tid)?;
        let old = {
            let mut st = group.lock();
            let thread = st.live_thread_mut(tid)?;
            let old = thread.blocked;
            thread.blocked = match how {
                MaskHow::Block => old | set,
                MaskHow::Unblock => old - set,
                MaskHow::SetAll => set,
            };
            let newly_blocked = thread.blocked - old;
            st.retarget_shared_pending(tid, newly_blocked);
            st.recalc_sigpending(tid);
            old
        };
        group.wake_all();
        Ok(old)
    }

    fn signal_return(&self, tid: Tid, saved_mask: SignalSet) -> SignalResult<()> {
        self.set_blocked_mask(tid, MaskHow::SetAll, saved_mask)
            .map(|_| ())
    }

    fn get_pending(&self, target: PendingTarget) -> SignalResult<SignalSet> {
        match target {
            PendingTarget::Thread(tid) => {
                let group = self.group_of(tid)?;
                let st = group.lock();
                st.live_thread(tid)?;
                Ok(st.pending_for(tid))
            }
            PendingTarget::Group(tgid) => Ok(self.group(tgid)?.lock().pending_anywhere()),
        }
    }
}

impl SignalActions for SignalManager {
    fn get_disposition(&self, tgid: Tgid, signal: Signal) -> SignalResult<Disposition> {
        Ok(self.group(tgid)?.lock().actions.get(signal))
    }

    #[instrument(skip(self), level = "debug")]
    fn set_disposition(
        &self,
        tgid: Tgid,
        signal: Signal,
        disposition: Disposition,
    ) -> SignalResult<Disposition> {
        let group = self.group(tgid)?;
        let mut st = group.lock();
        let old = st.actions.set(signal, disposition)?;
        if disposition.ignores(signal) {
            let flushed = st.flush_everywhere(SignalSet::single(signal));
            if flushed > 0 {
                debug!("Flushed pending {} from group {} after ignore", signal, tgid);
            }
        }
        Ok(old)
    }

    fn reset_handlers(&self, tgid: Tgid) -> SignalResult<usize> {
        let count = self.group(tgid)?.lock().actions.reset_handlers();
        info!("Reset {} handlers for group {}", count, tgid);
        Ok(count)
    }
}

impl SignalConsumer for SignalManager {
    #[instrument(skip(self), level = "trace")]
    fn consume_next_deliverable(&self, tid: Tid) -> SignalResult<DeliveryDecision> {
        let group = self.group_of(tid)?;
        delivery::get_signal(&self.ctx, &group, tid)
    }

    #[instrument(skip(self), level = "debug")]
    fn wait_for_signal_blocking(
        &self,
        tid: Tid,
        allowed: SignalSet,
        timeout: Option<Duration>,
    ) -> SignalResult<SignalInfo> {
        let group = self.group_of(tid)?;
        delivery::wait_for_signal(&self.ctx, &group, tid, allowed, timeout)
    }
}

impl SignalStateManager for SignalManager {
    fn create_group(&self, identity: ProcessIdentity) -> Tgid {
        let tgid = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.groups.insert(
            tgid,
            Arc::new(ThreadGroup::new(tgid, identity, SignalSet::empty())),
        );
        self.threads.insert(tgid, tgid);
        info!("Created thread group {} (pgid {})", tgid, identity.pgid);
        tgid
    }

    fn spawn_thread(&self, creator: Tid) -> SignalResult<Tid> {
        let group = self.group_of(creator)?;
        let tid = {
            let mut st = group.lock();
            let parent = st.live_thread(creator)?;
            if st.group_exit_requested {
                return Err(SignalError::GroupExiting(group.tgid()));
            }
            let blocked = parent.blocked();
            let joins_stop = parent.stop_pending && st.group_stop_count > 0;

            let tid = self.next_id.fetch_add(1, Ordering::SeqCst);
            st.add_thread(tid, blocked);
            if joins_stop {
                st.thread_mut(tid)?.stop_pending = true;
                st.group_stop_count += 1;
            }
            tid
        };
        self.threads.insert(tid, group.tgid());
        debug!("Spawned thread {} in group {}", tid, group.tgid());
        Ok(tid)
    }

    fn exit_thread(&self, tid: Tid, status: i32) -> SignalResult<bool> {
        let group = self.group_of(tid)?;
        let last = group.lock().exit_thread(&self.ctx, tid, status)?;
        group.wake_all();
        Ok(last)
    }

    fn release_group(&self, tgid: Tgid) -> SignalResult<bool> {
        let group = self.group(tgid)?;
        let tids: Vec<Tid> = {
            let st = group.lock();
            if st.has_live_threads() {
                return Ok(false);
            }
            st.threads.keys().copied().collect()
        };

        self.groups.remove(&tgid);
        for tid in tids {
            self.threads.remove(&tid);
        }
        info!("Released thread group {}", tgid);
        Ok(true)
    }

    fn group_snapshot(&self, tgid: Tgid) -> SignalResult<GroupSnapshot> {
        Ok(self.group(tgid)?.snapshot())
    }

    fn stats(&self) -> SignalStats {
        self.ctx.stats.snapshot()
    }
}
