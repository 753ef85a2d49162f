/*!
 * Signal Queue Quota
 * Per-sender allocation pool backing queued signal detail entries
 */

use crate::core::shard_manager::{ShardManager, WorkloadProfile};
use crate::core::types::Uid;
use ahash::RandomState;
use dashmap::DashMap;
use log::debug;
use std::fmt;
use std::sync::Arc;

/// Bounded pool of queue entries, charged per sending uid
pub struct SigQueueQuota {
    limit: usize,
    charged: DashMap<Uid, usize, RandomState>,
}

impl SigQueueQuota {
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            limit,
            charged: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                ShardManager::shards(WorkloadProfile::MediumContention),
            ),
        })
    }

    /// Configured per-uid limit
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Reserve one entry for `uid`.
    ///
    /// `override_limit` lets kill-style legacy sends exceed the cap.
    /// Returns `None` when the pool is exhausted.
    pub fn try_charge(self: &Arc<Self>, uid: Uid, override_limit: bool) -> Option<QuotaCharge> {
        let mut count = self.charged.entry(uid).or_insert(0);
        if !override_limit && *count >= self.limit {
            debug!("Signal queue quota exhausted for uid {} ({})", uid, *count);
            return None;
        }
        *count += 1;
        drop(count);

        Some(QuotaCharge {
            quota: Arc::clone(self),
            uid,
        })
    }

    /// Entries currently charged to `uid`
    pub fn outstanding(&self, uid: Uid) -> usize {
        self.charged.get(&uid).map(|count| *count).unwrap_or(0)
    }

    fn release(&self, uid: Uid) {
        self.charged.remove_if_mut(&uid, |_, count| {
            *count = count.saturating_sub(1);
            *count == 0
        });
    }
}

impl fmt::Debug for SigQueueQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigQueueQuota")
            .field("limit", &self.limit)
            .field("uids", &self.charged.len())
            .finish()
    }
}

/// One charged entry; returned to the pool on drop
pub struct QuotaCharge {
    quota: Arc<SigQueueQuota>,
    uid: Uid,
}

impl QuotaCharge {
    pub fn uid(&self) -> Uid {
        self.uid
    }
}

impl Drop for QuotaCharge {
    fn drop(&mut self) {
        self.quota.release(self.uid);
    }
}

impl fmt::Debug for QuotaCharge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuotaCharge").field("uid", &self.uid).finish()
    }
}
