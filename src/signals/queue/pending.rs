/*!
 * Pending Signal Queue
 * Ordered queued-signal entries plus the set of signals present
 */

use super::quota::{QuotaCharge, SigQueueQuota};
use crate::signals::core::sigset::SignalSet;
use crate::signals::core::types::{Signal, SignalInfo};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

/// Allocation pool exhausted for a queued entry
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("signal queue quota exhausted")]
pub struct QueueFull;

/// A queued signal with its origin info.
///
/// Owned by exactly one queue until dequeued; the quota charge (if any)
/// is returned when the entry is dropped.
#[derive(Debug)]
pub struct QueuedSignal {
    pub info: SignalInfo,
    /// Queue insertion order marker
    pub seq: u64,
    charge: Option<QuotaCharge>,
}

impl QueuedSignal {
    #[inline]
    pub fn signal(&self) -> Signal {
        self.info.signal
    }

    /// Entry counts against a sender's quota
    #[inline]
    pub fn is_charged(&self) -> bool {
        self.charge.is_some()
    }

    /// Consume the entry, releasing its quota charge
    #[inline]
    pub fn into_info(self) -> SignalInfo {
        self.info
    }
}

/// Pending signals of one thread or one thread group.
///
/// `present` holds every signal with at least one entry, plus signals
/// recorded without detail after an allocation failure.
#[derive(Debug, Default)]
pub struct PendingQueue {
    present: SignalSet,
    entries: VecDeque<QueuedSignal>,
    next_seq: u64,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals currently pending
    #[inline]
    pub fn present(&self) -> SignalSet {
        self.present
    }

    #[inline]
    pub fn contains(&self, signal: Signal) -> bool {
        self.present.contains(signal)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    /// Number of detail entries
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Queued entries in insertion order
    pub fn entries(&self) -> impl Iterator<Item = &QueuedSignal> {
        self.entries.iter()
    }

    /// A further raise of `signal` would merge into the pending instance
    #[inline]
    pub fn is_coalesced(&self, signal: Signal) -> bool {
        signal.is_legacy() && self.present.contains(signal)
    }

    /// Queue `info`, charging one entry to the sender's uid.
    ///
    /// Legacy signals already present are merged. On `QueueFull` nothing
    /// changes; the caller decides between failing and `mark_present`.
    pub fn enqueue(&mut self, info: SignalInfo, quota: &Arc<SigQueueQuota>) -> Result<(), QueueFull> {
        let signal = info.signal;
        if self.is_coalesced(signal) {
            return Ok(());
        }

        let override_limit = signal.is_legacy() && info.code.is_kill_style();
        let charge = quota.try_charge(info.uid, override_limit).ok_or(QueueFull)?;
        self.push(info, Some(charge));
        Ok(())
    }

    /// Queue `info` from the reserved pool; never fails
    pub fn enqueue_reserved(&mut self, info: SignalInfo) {
        if self.is_coalesced(info.signal) {
            return;
        }
        self.push(info, None);
    }

    /// Record `signal` as pending without an entry
    #[inline]
    pub fn mark_present(&mut self, signal: Signal) {
        self.present.insert(signal);
    }

    fn push(&mut self, info: SignalInfo, charge: Option<QuotaCharge>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.present.insert(info.signal);
        self.entries.push_back(QueuedSignal { info, seq, charge });
    }

    /// Remove the lowest-numbered pending signal not in `blocked`.
    ///
    /// Takes the oldest entry for that number; a signal pending without an
    /// entry yields synthesized kill-style info.
    pub fn dequeue_first_unblocked(&mut self, blocked: SignalSet) -> Option<QueuedSignal> {
        let signal = self.present.lowest_member_excluding(blocked)?;
        Some(self.collect(signal))
    }

    fn collect(&mut self, signal: Signal) -> QueuedSignal {
        let position = self.entries.iter().position(|e| e.signal() == signal);

        match position.and_then(|pos| self.entries.remove(pos)) {
            Some(entry) => {
                let still_pending = self.entries.iter().any(|e| e.signal() == signal);
                if !still_pending {
                    self.present.remove(signal);
                }
                entry
            }
            None => {
                self.present.remove(signal);
                QueuedSignal {
                    info: SignalInfo::detailless(signal),
                    seq: self.next_seq,
                    charge: None,
                }
            }
        }
    }

    /// Drop every entry whose signal is in `mask`; returns how many
    /// signal numbers were cleared
    pub fn remove_matching(&mut self, mask: SignalSet) -> u32 {
        let hit = self.present & mask;
        if hit.is_empty() {
            return 0;
        }
        self.present = self.present - mask;
        self.entries.retain(|e| !mask.contains(e.signal()));
        hit.len()
    }

    /// Flush everything
    pub fn clear(&mut self) {
        self.present = SignalSet::empty();
        self.entries.clear();
    }
}
