/*!
 * Lock-Free Signal Statistics
 * Uses atomic counters for zero-contention stats tracking in hot paths
 */

use super::types::SignalStats;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic signal statistics for lock-free updates
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
/// - All operations use relaxed ordering; counters are monitoring data
#[repr(C, align(64))]
#[derive(Debug)]
pub struct AtomicSignalStats {
    total_signals_sent: AtomicU64,
    total_signals_delivered: AtomicU64,
    total_signals_queued: AtomicU64,
    total_signals_coalesced: AtomicU64,
    total_signals_ignored: AtomicU64,
    total_queue_overflows: AtomicU64,
    group_stops: AtomicU64,
    group_exits: AtomicU64,
}

impl AtomicSignalStats {
    /// Create new atomic stats
    #[inline]
    pub const fn new() -> Self {
        Self {
            total_signals_sent: AtomicU64::new(0),
            total_signals_delivered: AtomicU64::new(0),
            total_signals_queued: AtomicU64::new(0),
            total_signals_coalesced: AtomicU64::new(0),
            total_signals_ignored: AtomicU64::new(0),
            total_queue_overflows: AtomicU64::new(0),
            group_stops: AtomicU64::new(0),
            group_exits: AtomicU64::new(0),
        }
    }

    /// Hot path - called on every accepted send
    #[inline(always)]
    pub fn inc_signals_sent(&self) {
        self.total_signals_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Hot path - called on every handler or fatal delivery
    #[inline(always)]
    pub fn inc_signals_delivered(&self) {
        self.total_signals_delivered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_signals_queued(&self) {
        self.total_signals_queued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_signals_coalesced(&self) {
        self.total_signals_coalesced.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_signals_ignored(&self) {
        self.total_signals_ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// Entry could not be allocated; signal kept without detail
    #[inline(always)]
    pub fn inc_queue_overflows(&self) {
        self.total_queue_overflows.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_group_stops(&self) {
        self.group_stops.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_group_exits(&self) {
        self.group_exits.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy of the counters; each is read independently
    #[inline]
    pub fn snapshot(&self) -> SignalStats {
        SignalStats {
            total_signals_sent: self.total_signals_sent.load(Ordering::Relaxed),
            total_signals_delivered: self.total_signals_delivered.load(Ordering::Relaxed),
            total_signals_queued: self.total_signals_queued.load(Ordering::Relaxed),
            total_signals_coalesced: self.total_signals_coalesced.load(Ordering::Relaxed),
            total_signals_ignored: self.total_signals_ignored.load(Ordering::Relaxed),
            total_queue_overflows: self.total_queue_overflows.load(Ordering::Relaxed),
            group_stops: self.group_stops.load(Ordering::Relaxed),
            group_exits: self.group_exits.load(Ordering::Relaxed),
        }
    }
}

impl Default for AtomicSignalStats {
    fn default() -> Self {
        Self::new()
    }
}
