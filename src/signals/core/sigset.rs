/*!
 * Signal Set
 * Fixed-width bitset over signal numbers 1..=64
 */

use super::types::Signal;
use crate::core::limits::{NSIG, SIGRTMIN};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not, Sub};

/// Set of signal numbers; bit `n - 1` stands for signal `n`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalSet(u64);

impl SignalSet {
    /// Signals the legacy (non real-time) range covers
    pub const LEGACY: SignalSet = SignalSet((1u64 << (SIGRTMIN - 1)) - 1);

    /// Every representable signal
    pub const FULL: SignalSet = SignalSet(if NSIG == 64 {
        u64::MAX
    } else {
        (1u64 << NSIG) - 1
    });

    #[inline]
    pub const fn empty() -> Self {
        SignalSet(0)
    }

    #[inline]
    pub const fn full() -> Self {
        Self::FULL
    }

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        SignalSet(bits & Self::FULL.0)
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Set holding exactly one signal
    #[inline]
    pub const fn single(signal: Signal) -> Self {
        SignalSet(1u64 << signal.index())
    }

    /// KILL and STOP, which no mask may contain
    #[inline]
    pub const fn unblockable() -> Self {
        SignalSet(Self::single(Signal::SIGKILL).0 | Self::single(Signal::SIGSTOP).0)
    }

    /// Every stop-class signal (STOP, TSTP, TTIN, TTOU)
    #[inline]
    pub const fn stop_class() -> Self {
        SignalSet(
            Self::single(Signal::SIGSTOP).0
                | Self::single(Signal::SIGTSTP).0
                | Self::single(Signal::SIGTTIN).0
                | Self::single(Signal::SIGTTOU).0,
        )
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, signal: Signal) -> bool {
        self.0 & (1u64 << signal.index()) != 0
    }

    #[inline]
    pub fn insert(&mut self, signal: Signal) {
        self.0 |= 1u64 << signal.index();
    }

    #[inline]
    pub fn remove(&mut self, signal: Signal) {
        self.0 &= !(1u64 << signal.index());
    }

    #[inline]
    pub const fn union(self, other: SignalSet) -> SignalSet {
        SignalSet(self.0 | other.0)
    }

    #[inline]
    pub const fn intersection(self, other: SignalSet) -> SignalSet {
        SignalSet(self.0 & other.0)
    }

    /// Members of `self` that are not in `other`
    #[inline]
    pub const fn difference(self, other: SignalSet) -> SignalSet {
        SignalSet(self.0 & !other.0)
    }

    #[inline]
    pub const fn complement(self) -> SignalSet {
        SignalSet(!self.0 & Self::FULL.0)
    }

    /// True if some member of `self` is outside `excluded`
    #[inline]
    pub const fn any_outside(self, excluded: SignalSet) -> bool {
        self.0 & !excluded.0 != 0
    }

    /// Lowest-numbered member that is not in `mask`
    ///
    /// Lower numbers win, which gives legacy signals priority over
    /// real-time ones and orders real-time signals numerically.
    #[inline]
    pub fn lowest_member_excluding(self, mask: SignalSet) -> Option<Signal> {
        let candidates = self.0 & !mask.0;
        if candidates == 0 {
            return None;
        }
        let number = candidates.trailing_zeros() + 1;
        Signal::from_number(number).ok()
    }

    /// Number of members
    #[inline]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Members in ascending order
    pub fn iter(self) -> impl Iterator<Item = Signal> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let index = bits.trailing_zeros();
            bits &= bits - 1;
            Signal::from_number(index + 1).ok()
        })
    }
}

impl FromIterator<Signal> for SignalSet {
    fn from_iter<I: IntoIterator<Item = Signal>>(iter: I) -> Self {
        let mut set = SignalSet::empty();
        for signal in iter {
            set.insert(signal);
        }
        set
    }
}

impl From<Signal> for SignalSet {
    fn from(signal: Signal) -> Self {
        SignalSet::single(signal)
    }
}

impl BitOr for SignalSet {
    type Output = SignalSet;

    fn bitor(self, rhs: SignalSet) -> SignalSet {
        self.union(rhs)
    }
}

impl BitAnd for SignalSet {
    type Output = SignalSet;

    fn bitand(self, rhs: SignalSet) -> SignalSet {
        self.intersection(rhs)
    }
}

impl Sub for SignalSet {
    type Output = SignalSet;

    fn sub(self, rhs: SignalSet) -> SignalSet {
        self.difference(rhs)
    }
}

impl Not for SignalSet {
    type Output = SignalSet;

    fn not(self) -> SignalSet {
        self.complement()
    }
}

impl fmt::Debug for SignalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|s| s.number())).finish()
    }
}
