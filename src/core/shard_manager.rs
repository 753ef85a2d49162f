/*!
 * Shard Sizing
 *
 * CPU-proportional shard counts for the concurrent maps behind the signal
 * manager (group table, thread index, per-uid queue quota).
 */

use std::sync::OnceLock;

static CPU_COUNT: OnceLock<usize> = OnceLock::new();

/// Expected access pattern of a concurrent map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadProfile {
    /// Touched on every send (group table, thread index): 4x CPUs
    HighContention,
    /// Touched when entries are queued or released (quota): 2x CPUs
    MediumContention,
    /// Rare lookups: 1x CPUs
    LowContention,
}

/// Shard count calculator
pub struct ShardManager;

impl ShardManager {
    fn cpus() -> usize {
        *CPU_COUNT.get_or_init(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or_else(|e| {
                    log::warn!("Failed to detect CPU count ({}), assuming 8", e);
                    8
                })
        })
    }

    /// Power-of-two shard count in [8, 512] for `profile`
    pub fn shards(profile: WorkloadProfile) -> usize {
        let multiplier = match profile {
            WorkloadProfile::HighContention => 4,
            WorkloadProfile::MediumContention => 2,
            WorkloadProfile::LowContention => 1,
        };
        (Self::cpus() * multiplier).next_power_of_two().clamp(8, 512)
    }

    pub fn cpu_count() -> usize {
        Self::cpus()
    }
}
