/*!
 * Signal Subsystem Configuration
 *
 * Runtime configuration for queue sizing and stop/continue reporting
 */

use super::limits::DEFAULT_SIGQUEUE_QUOTA;
use log::warn;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the per-sender queue quota
pub const ENV_QUEUE_QUOTA: &str = "SIGNAL_QUEUE_QUOTA";

/// Environment variable toggling stop/continue reports to the parent
pub const ENV_STOP_REPORT: &str = "SIGNAL_STOP_REPORT";

/// Signal subsystem configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Maximum queued detail entries charged to one sending uid
    pub queue_quota: usize,
    /// Forward group stop / continue events to the parent notifier
    pub stop_report: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            queue_quota: DEFAULT_SIGQUEUE_QUOTA,
            stop_report: true,
        }
    }
}

impl SignalConfig {
    /// Configuration without a practical queue limit
    pub const fn unlimited() -> Self {
        Self {
            queue_quota: usize::MAX,
            stop_report: true,
        }
    }

    /// Configuration with a tight queue quota (exercises overflow paths)
    pub const fn strict(queue_quota: usize) -> Self {
        Self {
            queue_quota,
            stop_report: true,
        }
    }

    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(ENV_QUEUE_QUOTA) {
            match raw.trim().parse::<usize>() {
                Ok(quota) => config.queue_quota = quota,
                Err(e) => warn!("Ignoring {}={:?}: {}", ENV_QUEUE_QUOTA, raw, e),
            }
        }

        if let Ok(raw) = std::env::var(ENV_STOP_REPORT) {
            match raw.trim() {
                "1" | "true" => config.stop_report = true,
                "0" | "false" => config.stop_report = false,
                other => warn!("Ignoring {}={:?}: expected true/false", ENV_STOP_REPORT, other),
            }
        }

        config
    }

    /// Override the queue quota
    pub fn with_queue_quota(mut self, queue_quota: usize) -> Self {
        self.queue_quota = queue_quota;
        self
    }
}
