/*!
 * Core Module
 * Fundamental identifiers, limits and configuration
 */

pub mod config;
pub mod limits;
pub mod shard_manager;
pub mod types;

// Re-export for convenience
pub use config::SignalConfig;
pub use shard_manager::{ShardManager, WorkloadProfile};
pub use types::*;
