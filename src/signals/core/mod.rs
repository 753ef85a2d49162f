/*!
 * Signal Core - Types and Traits
 * Fundamental types, signal sets and collaborator traits for signal handling
 */

pub mod atomic_stats;
pub mod sigset;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use atomic_stats::AtomicSignalStats;
pub use sigset::SignalSet;
pub use traits::*;
pub use types::*;
