/*!
 * Signal Kernel Library
 * POSIX-style signal generation, queuing and delivery for thread groups
 */

pub mod core;
pub mod monitoring;
pub mod signals;

// Re-exports
pub use crate::core::{Credentials, ProcessIdentity, SignalConfig, Tgid, Tid};
pub use monitoring::init_tracing;
pub use signals::{
    Disposition, DeliveryDecision, HandlerRegistry, MaskHow, PendingTarget, PidSelector, Sender,
    Signal, SignalApi, SignalError, SignalInfo, SignalManager, SignalManagerBuilder, SignalResult,
    SignalSet,
};
