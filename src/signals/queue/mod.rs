/*!
 * Signal Queues
 * Pending signal queues and the entry allocation quota behind them
 */

mod pending;
mod quota;

// Re-export public API
pub use pending::{PendingQueue, QueueFull, QueuedSignal};
pub use quota::{QuotaCharge, SigQueueQuota};
