/*!
 * Thread Groups
 * Shared signal state, routing and job control for a group of threads
 */

mod context;
mod jobctl;
mod routing;
mod state;

pub(crate) use context::SignalContext;
pub(crate) use routing::RouteTarget;

// Re-export public API
pub use state::{GroupSnapshot, GroupState, ThreadGroup};
