/*!
 * Signal Handler - Callback Execution
 * Maps handler tokens to callbacks run on delivery
 */

mod callbacks;

// Re-export public API
pub use callbacks::{HandlerFn, HandlerRegistry};
