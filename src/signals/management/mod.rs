/*!
 * Signal Management
 * Central signal manager and its builder
 */

mod builder;
mod manager;

// Re-export public API
pub use builder::SignalManagerBuilder;
pub use manager::SignalManager;
