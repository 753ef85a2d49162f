/*!
 * Signal Delivery
 * Consume-side decisions and synchronous waits
 */

mod engine;
mod wait;

pub(crate) use engine::get_signal;
pub(crate) use wait::wait_for_signal;
