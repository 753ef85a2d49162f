/*!
 * Thread Signal State
 */

mod state;

pub(crate) use state::NotifierHook;
pub use state::{RunState, ThreadSnapshot, ThreadState};
