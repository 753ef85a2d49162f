/*!
 * Signal Actions
 * Disposition table and default-action classification
 */

mod table;

// Re-export public API
pub use table::{
    classify_default, ActionFlags, DefaultAction, Disposition, DispositionTable, HandlerToken,
    SigHandler,
};
