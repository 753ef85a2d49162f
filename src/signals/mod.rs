/*!
 * Signals Module
 * POSIX-style signal delivery for thread groups
 */

pub mod action;
pub mod core;
mod delivery;
pub mod group;
pub mod handler;
pub mod management;
pub mod queue;
pub mod thread;
pub mod traits;

// Re-export public API
pub use self::action::{
    classify_default, ActionFlags, DefaultAction, Disposition, DispositionTable, HandlerToken,
    SigHandler,
};
pub use self::core::{
    AtomicSignalStats, ChildEvent, CoreDumpError, CoreDumper, CredentialPolicy, DeliveryDecision,
    MaskHow, NeverOrphaned, NoCoreDump, NoParent, NoTracer, ParentNotifier, PendingTarget,
    PermissionChecker, PgrpQuery, PidSelector, SigCode, SigPayload, Sender, Signal, SignalError,
    SignalInfo, SignalNotifier, SignalResult, SignalSet, SignalStats, Tracer, TracerVerdict,
};
pub use group::{GroupSnapshot, ThreadGroup};
pub use handler::{HandlerFn, HandlerRegistry};
pub use management::{SignalManager, SignalManagerBuilder};
pub use queue::{PendingQueue, SigQueueQuota};
pub use thread::{RunState, ThreadSnapshot};
pub use traits::*;
