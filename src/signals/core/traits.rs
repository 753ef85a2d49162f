/*!
 * Signal Traits
 * Collaborators the signal subsystem consults but does not implement
 */

use super::types::{ChildEvent, Signal, SignalInfo, TracerVerdict};
use crate::core::types::{Pgid, ProcessIdentity, Tgid, Tid};
use log::debug;
use thiserror::Error;

/// Receives stop/continue/exit reports about a thread group.
///
/// Called while the group's signal lock is held so reports arrive in the
/// order the state changes happened. Implementations must not send signals
/// to the same group synchronously.
pub trait ParentNotifier: Send + Sync {
    fn notify_parent(&self, child: Tgid, event: ChildEvent, status: i32);
}

/// Debugger attached to threads
pub trait Tracer: Send + Sync {
    /// Check if thread is traced
    fn is_traced(&self, tid: Tid) -> bool;

    /// Hand a signal to the tracer while the thread is suspended.
    /// Called without any signal lock held; may block.
    fn intercept(&self, tid: Tid, info: &SignalInfo) -> TracerVerdict;
}

/// Core dump failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("core dump failed: {0}")]
pub struct CoreDumpError(pub String);

/// Writes core dumps; called without any signal lock held
pub trait CoreDumper: Send + Sync {
    fn dump(&self, tgid: Tgid, tid: Tid, info: &SignalInfo) -> Result<(), CoreDumpError>;
}

/// Credential rules for user-originated sends
pub trait PermissionChecker: Send + Sync {
    fn may_send(&self, sender: &ProcessIdentity, target: &ProcessIdentity, signal: Signal) -> bool;
}

/// Orphaned process group query used before job-control stops
pub trait PgrpQuery: Send + Sync {
    fn is_orphaned(&self, pgid: Pgid) -> bool;
}

/// Block-all override installed on a thread; signals covered by its mask
/// stay pending unless `allow` returns true
pub trait SignalNotifier: Send + Sync {
    fn allow(&self, signal: Signal) -> bool;
}

/// No parent process to report to
#[derive(Debug, Default, Clone, Copy)]
pub struct NoParent;

impl ParentNotifier for NoParent {
    fn notify_parent(&self, child: Tgid, event: ChildEvent, status: i32) {
        debug!(
            "Dropping {:?} report for group {} (status {}): no parent",
            event, child, status
        );
    }
}

/// No thread is ever traced
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTracer;

impl Tracer for NoTracer {
    fn is_traced(&self, _tid: Tid) -> bool {
        false
    }

    fn intercept(&self, _tid: Tid, info: &SignalInfo) -> TracerVerdict {
        TracerVerdict::Deliver(info.signal)
    }
}

/// Core dumps are not supported; every attempt fails
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCoreDump;

impl CoreDumper for NoCoreDump {
    fn dump(&self, _tgid: Tgid, _tid: Tid, _info: &SignalInfo) -> Result<(), CoreDumpError> {
        Err(CoreDumpError("core dumps disabled".to_string()))
    }
}

/// POSIX kill() permission rule
#[derive(Debug, Default, Clone, Copy)]
pub struct CredentialPolicy;

impl PermissionChecker for CredentialPolicy {
    fn may_send(&self, sender: &ProcessIdentity, target: &ProcessIdentity, signal: Signal) -> bool {
        let s = &sender.creds;
        let t = &target.creds;

        if s.cap_kill {
            return true;
        }

        if s.euid == t.suid || s.euid == t.uid || s.uid == t.suid || s.uid == t.uid {
            return true;
        }

        signal == Signal::SIGCONT && sender.sid == target.sid
    }
}

/// Process groups are never orphaned
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverOrphaned;

impl PgrpQuery for NeverOrphaned {
    fn is_orphaned(&self, _pgid: Pgid) -> bool {
        false
    }
}
