/*!
 * Signal Context
 * Shared configuration, quota, statistics and collaborators
 */

use crate::core::config::SignalConfig;
use crate::core::types::Tgid;
use crate::signals::core::atomic_stats::AtomicSignalStats;
use crate::signals::core::traits::{
    CoreDumper, CredentialPolicy, NeverOrphaned, NoCoreDump, NoParent, NoTracer, ParentNotifier,
    PermissionChecker, PgrpQuery, Tracer,
};
use crate::signals::core::types::ChildEvent;
use crate::signals::queue::SigQueueQuota;
use log::debug;
use std::sync::Arc;

/// Everything group-level operations need besides the group itself
pub(crate) struct SignalContext {
    pub config: SignalConfig,
    pub quota: Arc<SigQueueQuota>,
    pub stats: AtomicSignalStats,
    pub notifier: Arc<dyn ParentNotifier>,
    pub tracer: Arc<dyn Tracer>,
    pub dumper: Arc<dyn CoreDumper>,
    pub permissions: Arc<dyn PermissionChecker>,
    pub pgrp: Arc<dyn PgrpQuery>,
}

impl SignalContext {
    /// Context with the stand-alone collaborators
    pub fn new(config: SignalConfig) -> Self {
        Self {
            quota: SigQueueQuota::new(config.queue_quota),
            config,
            stats: AtomicSignalStats::new(),
            notifier: Arc::new(NoParent),
            tracer: Arc::new(NoTracer),
            dumper: Arc::new(NoCoreDump),
            permissions: Arc::new(CredentialPolicy),
            pgrp: Arc::new(NeverOrphaned),
        }
    }

    /// Stop/continue reports honour `stop_report`; exit reports always go out
    pub fn report(&self, child: Tgid, event: ChildEvent, status: i32) {
        if matches!(event, ChildEvent::Stopped | ChildEvent::Continued) && !self.config.stop_report
        {
            debug!("Suppressed {:?} report for group {}", event, child);
            return;
        }
        self.notifier.notify_parent(child, event, status);
    }
}
