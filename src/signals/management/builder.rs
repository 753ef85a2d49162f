/*!
 * Signal Manager Builder
 * Builder pattern for SignalManager construction
 */

use super::manager::SignalManager;
use crate::core::config::SignalConfig;
use crate::signals::core::traits::{CoreDumper, ParentNotifier, PermissionChecker, PgrpQuery, Tracer};
use crate::signals::group::SignalContext;
use log::info;
use std::sync::Arc;

/// Builder for SignalManager
#[derive(Default)]
pub struct SignalManagerBuilder {
    config: Option<SignalConfig>,
    notifier: Option<Arc<dyn ParentNotifier>>,
    tracer: Option<Arc<dyn Tracer>>,
    dumper: Option<Arc<dyn CoreDumper>>,
    permissions: Option<Arc<dyn PermissionChecker>>,
    pgrp: Option<Arc<dyn PgrpQuery>>,
}

impl SignalManagerBuilder {
    /// Create a new SignalManager builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` instead of the defaults
    pub fn with_config(mut self, config: SignalConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Receiver of stop, continue and exit reports
    pub fn with_notifier(mut self, notifier: Arc<dyn ParentNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Debugger hook consulted before delivery
    pub fn with_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Writer for coredump-class deaths
    pub fn with_core_dumper(mut self, dumper: Arc<dyn CoreDumper>) -> Self {
        self.dumper = Some(dumper);
        self
    }

    /// Replace the credential-based permission policy
    pub fn with_permission_checker(mut self, permissions: Arc<dyn PermissionChecker>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Orphaned process group oracle for job-control stops
    pub fn with_pgrp_query(mut self, pgrp: Arc<dyn PgrpQuery>) -> Self {
        self.pgrp = Some(pgrp);
        self
    }

    /// Build the SignalManager
    pub fn build(self) -> SignalManager {
        let mut ctx = SignalContext::new(self.config.unwrap_or_default());

        let mut features = Vec::new();
        if let Some(notifier) = self.notifier {
            ctx.notifier = notifier;
            features.push("parent-notify");
        }
        if let Some(tracer) = self.tracer {
            ctx.tracer = tracer;
            features.push("tracer");
        }
        if let Some(dumper) = self.dumper {
            ctx.dumper = dumper;
            features.push("coredump");
        }
        if let Some(permissions) = self.permissions {
            ctx.permissions = permissions;
            features.push("custom-permissions");
        }
        if let Some(pgrp) = self.pgrp {
            ctx.pgrp = pgrp;
            features.push("pgrp-query");
        }

        if features.is_empty() {
            info!("Signal manager built with stand-alone collaborators");
        } else {
            info!("Signal manager built with: {}", features.join(", "));
        }
        SignalManager::from_context(ctx)
    }
}
