/*!
 * Signal Handler Registry
 * Executable handlers behind the opaque tokens stored in dispositions
 */

use crate::core::types::Tid;
use crate::signals::action::HandlerToken;
use crate::signals::core::types::{DeliveryDecision, SignalInfo, SignalResult};
use crate::signals::traits::SignalMasking;
use ahash::RandomState;
use dashmap::DashMap;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Signal handler callback function type
pub type HandlerFn = Arc<dyn Fn(Tid, &SignalInfo) + Send + Sync>;

/// Handler registry for executable callbacks
///
/// # Performance
/// - Cache-line aligned to prevent false sharing of atomic ID counter
#[repr(C, align(64))]
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: Arc<DashMap<u64, HandlerFn, RandomState>>,
    next_id: Arc<AtomicU64>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(DashMap::with_hasher(RandomState::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register a handler; the token goes into a `Disposition`
    pub fn register<F>(&self, handler: F) -> HandlerToken
    where
        F: Fn(Tid, &SignalInfo) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.handlers.insert(id, Arc::new(handler));
        info!("Registered signal handler {}", id);
        HandlerToken(id)
    }

    /// Run the handler named by a `Handler` decision.
    /// Returns false for other decisions or unknown tokens.
    pub fn dispatch(&self, tid: Tid, decision: &DeliveryDecision) -> bool {
        let DeliveryDecision::Handler { info, handler, .. } = decision else {
            return false;
        };
        let Some(callback) = self.handlers.get(&handler.0).map(|h| Arc::clone(h.value())) else {
            warn!("No handler registered for token {}", handler.0);
            return false;
        };

        debug!("Executing handler {} for {} on thread {}", handler.0, info.signal, tid);
        callback(tid, info);
        true
    }

    /// Run the handler, then restore the mask saved at delivery
    pub fn invoke<M: SignalMasking>(
        &self,
        masking: &M,
        tid: Tid,
        decision: &DeliveryDecision,
    ) -> SignalResult<bool> {
        let ran = self.dispatch(tid, decision);
        if let DeliveryDecision::Handler { saved_mask, .. } = decision {
            masking.signal_return(tid, *saved_mask)?;
        }
        Ok(ran)
    }

    /// Unregister a handler
    pub fn unregister(&self, token: HandlerToken) -> bool {
        let removed = self.handlers.remove(&token.0).is_some();
        if removed {
            info!("Unregistered signal handler {}", token.0);
        }
        removed
    }

    /// Check if handler exists
    pub fn exists(&self, token: HandlerToken) -> bool {
        self.handlers.contains_key(&token.0)
    }

    /// Get handler count
    pub fn count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
