/*!
 * Tracing
 * Subscriber setup and timed operation spans
 *
 * `log` records emitted by the signal subsystem are bridged into the
 * same subscriber, so one filter controls both.
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Environment variable switching output to JSON
pub const ENV_TRACE_JSON: &str = "SIGNAL_TRACE_JSON";

static NEXT_TRACE_ID: AtomicU64 = AtomicU64::new(1);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - SIGNAL_TRACE_JSON: Enable JSON output (default: false)
///
/// Calling it again after a subscriber is installed is a no-op.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        debug!(json = use_json, "Tracing initialized");
    }
}

/// Timed span around a named operation
pub struct OperationSpan {
    span: tracing::Span,
    start: Instant,
    trace_id: u64,
}

impl OperationSpan {
    pub fn new(operation: &str) -> Self {
        let trace_id = NEXT_TRACE_ID.fetch_add(1, Ordering::Relaxed);
        let span = span!(
            Level::INFO,
            "operation",
            trace_id,
            operation = operation,
            duration_us = tracing::field::Empty,
            result = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
            trace_id,
        }
    }

    pub fn trace_id(&self) -> u64 {
        self.trace_id
    }

    /// Record the operation result
    pub fn record_result(&self, success: bool) {
        self.span
            .record("result", if success { "success" } else { "error" });
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for OperationSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.span.record("duration_us", duration.as_micros() as u64);
        let _entered = self.span.enter();
        if duration.as_millis() > 100 {
            warn!(trace_id = self.trace_id, duration_ms = duration.as_millis() as u64, "slow operation");
        }
    }
}

/// Create a span for an operation
pub fn span_operation(operation: &str) -> OperationSpan {
    OperationSpan::new(operation)
}
