/*!
 * Monitoring
 * Structured tracing setup for the signal subsystem
 */

mod tracer;

pub use tracer::{init_tracing, span_operation, OperationSpan, ENV_TRACE_JSON};
