/*!
 * Structured Tracing
 * Subscriber setup and per-operation spans using the tracing crate
 *
 * Features:
 * - Trace ID generation for request correlation
 * - JSON-formatted logs for structured parsing
 * - Slow operation detection on span close
 */

use crate::core::limits::SLOW_OPERATION_THRESHOLD;
use crate::process::types::Operation;
use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Initialize structured tracing
///
/// RUST_LOG sets the filter (default: info). `json` switches to JSON output.
pub fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        // JSON output for production/parsing
        let _ = registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init();
        info!("Structured tracing initialized with JSON output");
    } else {
        // Human-readable output for development
        let _ = registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init();
        info!("Structured tracing initialized");
    }
}

/// Generate a unique trace ID for request correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span covering one lifecycle operation on an init process
pub struct OperationSpan {
    span: tracing::Span,
    start: Instant,
    operation: Operation,
    trace_id: String,
}

impl OperationSpan {
    pub fn new(operation: Operation, id: &str) -> Self {
        let trace_id = generate_trace_id();

        let span = span!(
            Level::DEBUG,
            "lifecycle",
            trace_id = %trace_id,
            operation = %operation,
            id = id,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        let _entered = span.enter();
        debug!(operation = %operation, id = id, "operation started");
        drop(_entered);

        Self {
            span,
            start: Instant::now(),
            operation,
            trace_id,
        }
    }

    /// Get the trace ID for this operation
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Record the operation result
    pub fn record_result(&self, success: bool) {
        self.span
            .record("result", if success { "success" } else { "error" });
    }

    /// Record an error
    pub fn record_error(&self, error: &str) {
        self.span.record("error", error);
        self.span.record("result", "error");
    }
}

impl Drop for OperationSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();

        if duration > SLOW_OPERATION_THRESHOLD {
            warn!(
                trace_id = %self.trace_id,
                operation = %self.operation,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow lifecycle operation"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                operation = %self.operation,
                duration_us = duration.as_micros() as u64,
                "operation completed"
            );
        }
    }
}

/// Helper to create an operation span
#[inline]
pub fn span_operation(operation: Operation, id: &str) -> OperationSpan {
    OperationSpan::new(operation, id)
}
