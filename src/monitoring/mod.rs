/*!
 * Monitoring
 * Lifecycle events and structured tracing
 */

pub mod events;
mod tracer;

pub use events::{Event, EventSink, MemorySink, Payload, Severity, TracingSink};
pub use tracer::{generate_trace_id, init_tracing, span_operation, OperationSpan};
