/*!
 * Event System
 * Strongly-typed lifecycle events and the sinks that receive them
 */

use crate::core::types::{ExitCode, Timestamp};
use crate::process::state::InitState;
use crate::process::types::Operation;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Event severity for filtering and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Severity {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

/// Lifecycle event emitted by an init process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic timestamp (nanoseconds since the first event)
    pub timestamp_ns: Timestamp,
    /// Event severity
    pub severity: Severity,
    /// Identity of the process the event belongs to
    pub id: String,
    /// Event payload
    pub payload: Payload,
}

/// Event payload - strongly typed variants for each event type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// A successor state was installed
    StateChanged {
        operation: Operation,
        from: InitState,
        to: InitState,
    },
    /// An exit notification was accepted
    ExitRecorded { status: ExitCode, previous: InitState },
    /// An operation was refused in the current state
    OperationRejected {
        operation: Operation,
        state: InitState,
    },
    /// The controller failed a side effect; state is unchanged
    ControllerFailed { operation: Operation, error: String },
    /// Resuming a paused process after its exit failed
    CompensatingResumeFailed { error: String },
    /// The process exited while a side effect was in flight and the
    /// operation's successor no longer applies
    TransitionSuperseded {
        operation: Operation,
        target: InitState,
        current: InitState,
    },
}

impl Payload {
    /// Short machine-readable event name
    pub const fn kind(&self) -> &'static str {
        match self {
            Payload::StateChanged { .. } => "state_changed",
            Payload::ExitRecorded { .. } => "exit_recorded",
            Payload::OperationRejected { .. } => "operation_rejected",
            Payload::ControllerFailed { .. } => "controller_failed",
            Payload::CompensatingResumeFailed { .. } => "compensating_resume_failed",
            Payload::TransitionSuperseded { .. } => "transition_superseded",
        }
    }
}

impl Event {
    /// Create a new event with current timestamp
    #[inline]
    pub fn new(severity: Severity, id: impl Into<String>, payload: Payload) -> Self {
        Self {
            timestamp_ns: Self::now_ns(),
            severity,
            id: id.into(),
            payload,
        }
    }

    /// Get current time in nanoseconds (monotonic)
    #[inline]
    fn now_ns() -> Timestamp {
        static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
        let start = START.get_or_init(Instant::now);
        start.elapsed().as_nanos() as Timestamp
    }
}

/// Destination for lifecycle events
///
/// Injected into each init process so the core can be observed without
/// process-wide logging setup.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Forwards events to `tracing` at the event's severity
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: Event) {
        let kind = event.payload.kind();
        match event.severity {
            Severity::Trace => {
                tracing::trace!(id = %event.id, event = kind, payload = ?event.payload, "lifecycle event")
            }
            Severity::Debug => {
                tracing::debug!(id = %event.id, event = kind, payload = ?event.payload, "lifecycle event")
            }
            Severity::Info => {
                tracing::info!(id = %event.id, event = kind, payload = ?event.payload, "lifecycle event")
            }
            Severity::Warn => {
                tracing::warn!(id = %event.id, event = kind, payload = ?event.payload, "lifecycle event")
            }
            Severity::Error => {
                tracing::error!(id = %event.id, event = kind, payload = ?event.payload, "lifecycle event")
            }
        }
    }
}

/// Keeps every event in memory, in emission order
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Drain recorded events
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of recorded events matching a predicate
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Event) -> bool,
    {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) {
        self.events.lock().push(event);
    }
}
