/*!
 * Init Shim Library
 * Lifecycle state machine for a container's init process
 */

pub mod core;
pub mod monitoring;
pub mod process;
pub mod signals;

// Re-exports
pub use crate::core::{
    ConfigError, ControllerError, ControllerResult, LifecycleError, LifecycleResult, ShimConfig,
};
pub use monitoring::{init_tracing, Event, EventSink, MemorySink, Payload, Severity, TracingSink};
pub use process::{
    CheckpointConfig, ExecHandle, ExecOptions, ExitStatus, InitProcess, InitState,
    LocalController, Operation, ProcessController, ProcessSnapshot, ResourceSpec,
};
pub use signals::Signal;
