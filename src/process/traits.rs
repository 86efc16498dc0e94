/*!
 * Process Traits
 * Side-effect boundary between the lifecycle core and the runtime
 */

use super::types::{CheckpointConfig, ExecHandle, ExecOptions, ResourceSpec};
use crate::core::errors::ControllerResult;
use crate::signals::Signal;

/// Performs the OS-level work behind lifecycle operations
///
/// Implementations enforce their own timeouts. Errors are returned to the
/// caller of the lifecycle operation unchanged.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessController: Send + Sync {
    /// Start the created process
    fn start(&self, id: &str) -> ControllerResult<()>;

    /// Deliver a signal to the process, or to every process in the container
    fn kill(&self, id: &str, signal: Signal, all: bool) -> ControllerResult<()>;

    /// Release the runtime's resources for the process
    fn delete(&self, id: &str) -> ControllerResult<()>;

    /// Apply new resource limits
    fn update(&self, id: &str, resources: &ResourceSpec) -> ControllerResult<()>;

    /// Start an exec session alongside the init process
    fn exec(&self, id: &str, exec_id: &str, options: &ExecOptions) -> ControllerResult<ExecHandle>;

    /// Unfreeze a paused process
    fn resume(&self, id: &str) -> ControllerResult<()>;

    /// Write a checkpoint image of the process
    fn checkpoint(&self, id: &str, config: &CheckpointConfig) -> ControllerResult<()>;
}
