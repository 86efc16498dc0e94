/*!
 * Process Module
 * Init process lifecycle, controller boundary, and a local controller
 */

pub mod init;
pub mod local;
pub mod state;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use init::InitProcess;
pub use local::LocalController;
pub use state::{Dispatch, ExitAction, InitState};
pub use traits::ProcessController;
pub use types::{
    CheckpointConfig, ExecHandle, ExecOptions, ExitStatus, Operation, ProcessSnapshot,
    ResourceSpec,
};
