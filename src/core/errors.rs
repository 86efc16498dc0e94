/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use crate::process::state::InitState;
use crate::process::types::Operation;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle operation result
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Process controller result
pub type ControllerResult<T> = Result<T, ControllerError>;

/// Errors returned to callers of the init process
///
/// Internal consistency violations are not represented here: an attempt to
/// install a successor the transition table does not allow panics instead.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum LifecycleError {
    #[error("cannot {operation} process in {state} state")]
    #[diagnostic(
        code(lifecycle::illegal_operation),
        help("The operation is not valid for the current process state. Check status() first.")
    )]
    IllegalOperation {
        operation: Operation,
        state: InitState,
    },

    #[error("{operation} not implemented yet for {state} processes")]
    #[diagnostic(
        code(lifecycle::not_implemented),
        help("This operation is reserved but not yet supported by the shim.")
    )]
    NotImplemented {
        operation: Operation,
        state: InitState,
    },

    #[error(transparent)]
    #[diagnostic(code(lifecycle::controller))]
    Controller(#[from] ControllerError),
}

impl LifecycleError {
    /// True for errors caused by calling an operation in the wrong state
    #[inline]
    pub fn is_illegal_operation(&self) -> bool {
        matches!(self, LifecycleError::IllegalOperation { .. })
    }

    /// True for reserved operations that are not supported yet
    #[inline]
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, LifecycleError::NotImplemented { .. })
    }

    /// The controller error, if this error came from a side effect
    #[inline]
    pub fn controller_error(&self) -> Option<&ControllerError> {
        match self {
            LifecycleError::Controller(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors raised by process controllers
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ControllerError {
    #[error("process {0} not found")]
    #[diagnostic(code(controller::not_found))]
    NotFound(String),

    #[error("failed to spawn process: {0}")]
    #[diagnostic(
        code(controller::spawn_failed),
        help("Check that the command exists and is executable.")
    )]
    SpawnFailed(String),

    #[error("failed to deliver {signal} to process {id}: {reason}")]
    #[diagnostic(code(controller::signal_failed))]
    SignalFailed {
        id: String,
        signal: String,
        reason: String,
    },

    #[error("process {0} is still running")]
    #[diagnostic(
        code(controller::still_running),
        help("Kill the process and wait for its exit before deleting it.")
    )]
    StillRunning(String),

    #[error("unsupported: {0}")]
    #[diagnostic(code(controller::unsupported))]
    Unsupported(String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(controller::io))]
    Io(String),

    #[error("{0}")]
    #[diagnostic(code(controller::failed))]
    Failed(String),
}

impl From<std::io::Error> for ControllerError {
    fn from(err: std::io::Error) -> Self {
        ControllerError::Io(err.to_string())
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    #[diagnostic(code(config::invalid))]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{key} must not be empty")]
    #[diagnostic(code(config::empty))]
    Empty { key: &'static str },
}
