/*!
 * Process Types
 * Operation names and the payloads passed to process controllers
 */

use super::state::InitState;
use crate::core::types::{ExitCode, Pid};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use time::OffsetDateTime;

/// Lifecycle operations accepted by an init process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Start,
    Pause,
    Resume,
    Update,
    Checkpoint,
    Delete,
    Kill,
    Exec,
    SetExited,
    Status,
}

impl Operation {
    /// Every operation, in declaration order
    pub const ALL: [Operation; 10] = [
        Operation::Start,
        Operation::Pause,
        Operation::Resume,
        Operation::Update,
        Operation::Checkpoint,
        Operation::Delete,
        Operation::Kill,
        Operation::Exec,
        Operation::SetExited,
        Operation::Status,
    ];

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Operation::Start => "start",
            Operation::Pause => "pause",
            Operation::Resume => "resume",
            Operation::Update => "update",
            Operation::Checkpoint => "checkpoint",
            Operation::Delete => "delete",
            Operation::Kill => "kill",
            Operation::Exec => "exec",
            Operation::SetExited => "set_exited",
            Operation::Status => "status",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for an exec session inside the container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOptions {
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub terminal: bool,
}

impl ExecOptions {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    #[inline]
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// Handle to a started exec session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecHandle {
    pub exec_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<Pid>,
}

/// Resource limits applied through Update
///
/// Unset fields leave the current limit untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_shares: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_quota: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_period: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pids_limit: Option<i64>,
}

impl ResourceSpec {
    /// True when no limit would change
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Checkpoint configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Scratch directory for the checkpoint tool
    pub work_dir: PathBuf,
    /// Destination of the checkpoint image
    pub image_path: PathBuf,
    /// Stop the process once the checkpoint is written
    #[serde(default)]
    pub exit_after_checkpoint: bool,
    #[serde(default)]
    pub allow_open_tcp: bool,
    #[serde(default)]
    pub allow_external_unix_sockets: bool,
    #[serde(default)]
    pub allow_terminal_devices: bool,
    #[serde(default)]
    pub file_locks: bool,
    /// Namespaces to recreate empty on restore
    #[serde(default)]
    pub empty_namespaces: Vec<String>,
}

/// Recorded exit of the init process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStatus {
    pub code: ExitCode,
    #[serde(with = "time::serde::rfc3339")]
    pub exited_at: OffsetDateTime,
}

impl ExitStatus {
    pub fn now(code: ExitCode) -> Self {
        Self {
            code,
            exited_at: OffsetDateTime::now_utc(),
        }
    }

    #[inline]
    pub const fn success(&self) -> bool {
        self.code == 0
    }
}

/// Point-in-time view of an init process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub id: String,
    pub state: InitState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<ExitStatus>,
}
