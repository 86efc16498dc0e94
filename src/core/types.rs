/*!
 * Core Types
 * Common types used across the shim
 */

/// OS-level process ID
pub type Pid = u32;

/// Exit status code as reported by the runtime (128 + n for signal exits)
pub type ExitCode = i32;

/// Timestamp in nanoseconds since the first lifecycle event
pub type Timestamp = u64;
