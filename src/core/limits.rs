/*!
 * Shim Limits and Constants
 *
 * Centralized location for defaults and thresholds used by the lifecycle core
 * and the `shim` binary.
 */

use std::time::Duration;

// =============================================================================
// EXIT STATUS
// =============================================================================

/// Base added to a signal number to form the exit code of a signalled process
/// [LINUX-COMPAT] Shell convention, SIGKILL exits report 137
pub const SIGNAL_EXIT_BASE: i32 = 128;

/// Exit code reported when the waiter could not observe the real status
pub const UNKNOWN_EXIT_CODE: i32 = 255;

// =============================================================================
// TIMING
// =============================================================================

/// Grace period between SIGTERM and SIGKILL when the shim shuts down
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(10);

/// Operations slower than this are logged at warn level
pub const SLOW_OPERATION_THRESHOLD: Duration = Duration::from_millis(100);

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Process identity override
pub const ENV_SHIM_ID: &str = "SHIM_ID";

/// Kill grace period override, in milliseconds
pub const ENV_KILL_GRACE_MS: &str = "SHIM_KILL_GRACE_MS";

/// Enables JSON log output when set to `1` or `true`
pub const ENV_TRACE_JSON: &str = "SHIM_TRACE_JSON";
