/*!
 * Shim Configuration
 *
 * Runtime configuration read from the environment
 */

use super::errors::ConfigError;
use super::limits::{DEFAULT_KILL_GRACE, ENV_KILL_GRACE_MS, ENV_SHIM_ID, ENV_TRACE_JSON};
use std::time::Duration;
use uuid::Uuid;

/// Configuration for a single shim instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimConfig {
    /// Identity of the init process
    pub id: String,
    /// Time allowed between SIGTERM and SIGKILL on shutdown
    pub kill_grace: Duration,
    /// Emit JSON formatted logs
    pub trace_json: bool,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kill_grace: DEFAULT_KILL_GRACE,
            trace_json: false,
        }
    }
}

impl ShimConfig {
    /// Load configuration from the process environment
    ///
    /// Environment variables:
    /// - SHIM_ID: process identity (default: random uuid)
    /// - SHIM_KILL_GRACE_MS: shutdown grace period (default: 10000)
    /// - SHIM_TRACE_JSON: JSON log output (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(id) = lookup(ENV_SHIM_ID) {
            let id = id.trim();
            if id.is_empty() {
                return Err(ConfigError::Empty { key: ENV_SHIM_ID });
            }
            config.id = id.to_string();
        }

        if let Some(raw) = lookup(ENV_KILL_GRACE_MS) {
            let millis = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::Invalid {
                    key: ENV_KILL_GRACE_MS,
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
            config.kill_grace = Duration::from_millis(millis);
        }

        config.trace_json = lookup(ENV_TRACE_JSON)
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false);

        Ok(config)
    }
}
