//! Failed-attempt lockout configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Progressive lockout policy for one family of authentication attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutConfig {
    /// Failures before a sub-key is locked out.
    #[serde(default = "default_max_failed")]
    pub max_failed_attempts: u32,
    /// Base lockout window in seconds.
    #[serde(default = "default_initial_lockout")]
    pub initial_lockout_seconds: u64,
    /// Growth applied per multiplier step when failures keep arriving during a lockout.
    #[serde(default = "default_incremental_lockout")]
    pub incremental_lockout_seconds: u64,
    /// Interval between stale-record sweeps in seconds.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
    /// Inactivity after which a record that is not locked out is forgotten.
    #[serde(default = "default_reset_interval")]
    pub failed_attempt_reset_seconds: u64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: default_max_failed(),
            initial_lockout_seconds: default_initial_lockout(),
            incremental_lockout_seconds: default_incremental_lockout(),
            cleanup_interval_seconds: default_cleanup_interval(),
            failed_attempt_reset_seconds: default_reset_interval(),
        }
    }
}

impl LockoutConfig {
    /// Base lockout window.
    pub fn initial_lockout(&self) -> Duration {
        seconds(self.initial_lockout_seconds)
    }

    /// Per-step escalation applied during an active lockout.
    pub fn incremental_lockout(&self) -> Duration {
        seconds(self.incremental_lockout_seconds)
    }

    /// Sweep interval.
    pub fn cleanup_interval(&self) -> Duration {
        seconds(self.cleanup_interval_seconds)
    }

    /// Inactivity window for non-escalated failure records.
    pub fn failed_attempt_reset(&self) -> Duration {
        seconds(self.failed_attempt_reset_seconds)
    }
}

/// Converts a configured second count, clamping values chrono cannot represent.
pub(crate) fn seconds(value: u64) -> Duration {
    i64::try_from(value)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

fn default_max_failed() -> u32 {
    5
}

fn default_initial_lockout() -> u64 {
    300
}

fn default_incremental_lockout() -> u64 {
    300
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_reset_interval() -> u64 {
    900
}
