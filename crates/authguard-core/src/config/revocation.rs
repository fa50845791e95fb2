//! Token revocation cache configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::lockout::seconds;

/// Revoked-token denylist configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationConfig {
    /// Interval between expired-entry sweeps in seconds.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
    /// Retention used when a token carries an unusable expiry claim.
    #[serde(default = "default_fallback_ttl")]
    pub fallback_ttl_seconds: u64,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_seconds: default_cleanup_interval(),
            fallback_ttl_seconds: default_fallback_ttl(),
        }
    }
}

impl RevocationConfig {
    /// Sweep interval.
    pub fn cleanup_interval(&self) -> Duration {
        seconds(self.cleanup_interval_seconds)
    }

    /// Retention for tokens without a usable expiry.
    pub fn fallback_ttl(&self) -> Duration {
        seconds(self.fallback_ttl_seconds)
    }
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_fallback_ttl() -> u64 {
    900
}
