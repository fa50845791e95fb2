//! In-memory denylist of revoked token ids.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use authguard_core::config::RevocationConfig;
use authguard_core::error::AppError;
use authguard_core::result::AppResult;
use authguard_core::traits::Clock;
use authguard_worker::PeriodicSweeper;

/// Shared state reachable from both request paths and the sweeper task.
struct DenylistState {
    config: RevocationConfig,
    clock: Arc<dyn Clock>,
    /// Token id to natural expiry.
    revoked: DashMap<String, DateTime<Utc>>,
}

impl DenylistState {
    fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.revoked.len();

        self.revoked.retain(|_, natural_expiry| *natural_expiry > now);

        let removed = before.saturating_sub(self.revoked.len());
        if removed > 0 {
            debug!(
                removed,
                remaining = self.revoked.len(),
                "Swept naturally expired revocations"
            );
        }
        removed
    }
}

/// Holds revoked token ids until the tokens would have expired anyway.
///
/// Signature and expiry validation happen elsewhere; this cache only
/// answers whether an otherwise valid token was revoked early.
pub struct TokenRevocationCache {
    /// Shared map and settings.
    state: Arc<DenylistState>,
    /// Background expired-entry cleanup.
    sweeper: PeriodicSweeper,
}

impl std::fmt::Debug for TokenRevocationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRevocationCache")
            .field("config", &self.state.config)
            .field("revoked", &self.state.revoked.len())
            .finish()
    }
}

impl TokenRevocationCache {
    /// Creates an empty cache. Call [`start_sweeper`](Self::start_sweeper) to enable cleanup.
    pub fn new(config: RevocationConfig, clock: Arc<dyn Clock>) -> Self {
        let sweeper = PeriodicSweeper::new("revocation", Arc::clone(&clock));
        Self {
            state: Arc::new(DenylistState {
                config,
                clock,
                revoked: DashMap::new(),
            }),
            sweeper,
        }
    }

    /// Starts the periodic expired-entry sweep on the configured interval.
    pub fn start_sweeper(&self) -> AppResult<()> {
        let state = Arc::downgrade(&self.state);
        self.sweeper.start(
            move || {
                if let Some(state) = state.upgrade() {
                    state.sweep();
                }
            },
            self.state.config.cleanup_interval(),
        )
    }

    /// Stops the sweeper. The cache stays queryable.
    pub fn dispose(&self) {
        self.sweeper.dispose();
    }

    /// Revokes `token_id` until its natural expiry. Re-denying only updates the expiry.
    pub fn deny(&self, token_id: &str, natural_expiry: DateTime<Utc>) {
        let previous = self
            .state
            .revoked
            .insert(token_id.to_string(), natural_expiry);

        if previous.is_none() {
            info!(token_id = %token_id, natural_expiry = %natural_expiry, "Token revoked");
        }
    }

    /// Revokes a JWT by its `jti` and `exp` claims.
    ///
    /// An `exp` outside the representable range is held for the configured
    /// fallback TTL instead.
    pub fn deny_jwt(&self, jti: Uuid, exp: i64) {
        let natural_expiry = match DateTime::from_timestamp(exp, 0) {
            Some(expiry) => expiry,
            None => {
                warn!(jti = %jti, exp, "Unrepresentable token expiry, using fallback TTL");
                self.state
                    .clock
                    .now()
                    .checked_add_signed(self.state.config.fallback_ttl())
                    .unwrap_or(DateTime::<Utc>::MAX_UTC)
            }
        };
        self.deny(&jti.to_string(), natural_expiry);
    }

    /// Whether `token_id` is on the denylist.
    pub fn is_denied(&self, token_id: &str) -> bool {
        self.state.revoked.contains_key(token_id)
    }

    /// Rejects a revoked token with an authentication error.
    pub fn ensure_not_denied(&self, token_id: &str) -> AppResult<()> {
        if self.is_denied(token_id) {
            return Err(AppError::authentication("Token has been revoked"));
        }
        Ok(())
    }

    /// Number of revoked ids currently held.
    pub fn len(&self) -> usize {
        self.state.revoked.len()
    }

    /// Whether no ids are held.
    pub fn is_empty(&self) -> bool {
        self.state.revoked.is_empty()
    }

    /// Runs one cleanup pass now. Returns the number of ids removed.
    pub fn sweep(&self) -> usize {
        self.state.sweep()
    }
}
