//! Explicit construction of the security services.
//!
//! Built once at process start and handed to the authentication flows.

use std::sync::Arc;

use tracing::info;

use authguard_core::config::SecurityConfig;
use authguard_core::result::AppResult;
use authguard_core::traits::Clock;
use authguard_core::types::LockoutScope;

use crate::lockout::LockoutTracker;
use crate::revocation::TokenRevocationCache;

/// The login lockout, password-reset lockout, and token denylist sharing one clock.
#[derive(Debug, Clone)]
pub struct SecurityServices {
    /// Consulted by credential verification.
    pub login_lockout: Arc<LockoutTracker>,
    /// Consulted by the password reset flow.
    pub password_reset_lockout: Arc<LockoutTracker>,
    /// Consulted by token validation; fed by logout and refresh.
    pub revoked_tokens: Arc<TokenRevocationCache>,
}

impl SecurityServices {
    /// Builds all services from configuration. Sweepers are not started yet.
    pub fn new(config: &SecurityConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            login_lockout: Arc::new(LockoutTracker::new(
                LockoutScope::Login,
                config.lockout.clone(),
                Arc::clone(&clock),
            )),
            password_reset_lockout: Arc::new(LockoutTracker::new(
                LockoutScope::PasswordReset,
                config.password_reset.clone(),
                Arc::clone(&clock),
            )),
            revoked_tokens: Arc::new(TokenRevocationCache::new(
                config.revocation.clone(),
                clock,
            )),
        }
    }

    /// Starts every background sweeper, restarting any running schedule.
    ///
    /// Does nothing once [`shutdown`](Self::shutdown) has been called.
    pub fn start(&self) -> AppResult<()> {
        self.login_lockout.start_sweeper()?;
        self.password_reset_lockout.start_sweeper()?;
        self.revoked_tokens.start_sweeper()?;
        info!("Security sweepers started");
        Ok(())
    }

    /// Stops every background sweeper for good. Idempotent.
    pub fn shutdown(&self) {
        self.login_lockout.dispose();
        self.password_reset_lockout.dispose();
        self.revoked_tokens.dispose();
        info!("Security sweepers stopped");
    }
}
