//! Shared test helpers for integration tests.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use authguard_auth::SecurityServices;
use authguard_core::config::SecurityConfig;
use authguard_core::error::AppError;
use authguard_core::traits::{Clock, ManualClock};

/// Access token handed out by the simulated login flow
#[derive(Debug, Clone, Copy)]
pub struct IssuedToken {
    /// JWT ID
    pub jti: Uuid,
    /// Natural expiry, seconds since epoch
    pub exp: i64,
}

/// Test application context wiring the services into minimal auth flows
pub struct TestApp {
    /// Manually driven clock shared by every service
    pub clock: Arc<ManualClock>,
    /// The services under test
    pub services: SecurityServices,
    /// Known users: email to password
    users: HashMap<String, String>,
    /// Access token lifetime
    token_ttl: Duration,
}

impl TestApp {
    /// Create a new test application with running sweepers
    pub fn new() -> Self {
        let config = SecurityConfig::from_toml(
            r#"
            [lockout]
            max_failed_attempts = 3
            initial_lockout_seconds = 60
            incremental_lockout_seconds = 60
            cleanup_interval_seconds = 30
            failed_attempt_reset_seconds = 300

            [password_reset]
            max_failed_attempts = 2
            initial_lockout_seconds = 600

            [revocation]
            cleanup_interval_seconds = 30
            "#,
        )
        .expect("Failed to load test config");

        let clock = Arc::new(ManualClock::default());
        let services = SecurityServices::new(&config, clock.clone());
        services.start().expect("Failed to start sweepers");

        Self {
            clock,
            services,
            users: HashMap::new(),
            token_ttl: Duration::minutes(15),
        }
    }

    /// Register a user
    pub fn create_test_user(&mut self, email: &str, password: &str) {
        self.users
            .insert(email.to_lowercase(), password.to_string());
    }

    /// Credential verification: lockout check, password check, feedback
    pub fn login(&self, email: &str, ip: &str, password: &str) -> Result<IssuedToken, AppError> {
        let lockout = &self.services.login_lockout;
        lockout.ensure_not_locked_out(email, ip)?;

        let matches = self
            .users
            .get(&email.to_lowercase())
            .is_some_and(|stored| stored == password);

        if !matches {
            lockout.record_failure(email, ip);
            return Err(AppError::authentication("Invalid credentials"));
        }

        lockout.reset_attempts(email, ip);
        Ok(self.issue_token())
    }

    /// Password reset: separate lockout, reset on success
    pub fn reset_password(&self, email: &str, ip: &str, code_valid: bool) -> Result<(), AppError> {
        let lockout = &self.services.password_reset_lockout;
        lockout.ensure_not_locked_out(email, ip)?;

        if !code_valid {
            lockout.record_failure(email, ip);
            return Err(AppError::authentication("Invalid reset code"));
        }

        lockout.reset_attempts(email, ip);
        Ok(())
    }

    /// Logout revokes the token until its natural expiry
    pub fn logout(&self, token: IssuedToken) {
        self.services.revoked_tokens.deny_jwt(token.jti, token.exp);
    }

    /// Refresh rotates the token and revokes the old one
    pub fn refresh(&self, token: IssuedToken) -> Result<IssuedToken, AppError> {
        self.authorize(token)?;
        self.services.revoked_tokens.deny_jwt(token.jti, token.exp);
        Ok(self.issue_token())
    }

    /// Token validation middleware: natural expiry first, then the denylist
    pub fn authorize(&self, token: IssuedToken) -> Result<(), AppError> {
        if self.clock.now().timestamp() >= token.exp {
            return Err(AppError::authentication("Token has expired"));
        }
        self.services
            .revoked_tokens
            .ensure_not_denied(&token.jti.to_string())
    }

    /// Poll until `condition` holds, letting the sweeper tasks run
    pub async fn eventually(&self, condition: impl Fn() -> bool) -> bool {
        for _ in 0..200 {
            if condition() {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        condition()
    }

    fn issue_token(&self) -> IssuedToken {
        IssuedToken {
            jti: Uuid::new_v4(),
            exp: (self.clock.now() + self.token_ttl).timestamp(),
        }
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.services.shutdown();
    }
}
