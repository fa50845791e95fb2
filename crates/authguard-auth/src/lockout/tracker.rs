//! Concurrent lockout tracker keyed by principal and origin.

use std::sync::Arc;

use chrono::Duration;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use authguard_core::config::LockoutConfig;
use authguard_core::error::AppError;
use authguard_core::result::AppResult;
use authguard_core::traits::Clock;
use authguard_core::types::{LockoutIdentity, LockoutScope};
use authguard_worker::PeriodicSweeper;

use super::record::{AttemptRecord, FailureOutcome};

/// Shared state reachable from both request paths and the sweeper task.
struct TrackerState {
    scope: LockoutScope,
    config: LockoutConfig,
    clock: Arc<dyn Clock>,
    attempts: DashMap<String, AttemptRecord>,
}

impl TrackerState {
    fn sweep(&self) -> usize {
        let now = self.clock.now();
        let reset_after = self.config.failed_attempt_reset();
        let before = self.attempts.len();

        self.attempts
            .retain(|_, record| !record.is_stale_at(now, reset_after));

        let removed = before.saturating_sub(self.attempts.len());
        if removed > 0 {
            debug!(
                scope = %self.scope,
                removed,
                remaining = self.attempts.len(),
                "Swept stale attempt records"
            );
        }
        removed
    }
}

/// Tracks failed authentication attempts and decides lockouts.
///
/// Each identity is split into a principal sub-key and an origin sub-key.
/// They are updated independently and the identity is locked out while
/// either of them is.
pub struct LockoutTracker {
    /// Shared map and policy.
    state: Arc<TrackerState>,
    /// Background stale-record cleanup.
    sweeper: PeriodicSweeper,
}

impl std::fmt::Debug for LockoutTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockoutTracker")
            .field("scope", &self.state.scope)
            .field("config", &self.state.config)
            .field("tracked", &self.state.attempts.len())
            .finish()
    }
}

impl LockoutTracker {
    /// Creates a tracker. Call [`start_sweeper`](Self::start_sweeper) to enable cleanup.
    pub fn new(scope: LockoutScope, config: LockoutConfig, clock: Arc<dyn Clock>) -> Self {
        let sweeper = PeriodicSweeper::new(format!("lockout:{scope}"), Arc::clone(&clock));
        Self {
            state: Arc::new(TrackerState {
                scope,
                config,
                clock,
                attempts: DashMap::new(),
            }),
            sweeper,
        }
    }

    /// Starts the periodic stale-record sweep on the configured interval.
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

    /// Stops the sweeper. The tracker stays queryable.
    pub fn dispose(&self) {
        self.sweeper.dispose();
    }

    /// The key namespace of this tracker.
    pub fn scope(&self) -> LockoutScope {
        self.state.scope
    }

    /// Whether either sub-key is inside a lockout window.
    pub fn is_locked_out(&self, principal: &str, origin: &str) -> bool {
        let now = self.state.clock.now();
        self.sub_keys(principal, origin).iter().any(|key| {
            self.state
                .attempts
                .get(key)
                .is_some_and(|record| record.is_locked_at(now))
        })
    }

    /// Records one failed attempt against both sub-keys.
    pub fn record_failure(&self, principal: &str, origin: &str) {
        let now = self.state.clock.now();

        for key in self.sub_keys(principal, origin) {
            let outcome = {
                let mut record = self
                    .state
                    .attempts
                    .entry(key.clone())
                    .or_insert_with(|| AttemptRecord::new(now));
                record.register_failure(now, &self.state.config)
            };

            match outcome {
                FailureOutcome::Counted { failure_count } => {
                    debug!(
                        scope = %self.state.scope,
                        key = %key,
                        failure_count,
                        "Failed attempt recorded"
                    );
                }
                FailureOutcome::LockedOut { until } => {
                    warn!(
                        scope = %self.state.scope,
                        key = %key,
                        lockout_until = %until,
                        "Lockout triggered"
                    );
                }
                FailureOutcome::Escalated { until, multiplier } => {
                    warn!(
                        scope = %self.state.scope,
                        key = %key,
                        lockout_until = %until,
                        multiplier,
                        "Failed attempt during lockout, lockout extended"
                    );
                }
            }
        }
    }

    /// Forgets both sub-keys, e.g. after a successful login or password reset.
    pub fn reset_attempts(&self, principal: &str, origin: &str) {
        for key in self.sub_keys(principal, origin) {
            if self.state.attempts.remove(&key).is_some() {
                info!(scope = %self.state.scope, key = %key, "Failed attempts reset");
            }
        }
    }

    /// The longest remaining lockout among the sub-keys.
    pub fn remaining_lockout(&self, principal: &str, origin: &str) -> Option<Duration> {
        let now = self.state.clock.now();
        self.sub_keys(principal, origin)
            .iter()
            .filter_map(|key| {
                self.state
                    .attempts
                    .get(key)
                    .and_then(|record| record.remaining_at(now))
            })
            .max()
    }

    /// Rejects the attempt with a rate-limit error while locked out.
    pub fn ensure_not_locked_out(&self, principal: &str, origin: &str) -> AppResult<()> {
        match self.remaining_lockout(principal, origin) {
            Some(remaining) => {
                let retry_after = whole_seconds_rounded_up(remaining);
                Err(AppError::rate_limited(
                    format!("Too many failed attempts, retry in {retry_after}s"),
                    retry_after,
                ))
            }
            None => Ok(()),
        }
    }

    /// The highest pending failure count among the sub-keys.
    pub fn failure_count(&self, principal: &str, origin: &str) -> u32 {
        self.sub_keys(principal, origin)
            .iter()
            .filter_map(|key| self.state.attempts.get(key).map(|record| record.failure_count))
            .max()
            .unwrap_or(0)
    }

    /// Number of sub-keys currently held in memory.
    pub fn tracked_entries(&self) -> usize {
        self.state.attempts.len()
    }

    /// Runs one cleanup pass now. Returns the number of records removed.
    pub fn sweep(&self) -> usize {
        self.state.sweep()
    }

    fn sub_keys(&self, principal: &str, origin: &str) -> [String; 2] {
        LockoutIdentity::new(principal, origin).sub_keys(self.state.scope)
    }
}

/// Never zero for a positive duration, so a locked key always gets a retry hint.
fn whole_seconds_rounded_up(remaining: Duration) -> u64 {
    let partial = remaining.subsec_nanos() > 0;
    let seconds = remaining.num_seconds().saturating_add(i64::from(partial));
    u64::try_from(seconds).unwrap_or(0)
}
