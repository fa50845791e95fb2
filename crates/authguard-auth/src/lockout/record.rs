//! Per-sub-key failure state and the progressive lockout rules.

use chrono::{DateTime, Duration, Utc};

use authguard_core::config::LockoutConfig;

/// Failure history for one sub-key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Failures counted since the last lockout fired.
    pub failure_count: u32,
    /// End of the current or most recent lockout window.
    pub lockout_until: Option<DateTime<Utc>>,
    /// Scales the next lockout window. Starts at 1 and doubles on abuse during a lockout.
    pub lockout_multiplier: u32,
    /// Time of the most recent failure.
    pub last_activity: DateTime<Utc>,
}

/// What a single failure did to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Counted toward the threshold; no lockout yet.
    Counted { failure_count: u32 },
    /// The threshold was reached and a lockout started.
    LockedOut { until: DateTime<Utc> },
    /// A failure arrived during a lockout and the window was re-applied longer.
    Escalated { until: DateTime<Utc>, multiplier: u32 },
}

impl AttemptRecord {
    /// A fresh record with no failures.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            failure_count: 0,
            lockout_until: None,
            lockout_multiplier: 1,
            last_activity: now,
        }
    }

    /// Whether the lockout window is still open at `now`.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.lockout_until.is_some_and(|until| until > now)
    }

    /// Time left in the lockout window, if any.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.lockout_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// Not locked out and idle for longer than `reset_after`.
    pub fn is_stale_at(&self, now: DateTime<Utc>, reset_after: Duration) -> bool {
        !self.is_locked_at(now) && now - self.last_activity > reset_after
    }

    /// Applies one failed attempt at `now`.
    pub fn register_failure(&mut self, now: DateTime<Utc>, config: &LockoutConfig) -> FailureOutcome {
        self.last_activity = now;

        if self.is_locked_at(now) {
            self.lockout_multiplier = self.lockout_multiplier.saturating_mul(2);
            let window = config
                .initial_lockout()
                .checked_add(&scaled(config.incremental_lockout(), self.lockout_multiplier))
                .unwrap_or(Duration::MAX);
            let until = deadline(now, window);
            self.lockout_until = Some(until);
            return FailureOutcome::Escalated {
                until,
                multiplier: self.lockout_multiplier,
            };
        }

        // An expired window no longer matters; the counter was zeroed when it fired.
        self.lockout_until = None;
        self.failure_count = self.failure_count.saturating_add(1);

        if self.failure_count >= config.max_failed_attempts {
            let until = deadline(now, scaled(config.initial_lockout(), self.lockout_multiplier));
            self.lockout_until = Some(until);
            self.failure_count = 0;
            return FailureOutcome::LockedOut { until };
        }

        FailureOutcome::Counted {
            failure_count: self.failure_count,
        }
    }
}

fn scaled(base: Duration, factor: u32) -> Duration {
    i32::try_from(factor)
        .ok()
        .and_then(|factor| base.checked_mul(factor))
        .unwrap_or(Duration::MAX)
}

fn deadline(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_add_signed(window)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
