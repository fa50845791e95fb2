//! Fixed-interval sweep loop driven by an injected clock.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing;

use authguard_core::error::AppError;
use authguard_core::traits::Clock;

/// Callback invoked on every tick.
pub type SweepCallback = Arc<dyn Fn() + Send + Sync>;

/// The currently scheduled loop.
struct ActiveSweep {
    /// Cooperative stop signal for the loop.
    cancel: watch::Sender<bool>,
    /// Handle of the spawned loop task.
    handle: JoinHandle<()>,
}

impl ActiveSweep {
    fn stop(self) {
        let _ = self.cancel.send(true);
        self.handle.abort();
    }
}

/// Runs a callback every `interval` of clock time until disposed.
///
/// Calling [`start`](Self::start) again replaces the previous schedule.
/// Disposal is idempotent and also happens on drop.
pub struct PeriodicSweeper {
    /// Name used in log output.
    name: String,
    /// Time source for the schedule.
    clock: Arc<dyn Clock>,
    /// Bumped on every start and on dispose; loops from older generations never fire.
    generation: Arc<AtomicU64>,
    /// Set once by `dispose`.
    disposed: AtomicBool,
    /// The running loop, if any.
    active: Mutex<Option<ActiveSweep>>,
}

impl std::fmt::Debug for PeriodicSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicSweeper")
            .field("name", &self.name)
            .field("disposed", &self.disposed.load(Ordering::SeqCst))
            .finish()
    }
}

impl PeriodicSweeper {
    /// Creates an idle sweeper. Nothing is scheduled until [`start`](Self::start).
    pub fn new(name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            clock,
            generation: Arc::new(AtomicU64::new(0)),
            disposed: AtomicBool::new(false),
            active: Mutex::new(None),
        }
    }

    /// Schedules `callback` every `interval`, superseding any previous schedule.
    ///
    /// The first tick is one interval after the current clock time. Must be
    /// called from within a Tokio runtime. After [`dispose`](Self::dispose)
    /// this is a no-op.
    pub fn start<F>(&self, callback: F, interval: Duration) -> Result<(), AppError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if interval < Duration::milliseconds(1) {
            return Err(AppError::configuration(format!(
                "Sweep interval for '{}' must be at least 1ms",
                self.name
            )));
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            AppError::internal(format!(
                "Sweeper '{}' requires a Tokio runtime: {e}",
                self.name
            ))
        })?;

        let mut active = self.lock_active();

        if self.disposed.load(Ordering::SeqCst) {
            tracing::warn!(sweeper = %self.name, "Ignoring start on disposed sweeper");
            return Ok(());
        }

        if let Some(previous) = active.take() {
            previous.stop();
            tracing::debug!(sweeper = %self.name, "Superseded previous sweep schedule");
        }

        let first_tick = self
            .clock
            .now()
            .checked_add_signed(interval)
            .ok_or_else(|| {
                AppError::configuration(format!(
                    "Sweep interval for '{}' is too large",
                    self.name
                ))
            })?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let sweep_loop = SweepLoop {
            name: self.name.clone(),
            clock: Arc::clone(&self.clock),
            generation: Arc::clone(&self.generation),
            own_generation: generation,
            callback: Arc::new(callback),
            interval,
        };
        let handle = runtime.spawn(sweep_loop.run(first_tick, cancel_rx));

        *active = Some(ActiveSweep {
            cancel: cancel_tx,
            handle,
        });

        tracing::info!(
            sweeper = %self.name,
            interval_ms = interval.num_milliseconds(),
            "Sweep schedule started"
        );
        Ok(())
    }

    /// Stops the schedule permanently. Safe to call repeatedly or before `start`.
    pub fn dispose(&self) {
        let mut active = self.lock_active();
        let first = !self.disposed.swap(true, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);

        if let Some(previous) = active.take() {
            previous.stop();
        }

        if first {
            tracing::info!(sweeper = %self.name, "Sweeper disposed");
        }
    }

    /// Whether a schedule is currently running.
    pub fn is_running(&self) -> bool {
        self.lock_active()
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveSweep>> {
        // The guarded state stays consistent even if a holder panicked.
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for PeriodicSweeper {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// State moved into the spawned loop task.
struct SweepLoop {
    name: String,
    clock: Arc<dyn Clock>,
    generation: Arc<AtomicU64>,
    own_generation: u64,
    callback: SweepCallback,
    interval: Duration,
}

impl SweepLoop {
    async fn run(self, first_tick: DateTime<Utc>, mut cancel: watch::Receiver<bool>) {
        let mut next = first_tick;

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        tracing::debug!(sweeper = %self.name, "Sweep loop cancelled");
                        break;
                    }
                }
                _ = self.clock.sleep_until(next) => {
                    if self.generation.load(Ordering::SeqCst) != self.own_generation {
                        break;
                    }

                    self.fire();
                    next = self.next_tick(next);
                }
            }
        }
    }

    fn fire(&self) {
        let callback = Arc::clone(&self.callback);
        if catch_unwind(AssertUnwindSafe(|| (*callback)())).is_err() {
            tracing::error!(sweeper = %self.name, "Sweep callback panicked");
        }
    }

    /// Advances past `now`, skipping any ticks the clock jumped over.
    ///
    /// Saturates at the end of representable time.
    fn next_tick(&self, previous: DateTime<Utc>) -> DateTime<Utc> {
        let Some(next) = previous.checked_add_signed(self.interval) else {
            return DateTime::<Utc>::MAX_UTC;
        };
        let now = self.clock.now();
        if next > now {
            return next;
        }

        let interval_ms = self.interval.num_milliseconds();
        let behind_ms = (now - next).num_milliseconds();
        let skipped = behind_ms / interval_ms + 1;
        tracing::trace!(sweeper = %self.name, skipped, "Skipping missed sweep ticks");
        Duration::try_milliseconds(interval_ms.saturating_mul(skipped))
            .and_then(|jump| next.checked_add_signed(jump))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
