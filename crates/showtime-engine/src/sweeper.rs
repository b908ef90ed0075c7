//! Periodic retirement of elapsed screenings.
//!
//! The sweeper calls [`ShowtimeEngine::auto_hide_expired`] on a fixed
//! interval. At most one sweep runs at a time; a tick that fires while a
//! sweep is still in progress is skipped. Failures are logged and retried on
//! the next tick.

use chrono::{Duration as ChronoDuration, NaiveDateTime};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::engine::ShowtimeEngine;
use crate::model::Screening;

/// Whether a screening's window plus grace has elapsed at `now` (venue time).
///
/// Anything dated before today is expired. A screening dated today expires
/// once `now >= end_time + grace_minutes`.
pub fn is_expired(screening: &Screening, now: NaiveDateTime, grace_minutes: u32) -> bool {
    let today = now.date();
    if screening.show_date < today {
        return true;
    }
    if screening.show_date > today {
        return false;
    }
    let ends = screening.show_date.and_time(screening.end_time.as_naive());
    now >= ends + ChronoDuration::minutes(i64::from(grace_minutes))
}

/// Result of one [`ExpirationSweeper::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// The sweep ran and hid this many screenings.
    Completed(usize),
    /// Another sweep was still running.
    Skipped,
    /// The sweep failed; it will be retried on the next tick.
    Failed,
}

pub struct ExpirationSweeper {
    engine: Arc<ShowtimeEngine>,
    interval: Duration,
    running: AtomicBool,
}

impl ExpirationSweeper {
    pub fn new(engine: Arc<ShowtimeEngine>) -> Self {
        let interval = engine.config().sweep_interval();
        Self {
            engine,
            interval,
            running: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run one guarded sweep.
    pub async fn tick(&self) -> SweepOutcome {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            warn!("previous expiry sweep still running; skipping tick");
            return SweepOutcome::Skipped;
        };

        match self.engine.auto_hide_expired().await {
            Ok(count) => {
                debug!(count, "expiry sweep completed");
                SweepOutcome::Completed(count)
            }
            Err(err) => {
                error!(error = %err, "expiry sweep failed");
                SweepOutcome::Failed
            }
        }
    }

    /// Tick until `shutdown` becomes `true` or its sender is dropped.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX);
        info!(interval_ms, "expiry sweeper started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("expiry sweeper shutting down");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

/// Holds the run-in-progress flag; clears it on drop.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
