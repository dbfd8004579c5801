use std::sync::{Arc, Mutex};
use std::time::Duration;

use media_types::CLOCK_RATE;

use crate::clock::Clock;

fn duration_from_180k(t: u64) -> Duration {
    Duration::from_secs_f64(t as f64 / CLOCK_RATE as f64)
}

/// Fires a periodic or one-shot callback at a clock time, in CR units (spec
/// §4.3 "a scheduler that fires a callback every `1/fps` period"; §4.3
/// "Flush semantics": "a final scheduled callback is enqueued").
///
/// Translated from original_source's `lib_utils/scheduler.hpp`
/// `scheduleEvery`/`scheduleAt` into the Tokio idiom already used for
/// time-driven work elsewhere in this workspace.
pub trait Scheduler: Send + Sync {
    /// Invoke `callback(tick_clock_time)` every `period_180k` CR units,
    /// forever, until the Scheduler itself is dropped.
    fn schedule_every(&self, period_180k: u64, callback: Arc<dyn Fn(i64) + Send + Sync>);

    /// Invoke `callback(tick_clock_time)` exactly once, at or after
    /// `at_180k`.
    fn schedule_once(&self, at_180k: u64, callback: Box<dyn FnOnce(i64) + Send>);
}

/// Drives callbacks from a real `tokio::time::interval`/`sleep`, on the
/// ambient Tokio runtime (the same `Handle::current()` pattern
/// `pipeline_graph::executor::spawn_under_policy` already relies on to call
/// async primitives from inside a `spawn_blocking` body).
pub struct TokioScheduler {
    clock: Arc<dyn Clock>,
}

impl TokioScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_every(&self, period_180k: u64, callback: Arc<dyn Fn(i64) + Send + Sync>) {
        let period = duration_from_180k(period_180k.max(1));
        let clock = self.clock.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                callback(clock.now_180k());
            }
        });
    }

    fn schedule_once(&self, at_180k: u64, callback: Box<dyn FnOnce(i64) + Send>) {
        let clock = self.clock.clone();
        let now = clock.now_180k().max(0) as u64;
        let delay = duration_from_180k(at_180k.saturating_sub(now));
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback(clock.now_180k());
        });
    }
}

/// A scheduler with no background thread: periodic callbacks are recorded
/// and invoked explicitly via [`ManualScheduler::tick`], one-shot callbacks
/// via [`ManualScheduler::fire_pending`]. Deterministic, for tests (spec §8
/// scenario 4).
#[derive(Default)]
pub struct ManualScheduler {
    periodic: Mutex<Vec<Arc<dyn Fn(i64) + Send + Sync>>>,
    pending_once: Mutex<Vec<Box<dyn FnOnce(i64) + Send>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&self, t_180k: i64) {
        for callback in self.periodic.lock().unwrap().iter() {
            callback(t_180k);
        }
    }

    /// Run and discard every one-shot callback scheduled so far (used to
    /// drive the flush()-time "final removal" tick in tests).
    pub fn fire_pending(&self, t_180k: i64) {
        let pending = std::mem::take(&mut *self.pending_once.lock().unwrap());
        for callback in pending {
            callback(t_180k);
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_every(&self, _period_180k: u64, callback: Arc<dyn Fn(i64) + Send + Sync>) {
        self.periodic.lock().unwrap().push(callback);
    }

    fn schedule_once(&self, _at_180k: u64, callback: Box<dyn FnOnce(i64) + Send>) {
        self.pending_once.lock().unwrap().push(callback);
    }
}
