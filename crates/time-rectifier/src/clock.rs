use std::sync::Mutex;
use std::time::Instant;

use media_types::CLOCK_RATE;

/// Source of "now" in CR (180_000 Hz) units (spec §4.3 "Driven by an
/// injected clock (wall-clock or virtual)"; spec §9 "Global clock →
/// injected clock").
///
/// Injected at construction rather than read from a process-wide
/// singleton, matching the same pattern as [`crate::UtcClock`]-equivalents
/// elsewhere in this workspace (`dasher::UtcClock`).
pub trait Clock: Send + Sync {
    fn now_180k(&self) -> i64;
}

/// Wall-clock time, measured as elapsed duration since construction.
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_180k(&self) -> i64 {
        let elapsed = self.epoch.elapsed();
        (elapsed.as_secs() as i64 * CLOCK_RATE as i64)
            + (elapsed.subsec_nanos() as i64 * CLOCK_RATE as i64 / 1_000_000_000)
    }
}

/// A clock that only advances when told to, for deterministic tests (spec
/// §9's "test clock substitution").
pub struct VirtualClock {
    now_180k: Mutex<i64>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self {
            now_180k: Mutex::new(0),
        }
    }

    pub fn advance(&self, delta_180k: i64) {
        *self.now_180k.lock().unwrap() += delta_180k;
    }

    pub fn set(&self, t_180k: i64) {
        *self.now_180k.lock().unwrap() = t_180k;
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualClock {
    fn now_180k(&self) -> i64 {
        *self.now_180k.lock().unwrap()
    }
}
