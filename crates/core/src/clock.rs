// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction and the jitter-tolerant safe clock
//!
//! The raw [`Clock`] is a millisecond wall clock that may jump backwards or
//! fluctuate. [`SafeClock`] smooths those anomalies so that every reading is
//! greater than or equal to every reading returned before it, which is what
//! timed waits need to compute a remaining budget that never goes negative.

use crate::config::ClockConfig;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A clock that provides the current time in milliseconds
pub trait Clock: Clone + Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Real system wall clock
#[derive(Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => i64::try_from(since.as_millis()).unwrap_or(i64::MAX),
            Err(e) => -i64::try_from(e.duration().as_millis()).unwrap_or(i64::MAX),
        }
    }
}

/// Fake clock for testing with controllable time, including regressions
#[derive(Clone, Debug)]
pub struct FakeClock {
    current: Arc<Mutex<i64>>,
}

impl FakeClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            current: Arc::new(Mutex::new(start_millis)),
        }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += millis_of(duration);
    }

    /// Move the clock backwards by the given duration
    pub fn rewind(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current -= millis_of(duration);
    }

    /// Set the clock to a specific reading
    pub fn set(&self, millis: i64) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = millis;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Clock for FakeClock {
    fn now_millis(&self) -> i64 {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn millis_of(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Monotonic millisecond clock layered over a raw [`Clock`].
///
/// Readings that repeat the last raw value, or regress by no more than the
/// jitter threshold, return the last safe time without any write. Other
/// readings go through a single-writer update; a caller that loses the race
/// for the writer flag returns the last safe time instead of waiting.
#[derive(Debug)]
pub struct SafeClock<C: Clock = SystemClock> {
    clock: C,
    jitter: i64,
    last_safe: AtomicI64,
    last_unsafe: AtomicI64,
    updating: AtomicBool,
    /// Alternates the 1ms creep while the raw clock trails the safe clock
    creep: AtomicBool,
}

static GLOBAL: OnceLock<SafeClock> = OnceLock::new();

impl SafeClock {
    pub fn new(config: &ClockConfig) -> Self {
        Self::with_clock(SystemClock, config)
    }

    /// The process-wide safe clock, configured from the environment on first use.
    pub fn global() -> &'static SafeClock {
        GLOBAL.get_or_init(|| {
            let config = ClockConfig::from_env().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring invalid clock override");
                ClockConfig::default()
            });
            SafeClock::new(&config)
        })
    }
}

impl<C: Clock> SafeClock<C> {
    pub fn with_clock(clock: C, config: &ClockConfig) -> Self {
        let start = clock.now_millis();
        Self {
            clock,
            jitter: millis_of(config.jitter),
            last_safe: AtomicI64::new(start),
            last_unsafe: AtomicI64::new(start),
            updating: AtomicBool::new(false),
            creep: AtomicBool::new(false),
        }
    }

    /// The jitter threshold in milliseconds
    pub fn jitter_millis(&self) -> i64 {
        self.jitter
    }

    /// Current safe time in milliseconds
    pub fn now(&self) -> i64 {
        self.safe_time_at(self.clock.now_millis())
    }

    /// The last safe time computed, without consulting the raw clock
    pub fn last_safe_millis(&self) -> i64 {
        self.last_safe.load(Ordering::Acquire)
    }

    /// Safe time given an explicit raw reading.
    pub fn safe_time_at(&self, raw: i64) -> i64 {
        let delta = raw.saturating_sub(self.last_unsafe.load(Ordering::Acquire));
        if delta == 0 || (delta < 0 && delta >= -self.jitter) {
            return self.last_safe.load(Ordering::Acquire);
        }
        self.update(raw)
    }

    fn update(&self, raw: i64) -> i64 {
        if self
            .updating
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // another caller is updating; a slightly stale answer is still monotonic
            return self.last_safe.load(Ordering::Acquire);
        }

        let last_safe = self.last_safe.load(Ordering::Acquire);
        let last_unsafe = self.last_unsafe.load(Ordering::Acquire);
        let delta = raw.saturating_sub(last_unsafe);

        let next = if delta > 0 {
            if raw >= last_safe {
                raw
            } else {
                // raw clock is recovering from an earlier regression; each step
                // is at most the raw delta, so elapsed safe time never
                // outruns elapsed raw time
                let step = if delta == 1 {
                    i64::from(!self.creep.fetch_xor(true, Ordering::Relaxed))
                } else {
                    delta / 2
                };
                tracing::trace!(raw, last_safe, step, "safe clock creeping toward raw clock");
                last_safe + step
            }
        } else {
            if delta < -self.jitter {
                tracing::debug!(
                    raw,
                    last_unsafe,
                    regression_ms = -delta,
                    jitter_ms = self.jitter,
                    "raw clock regressed beyond jitter threshold"
                );
            }
            last_safe
        };

        self.last_unsafe.store(raw, Ordering::Release);
        self.last_safe.store(next, Ordering::Release);
        self.updating.store(false, Ordering::Release);
        next
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
