#![deny(missing_docs)]
//! Monotonic time sources shared by channels and control loops.
//!
//! Message timestamps and scheduler due-time arithmetic both come from a
//! [`Clock`]. Production code uses the [`Instant`]-anchored
//! [`MonotonicClock`]; tests swap in a [`ManualClock`] so tie-breaking and
//! wake-time math stay deterministic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source.
///
/// Implementations must never go backwards. Wall-clock adjustments must not
/// leak into the readings, or due-time arithmetic in the scheduler produces
/// spurious wakes.
pub trait Clock: Send + Sync {
    /// Current time in nanoseconds since an arbitrary fixed origin.
    fn now_ns(&self) -> u64;

    /// Current time in seconds since the same origin.
    fn now(&self) -> f64 {
        self.now_ns() as f64 / 1e9
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ns(&self) -> u64 {
        (**self).now_ns()
    }
}

/// Clock anchored at the instant of construction.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose origin is the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        // Saturates only after ~584 years of uptime.
        self.origin.elapsed().as_nanos().min(u64::MAX as u128) as u64
    }
}

/// Test clock advanced explicitly by the caller.
///
/// Clones share one timeline, so a scheduler and the test driving it observe
/// the same reading.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now_ns: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.now_ns
            .fetch_add(delta.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    /// Sets the absolute reading in nanoseconds.
    ///
    /// Callers are responsible for keeping the timeline monotonic.
    pub fn set_ns(&self, ns: u64) {
        self.now_ns.store(ns, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let mut prev = clock.now_ns();
        for _ in 0..1_000 {
            let next = clock.now_ns();
            assert!(next >= prev);
            prev = next;
        }
    }

    #[test]
    fn manual_clock_clones_share_one_timeline() {
        let clock = ManualClock::new();
        let observer = clock.clone();
        clock.advance(Duration::from_nanos(250));
        assert_eq!(observer.now_ns(), 250);
        observer.set_ns(1_000);
        assert_eq!(clock.now_ns(), 1_000);
    }

    #[test]
    fn seconds_reading_derives_from_nanoseconds() {
        let clock = ManualClock::new();
        clock.set_ns(1_500_000_000);
        assert!((clock.now() - 1.5).abs() < 1e-12);
    }
}
