//! Clock and timing utilities for playback synchronization.
//!
//! The sequencer never reads wall-clock time directly. Every timing
//! decision goes through the [`Clock`] trait so hosts can supply a real
//! monotonic clock while tests and simulations drive a [`ManualClock`].
//! This module also provides:
//! - Conversions between nanoseconds and seconds
//! - Drift measurement between the sequencer clock and a media source
//! - Frame-rate throttling for the render loop

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of monotonic time for the playback engine.
pub trait Clock {
    /// Nanoseconds since an arbitrary, fixed epoch.
    fn now_ns(&self) -> u64;

    /// Seconds since the same epoch.
    fn now_secs(&self) -> f64 {
        ns_to_secs(self.now_ns())
    }
}

/// Convert a nanosecond value to seconds.
pub fn ns_to_secs(ns: u64) -> f64 {
    ns as f64 / 1_000_000_000.0
}

/// Convert seconds to nanoseconds. Negative inputs saturate to zero.
pub fn secs_to_ns(secs: f64) -> u64 {
    (secs.max(0.0) * 1_000_000_000.0) as u64
}

/// A clock anchored to the moment it was created.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    /// The instant the clock started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl MonotonicClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Wall-clock time at clock start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// The underlying epoch instant.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time value, so a test can keep one handle and
/// give another to the sequencer.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ns: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a manual clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to an absolute time in nanoseconds.
    pub fn set_ns(&self, ns: u64) {
        self.now_ns.store(ns, Ordering::SeqCst);
    }

    /// Move forward by a number of seconds.
    pub fn advance_secs(&self, secs: f64) {
        self.now_ns.fetch_add(secs_to_ns(secs), Ordering::SeqCst);
    }

    /// Move forward by a number of milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.now_ns.fetch_add(ms * 1_000_000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
}

/// Drift measurement between the sequencer clock and a media source.
#[derive(Debug, Clone, Copy)]
pub struct DriftMeasurement {
    /// Position the sequencer expects (ns).
    pub reference_ns: u64,
    /// Position the source reports (ns).
    pub measured_ns: u64,
}

impl DriftMeasurement {
    /// Build a measurement from two positions in seconds.
    pub fn from_secs(reference_secs: f64, measured_secs: f64) -> Self {
        Self {
            reference_ns: secs_to_ns(reference_secs),
            measured_ns: secs_to_ns(measured_secs),
        }
    }

    /// Drift in nanoseconds (positive = measured is ahead).
    pub fn drift_ns(&self) -> i64 {
        self.measured_ns as i64 - self.reference_ns as i64
    }

    /// Drift in milliseconds.
    pub fn drift_ms(&self) -> f64 {
        self.drift_ns() as f64 / 1_000_000.0
    }

    /// Whether drift exceeds an acceptable threshold.
    pub fn exceeds_threshold_ms(&self, threshold_ms: f64) -> bool {
        self.drift_ms().abs() > threshold_ms
    }
}

/// Frame rate controller for the render loop.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Forget the last tick so the next call fires immediately.
    pub fn reset(&mut self) {
        self.last_tick_ns = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_elapsed() {
        let clock = MonotonicClock::start();
        assert!(clock.now_ns() < 1_000_000_000);
        assert!(!clock.epoch_wall().is_empty());
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance_secs(1.5);
        assert_eq!(clock.now_ns(), 1_500_000_000);
        handle.advance_ms(250);
        assert!((clock.now_secs() - 1.75).abs() < 1e-9);
        clock.set_ns(0);
        assert_eq!(handle.now_ns(), 0);
    }

    #[test]
    fn test_ns_to_secs_conversion() {
        assert!((ns_to_secs(1_500_000_000) - 1.5).abs() < 1e-9);
        assert_eq!(secs_to_ns(2.0), 2_000_000_000);
        assert_eq!(secs_to_ns(-3.0), 0);
    }

    #[test]
    fn test_drift_measurement() {
        let drift = DriftMeasurement::from_secs(1.0, 1.05);
        assert_eq!(drift.drift_ns(), 50_000_000);
        assert!((drift.drift_ms() - 50.0).abs() < 1e-6);
        assert!(drift.exceeds_threshold_ms(10.0));
        assert!(!drift.exceeds_threshold_ms(100.0));
    }

    #[test]
    fn test_rate_controller() {
        let mut ctrl = RateController::new(60);
        assert!(ctrl.should_tick(0)); // first tick always fires
        assert!(!ctrl.should_tick(1_000_000)); // 1ms later, too soon
        assert!(ctrl.should_tick(17_000_000)); // ~17ms later (60Hz ~ 16.67ms)
        ctrl.reset();
        assert!(ctrl.should_tick(17_000_001));
    }

    #[test]
    fn test_rate_controller_zero_hz_does_not_divide_by_zero() {
        let mut ctrl = RateController::new(0);
        assert!(ctrl.should_tick(0));
        assert!(!ctrl.should_tick(999_999_999));
        assert!(ctrl.should_tick(1_000_000_000));
    }
}
