//! General time utility functions and fixed-rate cycle management

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono;
use log::warn;
use std::thread;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Suspends a cyclic loop until the start of its next cycle.
///
/// Control loops only ever suspend through a ticker, so tests can replace the
/// wall-clock [`FixedRate`] with a scripted one.
pub trait Ticker {
    /// Block until the next cycle should start.
    fn wait(&mut self);

    /// Nominal cycle period in seconds.
    fn period_s(&self) -> f64;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Wall-clock ticker running at a fixed frequency.
///
/// Each call to `wait` sleeps for whatever remains of the cycle period since
/// the previous call. An overrun cycle is reported and the next cycle starts
/// immediately.
pub struct FixedRate {
    period: Duration,
    cycle_start: Instant,
    num_consec_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FixedRate {
    /// Create a new ticker. Non-positive or non-finite frequencies are
    /// replaced by 1 Hz.
    pub fn new(frequency_hz: f64) -> Self {
        let frequency_hz = if frequency_hz.is_finite() && frequency_hz > 0.0 {
            frequency_hz
        } else {
            warn!("Invalid cycle frequency {} Hz, using 1 Hz", frequency_hz);
            1.0
        };

        Self {
            period: Duration::from_secs_f64(1.0 / frequency_hz),
            cycle_start: Instant::now(),
            num_consec_overruns: 0,
        }
    }

    /// Number of consecutive cycles which have overrun the period.
    pub fn num_consec_overruns(&self) -> u64 {
        self.num_consec_overruns
    }
}

impl Ticker for FixedRate {
    fn wait(&mut self) {
        let cycle_dur = Instant::now() - self.cycle_start;

        match self.period.checked_sub(cycle_dur) {
            Some(d) => {
                self.num_consec_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - self.period.as_secs_f64()
                );
                self.num_consec_overruns += 1;
            }
        }

        self.cycle_start = Instant::now();
    }

    fn period_s(&self) -> f64 {
        self.period.as_secs_f64()
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        assert_eq!(
            duration_to_seconds(chrono::Duration::milliseconds(1500)),
            Some(1.5)
        );
    }

    #[test]
    fn test_invalid_frequency_falls_back() {
        assert_eq!(FixedRate::new(0.0).period_s(), 1.0);
        assert_eq!(FixedRate::new(f64::NAN).period_s(), 1.0);
        assert!((FixedRate::new(20.0).period_s() - 0.05).abs() < 1e-12);
    }
}
