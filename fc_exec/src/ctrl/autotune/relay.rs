//! # Relay identification
//!
//! The tuned axis is driven by a relay with hysteresis, `u0 + d` while the error is positive and
//! `u0 - d` while it is negative. A plant with enough phase lag settles into a limit cycle whose
//! period is the ultimate period `Tu`, and whose error amplitude `a` gives the ultimate gain
//! through the describing function of the relay, `Ku = 4 d / (pi a)`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use util::params::Validate;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Switches ignored at the start of the experiment while the oscillation settles.
const NUM_TRANSIENT_SWITCHES: usize = 2;

/// Amplitudes below this are not an oscillation.
///
/// Units: meters
const MIN_AMPLITUDE_M: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayParams {
    /// Relay amplitude `d`.
    ///
    /// Units: meters/second^2
    pub amplitude_mss: f64,

    /// Error band inside which the relay keeps its current output.
    ///
    /// Units: meters
    pub hysteresis_m: f64,

    /// Number of full oscillation periods averaged over.
    pub num_periods: usize,

    /// The experiment fails if it has not completed by then.
    ///
    /// Units: seconds
    pub max_duration_s: f64,
}

/// Ultimate point of the tuned axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UltimatePoint {
    /// Ultimate gain
    pub ku: f64,

    /// Ultimate period
    ///
    /// Units: seconds
    pub tu_s: f64,

    /// Measured error amplitude
    ///
    /// Units: meters
    pub amplitude_m: f64,
}

#[derive(Debug, Clone)]
pub struct RelayIdentification {
    params: RelayParams,
    period_s: f64,
    u0: f64,
    num_ticks: u64,

    /// Current relay output sign, zero before the first tick.
    relay_sign: f64,

    switch_times_s: Vec<f64>,

    /// Largest error magnitude of each completed half cycle
    peaks: Vec<f64>,
    half_cycle_peak: f64,

    outcome: Option<Result<UltimatePoint, IdentificationError>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum IdentificationError {
    #[error("no sustained oscillation within {0} s")]
    Timeout(f64),

    #[error("the oscillation amplitude is zero")]
    ZeroAmplitude,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RelayParams {
    fn default() -> Self {
        Self {
            amplitude_mss: 0.5,
            hysteresis_m: 0.02,
            num_periods: 3,
            max_duration_s: 30.0,
        }
    }
}

impl Validate for RelayParams {
    fn validate(&mut self) -> Vec<&'static str> {
        let mut reset = vec![];
        let def = Self::default();

        if !(self.amplitude_mss.is_finite() && self.amplitude_mss > 0.0) {
            self.amplitude_mss = def.amplitude_mss;
            reset.push("amplitude_mss");
        }
        if !(self.hysteresis_m.is_finite() && self.hysteresis_m >= 0.0) {
            self.hysteresis_m = def.hysteresis_m;
            reset.push("hysteresis_m");
        }
        if self.num_periods == 0 {
            self.num_periods = def.num_periods;
            reset.push("num_periods");
        }
        if !(self.max_duration_s.is_finite() && self.max_duration_s > 0.0) {
            self.max_duration_s = def.max_duration_s;
            reset.push("max_duration_s");
        }

        reset
    }
}

impl RelayIdentification {
    pub fn new(params: RelayParams, period_s: f64, u0: f64) -> Self {
        Self {
            params,
            period_s,
            u0,
            num_ticks: 0,
            relay_sign: 0.0,
            switch_times_s: Vec::new(),
            peaks: Vec::new(),
            half_cycle_peak: 0.0,
            outcome: None,
        }
    }

    /// Process one tick of the error, returning the relay output.
    ///
    /// Once the experiment has an outcome the output is the bias `u0`.
    pub fn step(&mut self, error: f64) -> f64 {
        if self.outcome.is_some() {
            return self.u0;
        }

        let t = self.num_ticks as f64 * self.period_s;
        self.num_ticks += 1;

        if self.relay_sign == 0.0 {
            self.relay_sign = if error >= 0.0 { 1.0 } else { -1.0 };
        }

        self.half_cycle_peak = self.half_cycle_peak.max(error.abs());

        let eps = self.params.hysteresis_m;
        let switch = (self.relay_sign > 0.0 && error < -eps)
            || (self.relay_sign < 0.0 && error > eps);

        if switch {
            self.relay_sign = -self.relay_sign;
            self.switch_times_s.push(t);
            self.peaks.push(self.half_cycle_peak);
            self.half_cycle_peak = error.abs();

            debug!("Relay switched at {:.3} s", t);
            self.check_complete();
        }

        if self.outcome.is_none() && t >= self.params.max_duration_s {
            self.outcome = Some(Err(IdentificationError::Timeout(self.params.max_duration_s)));
        }

        self.u0 + self.relay_sign * self.params.amplitude_mss
    }

    pub fn outcome(&self) -> Option<Result<UltimatePoint, IdentificationError>> {
        self.outcome
    }

    fn check_complete(&mut self) {
        let num_half = 2 * self.params.num_periods;
        if self.switch_times_s.len() < NUM_TRANSIENT_SWITCHES + num_half + 1 {
            return;
        }

        // The last 2n + 1 switches bound n full periods, and the last 2n peaks are the half
        // cycles between them
        let window = &self.switch_times_s[self.switch_times_s.len() - (num_half + 1)..];
        let tu_s = (window[num_half] - window[0]) / self.params.num_periods as f64;

        let peaks = &self.peaks[self.peaks.len() - num_half..];
        let amplitude_m = peaks.iter().sum::<f64>() / num_half as f64;

        self.outcome = Some(if amplitude_m > MIN_AMPLITUDE_M {
            Ok(UltimatePoint {
                ku: 4.0 * self.params.amplitude_mss / (PI * amplitude_m),
                tu_s,
                amplitude_m,
            })
        } else {
            Err(IdentificationError::ZeroAmplitude)
        });
    }
}
