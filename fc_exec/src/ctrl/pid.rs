//! # PID control law
//!
//! One setpoint-weighted PID controller per lab axis, discretised with a backward difference and
//! a first order filter on the derivative branch:
//!
//! ```text
//! P_k = K (b r_k - y_k)
//! D_k = a_d D_(k-1) + b_d ((c r_k - y_k) - (c r_(k-1) - y_(k-1)))
//! I_(k+1) = I_k + K h / Ti (r_k - y_k)
//! ```
//!
//! with `a_d = Td / (Td + N h)` and `b_d = K Td N / (Td + N h)`. The integral accumulator only
//! advances while its magnitude is below `I_lim`, otherwise it is frozen.
//!
//! The law is either tracking or identifying. While identifying, the tuned axis is driven by an
//! autotune session instead of its PID; the other axes keep tracking.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace, warn};
use nalgebra::Vector3;
use serde::Serialize;

// Internal
use super::{
    autotune::{AutotuneRecord, AutotuneRequest, AutotuneSession, RelayParams},
    Axis, ControlGains,
};
use crate::sample::KinematicSample;
use util::session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Discrete PID controller for a single axis.
#[derive(Debug, Clone, Serialize)]
pub struct AxisPid {
    gains: ControlGains,

    /// Sample period
    ///
    /// Units: seconds
    period_s: f64,

    /// Integral increment coefficient
    bi: f64,

    /// Derivative filter pole
    ad: f64,

    /// Derivative gain after filtering
    bd: f64,

    /// Integral accumulator
    integral: f64,

    /// Previous derivative branch output
    derivative: f64,

    /// Previous derivative branch error
    prev_d_error: Option<f64>,
}

/// PID law over the three lab axes.
#[derive(Debug)]
pub struct PidLaw {
    axes: [AxisPid; 3],
    mode: PidMode,
    relay: RelayParams,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum PidMode {
    Tracking,
    Identifying(Box<AutotuneSession>),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AxisPid {
    pub fn new(gains: ControlGains, period_s: f64) -> Self {
        let mut pid = Self {
            gains,
            period_s,
            bi: 0.0,
            ad: 0.0,
            bd: 0.0,
            integral: 0.0,
            derivative: 0.0,
            prev_d_error: None,
        };
        pid.update_coefficients();
        pid
    }

    pub fn gains(&self) -> &ControlGains {
        &self.gains
    }

    /// Replace the gains. The filter coefficients are re-derived immediately, the controller
    /// state is kept.
    pub fn set_gains(&mut self, gains: ControlGains) {
        self.gains = gains;
        self.update_coefficients();
    }

    /// Clear the integral and derivative state.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.derivative = 0.0;
        self.prev_d_error = None;
    }

    /// Current integral branch output.
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Last derivative branch output.
    pub fn derivative(&self) -> f64 {
        self.derivative
    }

    /// Controller output for the given setpoint and measurement.
    pub fn update(&mut self, setpoint: f64, measurement: f64) -> f64 {
        let g = &self.gains;

        let p = g.k * (g.b * setpoint - measurement);

        // No derivative kick on the first sample after a reset
        let d_error = g.c * setpoint - measurement;
        let d = match self.prev_d_error {
            Some(prev) => self.ad * self.derivative + self.bd * (d_error - prev),
            None => 0.0,
        };

        let i = self.integral;
        let out = p + i + d + g.u0;

        // Anti-windup: freeze the accumulator once the branch reaches its limit
        if i.abs() < g.i_lim {
            self.integral += self.bi * (setpoint - measurement);
        }

        self.derivative = d;
        self.prev_d_error = Some(d_error);

        out
    }

    fn update_coefficients(&mut self) {
        let g = &self.gains;
        let h = self.period_s;

        self.bi = if g.ti > 0.0 && g.ti.is_finite() {
            g.k * h / g.ti
        } else {
            0.0
        };

        let denom = g.td + g.n * h;
        if denom > 0.0 {
            self.ad = g.td / denom;
            self.bd = g.k * g.td * g.n / denom;
        } else {
            self.ad = 0.0;
            self.bd = 0.0;
        }
    }
}

impl PidLaw {
    pub fn new(gains: ControlGains, period_s: f64, relay: RelayParams) -> Self {
        let axis = AxisPid::new(gains, period_s);

        Self {
            axes: [axis.clone(), axis.clone(), axis],
            mode: PidMode::Tracking,
            relay,
        }
    }

    /// Commanded acceleration, without gravity compensation.
    pub fn compute_acceleration(
        &mut self,
        current: &KinematicSample,
        target: &KinematicSample,
    ) -> Vector3<f64> {
        // A finished session is consumed before anything is computed, so new gains only ever
        // apply from the start of a tick
        self.finish_autotune();

        let mut out = Vector3::zeros();

        for axis in Axis::ALL.iter() {
            let i = axis.index();
            let r = target.pos_m[i];
            let y = current.pos_m[i];

            out[i] = match &mut self.mode {
                PidMode::Identifying(session) if session.request.axis == *axis => {
                    session.step(r - y)
                }
                _ => self.axes[i].update(r, y),
            };
        }

        trace!("PID output: {:?}", out.as_slice());

        out
    }

    /// Clear the state of every axis.
    pub fn reset(&mut self) {
        for axis in self.axes.iter_mut() {
            axis.reset();
        }
    }

    /// Gains of the given axis.
    pub fn gains(&self, axis: Axis) -> ControlGains {
        self.axes[axis.index()].gains
    }

    /// Update named gains on every axis.
    ///
    /// Unknown names and invalid values are ignored with a warning. Returns the number of gains
    /// applied.
    pub fn set_gains(&mut self, updates: &[(&str, f64)]) -> usize {
        let mut num_applied = 0;

        for axis in self.axes.iter_mut() {
            let mut gains = axis.gains;
            num_applied = 0;

            for (name, value) in updates {
                match gains.set(name, *value) {
                    Ok(()) => num_applied += 1,
                    Err(e) => warn!("Gain update ignored: {}", e),
                }
            }

            axis.set_gains(gains);
        }

        info!("{} PID gain(s) updated", num_applied);
        num_applied
    }

    /// Replace the gains of every axis.
    pub fn replace_gains(&mut self, gains: ControlGains) {
        for axis in self.axes.iter_mut() {
            axis.set_gains(gains);
        }
    }

    pub fn set_relay_params(&mut self, relay: RelayParams) {
        self.relay = relay;
    }

    /// Toggle autotuning.
    ///
    /// Starts a session for the requested axis when tracking, cancels the running session when
    /// identifying. Returns true if a session was started.
    pub fn autotune(&mut self, request: AutotuneRequest) -> bool {
        match self.mode {
            PidMode::Tracking => {
                let i = request.axis.index();
                let session = AutotuneSession::new(
                    request,
                    self.relay,
                    self.axes[i].period_s,
                    self.axes[i].gains.u0,
                );
                info!(
                    "Starting autotune of the {:?} axis ({:?} identification, {:?} synthesis)",
                    request.axis, request.identification, request.synthesis
                );
                self.mode = PidMode::Identifying(Box::new(session));
                true
            }
            PidMode::Identifying(ref session) => {
                let axis = session.request.axis;
                info!(
                    "Autotune of the {:?} axis cancelled, keeping the current gains",
                    axis
                );

                // Tracking restarts from a clean state on the tuned axis
                self.mode = PidMode::Tracking;
                self.axes[axis.index()].reset();
                false
            }
        }
    }

    pub fn is_identifying(&self) -> bool {
        matches!(self.mode, PidMode::Identifying(_))
    }

    /// Output of the vertical derivative branch at the last tick.
    pub fn derivative_diagnostic(&self) -> f64 {
        self.axes[Axis::Z.index()].derivative()
    }

    /// If the running session has an outcome, apply it and return to tracking.
    fn finish_autotune(&mut self) {
        let (request, outcome) = match &self.mode {
            PidMode::Identifying(session) => match session.outcome() {
                Some(o) => (session.request, o),
                None => return,
            },
            PidMode::Tracking => return,
        };

        self.mode = PidMode::Tracking;

        let pid = &mut self.axes[request.axis.index()];

        match outcome {
            Ok(ultimate) => {
                let gains = request.synthesis.synthesise(&ultimate, &pid.gains);
                info!(
                    "Autotune of the {:?} axis complete: Ku = {:.4}, Tu = {:.4} s, new gains {:?}",
                    request.axis, ultimate.ku, ultimate.tu_s, gains
                );

                pid.set_gains(gains);
                pid.reset();

                session::save_with_timestamp(
                    "autotune/gains.json",
                    AutotuneRecord::new(request, ultimate, gains),
                );
            }
            Err(e) => warn!(
                "Autotune of the {:?} axis failed ({}), keeping the current gains",
                request.axis, e
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ctrl::autotune::{IdentificationMethod, SynthesisMethod};

    fn gains(k: f64, ti: f64, td: f64) -> ControlGains {
        ControlGains {
            k,
            ti,
            td,
            ..Default::default()
        }
    }

    #[test]
    fn test_proportional_only() {
        let mut pid = AxisPid::new(gains(2.0, f64::INFINITY, 0.0), 0.1);
        assert_eq!(pid.update(1.0, 0.25), 1.5);
        assert_eq!(pid.update(1.0, 0.5), 1.0);
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn test_integral_accumulates() {
        let mut pid = AxisPid::new(gains(1.0, 1.0, 0.0), 0.1);

        // The integral branch lags one tick behind the error
        assert!((pid.update(1.0, 0.0) - 1.0).abs() < 1e-12);
        assert!((pid.update(1.0, 0.0) - 1.1).abs() < 1e-12);
        assert!((pid.update(1.0, 0.0) - 1.2).abs() < 1e-12);

        pid.reset();
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn test_anti_windup_freezes() {
        let mut g = gains(1.0, 1.0, 0.0);
        g.i_lim = 0.5;
        let mut pid = AxisPid::new(g, 0.1);

        for _ in 0..20 {
            pid.update(1.0, 0.0);
        }

        let frozen = pid.integral();
        assert!(frozen >= 0.5);
        assert!(frozen < 0.7);

        // Frozen from tick to tick, while the proportional branch still responds
        let out_a = pid.update(1.0, 0.0);
        assert_eq!(pid.integral(), frozen);
        let out_b = pid.update(1.0, 0.5);
        assert_eq!(pid.integral(), frozen);
        assert!((out_a - out_b - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_filtered_derivative() {
        let h = 0.1;
        let mut g = gains(1.0, f64::INFINITY, 0.5);
        g.n = 10.0;
        let mut pid = AxisPid::new(g, h);

        // First sample never kicks
        pid.update(0.0, 0.0);
        assert_eq!(pid.derivative(), 0.0);

        // A step in the measurement gives a negative derivative which then decays
        pid.update(0.0, 1.0);
        let ad = 0.5 / (0.5 + 10.0 * h);
        let bd = 1.0 * 0.5 * 10.0 / (0.5 + 10.0 * h);
        assert!((pid.derivative() + bd).abs() < 1e-12);

        pid.update(0.0, 1.0);
        assert!((pid.derivative() + ad * bd).abs() < 1e-12);
    }

    #[test]
    fn test_gain_change_next_tick() {
        let mut law = PidLaw::new(gains(1.0, f64::INFINITY, 0.0), 0.1, RelayParams::default());
        let current = KinematicSample::default();
        let target = KinematicSample::hold(Vector3::new(1.0, 2.0, 3.0), 0.0);

        let out = law.compute_acceleration(&current, &target);
        assert_eq!(out, Vector3::new(1.0, 2.0, 3.0));

        assert_eq!(law.set_gains(&[("K", 2.0), ("Kq", 7.0)]), 1);
        assert_eq!(law.gains(Axis::Y).k, 2.0);

        let out = law.compute_acceleration(&current, &target);
        assert_eq!(out, Vector3::new(2.0, 4.0, 6.0));
    }

    #[test]
    fn test_autotune_toggle() {
        let mut law = PidLaw::new(ControlGains::default(), 0.1, RelayParams::default());
        let request = AutotuneRequest {
            axis: Axis::Z,
            identification: IdentificationMethod::Relay,
            synthesis: SynthesisMethod::ZieglerNichols,
        };

        assert!(law.autotune(request));
        assert!(law.is_identifying());

        // Only the tuned axis is driven by the relay
        let relay = RelayParams::default();
        let current = KinematicSample::default();
        let target = KinematicSample::hold(Vector3::new(0.0, 0.0, 1.0), 0.0);
        let out = law.compute_acceleration(&current, &target);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[2], relay.amplitude_mss);

        assert!(!law.autotune(request));
        assert!(!law.is_identifying());
        assert_eq!(law.gains(Axis::Z), ControlGains::default());
    }

    #[test]
    fn test_cancelled_autotune_resets_axis() {
        let mut g = gains(1.0, 1.0, 0.5);
        g.n = 10.0;
        let mut law = PidLaw::new(g, 0.1, RelayParams::default());
        let current = KinematicSample::default();
        let target = KinematicSample::hold(Vector3::new(1.0, 0.0, 0.0), 0.0);

        for _ in 0..5 {
            law.compute_acceleration(&current, &target);
        }
        assert!(law.axes[0].integral() > 0.0);

        let request = AutotuneRequest {
            axis: Axis::X,
            identification: IdentificationMethod::Relay,
            synthesis: SynthesisMethod::ZieglerNichols,
        };
        assert!(law.autotune(request));
        for _ in 0..3 {
            law.compute_acceleration(&current, &target);
        }
        assert!(!law.autotune(request));

        assert_eq!(law.axes[0].integral(), 0.0);
        assert_eq!(law.axes[0].derivative(), 0.0);

        // No derivative kick against the error seen before identification
        let moved = KinematicSample::hold(Vector3::new(0.5, 0.0, 0.0), 0.0);
        let out = law.compute_acceleration(&moved, &target);
        assert_eq!(law.axes[0].derivative(), 0.0);
        assert!((out[0] - 0.5).abs() < 1e-12);

        // Cancelling never touches the gains
        assert_eq!(law.gains(Axis::X), g);
    }

    #[test]
    fn test_failed_autotune_keeps_gains() {
        let relay = RelayParams {
            max_duration_s: 1.0,
            ..Default::default()
        };
        let mut law = PidLaw::new(ControlGains::default(), 0.1, relay);
        law.autotune(AutotuneRequest {
            axis: Axis::X,
            identification: IdentificationMethod::Relay,
            synthesis: SynthesisMethod::TyreusLuyben,
        });

        // A constant error never makes the relay switch
        let current = KinematicSample::default();
        let target = KinematicSample::hold(Vector3::new(1.0, 0.0, 0.0), 0.0);
        for _ in 0..20 {
            law.compute_acceleration(&current, &target);
        }

        assert!(!law.is_identifying());
        assert_eq!(law.gains(Axis::X), ControlGains::default());
    }
}
