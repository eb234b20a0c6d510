//! Blender parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use util::params::Validate;

use super::GAIN_REFERENCE_ANGLE_DEG;
use crate::{
    avoidance::AvoidanceParams,
    ctrl::{ControllerType, CtrlParams},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the Blender.
///
/// Pulse widths are in microseconds. Names follow the flight controller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlenderParams {
    /// Lowest pulse accepted by the flight controller
    #[serde(rename = "CONTROL_MIN")]
    pub control_min: f64,

    /// Centre stick pulse
    #[serde(rename = "CONTROL_NEUTRAL")]
    pub control_neutral: f64,

    /// Highest pulse accepted by the flight controller
    #[serde(rename = "CONTROL_MAX")]
    pub control_max: f64,

    /// Throttle which keeps the motors armed without lifting off
    #[serde(rename = "CONTROL_ARMING_MIN")]
    pub control_arming_min: f64,

    /// Throttle which cancels gravity at hover
    #[serde(rename = "CONTROL_CANCEL_GRAVITY")]
    pub control_cancel_gravity: f64,

    /// Yaw rate channel deflection at full yaw rate
    #[serde(rename = "N_yaw")]
    pub n_yaw: f64,

    /// Yaw rate gain
    #[serde(rename = "K_yaw")]
    pub k_yaw: f64,

    /// Yaw rate giving full deflection.
    ///
    /// Units: radians/second
    pub w_inf: f64,

    /// Pitch channel deflection for a tilt of `GAIN_REFERENCE_ANGLE_DEG`
    #[serde(rename = "Ktt")]
    pub ktt: f64,

    /// Roll channel deflection for a tilt of `GAIN_REFERENCE_ANGLE_DEG`
    #[serde(rename = "Kphi")]
    pub kphi: f64,

    /// Units: Hertz
    #[serde(rename = "CONTROLLER_FREQUENCY")]
    pub controller_frequency_hz: f64,

    pub controller_type: ControllerType,

    pub obstacle_avoidance: bool,

    pub ctrl: CtrlParams,

    pub avoidance: AvoidanceParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BlenderParams {
    /// Pitch channel gain per radian of tilt.
    pub fn ktt_per_rad(&self) -> f64 {
        self.ktt / GAIN_REFERENCE_ANGLE_DEG.to_radians()
    }

    /// Roll channel gain per radian of tilt.
    pub fn kphi_per_rad(&self) -> f64 {
        self.kphi / GAIN_REFERENCE_ANGLE_DEG.to_radians()
    }

    /// Sample period of the control loop.
    pub fn period_s(&self) -> f64 {
        1.0 / self.controller_frequency_hz
    }
}

impl Default for BlenderParams {
    fn default() -> Self {
        Self {
            control_min: 1000.0,
            control_neutral: 1500.0,
            control_max: 2000.0,
            control_arming_min: 1025.0,
            control_cancel_gravity: 1400.0,
            n_yaw: 500.0,
            k_yaw: 2.0,
            w_inf: 5.0,
            ktt: 1000.0,
            kphi: 1000.0,
            controller_frequency_hz: 30.0,
            controller_type: ControllerType::Pid,
            obstacle_avoidance: false,
            ctrl: CtrlParams::default(),
            avoidance: AvoidanceParams::default(),
        }
    }
}

impl Validate for BlenderParams {
    fn validate(&mut self) -> Vec<&'static str> {
        let mut reset = vec![];
        let def = Self::default();

        // The pulse table is only meaningful as a whole
        let pulses = [
            self.control_min,
            self.control_arming_min,
            self.control_neutral,
            self.control_max,
        ];
        let ordered = pulses.iter().all(|p| p.is_finite())
            && pulses.windows(2).all(|w| w[0] <= w[1])
            && self.control_min >= 0.0
            && self.control_max <= u16::MAX as f64;
        let gravity_valid = self.control_cancel_gravity.is_finite()
            && self.control_cancel_gravity > self.control_min
            && self.control_cancel_gravity <= self.control_max;

        if !(ordered && gravity_valid) {
            self.control_min = def.control_min;
            self.control_arming_min = def.control_arming_min;
            self.control_neutral = def.control_neutral;
            self.control_max = def.control_max;
            self.control_cancel_gravity = def.control_cancel_gravity;
            reset.push("CONTROL_*");
        }

        if !(self.n_yaw.is_finite() && self.n_yaw >= 0.0) {
            self.n_yaw = def.n_yaw;
            reset.push("N_yaw");
        }
        if !self.k_yaw.is_finite() {
            self.k_yaw = def.k_yaw;
            reset.push("K_yaw");
        }
        if !(self.w_inf.is_finite() && self.w_inf > 0.0) {
            self.w_inf = def.w_inf;
            reset.push("w_inf");
        }
        if !self.ktt.is_finite() {
            self.ktt = def.ktt;
            reset.push("Ktt");
        }
        if !self.kphi.is_finite() {
            self.kphi = def.kphi;
            reset.push("Kphi");
        }
        if !(self.controller_frequency_hz.is_finite() && self.controller_frequency_hz > 0.0) {
            self.controller_frequency_hz = def.controller_frequency_hz;
            reset.push("CONTROLLER_FREQUENCY");
        }

        reset.extend(self.ctrl.validate());
        reset.extend(self.avoidance.validate());

        reset
    }
}
