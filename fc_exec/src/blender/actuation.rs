//! # Actuation
//!
//! Mapping from a commanded acceleration in the lab frame to an RC override frame.
//!
//! The horizontal part of the acceleration is first rotated into the yaw frame of the quadrotor.
//! The norm of the rotated vector sets the throttle (thrust grows with the square of the pulse
//! above zero), its direction sets the pitch and roll tilts.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::fc::{RcOverride, CH_AUX, CH_PITCH, CH_ROLL, CH_THROTTLE, CH_YAW_RATE};
use nalgebra::Vector3;

// Internal
use super::BlenderParams;
use crate::ctrl::GRAVITY_MSS;
use util::maths::{angular_difference_deg, clamp};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Throttle saturation.
///
/// Units: microseconds
pub const THROTTLE_RANGE_US: (f64, f64) = (1000.0, 2000.0);

/// Pitch and roll saturation.
///
/// Units: microseconds
pub const TILT_RANGE_US: (f64, f64) = (1350.0, 1700.0);

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Blend the control law and avoidance accelerations.
///
/// The horizontal axes are mixed with the weight `w` given to avoidance, the vertical axis always
/// comes from the control law.
pub fn blend(ctrl: &Vector3<f64>, avoid: &Vector3<f64>, weight: f64) -> Vector3<f64> {
    let w = clamp(weight, 0.0, 1.0);

    Vector3::new(
        w * avoid[0] + (1.0 - w) * ctrl[0],
        w * avoid[1] + (1.0 - w) * ctrl[1],
        ctrl[2],
    )
}

/// Rotate the horizontal axes of a lab frame vector by `-yaw`.
pub fn lab_to_yaw_frame(v: &Vector3<f64>, yaw_deg: f64) -> Vector3<f64> {
    let (s, c) = yaw_deg.to_radians().sin_cos();
    Vector3::new(c * v[0] + s * v[1], -s * v[0] + c * v[1], v[2])
}

/// Rotate the horizontal axes of a yaw frame vector by `+yaw`.
pub fn yaw_to_lab_frame(v: &Vector3<f64>, yaw_deg: f64) -> Vector3<f64> {
    let (s, c) = yaw_deg.to_radians().sin_cos();
    Vector3::new(c * v[0] - s * v[1], s * v[0] + c * v[1], v[2])
}

/// Build the RC override frame for the commanded acceleration.
pub fn to_rc_override(
    acc: &Vector3<f64>,
    yaw_deg: f64,
    target_yaw_deg: f64,
    params: &BlenderParams,
    aux: u16,
) -> RcOverride {
    let neutral = params.control_neutral;
    let rot = lab_to_yaw_frame(acc, yaw_deg);
    let norm = rot.norm();

    // Yaw rate from the shortest way round to the target yaw
    let diff = angular_difference_deg(yaw_deg, target_yaw_deg);
    let w_yaw = -params.k_yaw * diff.to_radians();
    let yaw_rate = neutral - params.n_yaw * clamp(w_yaw / params.w_inf, -1.0, 1.0);

    let (throttle, pitch, roll) = if norm > 0.0 && norm.is_finite() {
        (
            params.control_cancel_gravity * (norm / GRAVITY_MSS).sqrt(),
            neutral - params.ktt_per_rad() * clamp(rot[0] / norm, -1.0, 1.0).asin(),
            neutral - params.kphi_per_rad() * clamp(rot[1] / norm, -1.0, 1.0).asin(),
        )
    } else {
        // No thrust direction: level attitude and the lowest throttle
        (params.control_min, neutral, neutral)
    };

    let mut cmd = RcOverride::default();
    cmd.channels[CH_ROLL] = to_pulse(clamp(roll, TILT_RANGE_US.0, TILT_RANGE_US.1));
    cmd.channels[CH_PITCH] = to_pulse(clamp(pitch, TILT_RANGE_US.0, TILT_RANGE_US.1));
    cmd.channels[CH_THROTTLE] =
        to_pulse(clamp(throttle, THROTTLE_RANGE_US.0, THROTTLE_RANGE_US.1));
    cmd.channels[CH_YAW_RATE] = to_pulse(yaw_rate);
    cmd.channels[CH_AUX] = aux;

    cmd
}

/// The minimal throttle, level frame sent while no target is available.
pub fn safe_command(params: &BlenderParams) -> RcOverride {
    let neutral = to_pulse(params.control_neutral);

    let mut cmd = RcOverride::default();
    cmd.channels[CH_ROLL] = neutral;
    cmd.channels[CH_PITCH] = neutral;
    cmd.channels[CH_THROTTLE] = to_pulse(params.control_arming_min);
    cmd.channels[CH_YAW_RATE] = neutral;

    cmd
}

/// Round a pulse width to the nearest microsecond.
fn to_pulse(us: f64) -> u16 {
    clamp(us, 0.0, u16::MAX as f64).round() as u16
}
