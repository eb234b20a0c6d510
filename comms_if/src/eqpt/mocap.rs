//! # Motion Capture Samples
//!
//! Position and derivative samples of tracked bodies, as delivered by the motion capture
//! derivator and as published by the trajectory generator as targets.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Position, velocity and acceleration of a body in the lab frame, plus its yaw.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct QuadSample {
    /// Position in the lab frame.
    ///
    /// Units: meters
    pub pos_m: [f64; 3],

    /// Velocity in the lab frame.
    ///
    /// Units: meters/second
    pub vel_ms: [f64; 3],

    /// Acceleration in the lab frame.
    ///
    /// Units: meters/second^2
    pub acc_mss: [f64; 3],

    /// Yaw angle about the lab Z axis.
    ///
    /// Units: degrees
    pub yaw_deg: f64,
}

/// Target sample used by the load transport controller.
///
/// The sample describes where the payload should be, the offset gives where the carrier should be
/// relative to the payload.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct QuadSampleExt {
    /// Target state of the payload
    pub payload: QuadSample,

    /// Desired carrier position relative to the payload.
    ///
    /// Units: meters
    pub carrier_offset_m: [f64; 3],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl QuadSample {
    /// A stationary sample at the given position and yaw.
    pub fn hold(pos_m: [f64; 3], yaw_deg: f64) -> Self {
        Self {
            pos_m,
            yaw_deg,
            ..Default::default()
        }
    }
}

impl From<QuadSample> for QuadSampleExt {
    fn from(payload: QuadSample) -> Self {
        Self {
            payload,
            carrier_offset_m: [0.0; 3],
        }
    }
}
