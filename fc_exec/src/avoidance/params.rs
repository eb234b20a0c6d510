//! Obstacle avoidance parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use util::params::Validate;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceParams {
    /// Gain of the repulsive field
    pub gain: f64,

    /// Saturation of the total repulsive acceleration.
    ///
    /// Units: meters/second^2
    pub max_acc_mss: f64,

    /// Obstacles further than this are ignored.
    ///
    /// Units: meters
    pub influence_radius_m: f64,

    /// Obstacles closer than this give full authority to avoidance.
    ///
    /// Units: meters
    pub safety_radius_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for AvoidanceParams {
    fn default() -> Self {
        Self {
            gain: 0.5,
            max_acc_mss: 2.0,
            influence_radius_m: 1.0,
            safety_radius_m: 0.4,
        }
    }
}

impl Validate for AvoidanceParams {
    fn validate(&mut self) -> Vec<&'static str> {
        let mut reset = vec![];
        let def = Self::default();

        if !(self.gain.is_finite() && self.gain >= 0.0) {
            self.gain = def.gain;
            reset.push("gain");
        }
        if !(self.max_acc_mss.is_finite() && self.max_acc_mss >= 0.0) {
            self.max_acc_mss = def.max_acc_mss;
            reset.push("max_acc_mss");
        }

        // The blend ramp needs a non-empty band between the two radii
        let radii_valid = self.safety_radius_m.is_finite()
            && self.influence_radius_m.is_finite()
            && self.safety_radius_m >= 0.0
            && self.influence_radius_m > self.safety_radius_m;
        if !radii_valid {
            self.influence_radius_m = def.influence_radius_m;
            self.safety_radius_m = def.safety_radius_m;
            reset.push("influence_radius_m");
            reset.push("safety_radius_m");
        }

        reset
    }
}
