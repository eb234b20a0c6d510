//! # Potential field generator
//!
//! Bounded acceleration from a separation distance and direction. The same field drives the
//! leader trajectory (attractive, towards the leader) and obstacle avoidance (repulsive, away
//! from each obstacle); only the parameters and the direction passed in differ.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// Internal
use util::maths::clamp;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Shape of the field magnitude as a function of distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Magnitude grows linearly with distance: `gain * d`
    Attractive,

    /// Magnitude is `gain * (1/d - 1/d_inf)` inside the influence radius, zero outside
    Repulsive,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PotentialField {
    pub kind: FieldKind,

    /// Field gain
    pub gain: f64,

    /// Saturation of the acceleration magnitude.
    ///
    /// Units: meters/second^2
    pub max_acc_mss: f64,

    /// Influence radius, only used by repulsive fields.
    ///
    /// Units: meters
    pub influence_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PotentialField {
    pub fn attractive(gain: f64, max_acc_mss: f64) -> Self {
        Self {
            kind: FieldKind::Attractive,
            gain,
            max_acc_mss,
            influence_m: f64::INFINITY,
        }
    }

    pub fn repulsive(gain: f64, max_acc_mss: f64, influence_m: f64) -> Self {
        Self {
            kind: FieldKind::Repulsive,
            gain,
            max_acc_mss,
            influence_m,
        }
    }

    /// Magnitude of the field at the given distance, in `[0, max_acc_mss]`.
    ///
    /// Negative or non-finite distances are treated as zero distance.
    pub fn magnitude(&self, distance_m: f64) -> f64 {
        let max = self.max_acc_mss.max(0.0);
        let d = if distance_m.is_finite() {
            distance_m.max(0.0)
        } else {
            0.0
        };

        match self.kind {
            FieldKind::Attractive => clamp(self.gain * d, 0.0, max),
            FieldKind::Repulsive => {
                if d >= self.influence_m {
                    0.0
                } else if d <= 0.0 {
                    max
                } else {
                    clamp(self.gain * (1.0 / d - 1.0 / self.influence_m), 0.0, max)
                }
            }
        }
    }

    /// Acceleration at the given distance, directed along `direction`.
    ///
    /// The direction need not be normalised. A zero direction gives zero acceleration.
    pub fn acceleration(&self, distance_m: f64, direction: &Vector3<f64>) -> Vector3<f64> {
        unit_or_zero(direction) * self.magnitude(distance_m)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Explicit Euler step of the velocity.
pub fn velocity(v_prev: &Vector3<f64>, acc: &Vector3<f64>, dt_s: f64) -> Vector3<f64> {
    v_prev + acc * dt_s
}

/// Explicit Euler step of the position.
pub fn position(p_prev: &Vector3<f64>, vel: &Vector3<f64>, dt_s: f64) -> Vector3<f64> {
    p_prev + vel * dt_s
}

/// Normalised copy of the vector, or the zero vector if it has no length.
pub fn unit_or_zero(v: &Vector3<f64>) -> Vector3<f64> {
    v.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros)
}
