//! # Kinematic profile
//!
//! Smooth scalar profile along a path of length `dist`, bounded in acceleration. The profile is
//! the cubic
//!
//! ```text
//! s(t) = c t^2 (t - 1.5 t_f),   c = -2 dist / t_f^3,   t_f = sqrt(6 dist / (0.9 a_max))
//! ```
//!
//! which starts and ends at rest and peaks at `0.9 a_max` at both ends.

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Fraction of the acceleration bound actually used by the profile.
pub const ACC_MARGIN: f64 = 0.9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile {
    /// Path length
    ///
    /// Units: meters
    dist: f64,

    /// Duration of the profile
    ///
    /// Units: seconds
    t_f: f64,

    /// Path constant
    c: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Profile {
    /// Build the profile for a path of length `dist_m` and acceleration bound `a_max_mss`.
    ///
    /// A zero (or invalid) length or bound gives the empty profile, `t_f = 0` and `c = 0`.
    pub fn new(dist_m: f64, a_max_mss: f64) -> Self {
        let valid = dist_m.is_finite()
            && a_max_mss.is_finite()
            && dist_m > 0.0
            && a_max_mss > 0.0;

        if !valid {
            return Self {
                dist: 0.0,
                t_f: 0.0,
                c: 0.0,
            };
        }

        let t_f = (6.0 * dist_m / (ACC_MARGIN * a_max_mss)).sqrt();

        Self {
            dist: dist_m,
            t_f,
            c: -2.0 * dist_m / t_f.powi(3),
        }
    }

    pub fn dist(&self) -> f64 {
        self.dist
    }

    /// Duration of the profile in seconds.
    pub fn duration_s(&self) -> f64 {
        self.t_f
    }

    /// Path constant `c`.
    pub fn path_constant(&self) -> f64 {
        self.c
    }

    /// Distance travelled at time `t`.
    ///
    /// Before the start the profile is at 0, after `t_f` it holds at `dist`.
    pub fn s(&self, t: f64) -> f64 {
        if t <= 0.0 {
            0.0
        } else if t >= self.t_f {
            self.dist
        } else {
            t * t * self.c * (t - 1.5 * self.t_f)
        }
    }

    /// Speed along the path at time `t`, zero outside `(0, t_f)`.
    pub fn s_dot(&self, t: f64) -> f64 {
        if t <= 0.0 || t >= self.t_f {
            0.0
        } else {
            self.c * (3.0 * t * t - 3.0 * self.t_f * t)
        }
    }

    /// Acceleration along the path at time `t`, zero outside `[0, t_f)`.
    pub fn s_ddot(&self, t: f64) -> f64 {
        if t < 0.0 || t >= self.t_f {
            0.0
        } else {
            self.c * (6.0 * t - 3.0 * self.t_f)
        }
    }
}
