//! Geometry helpers shared by the trajectory modes

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;

pub use crate::potential::unit_or_zero;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Vectors shorter than this are treated as zero
pub const EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Right handed orthonormal frame attached to a circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleFrame {
    /// Radial axis, from the centre towards the start point
    pub e_r: Vector3<f64>,

    /// Tangential axis, direction of travel at the start point
    pub e_t: Vector3<f64>,

    /// Normal to the plane of the circle, `e_r x e_t`
    pub e_n: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CircleFrame {
    /// Build the frame from a radial vector and a velocity.
    ///
    /// The velocity is projected onto the plane normal to the radial axis (Gram-Schmidt).
    /// Returns `None` if the radial vector is zero or the velocity has no tangential component.
    pub fn new(radial: &Vector3<f64>, velocity: &Vector3<f64>) -> Option<Self> {
        let e_r = radial.try_normalize(EPSILON)?;
        let e_t = reject(velocity, &e_r).try_normalize(EPSILON)?;

        Some(Self {
            e_r,
            e_t,
            e_n: e_r.cross(&e_t),
        })
    }

    /// Point on the circle of the given centre and radius, `angle_rad` along from the start
    /// point.
    pub fn point(&self, centre: &Vector3<f64>, radius_m: f64, angle_rad: f64) -> Vector3<f64> {
        centre + (self.e_r * angle_rad.cos() + self.e_t * angle_rad.sin()) * radius_m
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Euclidean distance between two points.
pub fn distance(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    (b - a).norm()
}

/// Component of `v` orthogonal to the unit vector `axis`.
pub fn reject(v: &Vector3<f64>, axis: &Vector3<f64>) -> Vector3<f64> {
    v - axis * v.dot(axis)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_frame_is_orthonormal() {
        let f = CircleFrame::new(
            &Vector3::new(2.0, 0.0, 0.0),
            &Vector3::new(0.3, 1.0, 0.0),
        )
        .unwrap();

        assert!((f.e_r - Vector3::x()).norm() < 1e-12);
        assert!((f.e_t - Vector3::y()).norm() < 1e-12);
        assert!((f.e_n - Vector3::z()).norm() < 1e-12);
        assert!(f.e_r.dot(&f.e_t).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_frames() {
        assert!(CircleFrame::new(&Vector3::zeros(), &Vector3::y()).is_none());
        assert!(CircleFrame::new(&Vector3::x(), &Vector3::new(-2.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_circle_point() {
        let f = CircleFrame::new(&Vector3::x(), &Vector3::y()).unwrap();
        let c = Vector3::new(1.0, 1.0, 1.0);
        let p = f.point(&c, 2.0, std::f64::consts::FRAC_PI_2);
        assert!((p - Vector3::new(1.0, 3.0, 1.0)).norm() < 1e-12);
        assert!((distance(&c, &f.point(&c, 2.0, 1.234)) - 2.0).abs() < 1e-12);
    }
}
