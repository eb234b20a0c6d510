//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Saturate a value between `min` and `max`.
///
/// NaN inputs saturate to `min` so that a NaN can never reach an actuator.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    if value.is_nan() {
        return min;
    }

    value.max(min).min(max)
}

/// Get the signed shortest angular distance `current - target` in degrees.
///
/// The result lies in `[-180, 180]`. Differences of exactly half a turn keep
/// the sign of the raw difference so that the function stays antisymmetric.
pub fn angular_difference_deg<T>(current: T, target: T) -> T
where
    T: Float
{
    let half_turn = T::from(180.0).unwrap();
    let full_turn = T::from(360.0).unwrap();

    let diff = current - target;
    let wrapped = rem_euclid(diff, full_turn);

    if wrapped > half_turn {
        wrapped - full_turn
    }
    else if wrapped == half_turn && diff < T::zero() {
        -half_turn
    }
    else {
        wrapped
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-5.0, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.5, 0.0, 1.0), 0.5);
        assert_eq!(clamp(f64::NAN, 1000.0, 2000.0), 1000.0);
        assert_eq!(clamp(f64::INFINITY, 1000.0, 2000.0), 2000.0);
    }

    #[test]
    fn test_angular_difference() {
        assert_eq!(angular_difference_deg(170.0, -170.0), -20.0);
        assert_eq!(angular_difference_deg(-170.0, 170.0), 20.0);
        assert_eq!(angular_difference_deg(10.0, 30.0), -20.0);
        assert_eq!(angular_difference_deg(0.0, 0.0), 0.0);
        assert_eq!(angular_difference_deg(90.0, -90.0), 180.0);
        assert_eq!(angular_difference_deg(-90.0, 90.0), -180.0);
        assert_eq!(angular_difference_deg(720.0, 0.0), 0.0);
    }

    #[test]
    fn test_angular_difference_antisymmetric() {
        let mut a = -360.0;
        while a <= 360.0 {
            let mut b = -360.0;
            while b <= 360.0 {
                let ab = angular_difference_deg(a, b);
                let ba = angular_difference_deg(b, a);
                assert!(ab >= -180.0 && ab <= 180.0, "{} {} -> {}", a, b, ab);
                assert_eq!(ab, -ba, "{} {}", a, b);
                b += 15.0;
            }
            a += 15.0;
        }
    }
}
