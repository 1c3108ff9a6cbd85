//! Core units, constants, and shared primitives for the orbital simulation workspace.
//!
//! Everything here is expressed in SI units: metres, seconds, kilograms.

/// Physical constants expressed in SI units (unless stated otherwise).
pub mod constants {
    /// Newtonian gravitational constant (m³/kg/s²).
    pub const G: f64 = 6.674_30e-11;
    /// Standard gravity at Earth's surface (m/s²).
    pub const G0: f64 = 9.80665;
    /// Mass of the Earth (kg).
    pub const EARTH_MASS_KG: f64 = 5.972e24;
    /// Mean radius of the Earth (m).
    pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
    /// Seconds per hour.
    pub const SECONDS_PER_HOUR: f64 = 3_600.0;
    /// Full turn in radians.
    pub const TAU: f64 = std::f64::consts::TAU;
}

/// Basic unit conversion helpers.
pub mod units {
    /// Convert kilometres to metres.
    #[inline]
    pub fn km_to_m(v: f64) -> f64 {
        v * 1_000.0
    }

    /// Convert metres to kilometres.
    #[inline]
    pub fn m_to_km(v: f64) -> f64 {
        v / 1_000.0
    }
}

pub mod time {
    use super::constants::SECONDS_PER_HOUR;

    #[inline]
    pub fn seconds_to_hours(seconds: f64) -> f64 {
        seconds / SECONDS_PER_HOUR
    }
}

/// Angle helpers.
pub mod angle {
    use super::constants::TAU;

    /// Wrap an angle into `[0, 2π)`.
    #[inline]
    pub fn wrap_two_pi(angle: f64) -> f64 {
        let wrapped = angle.rem_euclid(TAU);
        // rem_euclid can round up to exactly TAU for tiny negative inputs
        if wrapped >= TAU { 0.0 } else { wrapped }
    }
}

/// Minimal vector helpers to avoid ad-hoc `[f64; 3]` math everywhere.
pub mod vector {
    /// Alias for a 3D vector in metres or m/s depending on context.
    pub type Vector3 = [f64; 3];

    /// The zero vector.
    pub const ZERO: Vector3 = [0.0, 0.0, 0.0];

    /// Unit vector along the reference Z axis (orbit normal of the reference plane).
    pub const UNIT_Z: Vector3 = [0.0, 0.0, 1.0];

    /// Euclidean norm of a vector.
    #[inline]
    pub fn norm(v: &Vector3) -> f64 {
        dot(v, v).sqrt()
    }

    /// Squared Euclidean norm.
    #[inline]
    pub fn norm_squared(v: &Vector3) -> f64 {
        dot(v, v)
    }

    /// Dot product of two vectors.
    #[inline]
    pub fn dot(a: &Vector3, b: &Vector3) -> f64 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    /// Cross product `a × b`.
    #[inline]
    pub fn cross(a: &Vector3, b: &Vector3) -> Vector3 {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    /// Vector addition.
    #[inline]
    pub fn add(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
    }

    /// Vector subtraction.
    #[inline]
    pub fn sub(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    /// Scale a vector by a scalar.
    #[inline]
    pub fn scale(v: &Vector3, s: f64) -> Vector3 {
        [v[0] * s, v[1] * s, v[2] * s]
    }

    /// Distance between two points.
    #[inline]
    pub fn distance(a: &Vector3, b: &Vector3) -> f64 {
        norm(&sub(a, b))
    }

    /// Unit vector in the direction of `v`, or `None` when `|v|` is below `epsilon`.
    #[inline]
    pub fn try_normalize(v: &Vector3, epsilon: f64) -> Option<Vector3> {
        let n = norm(v);
        if n > epsilon && n.is_finite() {
            Some(scale(v, 1.0 / n))
        } else {
            None
        }
    }

    /// Rotate a vector about the Z axis by `angle` radians (right-handed).
    #[inline]
    pub fn rotate_z(v: &Vector3, angle: f64) -> Vector3 {
        let (s, c) = angle.sin_cos();
        [v[0] * c - v[1] * s, v[0] * s + v[1] * c, v[2]]
    }

    /// Rotate a vector about the X axis by `angle` radians (right-handed).
    #[inline]
    pub fn rotate_x(v: &Vector3, angle: f64) -> Vector3 {
        let (s, c) = angle.sin_cos();
        [v[0], v[1] * c - v[2] * s, v[1] * s + v[2] * c]
    }

    /// True when every component is finite.
    #[inline]
    pub fn is_finite(v: &Vector3) -> bool {
        v.iter().all(|c| c.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::angle::wrap_two_pi;
    use super::vector::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn cross_follows_right_hand_rule() {
        let x = [1.0, 0.0, 0.0];
        let y = [0.0, 1.0, 0.0];
        assert_eq!(cross(&x, &y), UNIT_Z);
        assert_eq!(cross(&y, &x), [0.0, 0.0, -1.0]);
    }

    #[test]
    fn rotations_are_counter_clockwise() {
        let r = rotate_z(&[1.0, 0.0, 0.0], FRAC_PI_2);
        assert!(r[0].abs() < 1e-15 && (r[1] - 1.0).abs() < 1e-15);
        let r = rotate_x(&[0.0, 1.0, 0.0], FRAC_PI_2);
        assert!(r[1].abs() < 1e-15 && (r[2] - 1.0).abs() < 1e-15);
    }

    #[test]
    fn normalize_rejects_tiny_vectors() {
        assert!(try_normalize(&ZERO, 1e-12).is_none());
        let n = try_normalize(&[3.0, 4.0, 0.0], 1e-12).unwrap();
        assert!((norm(&n) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn angle_wrapping() {
        assert!((wrap_two_pi(-FRAC_PI_2) - 1.5 * PI).abs() < 1e-12);
        assert!((wrap_two_pi(5.0 * PI) - PI).abs() < 1e-12);
        assert_eq!(wrap_two_pi(-1e-300), 0.0);
    }
}
