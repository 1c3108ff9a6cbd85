//! Two-body orbit utilities: Cartesian state ⇄ classical elements, regime classification,
//! Kepler-equation solvers, and analytic propagation along conic arcs.

pub mod elements;
pub mod kepler;
pub mod propagate;

pub use elements::{
    Degeneracy, OrbitRegime, OrbitalElements, StateConversion, StateVector, to_elements, to_state,
};
pub use kepler::{KeplerSolution, KeplerSolver};
pub use propagate::{Propagation, PropagationError, propagate, propagate_elliptical};

use orbsim_core::vector::{self, Vector3};

/// Error returned when an input makes two-body geometry meaningless.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrbitError {
    #[error("gravitational parameter must be positive and finite (got {0})")]
    InvalidGravitationalParameter(f64),
    #[error("position magnitude {0} m is too small to define an orbit")]
    ZeroRadius(f64),
    #[error("state vector contains non-finite components")]
    NonFinite,
    #[error("semi-latus rectum {0} m does not describe a conic")]
    DegenerateConic(f64),
    #[error("true anomaly {0} rad lies beyond the hyperbolic asymptotes")]
    UnreachableAnomaly(f64),
}

/// Local circular orbit speed at radius `r_m`.
pub fn circular_speed(mu_m3_s2: f64, r_m: f64) -> f64 {
    (mu_m3_s2 / r_m).sqrt()
}

/// Escape speed at radius `r_m`: `sqrt(2μ/r)`.
pub fn escape_speed(mu_m3_s2: f64, r_m: f64) -> f64 {
    (2.0 * mu_m3_s2 / r_m).sqrt()
}

/// Vis-viva speed on a conic of semi-major axis `a_m` at radius `r_m`.
pub fn vis_viva_speed(mu_m3_s2: f64, r_m: f64, a_m: f64) -> f64 {
    let inv_a = if a_m.is_infinite() { 0.0 } else { 1.0 / a_m };
    (mu_m3_s2 * (2.0 / r_m - inv_a)).max(0.0).sqrt()
}

/// Specific orbital energy `|v|²/2 − μ/|r|`.
pub fn specific_energy(mu_m3_s2: f64, position: &Vector3, velocity: &Vector3) -> f64 {
    0.5 * vector::norm_squared(velocity) - mu_m3_s2 / vector::norm(position)
}

/// Patched-conic burn from a circular orbit onto a hyperbola with excess speed `vinf_m_s`.
pub fn escape_delta_v(mu_m3_s2: f64, parking_radius_m: f64, vinf_m_s: f64) -> f64 {
    let circular = circular_speed(mu_m3_s2, parking_radius_m);
    let hyperbolic = (vinf_m_s * vinf_m_s + 2.0 * mu_m3_s2 / parking_radius_m).sqrt();
    (hyperbolic - circular).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbsim_core::constants::{EARTH_MASS_KG, EARTH_RADIUS_M, G};

    #[test]
    fn escape_speed_at_iss_altitude() {
        let mu = G * EARTH_MASS_KG;
        let v = escape_speed(mu, EARTH_RADIUS_M + 400_000.0);
        assert!((v - 10_850.0).abs() < 5.0, "escape speed = {v}");
    }

    #[test]
    fn vis_viva_matches_circular_and_escape_limits() {
        let mu = 3.986e14;
        let r = 7.0e6;
        assert!((vis_viva_speed(mu, r, r) - circular_speed(mu, r)).abs() < 1e-9);
        assert!((vis_viva_speed(mu, r, f64::INFINITY) - escape_speed(mu, r)).abs() < 1e-9);
    }

    #[test]
    fn escape_burn_with_zero_excess_reaches_escape_speed() {
        let mu = 3.986e14;
        let r = 6.678e6;
        let dv = escape_delta_v(mu, r, 0.0);
        assert!((dv - (escape_speed(mu, r) - circular_speed(mu, r))).abs() < 1e-9);
    }
}
