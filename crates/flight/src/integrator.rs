//! Fixed-step integration.

use orbsim_core::vector::{self, Vector3};
use orbsim_orbits::StateVector;

/// Semi-implicit (symplectic) Euler: velocity first, then position with the new velocity.
pub fn semi_implicit_euler(
    state: &StateVector,
    acceleration_m_s2: &Vector3,
    h_s: f64,
) -> StateVector {
    let velocity = vector::add(&state.velocity_m_s, &vector::scale(acceleration_m_s2, h_s));
    let position = vector::add(&state.position_m, &vector::scale(&velocity, h_s));
    StateVector {
        position_m: position,
        velocity_m_s: velocity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbsim_orbits::specific_energy;

    const MU: f64 = 3.986_004_418e14;

    fn central_gravity(r: &Vector3) -> Vector3 {
        let d = vector::norm(r);
        vector::scale(r, -MU / (d * d * d))
    }

    #[test]
    fn position_uses_updated_velocity() {
        let state = StateVector {
            position_m: [0.0; 3],
            velocity_m_s: [1.0, 0.0, 0.0],
        };
        let next = semi_implicit_euler(&state, &[2.0, 0.0, 0.0], 0.5);
        assert_eq!(next.velocity_m_s, [2.0, 0.0, 0.0]);
        assert_eq!(next.position_m, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn circular_orbit_energy_stays_bounded_over_a_revolution() {
        let r0 = 7_000_000.0;
        let mut state = StateVector {
            position_m: [r0, 0.0, 0.0],
            velocity_m_s: [0.0, (MU / r0).sqrt(), 0.0],
        };
        let e0 = specific_energy(MU, &state.position_m, &state.velocity_m_s);
        let period = std::f64::consts::TAU * (r0.powi(3) / MU).sqrt();
        let h = 1.0;
        let steps = (period / h).round() as usize;
        let mut worst = 0.0_f64;
        for _ in 0..steps {
            let a = central_gravity(&state.position_m);
            state = semi_implicit_euler(&state, &a, h);
            let e = specific_energy(MU, &state.position_m, &state.velocity_m_s);
            worst = worst.max(((e - e0) / e0).abs());
        }
        assert!(worst < 5e-3, "relative energy error {worst}");
        let r = vector::norm(&state.position_m);
        assert!((r - r0).abs() / r0 < 5e-3, "radius drifted to {r}");
    }
}
