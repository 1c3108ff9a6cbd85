//! Analytic two-body propagation along a fixed conic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::OrbitError;
use crate::elements::{OrbitRegime, OrbitalElements, StateVector, to_state};
use crate::kepler::{
    self, KeplerSolution, KeplerSolver, hyperbolic_from_true, mean_anomaly_from_true,
    true_anomaly_from_eccentric, true_anomaly_from_hyperbolic,
};

/// Result of advancing a conic by a time interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Propagation {
    pub state: StateVector,
    /// Input elements with the true anomaly advanced.
    pub elements: OrbitalElements,
    /// `None` for parabolic arcs, which are solved in closed form.
    pub solution: Option<KeplerSolution>,
}

impl Propagation {
    /// False only when an iterative solve ran out of iterations.
    pub fn converged(&self) -> bool {
        self.solution.is_none_or(|s| s.converged)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    #[error("{0:?} trajectories are not handled by this propagator")]
    UnsupportedRegime(OrbitRegime),
    #[error("rectilinear trajectory cannot be propagated analytically")]
    Rectilinear,
    #[error(transparent)]
    Orbit(#[from] OrbitError),
}

/// Advance `elements` by `dt_s` seconds under a point-mass field of parameter `mu_m3_s2`.
///
/// Propagation starts from the current true anomaly. Elliptical arcs wrap the mean anomaly into
/// `[0, 2π)`; hyperbolic arcs use `e·sinh H − H = M`; parabolic arcs use Barker's equation.
pub fn propagate(
    elements: &OrbitalElements,
    mu_m3_s2: f64,
    dt_s: f64,
    solver: &KeplerSolver,
) -> Result<Propagation, PropagationError> {
    if !(mu_m3_s2 > 0.0 && mu_m3_s2.is_finite()) {
        return Err(OrbitError::InvalidGravitationalParameter(mu_m3_s2).into());
    }
    let p = elements.semi_latus_rectum_m;
    if !(p > 0.0) {
        return Err(PropagationError::Rectilinear);
    }
    if !p.is_finite() || !dt_s.is_finite() {
        return Err(OrbitError::NonFinite.into());
    }
    let e = elements.eccentricity;
    let nu0 = elements.true_anomaly_rad;

    let (nu, solution) = match elements.regime() {
        OrbitRegime::Elliptical => {
            let a = p / (1.0 - e * e);
            let n = (mu_m3_s2 / a.powi(3)).sqrt();
            let m = mean_anomaly_from_true(nu0, e) + n * dt_s;
            let sol = solver.solve_elliptic(m, e);
            (true_anomaly_from_eccentric(sol.anomaly, e), Some(sol))
        }
        OrbitRegime::Hyperbolic => {
            if 1.0 + e * nu0.cos() <= 0.0 {
                return Err(OrbitError::UnreachableAnomaly(nu0).into());
            }
            let a = p / (e * e - 1.0);
            let n = (mu_m3_s2 / a.powi(3)).sqrt();
            let h0 = hyperbolic_from_true(nu0, e);
            let m = e * h0.sinh() - h0 + n * dt_s;
            let sol = solver.solve_hyperbolic(m, e);
            (true_anomaly_from_hyperbolic(sol.anomaly, e), Some(sol))
        }
        OrbitRegime::Parabolic => {
            let d0 = (0.5 * nu0).tan();
            let n = 2.0 * (mu_m3_s2 / p.powi(3)).sqrt();
            let w = d0 + d0.powi(3) / 3.0 + n * dt_s;
            (2.0 * kepler::solve_barker(w).atan(), None)
        }
    };

    let advanced = elements.with_true_anomaly(nu);
    let state = to_state(&advanced, mu_m3_s2)?;
    Ok(Propagation {
        state,
        elements: advanced,
        solution,
    })
}

/// Elliptical-only propagation; open trajectories are rejected.
pub fn propagate_elliptical(
    elements: &OrbitalElements,
    mu_m3_s2: f64,
    dt_s: f64,
    solver: &KeplerSolver,
) -> Result<Propagation, PropagationError> {
    match elements.regime() {
        OrbitRegime::Elliptical => propagate(elements, mu_m3_s2, dt_s, solver),
        other => Err(PropagationError::UnsupportedRegime(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::to_elements;
    use crate::{specific_energy, vis_viva_speed};
    use orbsim_core::vector::{self, Vector3};
    use std::f64::consts::PI;

    const MU: f64 = 3.986_004_418e14;

    fn assert_vec_close(a: &Vector3, b: &Vector3, tol: f64) {
        let d = vector::distance(a, b);
        assert!(d < tol, "{a:?} vs {b:?} (|d| = {d})");
    }

    #[test]
    fn full_period_returns_to_start() {
        let el = OrbitalElements::new(9_000_000.0, 0.3, 0.5, 1.0, 2.0, 0.7);
        let start = to_state(&el, MU).unwrap();
        let period = el.period(MU).unwrap();
        let out = propagate(&el, MU, period, &KeplerSolver::default()).unwrap();
        assert!(out.converged());
        assert_vec_close(&out.state.position_m, &start.position_m, 1e-2);
        assert_vec_close(&out.state.velocity_m_s, &start.velocity_m_s, 1e-5);
    }

    #[test]
    fn half_period_from_periapsis_reaches_apoapsis() {
        let el = OrbitalElements::new(10_000_000.0, 0.2, 0.0, 0.0, 0.0, 0.0);
        let half = 0.5 * el.period(MU).unwrap();
        let out = propagate(&el, MU, half, &KeplerSolver::default()).unwrap();
        assert!((out.elements.true_anomaly_rad - PI).abs() < 1e-9);
        let r = vector::norm(&out.state.position_m);
        assert!((r - el.apoapsis_distance().unwrap()).abs() < 1e-3);
    }

    #[test]
    fn speed_after_propagation_matches_vis_viva() {
        let el = OrbitalElements::new(15_000_000.0, 0.6, 1.1, 0.3, 4.0, 1.0);
        let solver = KeplerSolver::default();
        for &dt in &[60.0, 1_234.5, 7_777.0, 40_000.0] {
            let out = propagate(&el, MU, dt, &solver).unwrap();
            let r = vector::norm(&out.state.position_m);
            let v = vector::norm(&out.state.velocity_m_s);
            let expected = vis_viva_speed(MU, r, el.semi_major_axis_m);
            assert!((v - expected).abs() < 1e-6, "dt={dt}: v={v} expected={expected}");
        }
    }

    #[test]
    fn hyperbolic_arc_conserves_energy() {
        let el = OrbitalElements::new(-20_000_000.0, 1.8, 0.4, 0.2, 0.1, -0.5);
        let start = to_state(&el, MU).unwrap();
        let e0 = specific_energy(MU, &start.position_m, &start.velocity_m_s);
        let out = propagate(&el, MU, 5_000.0, &KeplerSolver::default()).unwrap();
        assert!(out.converged());
        let e1 = specific_energy(MU, &out.state.position_m, &out.state.velocity_m_s);
        assert!((e1 - e0).abs() < 1e-6 * e0.abs(), "{e0} vs {e1}");
        assert!(vector::norm(&out.state.position_m) > vector::norm(&start.position_m));
    }

    #[test]
    fn parabolic_arc_stays_at_escape_speed() {
        let el = OrbitalElements::parabolic(14_000_000.0, 0.2, 0.0, 0.0, 0.0);
        let out = propagate(&el, MU, 3_600.0, &KeplerSolver::default()).unwrap();
        assert!(out.solution.is_none());
        let energy = specific_energy(MU, &out.state.position_m, &out.state.velocity_m_s);
        let scale = MU / vector::norm(&out.state.position_m);
        assert!(energy.abs() < 1e-9 * scale, "energy {energy}");
    }

    #[test]
    fn backwards_propagation_undoes_forwards() {
        let r = [7_000_000.0, 0.0, 0.0];
        let v = [0.0, 8_500.0, 500.0];
        let el = to_elements(&r, &v, MU).unwrap().elements;
        let solver = KeplerSolver::default();
        let fwd = propagate(&el, MU, 2_500.0, &solver).unwrap();
        let back = propagate(&fwd.elements, MU, -2_500.0, &solver).unwrap();
        assert_vec_close(&back.state.position_m, &r, 1e-2);
        assert_vec_close(&back.state.velocity_m_s, &v, 1e-5);
    }

    #[test]
    fn elliptical_only_rejects_open_orbits() {
        let hyper = OrbitalElements::new(-20_000_000.0, 1.8, 0.0, 0.0, 0.0, 0.0);
        assert_eq!(
            propagate_elliptical(&hyper, MU, 10.0, &KeplerSolver::default()),
            Err(PropagationError::UnsupportedRegime(OrbitRegime::Hyperbolic))
        );
        let para = OrbitalElements::parabolic(1.0e7, 0.0, 0.0, 0.0, 0.0);
        assert_eq!(
            propagate_elliptical(&para, MU, 10.0, &KeplerSolver::default()),
            Err(PropagationError::UnsupportedRegime(OrbitRegime::Parabolic))
        );
    }

    #[test]
    fn rectilinear_elements_are_rejected() {
        let conv = to_elements(&[7_000_000.0, 0.0, 0.0], &[100.0, 0.0, 0.0], MU).unwrap();
        assert_eq!(
            propagate(&conv.elements, MU, 10.0, &KeplerSolver::default()),
            Err(PropagationError::Rectilinear)
        );
    }
}
