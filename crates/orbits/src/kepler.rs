//! Kepler-equation solvers and anomaly conversions.

use orbsim_core::angle::wrap_two_pi;
use serde::{Deserialize, Serialize};

/// Outcome of an iterative Kepler solve.
///
/// A solve that exhausts its iteration budget still returns the best estimate; `converged`
/// tells the caller whether to trust it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeplerSolution {
    /// Eccentric anomaly `E` (elliptic) or hyperbolic anomaly `H`.
    pub anomaly: f64,
    pub iterations: u32,
    /// Absolute residual of the Kepler equation at `anomaly`.
    pub residual: f64,
    pub converged: bool,
}

/// Newton–Raphson solver settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeplerSolver {
    pub max_iterations: u32,
    pub tolerance: f64,
}

impl Default for KeplerSolver {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-12,
        }
    }
}

impl KeplerSolver {
    pub fn new(max_iterations: u32, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
        }
    }

    /// Solve `E − e·sin E = M` for `0 ≤ e < 1`. `M` is wrapped into `[0, 2π)` first.
    pub fn solve_elliptic(&self, mean_anomaly: f64, eccentricity: f64) -> KeplerSolution {
        let m = wrap_two_pi(mean_anomaly);
        let e = eccentricity;
        let mut anomaly = if e < 0.8 {
            m
        } else {
            // Danby's starter keeps Newton inside the basin for highly eccentric orbits
            m + 0.85 * e * m.sin().signum()
        };
        newton(
            self,
            &mut anomaly,
            |x| x - e * x.sin() - m,
            |x| 1.0 - e * x.cos(),
        )
    }

    /// Solve `e·sinh H − H = M` for `e > 1`.
    pub fn solve_hyperbolic(&self, mean_anomaly: f64, eccentricity: f64) -> KeplerSolution {
        let m = mean_anomaly;
        let e = eccentricity;
        let mut anomaly = m.signum() * (2.0 * m.abs() / e + 1.8).ln();
        newton(
            self,
            &mut anomaly,
            |x| e * x.sinh() - x - m,
            |x| e * x.cosh() - 1.0,
        )
    }
}

fn newton(
    solver: &KeplerSolver,
    anomaly: &mut f64,
    f: impl Fn(f64) -> f64,
    df: impl Fn(f64) -> f64,
) -> KeplerSolution {
    for iteration in 0..solver.max_iterations {
        let residual = f(*anomaly);
        if residual.abs() < solver.tolerance {
            return KeplerSolution {
                anomaly: *anomaly,
                iterations: iteration,
                residual: residual.abs(),
                converged: true,
            };
        }
        let slope = df(*anomaly);
        if slope == 0.0 || !slope.is_finite() {
            break;
        }
        *anomaly -= residual / slope;
    }
    let residual = f(*anomaly).abs();
    KeplerSolution {
        anomaly: *anomaly,
        iterations: solver.max_iterations,
        residual,
        converged: residual < solver.tolerance,
    }
}

/// Closed-form solution of Barker's equation `D + D³/3 = W`, returning `D = tan(ν/2)`.
pub fn solve_barker(parabolic_mean_anomaly: f64) -> f64 {
    // odd in W; solving for |W| avoids cancellation for large negative W
    let w = parabolic_mean_anomaly.abs();
    let b = 1.5 * w;
    let a = (b + (1.0 + b * b).sqrt()).cbrt();
    let d = a - 1.0 / a;
    d.copysign(parabolic_mean_anomaly)
}

/// True anomaly from eccentric anomaly on an ellipse.
pub fn true_anomaly_from_eccentric(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    let (s, c) = (0.5 * eccentric_anomaly).sin_cos();
    wrap_two_pi(2.0 * ((1.0 + eccentricity).sqrt() * s).atan2((1.0 - eccentricity).sqrt() * c))
}

/// Eccentric anomaly from true anomaly on an ellipse.
pub fn eccentric_from_true(true_anomaly: f64, eccentricity: f64) -> f64 {
    let (s, c) = (0.5 * true_anomaly).sin_cos();
    wrap_two_pi(2.0 * ((1.0 - eccentricity).sqrt() * s).atan2((1.0 + eccentricity).sqrt() * c))
}

/// Elliptic mean anomaly in `[0, 2π)` for a true anomaly.
pub fn mean_anomaly_from_true(true_anomaly: f64, eccentricity: f64) -> f64 {
    let e_anom = eccentric_from_true(true_anomaly, eccentricity);
    wrap_two_pi(e_anom - eccentricity * e_anom.sin())
}

/// Hyperbolic anomaly from true anomaly; `ν` must lie between the asymptotes.
pub fn hyperbolic_from_true(true_anomaly: f64, eccentricity: f64) -> f64 {
    let x = ((eccentricity - 1.0) / (eccentricity + 1.0)).sqrt() * (0.5 * true_anomaly).tan();
    2.0 * x.atanh()
}

/// True anomaly from hyperbolic anomaly, in `(-π, π)`.
pub fn true_anomaly_from_hyperbolic(hyperbolic_anomaly: f64, eccentricity: f64) -> f64 {
    let scale = ((eccentricity + 1.0) / (eccentricity - 1.0)).sqrt();
    let x = scale * (0.5 * hyperbolic_anomaly).tanh();
    2.0 * x.atan()
}
