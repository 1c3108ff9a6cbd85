//! Conversion between Cartesian state vectors and classical orbital elements.
//!
//! Angles follow the usual conventions: inclination in `[0, π]`, the other angles wrapped into
//! `[0, 2π)`. Degenerate geometry never produces NaN. The undefined angle is replaced by a
//! documented substitute and the caller is told through [`Degeneracy`]:
//!
//! - equatorial orbits (no node line): RAAN = 0, the argument of periapsis is measured from +X;
//! - circular orbits (no periapsis): argument of periapsis = 0, the true anomaly is measured from
//!   the ascending node (argument of latitude), or from +X when also equatorial (true longitude);
//! - rectilinear trajectories (zero angular momentum): inclination, RAAN, argument of periapsis
//!   and true anomaly are all 0.

use orbsim_core::angle::wrap_two_pi;
use orbsim_core::vector::{self, UNIT_Z, Vector3};
use serde::{Deserialize, Serialize};

use crate::OrbitError;

/// Eccentricity below which the periapsis direction is considered undefined.
pub const CIRCULAR_EPSILON: f64 = 1e-9;
/// `sin(i)` below which the node line is considered undefined.
pub const EQUATORIAL_EPSILON: f64 = 1e-9;
/// Distance of the eccentricity from 1 below which a trajectory is treated as parabolic.
pub const PARABOLIC_EPSILON: f64 = 1e-9;
/// `|h| / (|r| |v|)` below which the trajectory is rectilinear.
pub const RECTILINEAR_EPSILON: f64 = 1e-12;
/// Smallest radius (m) accepted as an orbital position.
pub const MIN_RADIUS_M: f64 = 1e-3;

/// Orbit regime selected by eccentricity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrbitRegime {
    Elliptical,
    Parabolic,
    Hyperbolic,
}

impl OrbitRegime {
    /// Classify an eccentricity; values within [`PARABOLIC_EPSILON`] of 1 are parabolic.
    pub fn from_eccentricity(eccentricity: f64) -> Self {
        if (eccentricity - 1.0).abs() < PARABOLIC_EPSILON {
            OrbitRegime::Parabolic
        } else if eccentricity < 1.0 {
            OrbitRegime::Elliptical
        } else {
            OrbitRegime::Hyperbolic
        }
    }

    /// Whether the trajectory is bound to the central body.
    pub fn is_closed(self) -> bool {
        matches!(self, OrbitRegime::Elliptical)
    }
}

/// Which substitutions were made while computing elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degeneracy {
    /// Eccentricity ≈ 0: argument of periapsis set to 0.
    pub circular: bool,
    /// Inclination ≈ 0 or π: RAAN set to 0.
    pub equatorial: bool,
    /// Angular momentum ≈ 0: all angles set to 0.
    pub rectilinear: bool,
}

impl Degeneracy {
    /// True when any substitution was made.
    pub fn any(&self) -> bool {
        self.circular || self.equatorial || self.rectilinear
    }
}

/// Cartesian position (m) and velocity (m/s) relative to the central body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub position_m: Vector3,
    pub velocity_m_s: Vector3,
}

/// Classical orbital elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    /// Negative for hyperbolic trajectories, infinite for parabolic ones.
    pub semi_major_axis_m: f64,
    pub eccentricity: f64,
    pub inclination_rad: f64,
    pub argument_of_periapsis_rad: f64,
    pub longitude_of_ascending_node_rad: f64,
    pub true_anomaly_rad: f64,
    /// `p = h²/μ`; finite for every regime, zero for rectilinear trajectories.
    pub semi_latus_rectum_m: f64,
}

impl OrbitalElements {
    /// Build elements for an elliptical or hyperbolic orbit from its semi-major axis.
    ///
    /// For a parabola use [`OrbitalElements::parabolic`], since `a` is unbounded there.
    pub fn new(
        semi_major_axis_m: f64,
        eccentricity: f64,
        inclination_rad: f64,
        longitude_of_ascending_node_rad: f64,
        argument_of_periapsis_rad: f64,
        true_anomaly_rad: f64,
    ) -> Self {
        Self {
            semi_major_axis_m,
            eccentricity,
            inclination_rad,
            argument_of_periapsis_rad,
            longitude_of_ascending_node_rad,
            true_anomaly_rad,
            semi_latus_rectum_m: semi_major_axis_m * (1.0 - eccentricity * eccentricity),
        }
    }

    /// Build elements for a parabolic trajectory from its semi-latus rectum.
    pub fn parabolic(
        semi_latus_rectum_m: f64,
        inclination_rad: f64,
        longitude_of_ascending_node_rad: f64,
        argument_of_periapsis_rad: f64,
        true_anomaly_rad: f64,
    ) -> Self {
        Self {
            semi_major_axis_m: f64::INFINITY,
            eccentricity: 1.0,
            inclination_rad,
            argument_of_periapsis_rad,
            longitude_of_ascending_node_rad,
            true_anomaly_rad,
            semi_latus_rectum_m,
        }
    }

    pub fn regime(&self) -> OrbitRegime {
        OrbitRegime::from_eccentricity(self.eccentricity)
    }

    /// Closest approach distance to the central body.
    pub fn periapsis_distance(&self) -> f64 {
        self.radius_at(0.0)
    }

    /// Farthest distance from the central body; `None` for open trajectories.
    pub fn apoapsis_distance(&self) -> Option<f64> {
        self.regime()
            .is_closed()
            .then(|| self.semi_major_axis_m * (1.0 + self.eccentricity))
    }

    /// Mean motion `sqrt(μ/|a|³)`; `None` for parabolic trajectories.
    pub fn mean_motion(&self, mu_m3_s2: f64) -> Option<f64> {
        let a = self.semi_major_axis_m.abs();
        (a.is_finite() && a > 0.0).then(|| (mu_m3_s2 / a.powi(3)).sqrt())
    }

    /// Orbital period `2π/n`; `None` for open trajectories.
    pub fn period(&self, mu_m3_s2: f64) -> Option<f64> {
        if !self.regime().is_closed() {
            return None;
        }
        self.mean_motion(mu_m3_s2).map(|n| std::f64::consts::TAU / n)
    }

    /// Radius at true anomaly `nu` from the conic equation.
    pub fn radius_at(&self, nu: f64) -> f64 {
        self.semi_latus_rectum_m / (1.0 + self.eccentricity * nu.cos())
    }

    /// Copy of these elements at a different true anomaly.
    pub fn with_true_anomaly(&self, true_anomaly_rad: f64) -> Self {
        Self {
            true_anomaly_rad: wrap_two_pi(true_anomaly_rad),
            ..*self
        }
    }
}

/// Elements together with the degeneracy substitutions used to obtain them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateConversion {
    pub elements: OrbitalElements,
    pub degeneracy: Degeneracy,
    pub regime: OrbitRegime,
    pub specific_energy_j_kg: f64,
}

fn validate_mu(mu_m3_s2: f64) -> Result<(), OrbitError> {
    if mu_m3_s2 > 0.0 && mu_m3_s2.is_finite() {
        Ok(())
    } else {
        Err(OrbitError::InvalidGravitationalParameter(mu_m3_s2))
    }
}

/// Compute classical elements from a position/velocity pair relative to the central body.
pub fn to_elements(
    position: &Vector3,
    velocity: &Vector3,
    mu_m3_s2: f64,
) -> Result<StateConversion, OrbitError> {
    validate_mu(mu_m3_s2)?;
    if !vector::is_finite(position) || !vector::is_finite(velocity) {
        return Err(OrbitError::NonFinite);
    }
    let r = vector::norm(position);
    if r < MIN_RADIUS_M {
        return Err(OrbitError::ZeroRadius(r));
    }
    let v2 = vector::norm_squared(velocity);
    let r_hat = vector::scale(position, 1.0 / r);

    let h_vec = vector::cross(position, velocity);
    let h = vector::norm(&h_vec);
    let rectilinear = h <= RECTILINEAR_EPSILON * r * v2.sqrt();

    let e_vec = vector::sub(
        &vector::scale(&vector::cross(velocity, &h_vec), 1.0 / mu_m3_s2),
        &r_hat,
    );
    let eccentricity = vector::norm(&e_vec);
    let regime = OrbitRegime::from_eccentricity(eccentricity);

    let energy = 0.5 * v2 - mu_m3_s2 / r;
    let semi_major_axis_m = if regime == OrbitRegime::Parabolic || energy == 0.0 {
        f64::INFINITY
    } else {
        -mu_m3_s2 / (2.0 * energy)
    };
    let semi_latus_rectum_m = h * h / mu_m3_s2;

    if rectilinear {
        return Ok(StateConversion {
            elements: OrbitalElements {
                semi_major_axis_m,
                eccentricity,
                inclination_rad: 0.0,
                argument_of_periapsis_rad: 0.0,
                longitude_of_ascending_node_rad: 0.0,
                true_anomaly_rad: 0.0,
                semi_latus_rectum_m,
            },
            degeneracy: Degeneracy {
                circular: false,
                equatorial: true,
                rectilinear: true,
            },
            regime,
            specific_energy_j_kg: energy,
        });
    }

    let h_hat = vector::scale(&h_vec, 1.0 / h);
    let inclination_rad = vector::dot(&h_hat, &UNIT_Z).clamp(-1.0, 1.0).acos();
    let prograde = h_vec[2] >= 0.0;

    // node vector ẑ × h
    let n_vec = vector::cross(&UNIT_Z, &h_vec);
    let n = vector::norm(&n_vec);
    let equatorial = n <= EQUATORIAL_EPSILON * h;
    let circular = eccentricity < CIRCULAR_EPSILON;

    let longitude_of_ascending_node_rad = if equatorial {
        0.0
    } else {
        wrap_two_pi(n_vec[1].atan2(n_vec[0]))
    };
    let n_hat = if equatorial {
        [1.0, 0.0, 0.0]
    } else {
        vector::scale(&n_vec, 1.0 / n)
    };

    let argument_of_periapsis_rad = if circular {
        0.0
    } else if equatorial {
        let longitude = e_vec[1].atan2(e_vec[0]);
        wrap_two_pi(if prograde { longitude } else { -longitude })
    } else {
        let e_hat = vector::scale(&e_vec, 1.0 / eccentricity);
        let angle = vector::dot(&n_hat, &e_hat).clamp(-1.0, 1.0).acos();
        if e_vec[2] < 0.0 {
            std::f64::consts::TAU - angle
        } else {
            angle
        }
    };

    let true_anomaly_rad = if circular && equatorial {
        let longitude = position[1].atan2(position[0]);
        wrap_two_pi(if prograde { longitude } else { -longitude })
    } else if circular {
        let angle = vector::dot(&n_hat, &r_hat).clamp(-1.0, 1.0).acos();
        if position[2] < 0.0 {
            std::f64::consts::TAU - angle
        } else {
            angle
        }
    } else {
        let e_hat = vector::scale(&e_vec, 1.0 / eccentricity);
        let angle = vector::dot(&e_hat, &r_hat).clamp(-1.0, 1.0).acos();
        if vector::dot(position, velocity) < 0.0 {
            std::f64::consts::TAU - angle
        } else {
            angle
        }
    };

    Ok(StateConversion {
        elements: OrbitalElements {
            semi_major_axis_m,
            eccentricity,
            inclination_rad,
            argument_of_periapsis_rad: wrap_two_pi(argument_of_periapsis_rad),
            longitude_of_ascending_node_rad,
            true_anomaly_rad: wrap_two_pi(true_anomaly_rad),
            semi_latus_rectum_m,
        },
        degeneracy: Degeneracy {
            circular,
            equatorial,
            rectilinear: false,
        },
        regime,
        specific_energy_j_kg: energy,
    })
}

/// Rotate a perifocal vector into the reference frame: `Rz(Ω) · Rx(i) · Rz(ω)`.
pub fn perifocal_to_reference(v: &Vector3, elements: &OrbitalElements) -> Vector3 {
    let v = vector::rotate_z(v, elements.argument_of_periapsis_rad);
    let v = vector::rotate_x(&v, elements.inclination_rad);
    vector::rotate_z(&v, elements.longitude_of_ascending_node_rad)
}

/// Compute the Cartesian state for a set of elements.
pub fn to_state(elements: &OrbitalElements, mu_m3_s2: f64) -> Result<StateVector, OrbitError> {
    validate_mu(mu_m3_s2)?;
    let p = elements.semi_latus_rectum_m;
    if !(p > 0.0 && p.is_finite()) {
        return Err(OrbitError::DegenerateConic(p));
    }
    let e = elements.eccentricity;
    let nu = elements.true_anomaly_rad;
    let (sin_nu, cos_nu) = nu.sin_cos();
    let denom = 1.0 + e * cos_nu;
    if denom <= 0.0 {
        return Err(OrbitError::UnreachableAnomaly(nu));
    }
    let r = p / denom;
    let speed_scale = (mu_m3_s2 / p).sqrt();

    let position_pf = [r * cos_nu, r * sin_nu, 0.0];
    let velocity_pf = [-speed_scale * sin_nu, speed_scale * (e + cos_nu), 0.0];

    Ok(StateVector {
        position_m: perifocal_to_reference(&position_pf, elements),
        velocity_m_s: perifocal_to_reference(&velocity_pf, elements),
    })
}
