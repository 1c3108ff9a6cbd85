//! Analytic estimators for impulsive transfers in the coplanar, circular limit.
//!
//! Burns are signed: positive is prograde, negative is retrograde (inward transfers).

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransferError {
    #[error("orbit radii must be positive and finite (got r1={r1}, r2={r2})")]
    InvalidRadius { r1: f64, r2: f64 },
    #[error("gravitational parameter must be positive (got {0})")]
    InvalidGravitationalParameter(f64),
}

/// Two-impulse Hohmann plan. `delta_v_m_s` is the departure burn; the circularisation burn
/// at the far side is reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransferOrbit {
    pub departure_radius_m: f64,
    pub arrival_radius_m: f64,
    pub semi_major_axis_m: f64,
    pub eccentricity: f64,
    pub transfer_time_s: f64,
    pub delta_v_m_s: f64,
    pub arrival_delta_v_m_s: f64,
    /// `|dv1| + |dv2|`
    pub total_delta_v_m_s: f64,
}

fn check(r1: f64, r2: f64, mu: f64) -> Result<(), TransferError> {
    if !(r1 > 0.0 && r2 > 0.0 && r1.is_finite() && r2.is_finite()) {
        return Err(TransferError::InvalidRadius { r1, r2 });
    }
    if !(mu > 0.0 && mu.is_finite()) {
        return Err(TransferError::InvalidGravitationalParameter(mu));
    }
    Ok(())
}

fn vis_viva(mu: f64, r: f64, a: f64) -> f64 {
    (mu * (2.0 / r - 1.0 / a)).sqrt()
}

/// Hohmann transfer between circular coplanar orbits of radii `r1_m` and `r2_m`.
pub fn hohmann(r1_m: f64, r2_m: f64, mu_m3_s2: f64) -> Result<TransferOrbit, TransferError> {
    check(r1_m, r2_m, mu_m3_s2)?;
    let a_t = 0.5 * (r1_m + r2_m);
    let v1 = (mu_m3_s2 / r1_m).sqrt();
    let v2 = (mu_m3_s2 / r2_m).sqrt();
    let dv1 = vis_viva(mu_m3_s2, r1_m, a_t) - v1;
    let dv2 = v2 - vis_viva(mu_m3_s2, r2_m, a_t);

    Ok(TransferOrbit {
        departure_radius_m: r1_m,
        arrival_radius_m: r2_m,
        semi_major_axis_m: a_t,
        eccentricity: (r2_m - r1_m).abs() / (r2_m + r1_m),
        transfer_time_s: std::f64::consts::PI * (a_t.powi(3) / mu_m3_s2).sqrt(),
        delta_v_m_s: dv1,
        arrival_delta_v_m_s: dv2,
        total_delta_v_m_s: dv1.abs() + dv2.abs(),
    })
}

/// Three-burn bi-elliptic transfer through an intermediate apoapsis `rb_m`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiEllipticTransfer {
    pub intermediate_radius_m: f64,
    pub dv1_m_s: f64,
    pub dv2_m_s: f64,
    pub dv3_m_s: f64,
    pub total_delta_v_m_s: f64,
    pub transfer_time_s: f64,
}

/// Evaluate a bi-elliptic transfer for a given `rb_m`; does not optimise `rb_m`.
pub fn bi_elliptic(
    r1_m: f64,
    r2_m: f64,
    rb_m: f64,
    mu_m3_s2: f64,
) -> Result<BiEllipticTransfer, TransferError> {
    check(r1_m, r2_m, mu_m3_s2)?;
    check(rb_m, rb_m, mu_m3_s2)?;
    let a1 = 0.5 * (r1_m + rb_m);
    let a2 = 0.5 * (rb_m + r2_m);

    let dv1 = vis_viva(mu_m3_s2, r1_m, a1) - (mu_m3_s2 / r1_m).sqrt();
    let dv2 = vis_viva(mu_m3_s2, rb_m, a2) - vis_viva(mu_m3_s2, rb_m, a1);
    let dv3 = (mu_m3_s2 / r2_m).sqrt() - vis_viva(mu_m3_s2, r2_m, a2);
    let half_period = |a: f64| std::f64::consts::PI * (a.powi(3) / mu_m3_s2).sqrt();

    Ok(BiEllipticTransfer {
        intermediate_radius_m: rb_m,
        dv1_m_s: dv1,
        dv2_m_s: dv2,
        dv3_m_s: dv3,
        total_delta_v_m_s: dv1.abs() + dv2.abs() + dv3.abs(),
        transfer_time_s: half_period(a1) + half_period(a2),
    })
}
