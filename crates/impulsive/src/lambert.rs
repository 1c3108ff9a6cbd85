use lambert_bate::get_velocities;
use orbsim_core::vector::{self, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LambertSolverError {
    #[error("lambert solver failed: {0}")]
    Failure(String),
    #[error("time of flight must be positive (got {0} s)")]
    InvalidTimeOfFlight(f64),
}

/// Solve Lambert's problem for the velocities at `r1_m` and `r2_m` (SI units throughout).
pub fn solve(
    r1_m: Vector3,
    r2_m: Vector3,
    time_of_flight_s: f64,
    mu_m3_s2: f64,
    short: bool,
) -> Result<(Vector3, Vector3), LambertSolverError> {
    if !(time_of_flight_s > 0.0) {
        return Err(LambertSolverError::InvalidTimeOfFlight(time_of_flight_s));
    }
    get_velocities(r1_m, r2_m, time_of_flight_s, mu_m3_s2, short, 1e-8, 500)
        .map_err(|e| LambertSolverError::Failure(format!("{e:?}")))
}

/// Two-burn intercept of a target position after a fixed time of flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intercept {
    pub departure_velocity_m_s: Vector3,
    pub arrival_velocity_m_s: Vector3,
    /// Burn vector applied at departure.
    pub departure_burn_m_s: Vector3,
    pub delta_v_m_s: f64,
    /// Speed relative to the target at arrival, when the target velocity is known.
    pub arrival_relative_speed_m_s: Option<f64>,
    pub time_of_flight_s: f64,
}

/// Plan an intercept from the current state to `target_position_m` in `time_of_flight_s`.
///
/// The short-way solution is tried first, then the long way.
pub fn intercept(
    position_m: Vector3,
    velocity_m_s: Vector3,
    target_position_m: Vector3,
    target_velocity_m_s: Option<Vector3>,
    time_of_flight_s: f64,
    mu_m3_s2: f64,
) -> Result<Intercept, LambertSolverError> {
    let (v1, v2) = solve(position_m, target_position_m, time_of_flight_s, mu_m3_s2, true)
        .or_else(|_| solve(position_m, target_position_m, time_of_flight_s, mu_m3_s2, false))?;
    let burn = vector::sub(&v1, &velocity_m_s);
    Ok(Intercept {
        departure_velocity_m_s: v1,
        arrival_velocity_m_s: v2,
        departure_burn_m_s: burn,
        delta_v_m_s: vector::norm(&burn),
        arrival_relative_speed_m_s: target_velocity_m_s.map(|vt| vector::distance(&v2, &vt)),
        time_of_flight_s,
    })
}
