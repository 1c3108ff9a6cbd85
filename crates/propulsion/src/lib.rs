//! Vehicle mass properties, thrust commands and propellant bookkeeping.

use orbsim_atmosphere::DragProperties;
use orbsim_config::VehicleConfig;
use orbsim_core::constants::G0;
use orbsim_core::vector::{self, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Directions shorter than this are treated as "no direction".
pub const MIN_DIRECTION_NORM: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VehicleError {
    #[error("vehicle `{name}`: {reason}")]
    Invalid { name: String, reason: String },
}

/// Vehicle definition used by the flight model.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub name: String,
    pub dry_mass_kg: f64,
    pub propellant_mass_kg: f64,
    pub max_thrust_newtons: f64,
    /// Without a specific impulse, thrust never consumes propellant.
    pub isp_seconds: Option<f64>,
    pub drag: DragProperties,
}

impl Vehicle {
    pub fn from_config(config: &VehicleConfig) -> Result<Self, VehicleError> {
        let invalid = |reason: &str| VehicleError::Invalid {
            name: config.name.clone(),
            reason: reason.to_string(),
        };
        if !(config.dry_mass_kg > 0.0 && config.dry_mass_kg.is_finite()) {
            return Err(invalid("dry mass must be positive"));
        }
        if !(config.propellant_mass_kg >= 0.0) {
            return Err(invalid("propellant mass must be non-negative"));
        }
        if !(config.max_thrust_newtons >= 0.0) {
            return Err(invalid("maximum thrust must be non-negative"));
        }
        if config.isp_seconds.is_some_and(|isp| !(isp > 0.0)) {
            return Err(invalid("specific impulse must be positive"));
        }
        if !(config.drag_coefficient >= 0.0 && config.cross_section_area_m2 >= 0.0) {
            return Err(invalid("drag coefficient and area must be non-negative"));
        }
        Ok(Self {
            name: config.name.clone(),
            dry_mass_kg: config.dry_mass_kg,
            propellant_mass_kg: config.propellant_mass_kg,
            max_thrust_newtons: config.max_thrust_newtons,
            isp_seconds: config.isp_seconds,
            drag: DragProperties {
                drag_coefficient: config.drag_coefficient,
                cross_section_area_m2: config.cross_section_area_m2,
            },
        })
    }

    /// Current total mass.
    pub fn mass_kg(&self) -> f64 {
        self.dry_mass_kg + self.propellant_mass_kg
    }

    /// Whether the engine can currently produce thrust.
    pub fn can_thrust(&self) -> bool {
        self.max_thrust_newtons > 0.0
            && (self.isp_seconds.is_none() || self.propellant_mass_kg > 0.0)
    }

    /// Clamp a requested thrust magnitude into `[0, max_thrust]`.
    pub fn clamp_thrust(&self, magnitude_n: f64) -> f64 {
        if magnitude_n.is_nan() {
            return 0.0;
        }
        magnitude_n.clamp(0.0, self.max_thrust_newtons)
    }

    /// Propellant mass flow `F / (Isp·g0)` in kg/s.
    pub fn mass_flow_rate(&self, thrust_n: f64) -> f64 {
        match self.isp_seconds {
            Some(isp) => thrust_n / (isp * G0),
            None => 0.0,
        }
    }

    /// Burn propellant for `thrust_n` over `dt_s`, never dropping below dry mass.
    /// Returns the propellant actually consumed.
    pub fn consume_propellant(&mut self, thrust_n: f64, dt_s: f64) -> f64 {
        let wanted = self.mass_flow_rate(thrust_n) * dt_s.max(0.0);
        let used = wanted.min(self.propellant_mass_kg).max(0.0);
        self.propellant_mass_kg -= used;
        used
    }

    /// Ideal rocket-equation delta-v left in the tanks; `None` without a specific impulse.
    pub fn delta_v_budget_m_s(&self) -> Option<f64> {
        self.isp_seconds
            .map(|isp| isp * G0 * (self.mass_kg() / self.dry_mass_kg).ln())
    }

    /// Propellant needed for an impulsive `delta_v_m_s` from the current mass.
    pub fn propellant_for_delta_v(&self, delta_v_m_s: f64) -> Option<f64> {
        self.isp_seconds.map(|isp| {
            let final_mass = self.mass_kg() / (delta_v_m_s.max(0.0) / (isp * G0)).exp();
            self.mass_kg() - final_mass
        })
    }
}

/// Requested thrust: a direction (any length) and a magnitude in newtons.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ThrustCommand {
    pub direction: Vector3,
    pub magnitude_n: f64,
}

impl ThrustCommand {
    pub fn new(direction: Vector3, magnitude_n: f64) -> Self {
        Self {
            direction,
            magnitude_n,
        }
    }

    /// Engine off.
    pub fn off() -> Self {
        Self::default()
    }

    /// Resolve against the vehicle's limits. Returns `None` when no force results.
    pub fn resolve(&self, vehicle: &Vehicle) -> Option<AppliedThrust> {
        if !vehicle.can_thrust() {
            return None;
        }
        let unit = vector::try_normalize(&self.direction, MIN_DIRECTION_NORM)?;
        let magnitude_n = vehicle.clamp_thrust(self.magnitude_n);
        if magnitude_n <= 0.0 {
            return None;
        }
        Some(AppliedThrust {
            direction: unit,
            magnitude_n,
        })
    }
}

/// Thrust after normalisation and clamping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppliedThrust {
    pub direction: Vector3,
    pub magnitude_n: f64,
}

impl AppliedThrust {
    pub fn force_n(&self) -> Vector3 {
        vector::scale(&self.direction, self.magnitude_n)
    }
}
