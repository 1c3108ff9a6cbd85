//! Per-vehicle orbital flight on top of the two-body utilities.
//!
//! Each tick evaluates gravity, thrust and drag, advances the state (analytic Kepler arc when
//! coasting, semi-implicit Euler otherwise), recomputes elements and checks for events.
//! [`SimulationContext`] owns the shared body catalog and steps vehicles in parallel.

pub mod catalog;
pub mod context;
pub mod events;
pub mod forces;
pub mod integrator;
pub mod observer;
pub mod scheduler;
pub mod vehicle;

pub use catalog::{CatalogError, CelestialBody, CelestialBodyCatalog};
pub use context::{SimulationContext, VehicleId};
pub use events::{EventDetector, EventInput, OrbitalEvent};
pub use forces::{ForceBreakdown, ForceInput, ForceModel, ForceWarning};
pub use integrator::semi_implicit_euler;
pub use observer::{EventLog, NullObserver, StateObserver};
pub use scheduler::{FixedStepScheduler, TickBudget};
pub use vehicle::{
    AdvanceReport, ConstantThrust, NoThrust, StepMethod, ThrustSource, TickReport,
    VehicleOrbitalState, VehicleSnapshot,
};

use orbsim_atmosphere::AtmosphereError;
use orbsim_config::{ConfigError, VehicleConfig};
use orbsim_impulsive::{LambertSolverError, TransferError};
use orbsim_orbits::OrbitError;
use orbsim_propulsion::{Vehicle, VehicleError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlightError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("orbit geometry: {0}")]
    Orbit(#[from] OrbitError),
    #[error(transparent)]
    Atmosphere(#[from] AtmosphereError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Lambert(#[from] LambertSolverError),
    #[error(transparent)]
    Vehicle(#[from] VehicleError),
    #[error("{0} is not part of this simulation")]
    UnknownVehicle(VehicleId),
    #[error("vehicle '{0}' not found in catalog")]
    VehicleNotFound(String),
    #[error("vehicle catalog is empty")]
    EmptyFleet,
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

/// Pick a vehicle by case-insensitive name, or the first record when no name is given.
pub fn select_vehicle(
    configs: &[VehicleConfig],
    requested: Option<&str>,
) -> Result<Vehicle, FlightError> {
    let chosen = match requested {
        Some(name) => configs
            .iter()
            .find(|cfg| cfg.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| FlightError::VehicleNotFound(name.to_string()))?,
        None => configs.first().ok_or(FlightError::EmptyFleet)?,
    };
    Ok(Vehicle::from_config(chosen)?)
}
