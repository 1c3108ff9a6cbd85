//! Orbital-mechanics simulation core.
//!
//! The workspace crates are re-exported here so front-ends (the CLI, a game host, tests) depend
//! on one crate. [`load_context`] wires configuration files into a ready [`SimulationContext`].

use std::path::Path;

pub use orbsim_atmosphere as atmosphere;
pub use orbsim_config as config;
pub use orbsim_core as base;
pub use orbsim_export as export;
pub use orbsim_flight as flight;
pub use orbsim_impulsive as impulsive;
pub use orbsim_orbits as orbits;
pub use orbsim_propulsion as propulsion;

pub use orbsim_flight::{
    CelestialBodyCatalog, OrbitalEvent, SimulationContext, VehicleId, VehicleOrbitalState,
};

use orbsim_config::ConfigError;
use orbsim_flight::FlightError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Flight(#[from] FlightError),
    #[error(transparent)]
    Catalog(#[from] orbsim_flight::CatalogError),
}

/// Build a context from a body catalog path and an optional simulation settings file.
///
/// Without a settings file the defaults apply.
pub fn load_context(
    bodies: impl AsRef<Path>,
    simulation: Option<&Path>,
) -> Result<SimulationContext, SetupError> {
    let bodies = orbsim_config::load_bodies(bodies)?;
    let catalog = CelestialBodyCatalog::from_configs(&bodies)?;
    let settings = match simulation {
        Some(path) => orbsim_config::load_simulation_config(path)?,
        None => orbsim_config::SimulationConfig::default(),
    };
    Ok(SimulationContext::new(catalog, settings)?)
}

/// Returns the version of the library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
