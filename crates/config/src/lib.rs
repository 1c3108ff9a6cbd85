//! Configuration models and loaders for the orbital simulation.
//!
//! Bodies and vehicles are loaded as record lists: a YAML file holding a list, a single TOML
//! file holding one record, or a directory of TOML files (one record each, sorted by name).
//! Simulation settings are a single TOML or YAML document where every field has a default.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Celestial body record used to build the gravitating catalog.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BodyConfig {
    pub name: String,
    #[serde(default)]
    pub position_m: [f64; 3],
    #[serde(default)]
    pub velocity_m_s: [f64; 3],
    pub mass_kg: f64,
    pub radius_m: f64,
    /// Whether vehicles orbiting this body feel atmospheric drag.
    #[serde(default)]
    pub has_atmosphere: bool,
}

/// Vehicle record: mass, engine and aerodynamic properties.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct VehicleConfig {
    pub name: String,
    pub dry_mass_kg: f64,
    #[serde(default)]
    pub propellant_mass_kg: f64,
    pub max_thrust_newtons: f64,
    #[serde(default)]
    pub isp_seconds: Option<f64>,
    pub drag_coefficient: f64,
    pub cross_section_area_m2: f64,
}

/// How coasting arcs are advanced.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PropagationMode {
    /// Analytic Kepler propagation about the central body whenever no thrust or drag acts.
    #[default]
    KeplerWhenCoasting,
    /// Always integrate the full force model.
    Integrated,
}

/// Event notification semantics.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventTrigger {
    /// Fire once when a condition becomes true.
    #[default]
    Edge,
    /// Fire on every tick while a condition holds.
    Level,
}

/// Permitted and initial time-acceleration factors.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TimeAccelerationConfig {
    pub initial: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for TimeAccelerationConfig {
    fn default() -> Self {
        Self {
            initial: 1.0,
            min: 0.1,
            max: 1_000.0,
        }
    }
}

/// Kepler-equation solver limits.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct KeplerConfig {
    pub max_iterations: u32,
    pub tolerance: f64,
}

impl Default for KeplerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-12,
        }
    }
}

/// Trajectory event thresholds.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EventConfig {
    pub tolerance_distance_m: f64,
    pub atmospheric_entry_altitude_m: f64,
    pub trigger: EventTrigger,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            tolerance_distance_m: 1_000.0,
            atmospheric_entry_altitude_m: 100_000.0,
            trigger: EventTrigger::Edge,
        }
    }
}

/// Altitude below which drag is applied.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DragConfig {
    pub ceiling_altitude_m: f64,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            ceiling_altitude_m: 120_000.0,
        }
    }
}

/// Three-band atmospheric density constants.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AtmosphereConfig {
    pub sea_level_density_kg_m3: f64,
    pub lapse_rate_k_m: f64,
    pub sea_level_temperature_k: f64,
    pub troposphere_exponent: f64,
    pub tropopause_altitude_m: f64,
    pub tropopause_density_kg_m3: f64,
    pub stratosphere_scale_height_m: f64,
    pub upper_band_altitude_m: f64,
    pub upper_band_density_kg_m3: f64,
    pub upper_band_scale_height_m: f64,
}

impl Default for AtmosphereConfig {
    fn default() -> Self {
        Self {
            sea_level_density_kg_m3: 1.225,
            lapse_rate_k_m: 0.0065,
            sea_level_temperature_k: 288.15,
            troposphere_exponent: 4.256,
            tropopause_altitude_m: 11_000.0,
            tropopause_density_kg_m3: 0.3639,
            stratosphere_scale_height_m: 6_341.62,
            upper_band_altitude_m: 20_000.0,
            upper_band_density_kg_m3: 0.088,
            upper_band_scale_height_m: 7_400.0,
        }
    }
}

/// Top-level simulation settings.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Catalog name of the body orbital elements are computed against.
    pub central_body: String,
    /// Fixed integration step in simulated seconds.
    pub step_s: f64,
    pub time_acceleration: TimeAccelerationConfig,
    /// Upper bound on ticks run for a single host frame; older backlog is dropped.
    pub max_ticks_per_advance: u32,
    pub propagation: PropagationMode,
    /// Pull from non-central bodies above which a coasting vehicle is integrated instead of
    /// following its Kepler conic.
    pub third_body_threshold_m_s2: f64,
    pub kepler: KeplerConfig,
    pub events: EventConfig,
    pub drag: DragConfig,
    pub atmosphere: AtmosphereConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            central_body: "Earth".to_string(),
            step_s: 1.0 / 60.0,
            time_acceleration: TimeAccelerationConfig::default(),
            max_ticks_per_advance: 100_000,
            propagation: PropagationMode::default(),
            third_body_threshold_m_s2: 1e-4,
            kepler: KeplerConfig::default(),
            events: EventConfig::default(),
            drag: DragConfig::default(),
            atmosphere: AtmosphereConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Reject settings that would make the simulation ill-defined.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if self.central_body.trim().is_empty() {
            return invalid("central_body must name a catalog body");
        }
        if !(self.step_s > 0.0 && self.step_s.is_finite()) {
            return invalid("step_s must be positive");
        }
        let ta = &self.time_acceleration;
        if !(ta.min > 0.0 && ta.max >= ta.min && ta.max.is_finite()) {
            return invalid("time_acceleration range must satisfy 0 < min <= max");
        }
        if !(ta.initial >= ta.min && ta.initial <= ta.max) {
            return invalid("time_acceleration.initial must lie inside [min, max]");
        }
        if self.max_ticks_per_advance == 0 {
            return invalid("max_ticks_per_advance must be at least 1");
        }
        if !(self.third_body_threshold_m_s2 >= 0.0) {
            return invalid("third_body_threshold_m_s2 must not be negative");
        }
        if self.kepler.max_iterations == 0 {
            return invalid("kepler.max_iterations must be at least 1");
        }
        if !(self.kepler.tolerance > 0.0) {
            return invalid("kepler.tolerance must be positive");
        }
        if !(self.events.tolerance_distance_m > 0.0) {
            return invalid("events.tolerance_distance_m must be positive");
        }
        if self.drag.ceiling_altitude_m < 0.0 {
            return invalid("drag.ceiling_altitude_m must not be negative");
        }
        let atm = &self.atmosphere;
        if atm.tropopause_altitude_m >= atm.upper_band_altitude_m {
            return invalid("atmosphere bands must be ordered: tropopause below upper band");
        }
        if !(atm.stratosphere_scale_height_m > 0.0 && atm.upper_band_scale_height_m > 0.0) {
            return invalid("atmosphere scale heights must be positive");
        }
        Ok(())
    }
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Load celestial body records.
pub fn load_bodies<P: AsRef<Path>>(path: P) -> Result<Vec<BodyConfig>, ConfigError> {
    load_records(path)
}

/// Load vehicle records.
pub fn load_vehicle_configs<P: AsRef<Path>>(path: P) -> Result<Vec<VehicleConfig>, ConfigError> {
    load_records(path)
}

/// Load and validate simulation settings from a TOML or YAML document.
pub fn load_simulation_config<P: AsRef<Path>>(path: P) -> Result<SimulationConfig, ConfigError> {
    let path = path.as_ref();
    let config: SimulationConfig = if is_toml(path) {
        toml::from_str(&std::fs::read_to_string(path)?)?
    } else {
        serde_yaml::from_reader(File::open(path)?)?
    };
    config.validate()?;
    Ok(config)
}

fn load_records<T, P>(path: P) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_dir() {
        read_dir_records(path)
    } else if is_toml(path) {
        let contents = std::fs::read_to_string(path)?;
        let record: T = toml::from_str(&contents)?;
        Ok(vec![record])
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

fn read_dir_records<T>(dir: &Path) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let mut records = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_toml(path))
        .collect();
    entries.sort();
    for path in entries {
        let contents = std::fs::read_to_string(&path)?;
        let record: T = toml::from_str(&contents)?;
        records.push(record);
    }
    Ok(records)
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|ext| ext == "toml").unwrap_or(false)
}
