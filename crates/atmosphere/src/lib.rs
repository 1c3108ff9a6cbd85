//! Atmosphere density profiles and the quadratic drag law.

use orbsim_config::AtmosphereConfig;
use orbsim_core::vector::{self, Vector3};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AtmosphereError {
    #[error("vehicle mass must be positive (got {0} kg)")]
    InvalidMass(f64),
    #[error("atmosphere scale height must be positive")]
    InvalidScaleHeight,
    #[error("atmosphere band altitudes must increase with height")]
    BandOrder,
    #[error("atmosphere densities must be non-negative")]
    NegativeDensity,
}

/// Density as a function of geometric altitude above the body's surface.
pub trait AtmosphereModel: Send + Sync {
    /// Density in kg/m³ at `altitude_m`.
    fn density(&self, altitude_m: f64) -> f64;
}

/// Piecewise density profile: a polytropic troposphere followed by two exponential bands.
///
/// Below the surface the sea-level density is returned.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreeBandAtmosphere {
    sea_level_density: f64,
    lapse_rate: f64,
    sea_level_temperature: f64,
    troposphere_exponent: f64,
    tropopause_altitude: f64,
    tropopause_density: f64,
    stratosphere_scale_height: f64,
    upper_band_altitude: f64,
    upper_band_density: f64,
    upper_band_scale_height: f64,
}

impl ThreeBandAtmosphere {
    pub fn from_config(config: &AtmosphereConfig) -> Result<Self, AtmosphereError> {
        if config.stratosphere_scale_height_m <= 0.0 || config.upper_band_scale_height_m <= 0.0 {
            return Err(AtmosphereError::InvalidScaleHeight);
        }
        if !(config.tropopause_altitude_m > 0.0
            && config.upper_band_altitude_m > config.tropopause_altitude_m)
        {
            return Err(AtmosphereError::BandOrder);
        }
        if config.sea_level_density_kg_m3 < 0.0
            || config.tropopause_density_kg_m3 < 0.0
            || config.upper_band_density_kg_m3 < 0.0
        {
            return Err(AtmosphereError::NegativeDensity);
        }
        Ok(Self {
            sea_level_density: config.sea_level_density_kg_m3,
            lapse_rate: config.lapse_rate_k_m,
            sea_level_temperature: config.sea_level_temperature_k,
            troposphere_exponent: config.troposphere_exponent,
            tropopause_altitude: config.tropopause_altitude_m,
            tropopause_density: config.tropopause_density_kg_m3,
            stratosphere_scale_height: config.stratosphere_scale_height_m,
            upper_band_altitude: config.upper_band_altitude_m,
            upper_band_density: config.upper_band_density_kg_m3,
            upper_band_scale_height: config.upper_band_scale_height_m,
        })
    }

    /// Earth's standard-atmosphere fit.
    pub fn earth() -> Self {
        Self {
            sea_level_density: 1.225,
            lapse_rate: 0.0065,
            sea_level_temperature: 288.15,
            troposphere_exponent: 4.256,
            tropopause_altitude: 11_000.0,
            tropopause_density: 0.3639,
            stratosphere_scale_height: 6_341.62,
            upper_band_altitude: 20_000.0,
            upper_band_density: 0.088,
            upper_band_scale_height: 7_400.0,
        }
    }
}

impl Default for ThreeBandAtmosphere {
    fn default() -> Self {
        Self::earth()
    }
}

impl AtmosphereModel for ThreeBandAtmosphere {
    fn density(&self, altitude_m: f64) -> f64 {
        if altitude_m < 0.0 {
            self.sea_level_density
        } else if altitude_m < self.tropopause_altitude {
            let ratio = (1.0 - self.lapse_rate * altitude_m / self.sea_level_temperature).max(0.0);
            self.sea_level_density * ratio.powf(self.troposphere_exponent)
        } else if altitude_m < self.upper_band_altitude {
            self.tropopause_density
                * (-(altitude_m - self.tropopause_altitude) / self.stratosphere_scale_height).exp()
        } else {
            self.upper_band_density
                * (-(altitude_m - self.upper_band_altitude) / self.upper_band_scale_height).exp()
        }
    }
}

/// Aerodynamic properties of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragProperties {
    pub drag_coefficient: f64,
    pub cross_section_area_m2: f64,
}

impl DragProperties {
    /// Ballistic coefficient `m / (Cd·A)` in kg/m²; infinite when the vehicle has no drag area.
    pub fn ballistic_coefficient(&self, mass_kg: f64) -> f64 {
        let cda = self.drag_coefficient * self.cross_section_area_m2;
        if cda > 0.0 { mass_kg / cda } else { f64::INFINITY }
    }
}

/// Dynamic pressure `½ρv²` in pascals.
pub fn dynamic_pressure(density_kg_m3: f64, speed_m_s: f64) -> f64 {
    0.5 * density_kg_m3 * speed_m_s * speed_m_s
}

/// Drag acceleration `−½ρ·Cd·A·|v|·v / m`, opposing the velocity relative to the air.
pub fn drag_acceleration(
    density_kg_m3: f64,
    relative_velocity_m_s: &Vector3,
    properties: &DragProperties,
    mass_kg: f64,
) -> Result<Vector3, AtmosphereError> {
    if !(mass_kg > 0.0) {
        return Err(AtmosphereError::InvalidMass(mass_kg));
    }
    let speed = vector::norm(relative_velocity_m_s);
    if speed == 0.0 {
        return Ok(vector::ZERO);
    }
    let deceleration =
        dynamic_pressure(density_kg_m3, speed) / properties.ballistic_coefficient(mass_kg);
    Ok(vector::scale(relative_velocity_m_s, -deceleration / speed))
}
