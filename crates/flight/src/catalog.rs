//! Gravitating bodies shared read-only by every vehicle.

use orbsim_config::BodyConfig;
use orbsim_core::constants::{EARTH_MASS_KG, EARTH_RADIUS_M, G};
use orbsim_core::vector::{self, Vector3};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("body catalog is empty")]
    Empty,
    #[error("body '{0}' appears more than once")]
    DuplicateName(String),
    #[error("body '{name}': {reason}")]
    InvalidBody { name: String, reason: String },
    #[error("body '{0}' not found in catalog")]
    UnknownBody(String),
}

/// A point mass with a kinematically prescribed position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CelestialBody {
    pub name: String,
    pub position_m: Vector3,
    pub velocity_m_s: Vector3,
    pub mass_kg: f64,
    pub radius_m: f64,
    pub has_atmosphere: bool,
}

impl CelestialBody {
    pub fn from_config(config: &BodyConfig) -> Self {
        Self {
            name: config.name.clone(),
            position_m: config.position_m,
            velocity_m_s: config.velocity_m_s,
            mass_kg: config.mass_kg,
            radius_m: config.radius_m,
            has_atmosphere: config.has_atmosphere,
        }
    }

    /// `μ = G·M`
    pub fn gravitational_parameter(&self) -> f64 {
        G * self.mass_kg
    }

    /// Height of `position_m` above this body's surface.
    pub fn altitude_of(&self, position_m: &Vector3) -> f64 {
        vector::distance(position_m, &self.position_m) - self.radius_m
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: &str| CatalogError::InvalidBody {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if !(self.mass_kg > 0.0 && self.mass_kg.is_finite()) {
            return Err(invalid("mass must be positive"));
        }
        if !(self.radius_m > 0.0 && self.radius_m.is_finite()) {
            return Err(invalid("radius must be positive"));
        }
        if !vector::is_finite(&self.position_m) || !vector::is_finite(&self.velocity_m_s) {
            return Err(invalid("state must be finite"));
        }
        Ok(())
    }
}

/// Immutable set of bodies; lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CelestialBodyCatalog {
    bodies: Vec<CelestialBody>,
}

impl CelestialBodyCatalog {
    pub fn new(bodies: Vec<CelestialBody>) -> Result<Self, CatalogError> {
        if bodies.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (i, body) in bodies.iter().enumerate() {
            body.validate()?;
            if bodies[..i]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&body.name))
            {
                return Err(CatalogError::DuplicateName(body.name.clone()));
            }
        }
        Ok(Self { bodies })
    }

    pub fn from_configs(configs: &[BodyConfig]) -> Result<Self, CatalogError> {
        Self::new(configs.iter().map(CelestialBody::from_config).collect())
    }

    /// Earth at the origin with the Moon and three outer planets on fixed initial states.
    pub fn solar_default() -> Self {
        let body = |name: &str, position_m, velocity_m_s, mass_kg, radius_m, has_atmosphere| {
            CelestialBody {
                name: name.to_string(),
                position_m,
                velocity_m_s,
                mass_kg,
                radius_m,
                has_atmosphere,
            }
        };
        Self {
            bodies: vec![
                body("Earth", [0.0; 3], [0.0; 3], EARTH_MASS_KG, EARTH_RADIUS_M, true),
                body(
                    "Moon",
                    [384_400_000.0, 0.0, 0.0],
                    [0.0, 1_022.0, 0.0],
                    7.342e22,
                    1_737_000.0,
                    false,
                ),
                body(
                    "Mars",
                    [2.25e11, 0.0, 0.0],
                    [0.0, 24_000.0, 0.0],
                    6.39e23,
                    3_389_000.0,
                    false,
                ),
                body(
                    "Jupiter",
                    [7.78e11, 0.0, 0.0],
                    [0.0, 13_000.0, 0.0],
                    1.898e27,
                    69_911_000.0,
                    false,
                ),
                body(
                    "Saturn",
                    [1.427e12, 0.0, 0.0],
                    [0.0, 9_600.0, 0.0],
                    5.683e26,
                    58_232_000.0,
                    false,
                ),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&CelestialBody> {
        self.bodies
            .iter()
            .find(|body| body.name.eq_ignore_ascii_case(name))
    }

    /// Like [`get`](Self::get) but reports a missing body as an error.
    pub fn central_body(&self, name: &str) -> Result<&CelestialBody, CatalogError> {
        self.get(name)
            .ok_or_else(|| CatalogError::UnknownBody(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CelestialBody> {
        self.bodies.iter()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_matches_known_bodies() {
        let catalog = CelestialBodyCatalog::solar_default();
        assert_eq!(catalog.len(), 5);
        let earth = catalog.get("earth").unwrap();
        assert_eq!(earth.position_m, [0.0; 3]);
        assert!(earth.has_atmosphere);
        let mu = earth.gravitational_parameter();
        assert!((mu - 3.986e14).abs() / 3.986e14 < 1e-3, "mu = {mu}");
        let moon = catalog.central_body("Moon").unwrap();
        assert_eq!(moon.velocity_m_s, [0.0, 1_022.0, 0.0]);
    }

    #[test]
    fn unknown_body_is_an_error() {
        let catalog = CelestialBodyCatalog::solar_default();
        assert_eq!(
            catalog.central_body("Pluto"),
            Err(CatalogError::UnknownBody("Pluto".into()))
        );
    }

    #[test]
    fn duplicate_and_invalid_bodies_are_rejected() {
        let config = |name: &str, mass_kg: f64| BodyConfig {
            name: name.into(),
            position_m: [0.0; 3],
            velocity_m_s: [0.0; 3],
            mass_kg,
            radius_m: 1.0e6,
            has_atmosphere: false,
        };
        assert_eq!(
            CelestialBodyCatalog::from_configs(&[config("A", 1.0), config("a", 2.0)]),
            Err(CatalogError::DuplicateName("a".into()))
        );
        assert!(matches!(
            CelestialBodyCatalog::from_configs(&[config("A", -1.0)]),
            Err(CatalogError::InvalidBody { .. })
        ));
        assert_eq!(
            CelestialBodyCatalog::from_configs(&[]),
            Err(CatalogError::Empty)
        );
    }

    #[test]
    fn altitude_is_measured_from_surface() {
        let catalog = CelestialBodyCatalog::solar_default();
        let earth = catalog.get("Earth").unwrap();
        let alt = earth.altitude_of(&[EARTH_RADIUS_M + 400_000.0, 0.0, 0.0]);
        assert!((alt - 400_000.0).abs() < 1e-6);
    }
}
