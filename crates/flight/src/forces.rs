//! Accelerations acting on a vehicle: point-mass gravity, engine thrust and atmospheric drag.

use std::fmt;
use std::sync::Arc;

use orbsim_atmosphere::{AtmosphereError, AtmosphereModel, ThreeBandAtmosphere};
use orbsim_config::DragConfig;
use orbsim_core::constants::G;
use orbsim_core::vector::{self, Vector3, ZERO};
use orbsim_propulsion::{AppliedThrust, ThrustCommand, Vehicle};
use serde::Serialize;

use crate::catalog::{CelestialBody, CelestialBodyCatalog};

pub use orbsim_atmosphere::drag_acceleration;

/// Bodies closer than this contribute no gravity.
pub const MIN_GRAVITY_DISTANCE_M: f64 = 1.0;

/// Non-fatal conditions noticed while evaluating forces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ForceWarning {
    SingularDistance { body: String, distance_m: f64 },
}

impl fmt::Display for ForceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForceWarning::SingularDistance { body, distance_m } => write!(
                f,
                "skipped gravity of {body}: vehicle is {distance_m:.3e} m from its centre"
            ),
        }
    }
}

/// Attraction `G·m·(r_b − r)/|r_b − r|³` of one body, or `None` (with a warning) when the vehicle
/// sits at its centre.
fn point_mass_acceleration(
    position_m: &Vector3,
    body: &CelestialBody,
    warnings: &mut Vec<ForceWarning>,
) -> Option<Vector3> {
    let d = vector::sub(&body.position_m, position_m);
    let r = vector::norm(&d);
    if r < MIN_GRAVITY_DISTANCE_M || !r.is_finite() {
        warnings.push(ForceWarning::SingularDistance {
            body: body.name.clone(),
            distance_m: r,
        });
        return None;
    }
    Some(vector::scale(&d, G * body.mass_kg / (r * r * r)))
}

/// Sum of point-mass attractions over the catalog.
pub fn gravity_acceleration(
    position_m: &Vector3,
    catalog: &CelestialBodyCatalog,
    warnings: &mut Vec<ForceWarning>,
) -> Vector3 {
    catalog.iter().fold(ZERO, |acc, body| {
        point_mass_acceleration(position_m, body, warnings)
            .map_or(acc, |a| vector::add(&acc, &a))
    })
}

/// Thrust force divided by current mass.
pub fn thrust_acceleration(thrust: &AppliedThrust, mass_kg: f64) -> Vector3 {
    if mass_kg > 0.0 {
        vector::scale(&thrust.force_n(), 1.0 / mass_kg)
    } else {
        ZERO
    }
}

/// Per-tick inputs to the force model.
pub struct ForceInput<'a> {
    pub position_m: &'a Vector3,
    pub velocity_m_s: &'a Vector3,
    pub vehicle: &'a Vehicle,
    pub catalog: &'a CelestialBodyCatalog,
    pub central: &'a CelestialBody,
    pub thrust: &'a ThrustCommand,
}

/// Individual contributions, kept apart for telemetry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForceBreakdown {
    /// Gravity from every body, the central one included.
    pub gravity_m_s2: Vector3,
    /// Part of `gravity_m_s2` due to bodies other than the central one.
    pub third_body_m_s2: Vector3,
    pub thrust_m_s2: Vector3,
    pub drag_m_s2: Vector3,
    pub applied_thrust: Option<AppliedThrust>,
    pub altitude_m: f64,
    pub density_kg_m3: f64,
    pub warnings: Vec<ForceWarning>,
}

impl ForceBreakdown {
    pub fn total(&self) -> Vector3 {
        vector::add(
            &vector::add(&self.gravity_m_s2, &self.thrust_m_s2),
            &self.drag_m_s2,
        )
    }

    /// True when thrust or drag acts, or when other bodies pull harder than
    /// `third_body_threshold_m_s2`.
    pub fn is_perturbed(&self, third_body_threshold_m_s2: f64) -> bool {
        self.applied_thrust.is_some()
            || self.drag_m_s2 != ZERO
            || vector::norm(&self.third_body_m_s2) > third_body_threshold_m_s2
    }
}

/// Gravity + thrust + drag. Drag acts only below the ceiling of a body flagged with an atmosphere.
#[derive(Clone)]
pub struct ForceModel {
    atmosphere: Arc<dyn AtmosphereModel>,
    drag_ceiling_m: f64,
}

impl fmt::Debug for ForceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForceModel")
            .field("drag_ceiling_m", &self.drag_ceiling_m)
            .finish_non_exhaustive()
    }
}

impl Default for ForceModel {
    fn default() -> Self {
        Self::new(Arc::new(ThreeBandAtmosphere::earth()), &DragConfig::default())
    }
}

impl ForceModel {
    pub fn new(atmosphere: Arc<dyn AtmosphereModel>, drag: &DragConfig) -> Self {
        Self {
            atmosphere,
            drag_ceiling_m: drag.ceiling_altitude_m,
        }
    }

    pub fn drag_ceiling_m(&self) -> f64 {
        self.drag_ceiling_m
    }

    pub fn evaluate(&self, input: &ForceInput<'_>) -> Result<ForceBreakdown, AtmosphereError> {
        let mut warnings = Vec::new();
        let mut central_gravity = ZERO;
        let mut third_body = ZERO;
        for body in input.catalog.iter() {
            let Some(a) = point_mass_acceleration(input.position_m, body, &mut warnings) else {
                continue;
            };
            if body.name == input.central.name {
                central_gravity = a;
            } else {
                third_body = vector::add(&third_body, &a);
            }
        }

        let mass = input.vehicle.mass_kg();
        let applied = input.thrust.resolve(input.vehicle);
        let thrust = applied
            .as_ref()
            .map_or(ZERO, |t| thrust_acceleration(t, mass));

        let altitude = input.central.altitude_of(input.position_m);
        let (drag, density) = if input.central.has_atmosphere && altitude < self.drag_ceiling_m {
            let density = self.atmosphere.density(altitude);
            let relative = vector::sub(input.velocity_m_s, &input.central.velocity_m_s);
            let drag = drag_acceleration(density, &relative, &input.vehicle.drag, mass)?;
            (drag, density)
        } else {
            (ZERO, 0.0)
        };

        Ok(ForceBreakdown {
            gravity_m_s2: vector::add(&central_gravity, &third_body),
            third_body_m_s2: third_body,
            thrust_m_s2: thrust,
            drag_m_s2: drag,
            applied_thrust: applied,
            altitude_m: altitude,
            density_kg_m3: density,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbsim_atmosphere::DragProperties;
    use orbsim_core::constants::{EARTH_MASS_KG, EARTH_RADIUS_M};

    fn vehicle() -> Vehicle {
        Vehicle {
            name: "test".into(),
            dry_mass_kg: 1_000.0,
            propellant_mass_kg: 0.0,
            max_thrust_newtons: 100_000.0,
            isp_seconds: None,
            drag: DragProperties {
                drag_coefficient: 2.0,
                cross_section_area_m2: 10.0,
            },
        }
    }

    fn earth_only() -> CelestialBodyCatalog {
        let earth = CelestialBodyCatalog::solar_default()
            .get("Earth")
            .cloned()
            .unwrap();
        CelestialBodyCatalog::new(vec![earth]).unwrap()
    }

    #[test]
    fn gravity_points_at_body_with_inverse_square_magnitude() {
        let catalog = earth_only();
        let mut warnings = Vec::new();
        let r = EARTH_RADIUS_M;
        let a = gravity_acceleration(&[r, 0.0, 0.0], &catalog, &mut warnings);
        assert!(warnings.is_empty());
        let expected = G * EARTH_MASS_KG / (r * r);
        assert!((a[0] + expected).abs() < 1e-9);
        assert!((expected - 9.82).abs() < 0.01, "surface g = {expected}");
    }

    #[test]
    fn singular_distance_is_skipped_and_reported() {
        let catalog = earth_only();
        let mut warnings = Vec::new();
        let a = gravity_acceleration(&[0.0; 3], &catalog, &mut warnings);
        assert_eq!(a, ZERO);
        assert!(matches!(
            &warnings[0],
            ForceWarning::SingularDistance { body, .. } if body == "Earth"
        ));
    }

    #[test]
    fn drag_only_below_ceiling() {
        let catalog = earth_only();
        let central = catalog.get("Earth").unwrap();
        let model = ForceModel::default();
        let v = vehicle();
        let off = ThrustCommand::off();
        let velocity = [0.0, 7_800.0, 0.0];

        let low = [EARTH_RADIUS_M + 80_000.0, 0.0, 0.0];
        let out = model
            .evaluate(&ForceInput {
                position_m: &low,
                velocity_m_s: &velocity,
                vehicle: &v,
                catalog: &catalog,
                central,
                thrust: &off,
            })
            .unwrap();
        assert!(out.drag_m_s2[1] < 0.0);
        assert!(out.density_kg_m3 > 0.0);
        assert!(out.is_perturbed(f64::INFINITY));

        let high = [EARTH_RADIUS_M + 400_000.0, 0.0, 0.0];
        let out = model
            .evaluate(&ForceInput {
                position_m: &high,
                velocity_m_s: &velocity,
                vehicle: &v,
                catalog: &catalog,
                central,
                thrust: &off,
            })
            .unwrap();
        assert_eq!(out.drag_m_s2, ZERO);
        assert!(!out.is_perturbed(0.0));
        assert_eq!(out.total(), out.gravity_m_s2);
        assert_eq!(out.third_body_m_s2, ZERO);
    }

    #[test]
    fn thrust_adds_clamped_acceleration() {
        let catalog = earth_only();
        let central = catalog.get("Earth").unwrap();
        let model = ForceModel::default();
        let v = vehicle();
        let thrust = ThrustCommand::new([0.0, 2.0, 0.0], 1.0e9);
        let position = [EARTH_RADIUS_M + 400_000.0, 0.0, 0.0];
        let out = model
            .evaluate(&ForceInput {
                position_m: &position,
                velocity_m_s: &[0.0, 7_670.0, 0.0],
                vehicle: &v,
                catalog: &catalog,
                central,
                thrust: &thrust,
            })
            .unwrap();
        assert!((out.thrust_m_s2[1] - 100.0).abs() < 1e-12);
        assert_eq!(out.applied_thrust.unwrap().magnitude_n, 100_000.0);
    }

    #[test]
    fn third_body_pull_is_split_out_and_thresholded() {
        let catalog = CelestialBodyCatalog::solar_default();
        let earth = catalog.get("Earth").unwrap();
        let moon = catalog.get("Moon").unwrap();
        let model = ForceModel::default();
        let v = vehicle();
        let off = ThrustCommand::off();

        let near_moon = vector::add(&moon.position_m, &[0.0, 5_000_000.0, 0.0]);
        let out = model
            .evaluate(&ForceInput {
                position_m: &near_moon,
                velocity_m_s: &moon.velocity_m_s,
                vehicle: &v,
                catalog: &catalog,
                central: earth,
                thrust: &off,
            })
            .unwrap();
        let expected = G * moon.mass_kg / 5.0e12;
        assert!((vector::norm(&out.third_body_m_s2) - expected).abs() < 1e-3 * expected);
        assert!(out.third_body_m_s2[1] < 0.0);
        assert!(out.is_perturbed(1e-4));
        assert!(!out.is_perturbed(1.0));

        let leo = [EARTH_RADIUS_M + 400_000.0, 0.0, 0.0];
        let out = model
            .evaluate(&ForceInput {
                position_m: &leo,
                velocity_m_s: &[0.0, 7_670.0, 0.0],
                vehicle: &v,
                catalog: &catalog,
                central: earth,
                thrust: &off,
            })
            .unwrap();
        assert!(!out.is_perturbed(1e-4));
    }
}
