//! Per-vehicle orbital state and the tick that advances it.

use std::sync::Arc;

use orbsim_atmosphere::ThreeBandAtmosphere;
use orbsim_config::{PropagationMode, SimulationConfig};
use orbsim_core::vector::{self, Vector3, ZERO};
use orbsim_impulsive::{Intercept, TransferOrbit, hohmann, intercept};
use orbsim_orbits::{
    Degeneracy, KeplerSolution, KeplerSolver, OrbitRegime, OrbitalElements, StateConversion,
    StateVector, propagate, to_elements,
};
use orbsim_propulsion::{ThrustCommand, Vehicle};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::FlightError;
use crate::catalog::{CelestialBody, CelestialBodyCatalog};
use crate::events::{EventDetector, EventInput, OrbitalEvent};
use crate::forces::{ForceInput, ForceModel, ForceWarning};
use crate::integrator::semi_implicit_euler;
use crate::scheduler::FixedStepScheduler;

/// Supplies the thrust command for each tick (the flight-control collaborator).
pub trait ThrustSource: Send + Sync {
    fn command(&self, state: &VehicleOrbitalState) -> ThrustCommand;
}

/// Engine always off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoThrust;

impl ThrustSource for NoThrust {
    fn command(&self, _state: &VehicleOrbitalState) -> ThrustCommand {
        ThrustCommand::off()
    }
}

/// The same command every tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConstantThrust(pub ThrustCommand);

impl ThrustSource for ConstantThrust {
    fn command(&self, _state: &VehicleOrbitalState) -> ThrustCommand {
        self.0
    }
}

impl<F> ThrustSource for F
where
    F: Fn(&VehicleOrbitalState) -> ThrustCommand + Send + Sync,
{
    fn command(&self, state: &VehicleOrbitalState) -> ThrustCommand {
        self(state)
    }
}

/// How a tick advanced the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMethod {
    Kepler,
    Integrated,
}

/// Outcome of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub method: StepMethod,
    /// Solver outcome when the tick followed the conic through an iterative Kepler solve.
    pub kepler: Option<KeplerSolution>,
    pub events: Vec<OrbitalEvent>,
    pub warnings: Vec<ForceWarning>,
}

impl TickReport {
    /// False when the Kepler solve ran out of iterations and the step used its best estimate.
    pub fn kepler_converged(&self) -> bool {
        self.kepler.is_none_or(|solution| solution.converged)
    }
}

/// Outcome of [`VehicleOrbitalState::advance`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdvanceReport {
    pub ticks: u64,
    pub dropped_ticks: u64,
    /// Ticks whose Kepler solve did not converge.
    pub unconverged_ticks: u64,
    pub events: Vec<OrbitalEvent>,
}

/// Read-only copy of the observable state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSnapshot {
    pub vehicle: String,
    pub central_body: String,
    pub simulation_time_s: f64,
    pub position_m: Vector3,
    pub velocity_m_s: Vector3,
    pub acceleration_m_s2: Vector3,
    pub altitude_m: f64,
    pub mass_kg: f64,
    pub regime: OrbitRegime,
    pub elements: OrbitalElements,
    pub degeneracy: Degeneracy,
    pub orbital_period_s: Option<f64>,
    pub time_acceleration: f64,
}

/// State of one vehicle: position and velocity in the catalog frame, elements relative to the
/// central body, and its own simulation clock.
#[derive(Debug, Clone)]
pub struct VehicleOrbitalState {
    vehicle: Vehicle,
    catalog: Arc<CelestialBodyCatalog>,
    central_body: String,
    state: StateVector,
    acceleration: Vector3,
    conversion: StateConversion,
    simulation_time_s: f64,
    scheduler: FixedStepScheduler,
    forces: ForceModel,
    detector: EventDetector,
    solver: KeplerSolver,
    mode: PropagationMode,
    third_body_threshold_m_s2: f64,
    pending_events: Vec<OrbitalEvent>,
}

impl VehicleOrbitalState {
    /// Place `vehicle` at `position_m` / `velocity_m_s` (catalog frame).
    pub fn new(
        vehicle: Vehicle,
        catalog: Arc<CelestialBodyCatalog>,
        position_m: Vector3,
        velocity_m_s: Vector3,
        config: &SimulationConfig,
    ) -> Result<Self, FlightError> {
        config.validate()?;
        let atmosphere = ThreeBandAtmosphere::from_config(&config.atmosphere)?;
        let central = catalog.central_body(&config.central_body)?;
        let central_body = central.name.clone();
        let state = StateVector {
            position_m,
            velocity_m_s,
        };
        let conversion = relative_elements(&state, central)?;
        let scheduler = FixedStepScheduler::new(
            config.step_s,
            &config.time_acceleration,
            config.max_ticks_per_advance,
        )?;

        Ok(Self {
            vehicle,
            catalog,
            central_body,
            state,
            acceleration: ZERO,
            conversion,
            simulation_time_s: 0.0,
            scheduler,
            forces: ForceModel::new(Arc::new(atmosphere), &config.drag),
            detector: EventDetector::new(&config.events),
            solver: KeplerSolver::new(config.kepler.max_iterations, config.kepler.tolerance),
            mode: config.propagation,
            third_body_threshold_m_s2: config.third_body_threshold_m_s2,
            pending_events: Vec::new(),
        })
    }

    fn central(&self) -> Result<&CelestialBody, FlightError> {
        Ok(self.catalog.central_body(&self.central_body)?)
    }

    /// Advance by exactly one integration step using `thrust`.
    ///
    /// On error the state is left as it was before the tick.
    pub fn tick(&mut self, thrust: &ThrustCommand) -> Result<TickReport, FlightError> {
        let catalog = Arc::clone(&self.catalog);
        let central = catalog.central_body(&self.central_body)?;
        let mu = central.gravitational_parameter();
        let h = self.scheduler.step_s();

        let breakdown = self.forces.evaluate(&ForceInput {
            position_m: &self.state.position_m,
            velocity_m_s: &self.state.velocity_m_s,
            vehicle: &self.vehicle,
            catalog: &catalog,
            central,
            thrust,
        })?;
        for warning in &breakdown.warnings {
            warn!(vehicle = %self.vehicle.name, "{warning}");
        }

        let coasting = self.mode == PropagationMode::KeplerWhenCoasting
            && !breakdown.is_perturbed(self.third_body_threshold_m_s2)
            && !self.conversion.degeneracy.rectilinear;

        let kepler_step = if coasting {
            match propagate(&self.conversion.elements, mu, h, &self.solver) {
                Ok(step) => {
                    if !step.converged() {
                        warn!(
                            vehicle = %self.vehicle.name,
                            residual = ?step.solution.map(|s| s.residual),
                            "Kepler solve did not converge; using best estimate"
                        );
                    }
                    Some(step)
                }
                Err(err) => {
                    debug!(vehicle = %self.vehicle.name, %err, "falling back to integration");
                    None
                }
            }
        } else {
            None
        };

        let kepler = kepler_step.as_ref().and_then(|step| step.solution);
        let (next_state, next_conversion, method) = match kepler_step {
            Some(step) => {
                let state = StateVector {
                    position_m: vector::add(&central.position_m, &step.state.position_m),
                    velocity_m_s: vector::add(&central.velocity_m_s, &step.state.velocity_m_s),
                };
                let conversion = StateConversion {
                    elements: step.elements,
                    ..self.conversion
                };
                (state, conversion, StepMethod::Kepler)
            }
            None => {
                let state = semi_implicit_euler(&self.state, &breakdown.total(), h);
                let conversion = relative_elements(&state, central)?;
                (state, conversion, StepMethod::Integrated)
            }
        };

        // commit
        if let Some(applied) = &breakdown.applied_thrust {
            self.vehicle.consume_propellant(applied.magnitude_n, h);
        }
        let previous_regime = self.conversion.regime;
        self.state = next_state;
        self.conversion = next_conversion;
        self.acceleration = breakdown.total();
        self.simulation_time_s += h;

        let mut events = std::mem::take(&mut self.pending_events);
        if previous_regime != self.conversion.regime {
            info!(
                vehicle = %self.vehicle.name,
                from = ?previous_regime,
                to = ?self.conversion.regime,
                "orbit regime changed"
            );
            events.push(OrbitalEvent::RegimeChanged {
                time_s: self.simulation_time_s,
                from: previous_regime,
                to: self.conversion.regime,
            });
        }
        let relative = self.relative_state_to(central);
        events.extend(self.detector.evaluate(&EventInput {
            time_s: self.simulation_time_s,
            radius_m: vector::norm(&relative.position_m),
            altitude_m: central.altitude_of(&self.state.position_m),
            speed_m_s: vector::norm(&relative.velocity_m_s),
            mu_m3_s2: mu,
            elements: &self.conversion.elements,
        }));
        for event in &events {
            debug!(vehicle = %self.vehicle.name, event = event.name(), t = event.time_s(), "event");
        }

        Ok(TickReport {
            method,
            kepler,
            events,
            warnings: breakdown.warnings,
        })
    }

    /// Run every tick due after `wall_dt_s` seconds of host time.
    pub fn advance(
        &mut self,
        wall_dt_s: f64,
        thrust: &dyn ThrustSource,
    ) -> Result<AdvanceReport, FlightError> {
        let budget = self.scheduler.due_ticks(wall_dt_s);
        let mut report = AdvanceReport {
            ticks: 0,
            dropped_ticks: budget.dropped,
            unconverged_ticks: 0,
            events: Vec::new(),
        };
        for _ in 0..budget.ticks {
            let command = thrust.command(self);
            let tick = self.tick(&command)?;
            report.ticks += 1;
            if !tick.kepler_converged() {
                report.unconverged_ticks += 1;
            }
            report.events.extend(tick.events);
        }
        Ok(report)
    }

    /// Queue a time-acceleration change; it applies at the next tick boundary.
    pub fn request_time_acceleration(&mut self, factor: f64) -> f64 {
        self.scheduler.request_time_acceleration(factor)
    }

    /// Hohmann plan from the current radius to a circular orbit of `target_radius_m`.
    /// A `TransferComputed` event is reported with the next tick.
    pub fn plan_transfer(&mut self, target_radius_m: f64) -> Result<TransferOrbit, FlightError> {
        let central = self.central()?;
        let mu = central.gravitational_parameter();
        let r1 = vector::distance(&self.state.position_m, &central.position_m);
        let transfer = hohmann(r1, target_radius_m, mu)?;
        info!(
            vehicle = %self.vehicle.name,
            r1_m = r1,
            r2_m = target_radius_m,
            dv1_m_s = transfer.delta_v_m_s,
            tof_s = transfer.transfer_time_s,
            "transfer computed"
        );
        self.pending_events.push(OrbitalEvent::TransferComputed {
            time_s: self.simulation_time_s,
            transfer,
        });
        Ok(transfer)
    }

    /// Hohmann plan to the radius of `target_position_m` measured from the central body.
    pub fn plan_transfer_to(
        &mut self,
        target_position_m: &Vector3,
    ) -> Result<TransferOrbit, FlightError> {
        let r2 = vector::distance(target_position_m, &self.central()?.position_m);
        self.plan_transfer(r2)
    }

    /// Lambert intercept of `target_position_m` (catalog frame) after `time_of_flight_s`.
    pub fn plan_intercept(
        &self,
        target_position_m: &Vector3,
        target_velocity_m_s: Option<&Vector3>,
        time_of_flight_s: f64,
    ) -> Result<Intercept, FlightError> {
        let central = self.central()?;
        let relative = self.relative_state_to(central);
        Ok(intercept(
            relative.position_m,
            relative.velocity_m_s,
            vector::sub(target_position_m, &central.position_m),
            target_velocity_m_s.map(|v| vector::sub(v, &central.velocity_m_s)),
            time_of_flight_s,
            central.gravitational_parameter(),
        )?)
    }

    /// Swap in a new catalog (bodies moved by the host) and recompute elements.
    pub fn replace_catalog(
        &mut self,
        catalog: Arc<CelestialBodyCatalog>,
    ) -> Result<(), FlightError> {
        let central = catalog.central_body(&self.central_body)?;
        let conversion = relative_elements(&self.state, central)?;
        self.conversion = conversion;
        self.catalog = catalog;
        Ok(())
    }

    /// Re-arm edge-triggered events and discard partially elapsed wall time.
    pub fn reset_clock(&mut self) {
        self.detector.reset();
        self.scheduler.reset();
    }

    fn relative_state_to(&self, central: &CelestialBody) -> StateVector {
        StateVector {
            position_m: vector::sub(&self.state.position_m, &central.position_m),
            velocity_m_s: vector::sub(&self.state.velocity_m_s, &central.velocity_m_s),
        }
    }

    pub fn snapshot(&self) -> VehicleSnapshot {
        VehicleSnapshot {
            vehicle: self.vehicle.name.clone(),
            central_body: self.central_body.clone(),
            simulation_time_s: self.simulation_time_s,
            position_m: self.state.position_m,
            velocity_m_s: self.state.velocity_m_s,
            acceleration_m_s2: self.acceleration,
            altitude_m: self.altitude(),
            mass_kg: self.vehicle.mass_kg(),
            regime: self.regime(),
            elements: self.conversion.elements,
            degeneracy: self.conversion.degeneracy,
            orbital_period_s: self.orbital_period(),
            time_acceleration: self.time_acceleration(),
        }
    }

    pub fn position(&self) -> Vector3 {
        self.state.position_m
    }

    pub fn velocity(&self) -> Vector3 {
        self.state.velocity_m_s
    }

    /// Total acceleration applied during the last tick.
    pub fn acceleration(&self) -> Vector3 {
        self.acceleration
    }

    pub fn elements(&self) -> &OrbitalElements {
        &self.conversion.elements
    }

    pub fn regime(&self) -> OrbitRegime {
        self.conversion.regime
    }

    pub fn degeneracy(&self) -> Degeneracy {
        self.conversion.degeneracy
    }

    /// Height above the central body's surface.
    pub fn altitude(&self) -> f64 {
        self.central()
            .map_or(f64::NAN, |c| c.altitude_of(&self.state.position_m))
    }

    /// `None` unless the orbit is elliptical.
    pub fn orbital_period(&self) -> Option<f64> {
        let mu = self.central().ok()?.gravitational_parameter();
        self.conversion.elements.period(mu)
    }

    pub fn simulation_time(&self) -> f64 {
        self.simulation_time_s
    }

    pub fn time_acceleration(&self) -> f64 {
        self.scheduler.time_acceleration()
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn central_body(&self) -> &str {
        &self.central_body
    }

    pub fn step_s(&self) -> f64 {
        self.scheduler.step_s()
    }
}

fn relative_elements(
    state: &StateVector,
    central: &CelestialBody,
) -> Result<StateConversion, FlightError> {
    let r = vector::sub(&state.position_m, &central.position_m);
    let v = vector::sub(&state.velocity_m_s, &central.velocity_m_s);
    Ok(to_elements(&r, &v, central.gravitational_parameter())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbsim_atmosphere::DragProperties;
    use orbsim_core::constants::EARTH_RADIUS_M;

    fn vehicle() -> Vehicle {
        Vehicle {
            name: "probe".into(),
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

    fn earth_only() -> Arc<CelestialBodyCatalog> {
        let earth = CelestialBodyCatalog::solar_default()
            .get("Earth")
            .cloned()
            .unwrap();
        Arc::new(CelestialBodyCatalog::new(vec![earth]).unwrap())
    }

    fn leo(config: &SimulationConfig) -> VehicleOrbitalState {
        let catalog = earth_only();
        let mu = catalog.get("Earth").unwrap().gravitational_parameter();
        let r = EARTH_RADIUS_M + 400_000.0;
        VehicleOrbitalState::new(
            vehicle(),
            catalog,
            [r, 0.0, 0.0],
            [0.0, (mu / r).sqrt(), 0.0],
            config,
        )
        .unwrap()
    }

    #[test]
    fn coasting_uses_kepler_and_keeps_radius() {
        let mut state = leo(&SimulationConfig::default());
        let r0 = vector::norm(&state.position());
        for _ in 0..600 {
            let report = state.tick(&ThrustCommand::off()).unwrap();
            assert_eq!(report.method, StepMethod::Kepler);
        }
        let r = vector::norm(&state.position());
        assert!((r - r0).abs() < 1e-3, "radius drifted by {}", r - r0);
        assert!((state.simulation_time() - 10.0).abs() < 1e-9);
        assert!(state.degeneracy().circular);
    }

    #[test]
    fn thrust_switches_to_integration_and_raises_energy() {
        let mut state = leo(&SimulationConfig::default());
        let a0 = state.elements().semi_major_axis_m;
        let prograde = ThrustCommand::new([0.0, 1.0, 0.0], 10_000.0);
        let report = state.tick(&prograde).unwrap();
        assert_eq!(report.method, StepMethod::Integrated);
        assert!(state.elements().semi_major_axis_m > a0);
        assert!(state.acceleration()[1] > 9.0);
    }

    #[test]
    fn integrated_mode_never_uses_kepler() {
        let config = SimulationConfig {
            propagation: PropagationMode::Integrated,
            ..SimulationConfig::default()
        };
        let mut state = leo(&config);
        let report = state.tick(&ThrustCommand::off()).unwrap();
        assert_eq!(report.method, StepMethod::Integrated);
    }

    #[test]
    fn advance_follows_time_acceleration() {
        let mut state = leo(&SimulationConfig::default());
        let report = state.advance(1.0, &NoThrust).unwrap();
        assert_eq!(report.ticks, 60);
        assert!((state.simulation_time() - 1.0).abs() < 1e-9);

        assert_eq!(state.request_time_acceleration(100.0), 100.0);
        let report = state.advance(1.0, &NoThrust).unwrap();
        assert_eq!(report.ticks, 6_000);
        assert!((state.simulation_time() - 101.0).abs() < 1e-6);
        assert_eq!(state.time_acceleration(), 100.0);
    }

    #[test]
    fn burn_to_escape_reports_regime_change_and_escape() {
        let mut state = leo(&SimulationConfig::default());
        let burn = |s: &VehicleOrbitalState| ThrustCommand::new(s.velocity(), 100_000.0);
        let mut events = Vec::new();
        for _ in 0..2_500 {
            events.extend(state.tick(&burn(&state)).unwrap().events);
        }
        assert_eq!(state.regime(), OrbitRegime::Hyperbolic);
        assert!(
            events
                .iter()
                .any(|e| matches!(e, OrbitalEvent::EscapeVelocityReached { .. }))
        );
        assert!(events.iter().any(|e| matches!(
            e,
            OrbitalEvent::RegimeChanged {
                from: OrbitRegime::Elliptical,
                ..
            }
        )));
    }

    #[test]
    fn planned_transfer_is_published_with_next_tick() {
        let mut state = leo(&SimulationConfig::default());
        let transfer = state.plan_transfer(42_164_000.0).unwrap();
        assert!(transfer.delta_v_m_s > 0.0);
        let report = state.tick(&ThrustCommand::off()).unwrap();
        assert!(matches!(
            report.events.first(),
            Some(OrbitalEvent::TransferComputed { transfer: t, .. }) if *t == transfer
        ));
        assert!(
            state
                .tick(&ThrustCommand::off())
                .unwrap()
                .events
                .is_empty()
        );
    }

    #[test]
    fn low_orbit_feels_drag() {
        let catalog = earth_only();
        let mu = catalog.get("Earth").unwrap().gravitational_parameter();
        let r = EARTH_RADIUS_M + 90_000.0;
        let mut state = VehicleOrbitalState::new(
            vehicle(),
            catalog,
            [r, 0.0, 0.0],
            [0.0, (mu / r).sqrt(), 0.0],
            &SimulationConfig::default(),
        )
        .unwrap();
        let a0 = state.elements().semi_major_axis_m;
        let report = state.tick(&ThrustCommand::off()).unwrap();
        assert_eq!(report.method, StepMethod::Integrated);
        assert!(state.elements().semi_major_axis_m < a0);
        assert!(
            report
                .events
                .iter()
                .any(|e| matches!(e, OrbitalEvent::AtmosphericEntry { .. }))
        );
    }

    #[test]
    fn unknown_central_body_is_rejected() {
        let config = SimulationConfig {
            central_body: "Vulcan".into(),
            ..SimulationConfig::default()
        };
        let result = VehicleOrbitalState::new(
            vehicle(),
            earth_only(),
            [7.0e6, 0.0, 0.0],
            [0.0, 7.5e3, 0.0],
            &config,
        );
        assert!(matches!(result, Err(FlightError::Catalog(_))));
    }

    fn near_moon(config: &SimulationConfig) -> VehicleOrbitalState {
        let catalog = Arc::new(CelestialBodyCatalog::solar_default());
        let moon = catalog.get("Moon").cloned().unwrap();
        VehicleOrbitalState::new(
            vehicle(),
            catalog,
            vector::add(&moon.position_m, &[0.0, 5_000_000.0, 0.0]),
            moon.velocity_m_s,
            config,
        )
        .unwrap()
    }

    #[test]
    fn strong_third_body_pull_forces_integration() {
        let mut coasting = near_moon(&SimulationConfig::default());
        let mut integrated = near_moon(&SimulationConfig {
            propagation: PropagationMode::Integrated,
            ..SimulationConfig::default()
        });
        let mut conic_only = near_moon(&SimulationConfig {
            third_body_threshold_m_s2: f64::INFINITY,
            ..SimulationConfig::default()
        });
        for _ in 0..600 {
            let report = coasting.tick(&ThrustCommand::off()).unwrap();
            assert_eq!(report.method, StepMethod::Integrated);
            integrated.tick(&ThrustCommand::off()).unwrap();
            let report = conic_only.tick(&ThrustCommand::off()).unwrap();
            assert_eq!(report.method, StepMethod::Kepler);
        }
        assert_eq!(coasting.velocity(), integrated.velocity());
        // ten seconds at roughly 0.2 m/s² towards the Moon
        let pulled = coasting.velocity()[1] - conic_only.velocity()[1];
        assert!(pulled < -1.5, "lunar pull changed vy by {pulled}");
    }

    #[test]
    fn weak_third_body_pull_keeps_the_conic() {
        let catalog = Arc::new(CelestialBodyCatalog::solar_default());
        let mu = catalog.get("Earth").unwrap().gravitational_parameter();
        let r = EARTH_RADIUS_M + 400_000.0;
        let mut state = VehicleOrbitalState::new(
            vehicle(),
            catalog,
            [r, 0.0, 0.0],
            [0.0, (mu / r).sqrt(), 0.0],
            &SimulationConfig::default(),
        )
        .unwrap();
        let report = state.tick(&ThrustCommand::off()).unwrap();
        assert_eq!(report.method, StepMethod::Kepler);
        assert!(report.kepler_converged());
    }

    #[test]
    fn kepler_non_convergence_is_reported() {
        let mut config = SimulationConfig::default();
        config.kepler.max_iterations = 1;
        config.kepler.tolerance = 1e-15;
        let catalog = earth_only();
        let mu = catalog.get("Earth").unwrap().gravitational_parameter();
        let r = 7_000_000.0;
        // 1.35 × circular speed at periapsis gives e ≈ 0.82
        let mut state = VehicleOrbitalState::new(
            vehicle(),
            catalog,
            [r, 0.0, 0.0],
            [0.0, 1.35 * (mu / r).sqrt(), 0.0],
            &config,
        )
        .unwrap();
        assert!((state.elements().eccentricity - 0.8225).abs() < 1e-3);

        let report = state.tick(&ThrustCommand::off()).unwrap();
        assert_eq!(report.method, StepMethod::Kepler);
        let solution = report.kepler.expect("elliptic step carries its solve");
        assert!(!solution.converged);
        assert!(!report.kepler_converged());

        let advance = state.advance(2.0 / 60.0, &NoThrust).unwrap();
        assert_eq!(advance.ticks, 2);
        assert_eq!(advance.unconverged_ticks, 2);
    }
}
