//! Explicit simulation context: the shared catalog plus every active vehicle.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use orbsim_config::SimulationConfig;
use orbsim_core::vector::Vector3;
use orbsim_propulsion::Vehicle;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::FlightError;
use crate::catalog::CelestialBodyCatalog;
use crate::observer::StateObserver;
use crate::vehicle::{AdvanceReport, NoThrust, ThrustSource, VehicleOrbitalState};

/// Handle for a vehicle inside a [`SimulationContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VehicleId(u64);

impl VehicleId {
    /// Rebuild a handle from its numeric value, e.g. when reading telemetry back.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vehicle-{}", self.0)
    }
}

struct Entry {
    state: VehicleOrbitalState,
    controller: Box<dyn ThrustSource>,
}

/// Owns the catalog and the vehicle states. Vehicles advance independently and in parallel;
/// a failure in one vehicle's tick does not touch the others.
pub struct SimulationContext {
    catalog: Arc<CelestialBodyCatalog>,
    config: SimulationConfig,
    vehicles: BTreeMap<VehicleId, Entry>,
    next_id: u64,
}

impl fmt::Debug for SimulationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationContext")
            .field("bodies", &self.catalog.len())
            .field("vehicles", &self.vehicles.len())
            .finish_non_exhaustive()
    }
}

impl SimulationContext {
    pub fn new(
        catalog: CelestialBodyCatalog,
        config: SimulationConfig,
    ) -> Result<Self, FlightError> {
        config.validate()?;
        catalog.central_body(&config.central_body)?;
        Ok(Self {
            catalog: Arc::new(catalog),
            config,
            vehicles: BTreeMap::new(),
            next_id: 0,
        })
    }

    pub fn catalog(&self) -> &Arc<CelestialBodyCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Add a coasting vehicle at the given catalog-frame state.
    pub fn spawn_vehicle(
        &mut self,
        vehicle: Vehicle,
        position_m: Vector3,
        velocity_m_s: Vector3,
    ) -> Result<VehicleId, FlightError> {
        let state = VehicleOrbitalState::new(
            vehicle,
            Arc::clone(&self.catalog),
            position_m,
            velocity_m_s,
            &self.config,
        )?;
        let id = VehicleId(self.next_id);
        self.next_id += 1;
        info!(%id, vehicle = %state.vehicle().name, regime = ?state.regime(), "vehicle spawned");
        self.vehicles.insert(
            id,
            Entry {
                state,
                controller: Box::new(NoThrust),
            },
        );
        Ok(id)
    }

    /// Attach the flight-control collaborator that supplies thrust for `id`.
    pub fn set_controller(
        &mut self,
        id: VehicleId,
        controller: impl ThrustSource + 'static,
    ) -> Result<(), FlightError> {
        let entry = self
            .vehicles
            .get_mut(&id)
            .ok_or(FlightError::UnknownVehicle(id))?;
        entry.controller = Box::new(controller);
        Ok(())
    }

    /// Stop simulating `id` and hand back its final state.
    pub fn remove_vehicle(&mut self, id: VehicleId) -> Option<VehicleOrbitalState> {
        let entry = self.vehicles.remove(&id)?;
        info!(%id, "vehicle removed");
        Some(entry.state)
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&VehicleOrbitalState> {
        self.vehicles.get(&id).map(|entry| &entry.state)
    }

    pub fn vehicle_mut(&mut self, id: VehicleId) -> Option<&mut VehicleOrbitalState> {
        self.vehicles.get_mut(&id).map(|entry| &mut entry.state)
    }

    pub fn vehicle_ids(&self) -> Vec<VehicleId> {
        self.vehicles.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Request the same time acceleration for every vehicle.
    pub fn request_time_acceleration(&mut self, factor: f64) {
        for entry in self.vehicles.values_mut() {
            entry.state.request_time_acceleration(factor);
        }
    }

    /// Advance every vehicle by `wall_dt_s` of host time, in parallel, then publish snapshots and
    /// events to `observer` in vehicle order.
    pub fn advance_all(
        &mut self,
        wall_dt_s: f64,
        observer: &mut dyn StateObserver,
    ) -> Vec<(VehicleId, Result<AdvanceReport, FlightError>)> {
        let results: Vec<_> = self
            .vehicles
            .par_iter_mut()
            .map(|(id, entry)| {
                let Entry { state, controller } = entry;
                (*id, state.advance(wall_dt_s, controller.as_ref()))
            })
            .collect();

        for (id, result) in &results {
            match result {
                Ok(report) => {
                    for event in &report.events {
                        observer.on_event(*id, event);
                    }
                }
                Err(err) => warn!(%id, %err, "vehicle tick failed"),
            }
            if let Some(entry) = self.vehicles.get(id) {
                observer.on_state(*id, &entry.state.snapshot());
            }
        }
        results
    }

    /// Replace the catalog between ticks, e.g. after the host moved the bodies.
    ///
    /// The new catalog must still contain the configured central body. A vehicle whose elements
    /// cannot be recomputed against it keeps the previous catalog; its error is returned next to
    /// its id, in vehicle order.
    pub fn replace_catalog(
        &mut self,
        catalog: CelestialBodyCatalog,
    ) -> Result<Vec<(VehicleId, Result<(), FlightError>)>, FlightError> {
        catalog.central_body(&self.config.central_body)?;
        let catalog = Arc::new(catalog);
        let results = self
            .vehicles
            .iter_mut()
            .map(|(id, entry)| {
                let result = entry.state.replace_catalog(Arc::clone(&catalog));
                if let Err(err) = &result {
                    warn!(%id, %err, "vehicle kept previous catalog");
                }
                (*id, result)
            })
            .collect();
        self.catalog = catalog;
        Ok(results)
    }
}
