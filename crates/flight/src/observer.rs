//! Observable-state interface for rendering, replication and logging consumers.

use std::collections::BTreeMap;

use crate::context::VehicleId;
use crate::events::OrbitalEvent;
use crate::vehicle::VehicleSnapshot;

/// Receives published state after each advance. Both hooks default to no-ops.
pub trait StateObserver {
    fn on_state(&mut self, _vehicle: VehicleId, _snapshot: &VehicleSnapshot) {}

    fn on_event(&mut self, _vehicle: VehicleId, _event: &OrbitalEvent) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl StateObserver for NullObserver {}

/// Collects events in publication order and keeps the latest snapshot per vehicle.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    pub events: Vec<(VehicleId, OrbitalEvent)>,
    pub latest: BTreeMap<VehicleId, VehicleSnapshot>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events_for(&self, vehicle: VehicleId) -> impl Iterator<Item = &OrbitalEvent> {
        self.events
            .iter()
            .filter(move |(id, _)| *id == vehicle)
            .map(|(_, event)| event)
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.latest.clear();
    }
}

impl StateObserver for EventLog {
    fn on_state(&mut self, vehicle: VehicleId, snapshot: &VehicleSnapshot) {
        self.latest.insert(vehicle, snapshot.clone());
    }

    fn on_event(&mut self, vehicle: VehicleId, event: &OrbitalEvent) {
        self.events.push((vehicle, event.clone()));
    }
}
