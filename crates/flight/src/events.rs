//! Discrete orbital events evaluated once per tick.

use orbsim_config::{EventConfig, EventTrigger};
use orbsim_impulsive::TransferOrbit;
use orbsim_orbits::{OrbitRegime, OrbitalElements, escape_speed};
use serde::Serialize;

/// Event published to observers. Every variant carries the simulated time it fired at.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrbitalEvent {
    PeriapsisReached {
        time_s: f64,
        radius_m: f64,
    },
    ApoapsisReached {
        time_s: f64,
        radius_m: f64,
    },
    AtmosphericEntry {
        time_s: f64,
        altitude_m: f64,
    },
    EscapeVelocityReached {
        time_s: f64,
        speed_m_s: f64,
        escape_speed_m_s: f64,
    },
    TransferComputed {
        time_s: f64,
        transfer: TransferOrbit,
    },
    RegimeChanged {
        time_s: f64,
        from: OrbitRegime,
        to: OrbitRegime,
    },
}

impl OrbitalEvent {
    pub fn time_s(&self) -> f64 {
        match self {
            OrbitalEvent::PeriapsisReached { time_s, .. }
            | OrbitalEvent::ApoapsisReached { time_s, .. }
            | OrbitalEvent::AtmosphericEntry { time_s, .. }
            | OrbitalEvent::EscapeVelocityReached { time_s, .. }
            | OrbitalEvent::TransferComputed { time_s, .. }
            | OrbitalEvent::RegimeChanged { time_s, .. } => *time_s,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrbitalEvent::PeriapsisReached { .. } => "periapsis_reached",
            OrbitalEvent::ApoapsisReached { .. } => "apoapsis_reached",
            OrbitalEvent::AtmosphericEntry { .. } => "atmospheric_entry",
            OrbitalEvent::EscapeVelocityReached { .. } => "escape_velocity_reached",
            OrbitalEvent::TransferComputed { .. } => "transfer_computed",
            OrbitalEvent::RegimeChanged { .. } => "regime_changed",
        }
    }
}

/// State sampled after a tick.
#[derive(Debug, Clone, Copy)]
pub struct EventInput<'a> {
    pub time_s: f64,
    pub radius_m: f64,
    pub altitude_m: f64,
    pub speed_m_s: f64,
    pub mu_m3_s2: f64,
    pub elements: &'a OrbitalElements,
}

const PERIAPSIS: usize = 0;
const APOAPSIS: usize = 1;
const ENTRY: usize = 2;
const ESCAPE: usize = 3;

/// Threshold checks with optional edge triggering.
///
/// With [`EventTrigger::Edge`] a condition fires once when it becomes true and re-arms when it
/// becomes false; with [`EventTrigger::Level`] it fires on every evaluation that holds.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDetector {
    tolerance_m: f64,
    entry_altitude_m: f64,
    trigger: EventTrigger,
    active: [bool; 4],
}

impl EventDetector {
    pub fn new(config: &EventConfig) -> Self {
        Self {
            tolerance_m: config.tolerance_distance_m,
            entry_altitude_m: config.atmospheric_entry_altitude_m,
            trigger: config.trigger,
            active: [false; 4],
        }
    }

    pub fn evaluate(&mut self, input: &EventInput<'_>) -> Vec<OrbitalEvent> {
        let el = input.elements;
        let periapsis = el.periapsis_distance();
        let apoapsis = el.apoapsis_distance();
        // apsides closer together than the tolerance cannot be told apart
        let distinct_apsides = apoapsis.is_none_or(|apo| apo - periapsis > 2.0 * self.tolerance_m);

        let near_periapsis =
            distinct_apsides && (input.radius_m - periapsis).abs() < self.tolerance_m;
        let near_apoapsis = distinct_apsides
            && el.regime().is_closed()
            && apoapsis.is_some_and(|apo| (input.radius_m - apo).abs() < self.tolerance_m);
        let below_entry = input.altitude_m < self.entry_altitude_m;
        let v_escape = escape_speed(input.mu_m3_s2, input.radius_m);
        let escaping = input.speed_m_s > v_escape;

        let mut events = Vec::new();
        if self.fires(PERIAPSIS, near_periapsis) {
            events.push(OrbitalEvent::PeriapsisReached {
                time_s: input.time_s,
                radius_m: input.radius_m,
            });
        }
        if self.fires(APOAPSIS, near_apoapsis) {
            events.push(OrbitalEvent::ApoapsisReached {
                time_s: input.time_s,
                radius_m: input.radius_m,
            });
        }
        if self.fires(ENTRY, below_entry) {
            events.push(OrbitalEvent::AtmosphericEntry {
                time_s: input.time_s,
                altitude_m: input.altitude_m,
            });
        }
        if self.fires(ESCAPE, escaping) {
            events.push(OrbitalEvent::EscapeVelocityReached {
                time_s: input.time_s,
                speed_m_s: input.speed_m_s,
                escape_speed_m_s: v_escape,
            });
        }
        events
    }

    fn fires(&mut self, slot: usize, condition: bool) -> bool {
        let was_active = std::mem::replace(&mut self.active[slot], condition);
        condition
            && match self.trigger {
                EventTrigger::Level => true,
                EventTrigger::Edge => !was_active,
            }
    }

    /// Re-arm every edge-triggered condition.
    pub fn reset(&mut self) {
        self.active = [false; 4];
    }
}
