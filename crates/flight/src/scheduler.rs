//! Wall-clock to tick conversion with time acceleration.
//!
//! The integration step stays fixed in simulated seconds; time acceleration only changes how much
//! wall time separates two ticks. Requested changes take effect at the next tick boundary.

use orbsim_config::TimeAccelerationConfig;
use tracing::{debug, warn};

use crate::FlightError;

/// Ticks owed for one call to [`FixedStepScheduler::due_ticks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickBudget {
    pub ticks: u64,
    /// Ticks discarded because the backlog exceeded the per-advance cap.
    pub dropped: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedStepScheduler {
    step_s: f64,
    time_acceleration: f64,
    pending: Option<f64>,
    min_acceleration: f64,
    max_acceleration: f64,
    accumulated_wall_s: f64,
    max_ticks: u64,
}

impl FixedStepScheduler {
    pub fn new(
        step_s: f64,
        acceleration: &TimeAccelerationConfig,
        max_ticks_per_advance: u32,
    ) -> Result<Self, FlightError> {
        if !(step_s > 0.0 && step_s.is_finite()) {
            return Err(FlightError::InvalidSetting(format!(
                "integration step must be positive (got {step_s})"
            )));
        }
        if !(acceleration.min > 0.0 && acceleration.max >= acceleration.min) {
            return Err(FlightError::InvalidSetting(
                "time acceleration range must satisfy 0 < min <= max".into(),
            ));
        }
        Ok(Self {
            step_s,
            time_acceleration: acceleration.initial.clamp(acceleration.min, acceleration.max),
            pending: None,
            min_acceleration: acceleration.min,
            max_acceleration: acceleration.max,
            accumulated_wall_s: 0.0,
            max_ticks: u64::from(max_ticks_per_advance.max(1)),
        })
    }

    /// Integration step in simulated seconds.
    pub fn step_s(&self) -> f64 {
        self.step_s
    }

    /// Wall-clock seconds between ticks at the active time acceleration.
    pub fn tick_period_s(&self) -> f64 {
        self.step_s / self.time_acceleration
    }

    pub fn time_acceleration(&self) -> f64 {
        self.time_acceleration
    }

    /// Queue a new time acceleration, clamped to the configured range. Returns the clamped value.
    pub fn request_time_acceleration(&mut self, factor: f64) -> f64 {
        let clamped = if factor.is_nan() {
            self.time_acceleration
        } else {
            factor.clamp(self.min_acceleration, self.max_acceleration)
        };
        self.pending = Some(clamped);
        clamped
    }

    fn apply_pending(&mut self) {
        if let Some(next) = self.pending.take() {
            if next != self.time_acceleration {
                // keep the simulated-time fraction of a partially elapsed tick
                self.accumulated_wall_s *= self.time_acceleration / next;
                debug!(from = self.time_acceleration, to = next, "time acceleration changed");
                self.time_acceleration = next;
            }
        }
    }

    /// Accumulate `wall_dt_s` and return how many whole ticks are due.
    pub fn due_ticks(&mut self, wall_dt_s: f64) -> TickBudget {
        self.apply_pending();
        if wall_dt_s.is_finite() && wall_dt_s > 0.0 {
            self.accumulated_wall_s += wall_dt_s;
        }
        let period = self.tick_period_s();
        let ticks = (self.accumulated_wall_s / period + 1e-9).floor();
        self.accumulated_wall_s = (self.accumulated_wall_s - ticks * period).max(0.0);
        let ticks = ticks as u64;
        if ticks > self.max_ticks {
            let dropped = ticks - self.max_ticks;
            warn!(
                dropped,
                cap = self.max_ticks,
                "tick backlog exceeds cap; dropping simulated time"
            );
            TickBudget {
                ticks: self.max_ticks,
                dropped,
            }
        } else {
            TickBudget { ticks, dropped: 0 }
        }
    }

    /// Discard accumulated wall time and apply any pending acceleration.
    pub fn reset(&mut self) {
        self.apply_pending();
        self.accumulated_wall_s = 0.0;
    }
}
