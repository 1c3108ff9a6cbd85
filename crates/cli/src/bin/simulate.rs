use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use orbsim::base::time::seconds_to_hours;
use orbsim::base::units::km_to_m;
use orbsim::base::vector;
use orbsim::config::load_vehicle_configs;
use orbsim::export::{
    RunSummary, TelemetryRecorder, write_summary, write_trajectory_csv, writer_for_path,
};
use orbsim::flight::{
    EventLog, OrbitalEvent, StateObserver, VehicleId, VehicleOrbitalState, VehicleSnapshot,
    select_vehicle,
};
use orbsim::propulsion::ThrustCommand;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Fly one vehicle around the central body and export its trajectory"
)]
struct Cli {
    /// Body catalog (YAML list, TOML file or directory of TOML files)
    #[arg(long, default_value = "configs/bodies")]
    bodies: PathBuf,

    /// Vehicle catalog
    #[arg(long, default_value = "configs/vehicles")]
    vehicles: PathBuf,

    /// Simulation settings (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Vehicle name (case-insensitive, defaults to the first record)
    #[arg(long)]
    vehicle: Option<String>,

    /// Initial altitude above the central body in km
    #[arg(long, default_value_t = 400.0)]
    altitude_km: f64,

    /// Initial speed as a multiple of the local circular speed
    #[arg(long, default_value_t = 1.0)]
    speed_factor: f64,

    /// Orbit inclination in degrees
    #[arg(long, default_value_t = 0.0)]
    inclination_deg: f64,

    /// Simulated seconds to fly
    #[arg(long, default_value_t = 5_400.0)]
    duration_s: f64,

    /// Simulated seconds between trajectory samples
    #[arg(long, default_value_t = 60.0)]
    sample_s: f64,

    /// Time-acceleration factor (clamped to the configured range)
    #[arg(long, default_value_t = 100.0)]
    time_acceleration: f64,

    /// Prograde thrust in newtons, applied from the start for --burn-s seconds
    #[arg(long, default_value_t = 0.0)]
    thrust_n: f64,

    /// Burn duration in simulated seconds
    #[arg(long, default_value_t = 0.0)]
    burn_s: f64,

    /// Plan a Hohmann transfer to this altitude (km) before flying
    #[arg(long)]
    transfer_to_km: Option<f64>,

    /// Trajectory CSV output (`-` for stdout)
    #[arg(long, default_value = "-")]
    output: PathBuf,

    /// Optional JSON-lines telemetry stream
    #[arg(long)]
    telemetry: Option<PathBuf>,

    /// Optional JSON run summary
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// Fans published state out to the in-memory log and the optional telemetry stream.
struct Observers {
    log: EventLog,
    telemetry: Option<TelemetryRecorder<Box<dyn Write>>>,
}

impl StateObserver for Observers {
    fn on_state(&mut self, vehicle: VehicleId, snapshot: &VehicleSnapshot) {
        self.log.on_state(vehicle, snapshot);
        if let Some(recorder) = self.telemetry.as_mut() {
            recorder.on_state(vehicle, snapshot);
        }
    }

    fn on_event(&mut self, vehicle: VehicleId, event: &OrbitalEvent) {
        self.log.on_event(vehicle, event);
        if let Some(recorder) = self.telemetry.as_mut() {
            recorder.on_event(vehicle, event);
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if !(cli.sample_s > 0.0 && cli.duration_s > 0.0) {
        bail!("--duration-s and --sample-s must be positive");
    }

    let mut ctx = orbsim::load_context(&cli.bodies, cli.config.as_deref())
        .with_context(|| format!("loading bodies from {}", cli.bodies.display()))?;
    let fleet = load_vehicle_configs(&cli.vehicles)
        .with_context(|| format!("loading vehicles from {}", cli.vehicles.display()))?;
    let vehicle = select_vehicle(&fleet, cli.vehicle.as_deref())?;

    let central = ctx
        .catalog()
        .central_body(&ctx.config().central_body)?
        .clone();
    let mu = central.gravitational_parameter();
    let radius = central.radius_m + km_to_m(cli.altitude_km);
    let speed = cli.speed_factor * (mu / radius).sqrt();
    let position = vector::add(&central.position_m, &[radius, 0.0, 0.0]);
    let velocity = vector::add(
        &central.velocity_m_s,
        &vector::rotate_x(&[0.0, speed, 0.0], cli.inclination_deg.to_radians()),
    );

    let id = ctx.spawn_vehicle(vehicle, position, velocity)?;
    if cli.thrust_n > 0.0 && cli.burn_s > 0.0 {
        let (thrust_n, burn_s, frame_velocity) = (cli.thrust_n, cli.burn_s, central.velocity_m_s);
        ctx.set_controller(id, move |state: &VehicleOrbitalState| {
            if state.simulation_time() < burn_s {
                ThrustCommand::new(vector::sub(&state.velocity(), &frame_velocity), thrust_n)
            } else {
                ThrustCommand::off()
            }
        })?;
    }

    let limits = &ctx.config().time_acceleration;
    let acceleration = cli.time_acceleration.clamp(limits.min, limits.max);
    ctx.request_time_acceleration(acceleration);

    if let Some(target_km) = cli.transfer_to_km {
        let state = ctx
            .vehicle_mut(id)
            .context("spawned vehicle disappeared")?;
        let transfer = state.plan_transfer(central.radius_m + km_to_m(target_km))?;
        eprintln!(
            "Hohmann to {:.0} km: Δv1 = {:.1} m/s, Δv2 = {:.1} m/s, TOF = {:.2} h",
            target_km,
            transfer.delta_v_m_s,
            transfer.arrival_delta_v_m_s,
            seconds_to_hours(transfer.transfer_time_s)
        );
    }

    let telemetry = match &cli.telemetry {
        Some(path) => Some(TelemetryRecorder::new(writer_for_path(path)?)),
        None => None,
    };
    let mut observers = Observers {
        log: EventLog::new(),
        telemetry,
    };

    let samples_due = (cli.duration_s / cli.sample_s).ceil() as usize;
    let wall_per_sample = cli.sample_s / acceleration;
    let mut samples = Vec::with_capacity(samples_due);
    info!(samples_due, wall_per_sample, "starting run");

    for _ in 0..samples_due {
        for (vehicle_id, result) in ctx.advance_all(wall_per_sample, &mut observers) {
            let report = result.with_context(|| format!("{vehicle_id} failed"))?;
            if report.dropped_ticks > 0 {
                warn!(dropped = report.dropped_ticks, "simulated time was dropped");
            }
            if report.unconverged_ticks > 0 {
                warn!(
                    ticks = report.unconverged_ticks,
                    "Kepler solve did not converge; best estimates were used"
                );
            }
        }
        let state = ctx.vehicle(id).context("vehicle disappeared")?;
        samples.push(state.snapshot());
        if state.altitude() < 0.0 {
            eprintln!(
                "Vehicle reached the surface at t = {:.1} s",
                state.simulation_time()
            );
            break;
        }
    }

    write_trajectory_csv(&cli.output, &samples)?;
    if let Some(recorder) = observers.telemetry.take() {
        recorder.finish()?;
    }

    let events: Vec<OrbitalEvent> = observers.log.events_for(id).cloned().collect();
    for event in &events {
        eprintln!("{:>12.1} s  {}", event.time_s(), event.name());
    }
    if let Some(path) = &cli.summary {
        write_summary(path, &RunSummary::from_run(&samples, &events))?;
    }

    Ok(())
}
