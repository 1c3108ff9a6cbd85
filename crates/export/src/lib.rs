//! Export helpers for trajectory CSV files and JSON telemetry.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

pub mod trajectory {
    use std::io::{self, Write};
    use std::path::Path;

    use orbsim_flight::VehicleSnapshot;

    const HEADER: &str = "time_s,x_m,y_m,z_m,vx_m_s,vy_m_s,vz_m_s,altitude_m,speed_m_s,semi_major_axis_m,eccentricity,inclination_deg,regime,mass_kg";

    /// Write the trajectory CSV header.
    pub fn write_header(writer: &mut dyn Write) -> io::Result<()> {
        writeln!(writer, "{}", HEADER)
    }

    /// Serialize one snapshot as a CSV row matching [`write_header`].
    pub fn write_row(writer: &mut dyn Write, s: &VehicleSnapshot) -> io::Result<()> {
        let [x, y, z] = s.position_m;
        let [vx, vy, vz] = s.velocity_m_s;
        let speed = (vx * vx + vy * vy + vz * vz).sqrt();
        writeln!(
            writer,
            "{:.3},{:.3},{:.3},{:.3},{:.6},{:.6},{:.6},{:.3},{:.6},{:.3},{:.9},{:.6},{:?},{:.3}",
            s.simulation_time_s,
            x,
            y,
            z,
            vx,
            vy,
            vz,
            s.altitude_m,
            speed,
            s.elements.semi_major_axis_m,
            s.elements.eccentricity,
            s.elements.inclination_rad.to_degrees(),
            s.regime,
            s.mass_kg,
        )
    }

    /// Write a complete trajectory file (header plus one row per snapshot).
    pub fn write_trajectory_csv(path: &Path, samples: &[VehicleSnapshot]) -> io::Result<()> {
        let mut writer = super::writer_for_path(path)?;
        write_header(writer.as_mut())?;
        for sample in samples {
            write_row(writer.as_mut(), sample)?;
        }
        writer.flush()
    }
}

pub mod telemetry {
    use std::collections::BTreeMap;
    use std::fs::{self, File};
    use std::io::{self, Write};
    use std::path::Path;

    use orbsim_flight::{OrbitalEvent, StateObserver, VehicleId, VehicleSnapshot};
    use serde::Serialize;
    use serde_json::to_writer_pretty;

    #[derive(Serialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    enum Line<'a> {
        State {
            vehicle: VehicleId,
            state: &'a VehicleSnapshot,
        },
        Event {
            vehicle: VehicleId,
            event: &'a OrbitalEvent,
        },
    }

    /// Observer that streams snapshots and events as JSON lines.
    ///
    /// Observer hooks cannot fail, so the first write error is kept and returned by
    /// [`TelemetryRecorder::finish`]; later records are skipped.
    pub struct TelemetryRecorder<W: Write> {
        writer: W,
        error: Option<io::Error>,
        lines: usize,
    }

    impl<W: Write> TelemetryRecorder<W> {
        pub fn new(writer: W) -> Self {
            Self {
                writer,
                error: None,
                lines: 0,
            }
        }

        pub fn lines_written(&self) -> usize {
            self.lines
        }

        fn write_line(&mut self, line: &Line<'_>) {
            if self.error.is_some() {
                return;
            }
            let result = serde_json::to_writer(&mut self.writer, line)
                .map_err(io::Error::from)
                .and_then(|()| self.writer.write_all(b"\n"));
            match result {
                Ok(()) => self.lines += 1,
                Err(err) => self.error = Some(err),
            }
        }

        /// Flush and hand back the writer, or the first error encountered.
        pub fn finish(mut self) -> io::Result<W> {
            if let Some(err) = self.error.take() {
                return Err(err);
            }
            self.writer.flush()?;
            Ok(self.writer)
        }
    }

    impl<W: Write> StateObserver for TelemetryRecorder<W> {
        fn on_state(&mut self, vehicle: VehicleId, snapshot: &VehicleSnapshot) {
            self.write_line(&Line::State {
                vehicle,
                state: snapshot,
            });
        }

        fn on_event(&mut self, vehicle: VehicleId, event: &OrbitalEvent) {
            self.write_line(&Line::Event { vehicle, event });
        }
    }

    /// End-of-run digest written next to the trajectory.
    #[derive(Debug, Clone, Serialize)]
    pub struct RunSummary<'a> {
        pub vehicle: &'a str,
        pub central_body: &'a str,
        pub duration_s: f64,
        pub min_altitude_m: f64,
        pub max_speed_m_s: f64,
        pub final_mass_kg: f64,
        pub event_counts: BTreeMap<&'static str, usize>,
        pub final_state: Option<&'a VehicleSnapshot>,
    }

    impl<'a> RunSummary<'a> {
        /// Aggregate samples and events; an empty sample list gives zeroed extrema.
        pub fn from_run(samples: &'a [VehicleSnapshot], events: &[OrbitalEvent]) -> Self {
            let first = samples.first();
            let last = samples.last();
            let mut event_counts = BTreeMap::new();
            for event in events {
                *event_counts.entry(event.name()).or_insert(0) += 1;
            }
            let speed = |s: &VehicleSnapshot| {
                let [vx, vy, vz] = s.velocity_m_s;
                (vx * vx + vy * vy + vz * vz).sqrt()
            };
            Self {
                vehicle: last.map_or("", |s| s.vehicle.as_str()),
                central_body: last.map_or("", |s| s.central_body.as_str()),
                duration_s: match (first, last) {
                    (Some(a), Some(b)) => b.simulation_time_s - a.simulation_time_s,
                    _ => 0.0,
                },
                min_altitude_m: samples
                    .iter()
                    .map(|s| s.altitude_m)
                    .reduce(f64::min)
                    .unwrap_or_default(),
                max_speed_m_s: samples.iter().map(speed).reduce(f64::max).unwrap_or_default(),
                final_mass_kg: last.map_or(0.0, |s| s.mass_kg),
                event_counts,
                final_state: last,
            }
        }
    }

    /// Write a pretty-printed JSON summary, creating parent directories as needed.
    pub fn write_summary(output: &Path, summary: &RunSummary<'_>) -> io::Result<()> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        to_writer_pretty(File::create(output)?, summary)?;
        Ok(())
    }
}

pub use telemetry::{RunSummary, TelemetryRecorder, write_summary};
pub use trajectory::write_trajectory_csv;

#[cfg(test)]
mod tests {
    use super::*;
    use orbsim_config::SimulationConfig;
    use orbsim_flight::{CelestialBodyCatalog, SimulationContext, StateObserver, VehicleSnapshot};
    use orbsim_propulsion::Vehicle;

    fn run(seconds: usize) -> (Vec<VehicleSnapshot>, Vec<orbsim_flight::OrbitalEvent>) {
        let mut ctx = SimulationContext::new(
            CelestialBodyCatalog::solar_default(),
            SimulationConfig::default(),
        )
        .unwrap();
        let mu = ctx.catalog().get("Earth").unwrap().gravitational_parameter();
        let r = 6_771_000.0;
        let vehicle = Vehicle::from_config(&orbsim_config::VehicleConfig {
            name: "probe".into(),
            dry_mass_kg: 1_000.0,
            propellant_mass_kg: 0.0,
            max_thrust_newtons: 100_000.0,
            isp_seconds: None,
            drag_coefficient: 2.0,
            cross_section_area_m2: 10.0,
        })
        .unwrap();
        let id = ctx
            .spawn_vehicle(vehicle, [r, 0.0, 0.0], [0.0, 1.05 * (mu / r).sqrt(), 0.0])
            .unwrap();
        let mut log = orbsim_flight::EventLog::new();
        let mut samples = Vec::new();
        for _ in 0..seconds {
            ctx.advance_all(1.0, &mut log);
            samples.push(ctx.vehicle(id).unwrap().snapshot());
        }
        let events = log.events.into_iter().map(|(_, e)| e).collect();
        (samples, events)
    }

    #[test]
    fn trajectory_csv_has_header_and_rows() {
        let (samples, _) = run(5);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/trajectory.csv");
        write_trajectory_csv(&path, &samples).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "time_s");
        assert_eq!(&headers[12], "regime");
        let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 5);
        assert_eq!(&rows[0][12], "Elliptical");
        let t: f64 = rows[4][0].parse().unwrap();
        assert!((t - 5.0).abs() < 1e-3);
    }

    #[test]
    fn recorder_writes_one_json_object_per_line() {
        let (samples, events) = run(2);
        let mut recorder = TelemetryRecorder::new(Vec::new());
        let id = orbsim_flight::VehicleId::from_raw(0);
        for event in &events {
            recorder.on_event(id, event);
        }
        recorder.on_state(id, &samples[1]);
        let expected = events.len() + 1;
        assert_eq!(recorder.lines_written(), expected);
        let bytes = recorder.finish().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), expected);
        let last = lines.last().unwrap();
        assert_eq!(last["kind"], "state");
        assert_eq!(last["state"]["vehicle"], "probe");
    }

    #[test]
    fn summary_aggregates_run() {
        let (samples, events) = run(10);
        let summary = RunSummary::from_run(&samples, &events);
        assert_eq!(summary.vehicle, "probe");
        assert!((summary.duration_s - 9.0).abs() < 1e-6);
        assert!(summary.max_speed_m_s > 7_000.0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_summary(&path, &summary).unwrap();
        let value: serde_json::Value =
            serde_json::from_reader(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(value["central_body"], "Earth");
    }
}
