use orbsim::export::{RunSummary, TelemetryRecorder, write_summary, write_trajectory_csv};
use orbsim::config::load_vehicle_configs;
use orbsim::flight::select_vehicle;
use tempfile::tempdir;

#[test]
fn context_run_exports_csv_telemetry_and_summary() {
    let mut ctx = orbsim::load_context("configs/bodies", None).expect("context");
    let fleet = load_vehicle_configs("configs/vehicles").expect("vehicles");
    let earth = ctx.catalog().central_body("Earth").expect("earth").clone();
    let r = earth.radius_m + 400_000.0;
    let v = (earth.gravitational_parameter() / r).sqrt() * 1.5;
    let id = ctx
        .spawn_vehicle(
            select_vehicle(&fleet, Some("tug")).expect("tug"),
            [r, 0.0, 0.0],
            [0.0, v, 0.0],
        )
        .expect("spawn");

    let mut recorder = TelemetryRecorder::new(Vec::new());
    let mut samples = Vec::new();
    for _ in 0..5 {
        ctx.advance_all(0.5, &mut recorder);
        samples.push(ctx.vehicle(id).expect("vehicle").snapshot());
    }
    assert_eq!(recorder.lines_written(), 5 + 2);
    let telemetry = String::from_utf8(recorder.finish().expect("flush")).expect("utf8");
    let kinds: Vec<String> = telemetry
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).expect("json line");
            value["kind"].as_str().expect("kind").to_string()
        })
        .collect();
    assert_eq!(kinds.iter().filter(|k| *k == "event").count(), 2);

    let dir = tempdir().expect("tempdir");
    let csv_path = dir.path().join("nested/trajectory.csv");
    write_trajectory_csv(&csv_path, &samples).expect("csv");
    let mut reader = csv::Reader::from_path(&csv_path).expect("reader");
    assert_eq!(reader.headers().expect("headers").len(), 14);
    let rows: Vec<_> = reader.records().collect::<Result<_, _>>().expect("rows");
    assert_eq!(rows.len(), 5);
    assert_eq!(&rows[4][12], "Hyperbolic");

    let summary_path = dir.path().join("summary.json");
    write_summary(&summary_path, &RunSummary::from_run(&samples, &[])).expect("summary");
    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary_path).expect("read")).expect("json");
    assert_eq!(summary["vehicle"], "Tug");
    assert!(summary["duration_s"].as_f64().expect("duration") > 1.9);
}
