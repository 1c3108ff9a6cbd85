use std::path::PathBuf;

use clap::Parser;
use orbsim::base::time::seconds_to_hours;
use orbsim::base::units::{km_to_m, m_to_km};
use orbsim::config::load_bodies;
use orbsim::flight::CelestialBodyCatalog;
use orbsim::impulsive::{bi_elliptic, hohmann};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Coplanar circular-to-circular transfer estimates around a catalog body"
)]
struct Cli {
    /// Body catalog (YAML list, TOML file or directory of TOML files)
    #[arg(long, default_value = "configs/bodies")]
    bodies: PathBuf,

    /// Central body name (case-insensitive)
    #[arg(long, default_value = "Earth")]
    body: String,

    /// Initial circular-orbit altitude in km
    #[arg(long)]
    from_altitude_km: f64,

    /// Target circular-orbit altitude in km
    #[arg(long)]
    to_altitude_km: f64,

    /// Also evaluate a bi-elliptic transfer through this apoapsis altitude (km)
    #[arg(long)]
    bi_elliptic_km: Option<f64>,

    /// Print the plan as JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let catalog = CelestialBodyCatalog::from_configs(&load_bodies(&cli.bodies)?)?;
    let body = catalog.central_body(&cli.body)?;
    let mu = body.gravitational_parameter();
    let r1 = body.radius_m + km_to_m(cli.from_altitude_km);
    let r2 = body.radius_m + km_to_m(cli.to_altitude_km);

    let transfer = hohmann(r1, r2, mu)?;
    let bi = cli
        .bi_elliptic_km
        .map(|rb_km| bi_elliptic(r1, r2, body.radius_m + km_to_m(rb_km), mu))
        .transpose()?;

    if cli.json {
        let value = serde_json::json!({
            "body": body.name,
            "hohmann": transfer,
            "bi_elliptic": bi,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("=== Hohmann Transfer around {} ===", body.name);
    println!(
        "Radii          : r1 = {:.1} km, r2 = {:.1} km",
        m_to_km(r1),
        m_to_km(r2)
    );
    println!(
        "Transfer orbit : a = {:.1} km, e = {:.4}",
        m_to_km(transfer.semi_major_axis_m),
        transfer.eccentricity
    );
    println!(
        "Burns          : Δv1 = {:.1} m/s, Δv2 = {:.1} m/s, total = {:.1} m/s",
        transfer.delta_v_m_s, transfer.arrival_delta_v_m_s, transfer.total_delta_v_m_s
    );
    println!(
        "Transfer time  : {:.2} h",
        seconds_to_hours(transfer.transfer_time_s)
    );
    if let Some(bi) = bi {
        println!(
            "Bi-elliptic    : Δv_total = {:.1} m/s (dv1={:.1}, dv2={:.1}, dv3={:.1}), TOF = {:.2} h",
            bi.total_delta_v_m_s,
            bi.dv1_m_s,
            bi.dv2_m_s,
            bi.dv3_m_s,
            seconds_to_hours(bi.transfer_time_s)
        );
    }
    Ok(())
}
