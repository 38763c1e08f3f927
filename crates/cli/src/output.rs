//! Sample output files.
//!
//! `.json` writes the whole run report, `.csv` writes one row per sample.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::Writer;
use traffic::RunReport;

use crate::error::{CliError, Result};

const CSV_HEADER: [&str; 21] = [
    "iteration",
    "frame",
    "actor_id",
    "speed",
    "acceleration",
    "throttle",
    "brake",
    "steer",
    "gear",
    "manual_gear_shift",
    "hand_brake",
    "tire_friction",
    "max_rpm",
    "torque_curve",
    "inclination",
    "accelerometer",
    "engine_oil_percent",
    "tire_pressure",
    "seatbelt_fastened",
    "engine_rpm",
    "fuel_consumption",
];

/// Write `report` to `path`, format chosen by extension
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => write_json(path, report),
        Some("csv") => write_csv(path, report),
        _ => Err(CliError::unsupported_output(path)),
    }
}

fn write_json(path: &Path, report: &RunReport) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;
    Ok(())
}

fn write_csv(path: &Path, report: &RunReport) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(CSV_HEADER)?;

    for sample in &report.samples {
        let t = &sample.telemetry;
        let e = &sample.estimates;
        let torque_curve = t
            .torque_curve
            .iter()
            .map(|(rpm, torque)| format!("{rpm}:{torque}"))
            .collect::<Vec<_>>()
            .join(";");

        writer.write_record(&[
            sample.iteration.to_string(),
            sample.frame.to_string(),
            sample.actor_id.to_string(),
            t.speed.to_string(),
            t.acceleration.to_string(),
            t.throttle.to_string(),
            t.brake.to_string(),
            t.steer.to_string(),
            t.gear.to_string(),
            t.manual_gear_shift.to_string(),
            t.hand_brake.to_string(),
            t.tire_friction.to_string(),
            t.max_rpm.to_string(),
            torque_curve,
            t.inclination.to_string(),
            // CARLA has no separate accelerometer on the actor
            t.acceleration.to_string(),
            e.engine_oil_percent.to_string(),
            e.tire_pressure.to_string(),
            e.seatbelt_fastened.to_string(),
            e.engine_rpm.to_string(),
            sample.fuel_consumption.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
