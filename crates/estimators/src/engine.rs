//! Engine RPM and inclination

use std::f64::consts::PI;

use contracts::Rotation;

/// Engine RPM from wheel speed.
///
/// `rpm = speed * 60 / (2π r)`, scaled by `gear_ratio * final_drive_ratio`
/// when a forward gear is engaged. Neutral and reverse return the wheel rate.
/// A non-positive rolling radius yields 0.
pub fn calculate_engine_rpm(
    current_gear: i32,
    gear_ratio: f64,
    final_drive_ratio: f64,
    speed_mps: f64,
    rolling_radius_m: f64,
) -> f64 {
    if rolling_radius_m <= 0.0 {
        return 0.0;
    }
    let rpm = (speed_mps * 60.0) / (2.0 * PI * rolling_radius_m);
    if current_gear > 0 {
        rpm * gear_ratio * final_drive_ratio
    } else {
        rpm
    }
}

/// Inclination is the pitch component of the orientation
pub fn vehicle_inclination(rotation: &Rotation) -> f64 {
    rotation.pitch
}
