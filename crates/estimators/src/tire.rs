//! Tire pressure drift
//!
//! Pressure rises 1 unit per 5 minutes of uptime and falls 1 unit per
//! 5 minutes stopped. Both effects stop growing after 20 minutes.

/// Seconds per one unit of pressure change
pub const PRESSURE_STEP_SECS: f64 = 300.0;

/// Both effects saturate after this many seconds (+/- 4 units)
pub const PRESSURE_CAP_SECS: f64 = 1200.0;

/// Pressure after `uptime_secs` of running, `stopped_for_secs` of which were stationary.
pub fn calculate_pressure(initial_pressure: f64, uptime_secs: f64, stopped_for_secs: f64) -> f64 {
    let rise = uptime_secs.clamp(0.0, PRESSURE_CAP_SECS) / PRESSURE_STEP_SECS;
    let fall = stopped_for_secs.clamp(0.0, PRESSURE_CAP_SECS) / PRESSURE_STEP_SECS;
    initial_pressure + rise - fall
}
