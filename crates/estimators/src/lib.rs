//! # Estimators
//!
//! Heuristic estimators mapping telemetry and time deltas to derived
//! physical quantities.
//!
//! - Engine oil remaining percentage
//! - Tire pressure drift
//! - Seatbelt state inference
//! - Engine RPM and vehicle inclination
//!
//! All functions are pure. The seatbelt policy takes its random source as an
//! argument so callers decide between reproducible and OS-seeded draws.

pub mod engine;
pub mod engine_oil;
pub mod seatbelt;
pub mod tire;

pub use engine::{calculate_engine_rpm, vehicle_inclination};
pub use engine_oil::{
    estimate_engine_oil_percentage, EngineOilEstimator, WearFactors, WearScales,
    MAX_TIME_BEFORE_OIL_CHANGE_SECS,
};
pub use seatbelt::{is_seatbelt, SeatbeltPolicy};
pub use tire::calculate_pressure;
