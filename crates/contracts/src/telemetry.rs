//! Vehicle telemetry records
//!
//! `VehicleState` is the raw reading from the simulator; `VehicleTelemetry` is
//! the per-step snapshot derived from it. Both are created fresh every
//! sampling step and never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::{ActorId, Rotation, Vector3};

/// Driver inputs currently applied to a vehicle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleControl {
    /// [0, 1]
    pub throttle: f64,
    /// [-1, 1]
    pub steer: f64,
    /// [0, 1]
    pub brake: f64,
    pub hand_brake: bool,
    pub reverse: bool,
    pub manual_gear_shift: bool,
    /// Negative for reverse, 0 for neutral
    pub gear: i32,
}

/// Point on the engine torque curve
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TorquePoint {
    pub rpm: f64,
    pub torque: f64,
}

/// Physics parameters of a vehicle relevant to telemetry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehiclePhysics {
    pub max_rpm: f64,
    pub torque_curve: Vec<TorquePoint>,
    /// Ratio of each forward gear, index 0 is first gear
    pub forward_gear_ratios: Vec<f64>,
    pub final_drive_ratio: f64,
    /// Tire friction per wheel, front-left first
    pub tire_friction: Vec<f64>,
    /// Wheel radius in meters, front-left first
    pub wheel_radius_m: Vec<f64>,
}

/// Raw vehicle state read from the simulator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub actor_id: ActorId,
    pub velocity: Vector3,
    pub acceleration: Vector3,
    pub rotation: Rotation,
    pub control: VehicleControl,
    pub physics: VehiclePhysics,
}

/// Per-vehicle, per-step telemetry snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleTelemetry {
    /// m/s
    pub speed: f64,
    /// m/s^2
    pub acceleration: f64,
    pub throttle: f64,
    pub brake: f64,
    pub steer: f64,
    pub gear: i32,
    pub manual_gear_shift: bool,
    pub hand_brake: bool,
    /// Friction of the first wheel
    pub tire_friction: f64,
    pub max_rpm: f64,
    pub torque_curve: Vec<(f64, f64)>,
    /// Pitch in degrees
    pub inclination: f64,
}

/// Quantities derived by the heuristic estimators for one sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleEstimates {
    /// Engine oil remaining, [0, 100]
    pub engine_oil_percent: f64,
    /// Tire pressure, same unit as the configured initial pressure
    pub tire_pressure: f64,
    pub seatbelt_fastened: bool,
    pub engine_rpm: f64,
}

/// One entry of the sampling loop output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Sampling iteration, starting at 0
    pub iteration: u32,
    /// Simulator frame the sample was taken at
    pub frame: u64,
    pub actor_id: ActorId,
    pub telemetry: VehicleTelemetry,
    pub estimates: VehicleEstimates,
    /// Predicted fuel consumption for the configured trip
    pub fuel_consumption: f64,
}
