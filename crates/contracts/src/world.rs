//! World-level geometry and settings shared with the simulator.

use serde::{Deserialize, Serialize};

/// 3D transform: location + rotation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Location (x, y, z) in meters
    pub location: Location,

    /// Rotation (pitch, yaw, roll) in degrees
    pub rotation: Rotation,
}

impl Transform {
    /// Transform at `location` with zero rotation
    pub fn at(location: Location) -> Self {
        Self {
            location,
            rotation: Rotation::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// Generic 3D vector (velocity, acceleration)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    /// Euclidean norm
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Episode settings of the simulator world.
///
/// `synchronous_mode` is process-wide state: whoever turns it on becomes the
/// clock authority and must be the one to turn it off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSettings {
    pub synchronous_mode: bool,
    pub no_rendering_mode: bool,
    pub fixed_delta_seconds: Option<f64>,
}

/// Simulation clock mode requested by the operator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
    /// The orchestrator steps the world with a fixed tick
    #[default]
    Synchronous,
    /// An external driver steps the world; the orchestrator only waits
    Asynchronous,
}

/// Traffic manager tuning applied before spawning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficManagerSettings {
    pub port: u16,
    pub synchronous_mode: bool,
    pub distance_to_leading_vehicle: f64,
    pub respawn_dormant_vehicles: bool,
    /// Hybrid physics radius in meters, `None` disables hybrid mode
    pub hybrid_physics_radius: Option<f64>,
    pub random_device_seed: Option<u64>,
}
