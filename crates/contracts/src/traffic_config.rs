//! TrafficConfig - Config Loader output
//!
//! Describes a complete traffic run: simulator connection, clock, traffic
//! manager, vehicle and pedestrian populations, sampling, estimators and the
//! fuel model. Every field has a default so an empty document is a valid run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

use crate::{ActorGeneration, ClockMode, ContractError, TrafficManagerSettings};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete traffic run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TrafficConfig {
    pub version: ConfigVersion,

    #[validate(nested)]
    pub carla: CarlaConfig,

    #[validate(nested)]
    pub world: WorldConfig,

    #[validate(nested)]
    pub traffic_manager: TrafficManagerConfig,

    #[validate(nested)]
    pub vehicles: VehiclePopulation,

    #[validate(nested)]
    pub pedestrians: PedestrianPopulation,

    #[validate(nested)]
    pub sampling: SamplingConfig,

    #[validate(nested)]
    pub estimators: EstimatorConfig,

    #[validate(nested)]
    pub fuel: FuelConfig,
}

/// Simulator connection
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CarlaConfig {
    #[validate(length(min = 1))]
    pub host: String,

    #[validate(range(min = 1))]
    pub port: u16,

    /// Client RPC timeout in seconds
    #[validate(range(min = 0.1))]
    pub timeout_secs: f64,
}

impl Default for CarlaConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 2000,
            timeout_secs: 10.0,
        }
    }
}

/// Clock and world settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WorldConfig {
    pub clock_mode: ClockMode,

    /// Fixed tick applied when this run claims synchronous mode
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub fixed_delta_seconds: f64,

    /// Disable rendering for the duration of the run
    pub no_rendering: bool,

    pub hybrid_physics: bool,

    #[validate(range(min = 0.0))]
    pub hybrid_physics_radius: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            clock_mode: ClockMode::Synchronous,
            fixed_delta_seconds: 0.05,
            no_rendering: false,
            hybrid_physics: false,
            hybrid_physics_radius: 70.0,
        }
    }
}

/// Traffic manager tuning
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TrafficManagerConfig {
    #[validate(range(min = 1))]
    pub port: u16,

    #[validate(range(min = 0.0))]
    pub distance_to_leading_vehicle: f64,

    pub respawn_dormant: bool,

    /// Percentage below the speed limit vehicles drive at (negative = faster)
    #[validate(range(min = -100.0, max = 100.0))]
    pub global_speed_difference: f64,
}

impl Default for TrafficManagerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            distance_to_leading_vehicle: 2.5,
            respawn_dormant: true,
            global_speed_difference: 10.0,
        }
    }
}

/// Vehicle population
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct VehiclePopulation {
    pub count: usize,

    #[validate(length(min = 1))]
    pub filter: String,

    /// "all", "1" or "2"
    pub generation: String,

    /// Restrict to car-class blueprints
    pub safe: bool,

    /// None seeds from the OS
    pub seed: Option<u64>,

    /// First vehicle gets the `hero` role
    pub hero: bool,

    /// Let the traffic manager drive vehicle lights
    pub car_lights_on: bool,
}

impl Default for VehiclePopulation {
    fn default() -> Self {
        Self {
            count: 30,
            filter: "vehicle.audi.*".to_string(),
            generation: "all".to_string(),
            safe: true,
            seed: None,
            hero: false,
            car_lights_on: false,
        }
    }
}

impl VehiclePopulation {
    pub fn generation(&self) -> Result<ActorGeneration, ContractError> {
        self.generation.parse()
    }
}

/// Pedestrian population
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PedestrianPopulation {
    pub count: usize,

    #[validate(length(min = 1))]
    pub filter: String,

    pub generation: String,

    /// Independent from the vehicle seed; None derives one from the vehicle RNG
    pub seed: Option<u64>,

    /// Fraction of pedestrians that run instead of walk
    #[validate(range(min = 0.0, max = 1.0))]
    pub running_fraction: f64,

    /// Fraction of pedestrians allowed to cross roads
    #[validate(range(min = 0.0, max = 1.0))]
    pub crossing_fraction: f64,
}

impl Default for PedestrianPopulation {
    fn default() -> Self {
        Self {
            count: 10,
            filter: "walker.pedestrian.*".to_string(),
            generation: "2".to_string(),
            seed: None,
            running_fraction: 0.0,
            crossing_fraction: 0.0,
        }
    }
}

impl PedestrianPopulation {
    pub fn generation(&self) -> Result<ActorGeneration, ContractError> {
        self.generation.parse()
    }
}

/// Sampling loop
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SamplingConfig {
    #[validate(range(min = 1))]
    pub iterations: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { iterations: 10 }
    }
}

/// Heuristic estimator inputs not available from the simulator
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Time already elapsed since the last oil change when the run starts
    #[validate(range(min = 0.0))]
    pub seconds_since_oil_change: f64,

    #[validate(range(min = 0.0))]
    pub initial_tire_pressure: f64,

    /// Speeds below this count as stopped (m/s)
    #[validate(range(min = 0.0))]
    pub stopped_speed_threshold: f64,

    /// Used when the simulator reports no wheel radius
    #[validate(range(exclusive_min = 0.0))]
    pub rolling_radius_m: f64,

    /// Seed of the seatbelt policy random source; None seeds from the OS
    pub seatbelt_seed: Option<u64>,

    #[validate(nested)]
    pub wear_scales: WearScales,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            seconds_since_oil_change: 0.0,
            initial_tire_pressure: 32.0,
            stopped_speed_threshold: 0.1,
            rolling_radius_m: 0.35,
            seatbelt_seed: None,
            wear_scales: WearScales::default(),
        }
    }
}

/// Value at which each engine-oil wear factor saturates to 1.0.
/// A zero scale removes the factor from the wear term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WearScales {
    #[validate(range(min = 0.0))]
    pub speed: f64,
    #[validate(range(min = 0.0))]
    pub acceleration: f64,
    #[validate(range(min = 0.0))]
    pub throttle: f64,
    #[validate(range(min = 0.0))]
    pub brake: f64,
    #[validate(range(min = 0.0))]
    pub steer: f64,
    #[validate(range(min = 0.0))]
    pub gear: f64,
    #[validate(range(min = 0.0))]
    pub tire_friction: f64,
    #[validate(range(min = 0.0))]
    pub max_rpm: f64,
    #[validate(range(min = 0.0))]
    pub accelerometer: f64,
}

impl Default for WearScales {
    fn default() -> Self {
        Self {
            speed: 70.0,
            acceleration: 10.0,
            throttle: 1.0,
            brake: 1.0,
            steer: 1.0,
            gear: 8.0,
            tire_friction: 4.0,
            max_rpm: 20_000.0,
            accelerometer: 10.0,
        }
    }
}

/// Fuel model location and the trip it is queried with
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FuelConfig {
    pub model_path: PathBuf,

    #[validate(nested)]
    pub trip: TripParameters,
}

impl Default for FuelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/fuel_consumption.json"),
            trip: TripParameters::default(),
        }
    }
}

/// Fuel type of the trip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GasType {
    E10,
    #[default]
    Sp98,
}

impl GasType {
    /// Categorical code used by the model (E10 = 0, SP98 = 1)
    pub fn code(self) -> u8 {
        match self {
            Self::E10 => 0,
            Self::Sp98 => 1,
        }
    }
}

/// Trip context passed to the fuel predictor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TripParameters {
    #[validate(range(min = 0.0))]
    pub distance: f64,

    #[validate(range(min = 0.0))]
    pub speed: f64,

    pub gas_type: GasType,
    pub air_conditioning: bool,
    pub rain: bool,
    pub sun: bool,
}

impl Default for TripParameters {
    fn default() -> Self {
        Self {
            distance: 50.0,
            speed: 60.0,
            gas_type: GasType::Sp98,
            air_conditioning: true,
            rain: false,
            sun: true,
        }
    }
}

impl TrafficConfig {
    /// Traffic manager settings derived from world and traffic manager sections
    pub fn traffic_manager_settings(&self) -> TrafficManagerSettings {
        TrafficManagerSettings {
            port: self.traffic_manager.port,
            synchronous_mode: self.world.clock_mode == ClockMode::Synchronous,
            distance_to_leading_vehicle: self.traffic_manager.distance_to_leading_vehicle,
            respawn_dormant_vehicles: self.traffic_manager.respawn_dormant,
            hybrid_physics_radius: self
                .world
                .hybrid_physics
                .then_some(self.world.hybrid_physics_radius),
            random_device_seed: self.vehicles.seed,
        }
    }
}
