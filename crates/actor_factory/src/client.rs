//! CARLA client abstraction
//!
//! Defines the narrow simulator interface the traffic run consumes, with a
//! real implementation (feature `real-carla`) and a mock for testing.

use std::future::Future;
use std::time::Duration;

use contracts::{
    ActorId, BlueprintInfo, Command, CommandResponse, Location, TrafficManagerSettings,
    Transform, VehicleState, WorldSettings,
};

use crate::error::Result;

/// CARLA client trait
///
/// Abstracts the CARLA operations used by a traffic run so the real client
/// and the mock share one interface.
pub trait CarlaClient: Send + Sync {
    /// Connect to CARLA server
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Current world settings
    fn world_settings(&self) -> impl Future<Output = Result<WorldSettings>> + Send;

    /// Apply world settings, returning the frame they took effect on
    fn apply_world_settings(
        &self,
        settings: WorldSettings,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Blueprints matching a wildcard filter, e.g. "vehicle.*"
    fn blueprints(&self, filter: &str) -> impl Future<Output = Result<Vec<BlueprintInfo>>> + Send;

    /// Recommended vehicle spawn points of the current map
    fn spawn_points(&self) -> impl Future<Output = Result<Vec<Transform>>> + Send;

    /// Random location on the pedestrian navigation mesh
    ///
    /// `None` when the sample was invalid.
    fn random_navigation_location(&self) -> impl Future<Output = Result<Option<Location>>> + Send;

    /// Apply a command batch
    ///
    /// Returns exactly one response per command, in command order. When
    /// `do_tick` is set the simulation advances one frame after the batch.
    fn apply_batch(
        &self,
        commands: Vec<Command>,
        do_tick: bool,
    ) -> impl Future<Output = Result<Vec<CommandResponse>>> + Send;

    /// Read a vehicle's kinematic, control and physics state
    fn vehicle_state(&self, actor_id: ActorId) -> impl Future<Output = Result<VehicleState>> + Send;

    /// Configure the traffic manager listening on `settings.port`
    fn configure_traffic_manager(
        &self,
        settings: &TrafficManagerSettings,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Switch the traffic manager's synchronous mode
    fn set_traffic_manager_synchronous(
        &self,
        port: u16,
        enabled: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Percentage below the speed limit all autopilot vehicles drive at
    fn set_global_speed_difference(
        &self,
        port: u16,
        percentage: f64,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Let the traffic manager drive a vehicle's lights
    fn update_vehicle_lights(
        &self,
        port: u16,
        actor_id: ActorId,
        enabled: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Seed of the pedestrian navigation random source
    fn set_pedestrians_seed(&self, seed: u64) -> impl Future<Output = Result<()>> + Send;

    /// Fraction of pedestrians allowed to cross roads
    fn set_pedestrians_cross_factor(&self, fraction: f64) -> impl Future<Output = Result<()>> + Send;

    /// Start an AI walker controller
    fn start_walker_controller(
        &self,
        controller_id: ActorId,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Stop an AI walker controller
    fn stop_walker_controller(
        &self,
        controller_id: ActorId,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Send an AI walker controller to a location
    fn walker_go_to_location(
        &self,
        controller_id: ActorId,
        location: Location,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Set an AI walker controller's max speed (m/s)
    fn set_walker_max_speed(
        &self,
        controller_id: ActorId,
        speed: f64,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Advance the simulation one frame (clock authority only)
    fn tick(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Wait for the next frame produced by whoever drives the clock
    fn wait_for_tick(&self) -> impl Future<Output = Result<u64>> + Send;
}
