//! Real CARLA client implementation
//!
//! Connects to CARLA server using carla-rust crate.
//! Batches are executed command by command so every command still yields its
//! own response.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use carla::client::{
    Actor, ActorBase, ActorBlueprint, Client, TrafficManager, Vehicle, WalkerAIController, World,
};
use carla::geom::{Location as CarlaLocation, Rotation as CarlaRotation, Transform as CarlaTransform};
use contracts::{
    ActorId, BlueprintAttribute, BlueprintInfo, Command, CommandResponse, Location, Rotation,
    SpawnCommand, TorquePoint, TrafficManagerSettings, Transform, Vector3, VehicleControl,
    VehiclePhysics, VehicleState, WorldSettings,
};
use tracing::{debug, info, instrument, warn};

use crate::client::CarlaClient;
use crate::error::{ActorFactoryError, Result};

/// Real CARLA client
///
/// Wraps carla-rust's Client, implements CarlaClient trait.
/// Uses Mutex for interior mutability, allowing `&self` methods to modify World.
#[derive(Default, Clone)]
pub struct RealCarlaClient {
    /// CARLA client
    client: Arc<Mutex<Option<Client>>>,
    /// World reference
    world: Arc<Mutex<Option<World>>>,
    /// Actors spawned through this client
    actors: Arc<Mutex<HashMap<ActorId, Actor>>>,
    /// Traffic managers by port
    traffic_managers: Arc<Mutex<HashMap<u16, TrafficManager>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RealCarlaClient {
    /// Create new client (disconnected state)
    pub fn new() -> Self {
        Self::default()
    }

    /// Access World with mutable reference, ensuring connected
    fn with_world_mut<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut World) -> Result<R>,
    {
        let mut world_guard = lock(&self.world);
        let world = world_guard.as_mut().ok_or_else(ActorFactoryError::not_connected)?;
        f(world)
    }

    fn with_traffic_manager<R, F>(&self, port: u16, f: F) -> Result<R>
    where
        F: FnOnce(&mut TrafficManager) -> R,
    {
        let mut managers = lock(&self.traffic_managers);
        if !managers.contains_key(&port) {
            let client_guard = lock(&self.client);
            let client = client_guard.as_ref().ok_or_else(ActorFactoryError::not_connected)?;
            managers.insert(port, client.instance_tm(Some(port)));
        }
        let manager = managers
            .get_mut(&port)
            .ok_or_else(|| ActorFactoryError::simulator("traffic_manager", "not available"))?;
        Ok(f(manager))
    }

    fn actor(&self, actor_id: ActorId) -> Result<Actor> {
        lock(&self.actors)
            .get(&actor_id)
            .cloned()
            .ok_or(ActorFactoryError::ActorNotFound { actor_id })
    }

    fn controller(&self, controller_id: ActorId) -> Result<WalkerAIController> {
        WalkerAIController::try_from(self.actor(controller_id)?)
            .map_err(|_| ActorFactoryError::ActorNotFound { actor_id: controller_id })
    }

    fn vehicle(&self, actor_id: ActorId) -> Result<Vehicle> {
        Vehicle::try_from(self.actor(actor_id)?).map_err(|_| ActorFactoryError::ActorNotFound { actor_id })
    }

    fn to_blueprint_info(bp: &ActorBlueprint) -> BlueprintInfo {
        bp.attributes()
            .iter()
            .fold(BlueprintInfo::new(bp.id()), |info, attr| {
                info.with_attribute(
                    attr.id(),
                    BlueprintAttribute::with_recommended(attr.value_string(), attr.recommended_values()),
                )
            })
    }

    fn spawn_one(&self, world: &mut World, command: &SpawnCommand) -> std::result::Result<ActorId, String> {
        let mut bp = world
            .blueprint_library()
            .find(&command.blueprint)
            .ok_or_else(|| format!("blueprint '{}' not found", command.blueprint))?;

        for (key, value) in &command.attributes {
            if !bp.set_attribute(key, value) {
                warn!(key, value, "failed to set blueprint attribute");
            }
        }

        let transform = to_carla_transform(command.transform);
        let actor = match command.parent {
            Some(parent_id) => {
                let parent = self.actor(parent_id).map_err(|e| e.to_string())?;
                world.spawn_actor_attached(&bp, &transform, &parent, None)
            }
            None => world.spawn_actor(&bp, &transform),
        }
        .map_err(|e| e.to_string())?;

        let actor_id = actor.id();
        if let Some(port) = command.autopilot_port {
            match Vehicle::try_from(actor.clone()) {
                Ok(vehicle) => vehicle.set_autopilot_opt(true, port),
                Err(_) => warn!(actor_id, "autopilot requested on a non-vehicle actor"),
            }
        }
        lock(&self.actors).insert(actor_id, actor);
        Ok(actor_id)
    }

    fn destroy_one(&self, actor_id: ActorId) -> std::result::Result<ActorId, String> {
        let actor = lock(&self.actors)
            .remove(&actor_id)
            .ok_or_else(|| format!("actor {actor_id} not found"))?;
        if actor.destroy() {
            Ok(actor_id)
        } else {
            Err(format!("destroy of actor {actor_id} returned false"))
        }
    }
}

/// Convert internal Transform to CARLA Transform
fn to_carla_transform(transform: Transform) -> CarlaTransform {
    CarlaTransform {
        location: to_carla_location(transform.location),
        rotation: CarlaRotation {
            pitch: transform.rotation.pitch as f32,
            yaw: transform.rotation.yaw as f32,
            roll: transform.rotation.roll as f32,
        },
    }
}

fn to_carla_location(location: Location) -> CarlaLocation {
    CarlaLocation {
        x: location.x as f32,
        y: location.y as f32,
        z: location.z as f32,
    }
}

fn from_carla_transform(transform: &CarlaTransform) -> Transform {
    Transform {
        location: Location {
            x: f64::from(transform.location.x),
            y: f64::from(transform.location.y),
            z: f64::from(transform.location.z),
        },
        rotation: Rotation {
            pitch: f64::from(transform.rotation.pitch),
            yaw: f64::from(transform.rotation.yaw),
            roll: f64::from(transform.rotation.roll),
        },
    }
}

impl CarlaClient for RealCarlaClient {
    #[instrument(name = "real_carla_connect", skip(self), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        let mut client = Client::connect(host, port, None);
        client.set_timeout(timeout);
        let world = client.world();

        info!(map = %world.map().name(), "connected to CARLA server");

        *lock(&self.client) = Some(client);
        *lock(&self.world) = Some(world);
        Ok(())
    }

    async fn world_settings(&self) -> Result<WorldSettings> {
        self.with_world_mut(|world| {
            let settings = world.settings();
            Ok(WorldSettings {
                synchronous_mode: settings.synchronous_mode,
                no_rendering_mode: settings.no_rendering_mode,
                fixed_delta_seconds: settings.fixed_delta_seconds,
            })
        })
    }

    #[instrument(name = "real_carla_apply_settings", skip(self), fields(sync = settings.synchronous_mode))]
    async fn apply_world_settings(&self, settings: WorldSettings) -> Result<u64> {
        self.with_world_mut(|world| {
            let mut episode = world.settings();
            episode.synchronous_mode = settings.synchronous_mode;
            episode.no_rendering_mode = settings.no_rendering_mode;
            episode.fixed_delta_seconds = settings.fixed_delta_seconds;
            Ok(world.apply_settings(&episode, Duration::from_secs(10)))
        })
    }

    #[instrument(name = "real_carla_blueprints", skip(self), fields(filter = %filter))]
    async fn blueprints(&self, filter: &str) -> Result<Vec<BlueprintInfo>> {
        self.with_world_mut(|world| {
            Ok(world
                .blueprint_library()
                .filter(filter)
                .iter()
                .map(|bp| Self::to_blueprint_info(&bp))
                .collect())
        })
    }

    async fn spawn_points(&self) -> Result<Vec<Transform>> {
        self.with_world_mut(|world| {
            Ok(world
                .map()
                .recommended_spawn_points()
                .iter()
                .map(from_carla_transform)
                .collect())
        })
    }

    async fn random_navigation_location(&self) -> Result<Option<Location>> {
        self.with_world_mut(|world| {
            Ok(world.random_location_from_navigation().map(|loc| Location {
                x: f64::from(loc.x),
                y: f64::from(loc.y),
                z: f64::from(loc.z),
            }))
        })
    }

    #[instrument(name = "real_carla_apply_batch", skip(self, commands), fields(count = commands.len(), do_tick))]
    async fn apply_batch(&self, commands: Vec<Command>, do_tick: bool) -> Result<Vec<CommandResponse>> {
        self.with_world_mut(|world| {
            let responses = commands
                .iter()
                .map(|command| {
                    let outcome = match command {
                        Command::Spawn(spawn) => self.spawn_one(world, spawn),
                        Command::Destroy(actor_id) => self.destroy_one(*actor_id),
                    };
                    match outcome {
                        Ok(actor_id) => CommandResponse::Ok(actor_id),
                        Err(message) => CommandResponse::Failed(message),
                    }
                })
                .collect();

            if do_tick {
                if world.settings().synchronous_mode {
                    world.tick();
                } else {
                    world.wait_for_tick();
                }
            }
            Ok(responses)
        })
    }

    async fn vehicle_state(&self, actor_id: ActorId) -> Result<VehicleState> {
        let vehicle = self.vehicle(actor_id)?;
        let velocity = vehicle.velocity();
        let acceleration = vehicle.acceleration();
        let transform = vehicle.transform();
        let control = vehicle.control();
        let physics = vehicle.physics_control();

        Ok(VehicleState {
            actor_id,
            velocity: Vector3 {
                x: f64::from(velocity.x),
                y: f64::from(velocity.y),
                z: f64::from(velocity.z),
            },
            acceleration: Vector3 {
                x: f64::from(acceleration.x),
                y: f64::from(acceleration.y),
                z: f64::from(acceleration.z),
            },
            rotation: from_carla_transform(&transform).rotation,
            control: VehicleControl {
                throttle: f64::from(control.throttle),
                steer: f64::from(control.steer),
                brake: f64::from(control.brake),
                hand_brake: control.hand_brake,
                reverse: control.reverse,
                manual_gear_shift: control.manual_gear_shift,
                gear: control.gear,
            },
            physics: VehiclePhysics {
                max_rpm: f64::from(physics.max_rpm),
                torque_curve: physics
                    .torque_curve
                    .iter()
                    .map(|v| TorquePoint {
                        rpm: f64::from(v.x),
                        torque: f64::from(v.y),
                    })
                    .collect(),
                forward_gear_ratios: physics
                    .forward_gears
                    .iter()
                    .map(|g| f64::from(g.ratio))
                    .collect(),
                final_drive_ratio: f64::from(physics.final_ratio),
                tire_friction: physics
                    .wheels
                    .iter()
                    .map(|w| f64::from(w.tire_friction))
                    .collect(),
                // CARLA reports wheel radius in centimetres
                wheel_radius_m: physics
                    .wheels
                    .iter()
                    .map(|w| f64::from(w.radius) / 100.0)
                    .collect(),
            },
        })
    }

    #[instrument(name = "real_carla_configure_traffic_manager", skip(self, settings), fields(port = settings.port))]
    async fn configure_traffic_manager(&self, settings: &TrafficManagerSettings) -> Result<()> {
        self.with_traffic_manager(settings.port, |tm| {
            tm.set_global_distance_to_leading_vehicle(settings.distance_to_leading_vehicle as f32);
            tm.set_respawn_dormant_vehicles(settings.respawn_dormant_vehicles);
            if let Some(radius) = settings.hybrid_physics_radius {
                tm.set_hybrid_physics_mode(true);
                tm.set_hybrid_physics_radius(radius as f32);
            }
            if let Some(seed) = settings.random_device_seed {
                tm.set_random_device_seed(seed);
            }
            tm.set_synchronous_mode(settings.synchronous_mode);
        })
    }

    async fn set_traffic_manager_synchronous(&self, port: u16, enabled: bool) -> Result<()> {
        self.with_traffic_manager(port, |tm| tm.set_synchronous_mode(enabled))
    }

    async fn set_global_speed_difference(&self, port: u16, percentage: f64) -> Result<()> {
        self.with_traffic_manager(port, |tm| {
            tm.set_global_percentage_speed_difference(percentage as f32)
        })
    }

    async fn update_vehicle_lights(&self, port: u16, actor_id: ActorId, enabled: bool) -> Result<()> {
        let actor = self.actor(actor_id)?;
        self.with_traffic_manager(port, |tm| tm.update_vehicle_lights(&actor, enabled))
    }

    async fn set_pedestrians_seed(&self, seed: u64) -> Result<()> {
        self.with_world_mut(|world| {
            world.set_pedestrians_seed(seed as u32);
            Ok(())
        })
    }

    async fn set_pedestrians_cross_factor(&self, fraction: f64) -> Result<()> {
        self.with_world_mut(|world| {
            world.set_pedestrians_cross_factor(fraction as f32);
            Ok(())
        })
    }

    async fn start_walker_controller(&self, controller_id: ActorId) -> Result<()> {
        self.controller(controller_id)?.start();
        Ok(())
    }

    async fn stop_walker_controller(&self, controller_id: ActorId) -> Result<()> {
        self.controller(controller_id)?.stop();
        Ok(())
    }

    async fn walker_go_to_location(&self, controller_id: ActorId, location: Location) -> Result<()> {
        self.controller(controller_id)?
            .go_to_location(&to_carla_location(location));
        Ok(())
    }

    async fn set_walker_max_speed(&self, controller_id: ActorId, speed: f64) -> Result<()> {
        self.controller(controller_id)?.set_max_speed(speed as f32);
        Ok(())
    }

    #[instrument(name = "real_carla_tick", skip(self))]
    async fn tick(&self) -> Result<u64> {
        let frame = self.with_world_mut(|world| Ok(world.tick()))?;
        debug!(frame, "world ticked");
        Ok(frame)
    }

    #[instrument(name = "real_carla_wait_for_tick", skip(self))]
    async fn wait_for_tick(&self) -> Result<u64> {
        self.with_world_mut(|world| Ok(world.wait_for_tick().frame()))
    }
}
