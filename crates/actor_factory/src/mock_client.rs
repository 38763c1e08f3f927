//! Mock CARLA 客户端
//!
//! 用于单元测试和无仿真器运行的 mock 实现，支持注入失败场景。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;

use contracts::{
    ActorId, BlueprintAttribute, BlueprintInfo, Command, CommandResponse, Location, Rotation,
    SpawnCommand, TorquePoint, TrafficManagerSettings, Transform, Vector3, VehicleControl,
    VehiclePhysics, VehicleState, WorldSettings,
};
use tracing::instrument;

use crate::client::CarlaClient;
use crate::error::{ActorFactoryError, Result};

/// 第一个 mock actor ID
pub const ACTOR_ID_BASE: ActorId = 1000;

/// Mock 客户端配置
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// 蓝图目录
    pub blueprints: Vec<BlueprintInfo>,
    /// 地图推荐 spawn 点数量
    pub spawn_point_count: usize,
    /// 有效导航采样次数上限（None 表示无限）
    pub navigation_samples: Option<usize>,
    /// 连接时的世界设置（可模拟其他时钟权威）
    pub initial_settings: WorldSettings,
    /// 车辆批次中应该失败的命令下标
    pub fail_vehicle_spawns: Vec<usize>,
    /// 行人批次中应该失败的命令下标
    pub fail_pedestrian_spawns: Vec<usize>,
    /// 控制器批次中应该失败的命令下标
    pub fail_controller_spawns: Vec<usize>,
    /// 应该失败的 destroy actor IDs
    pub fail_destroy: Vec<ActorId>,
    /// 第 k 次 tick 失败（从 1 开始计数）
    pub fail_tick_at: Option<u32>,
    /// 读取状态失败的车辆
    pub fail_vehicle_state: Vec<ActorId>,
    /// 连接失败
    pub fail_connect: bool,
    /// 返回错误的导航采样调用序号（从 1 开始计数）
    pub fail_navigation_calls: Vec<usize>,
    /// 行人种子、穿行系数与全局限速调用返回错误
    pub fail_traffic_tuning: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            blueprints: default_catalog(),
            spawn_point_count: 20,
            navigation_samples: None,
            initial_settings: WorldSettings::default(),
            fail_vehicle_spawns: Vec::new(),
            fail_pedestrian_spawns: Vec::new(),
            fail_controller_spawns: Vec::new(),
            fail_destroy: Vec::new(),
            fail_tick_at: None,
            fail_vehicle_state: Vec::new(),
            fail_connect: false,
            fail_navigation_calls: Vec::new(),
            fail_traffic_tuning: false,
        }
    }
}

/// 默认蓝图目录：少量车辆、自行车、行人和 AI 控制器
pub fn default_catalog() -> Vec<BlueprintInfo> {
    let car = |id: &str, generation: &str| {
        BlueprintInfo::new(id)
            .with_attribute("base_type", BlueprintAttribute::new("car"))
            .with_attribute("generation", BlueprintAttribute::new(generation))
            .with_attribute(
                "color",
                BlueprintAttribute::with_recommended("255,255,255", ["255,255,255", "12,12,12", "180,20,20"]),
            )
    };
    let pedestrian = |id: &str, generation: &str| {
        BlueprintInfo::new(id)
            .with_attribute("generation", BlueprintAttribute::new(generation))
            .with_attribute("is_invincible", BlueprintAttribute::new("true"))
            .with_attribute(
                "speed",
                BlueprintAttribute::with_recommended("1.26", ["0.0", "1.26", "2.5"]),
            )
    };

    vec![
        car("vehicle.audi.a2", "1"),
        car("vehicle.audi.etron", "2"),
        car("vehicle.audi.tt", "1"),
        car("vehicle.tesla.model3", "1"),
        BlueprintInfo::new("vehicle.bh.crossbike")
            .with_attribute("base_type", BlueprintAttribute::new("bicycle"))
            .with_attribute("generation", BlueprintAttribute::new("1"))
            .with_attribute("driver_id", BlueprintAttribute::with_recommended("0", ["0", "1", "2"])),
        pedestrian("walker.pedestrian.0001", "1"),
        pedestrian("walker.pedestrian.0002", "1"),
        pedestrian("walker.pedestrian.0015", "2"),
        pedestrian("walker.pedestrian.0016", "2"),
        BlueprintInfo::new("walker.pedestrian.0049")
            .with_attribute("generation", BlueprintAttribute::new("2")),
        BlueprintInfo::new("controller.ai.walker"),
    ]
}

/// `*` 通配匹配（CARLA 蓝图过滤语义）
pub fn matches_filter(pattern: &str, id: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return id.is_empty();
    };
    let Some(mut rest) = id.strip_prefix(first) else {
        return false;
    };
    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

/// Mock 客户端记录的调用
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Connect,
    ApplySettings(WorldSettings),
    ConfigureTrafficManager(TrafficManagerSettings),
    TrafficManagerSynchronous(bool),
    GlobalSpeedDifference(f64),
    UpdateVehicleLights(ActorId),
    PedestriansSeed(u64),
    PedestriansCrossFactor(f64),
    Batch { commands: Vec<Command>, do_tick: bool },
    StartController(ActorId),
    StopController(ActorId),
    GoToLocation(ActorId),
    SetMaxSpeed(ActorId, f64),
    Tick(u64),
    WaitForTick(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchKind {
    Vehicle,
    Pedestrian,
    Controller,
    Other,
}

impl BatchKind {
    fn of(command: &SpawnCommand) -> Self {
        if command.blueprint.starts_with("vehicle.") {
            Self::Vehicle
        } else if command.blueprint.starts_with("walker.") {
            Self::Pedestrian
        } else if command.blueprint.starts_with("controller.") {
            Self::Controller
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone)]
struct MockActor {
    blueprint: String,
    spawned_at_frame: u64,
}

/// Mock CARLA 客户端
pub struct MockCarlaClient {
    /// 配置（可注入失败场景）
    config: MockConfig,
    /// Actor ID 计数器
    next_actor_id: AtomicU32,
    /// 存活的 actors
    actors: Mutex<HashMap<ActorId, MockActor>>,
    /// 每个 actor 被成功销毁的次数
    destroyed: Mutex<HashMap<ActorId, u32>>,
    /// 当前世界设置
    settings: Mutex<WorldSettings>,
    /// 仿真帧号
    frame: AtomicU64,
    /// tick 调用次数
    tick_count: AtomicU32,
    /// 成功 tick 次数的订阅端
    ticks: watch::Sender<u32>,
    /// 已消耗的导航采样次数
    navigation_calls: AtomicUsize,
    /// 连接状态
    connected: Mutex<bool>,
    /// 调用记录
    calls: Mutex<Vec<MockCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockCarlaClient {
    /// 创建默认 mock 客户端
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// 使用配置创建 mock 客户端
    pub fn with_config(config: MockConfig) -> Self {
        let settings = config.initial_settings;
        Self {
            config,
            next_actor_id: AtomicU32::new(ACTOR_ID_BASE), // 从 1000 开始，便于识别
            actors: Mutex::new(HashMap::new()),
            destroyed: Mutex::new(HashMap::new()),
            settings: Mutex::new(settings),
            frame: AtomicU64::new(1),
            tick_count: AtomicU32::new(0),
            ticks: watch::Sender::new(0),
            navigation_calls: AtomicUsize::new(0),
            connected: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 获取当前存活的 actor 数量
    pub fn actor_count(&self) -> usize {
        lock(&self.actors).len()
    }

    /// 获取所有存活的 actor IDs（升序）
    pub fn all_actor_ids(&self) -> Vec<ActorId> {
        let mut ids: Vec<ActorId> = lock(&self.actors).keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// actor 被成功销毁的次数
    pub fn destroy_count(&self, actor_id: ActorId) -> u32 {
        lock(&self.destroyed).get(&actor_id).copied().unwrap_or(0)
    }

    /// 当前世界设置
    pub fn current_settings(&self) -> WorldSettings {
        *lock(&self.settings)
    }

    /// tick 调用次数（包括失败的那次）
    pub fn tick_count(&self) -> u32 {
        self.tick_count.load(Ordering::SeqCst)
    }

    /// 订阅成功 tick 次数，用于在运行中途触发关闭
    pub fn subscribe_ticks(&self) -> watch::Receiver<u32> {
        self.ticks.subscribe()
    }

    /// 调用记录快照
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// 所有批次中的 spawn 命令
    pub fn spawn_commands(&self) -> Vec<SpawnCommand> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                MockCall::Batch { commands, .. } => Some(commands),
                _ => None,
            })
            .flatten()
            .filter_map(|command| match command {
                Command::Spawn(spawn) => Some(spawn.clone()),
                Command::Destroy(_) => None,
            })
            .collect()
    }

    fn record(&self, call: MockCall) {
        lock(&self.calls).push(call);
    }

    fn allocate_actor_id(&self) -> ActorId {
        self.next_actor_id.fetch_add(1, Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> Result<()> {
        if *lock(&self.connected) {
            Ok(())
        } else {
            Err(ActorFactoryError::not_connected())
        }
    }

    fn ensure_actor(&self, actor_id: ActorId) -> Result<()> {
        if lock(&self.actors).contains_key(&actor_id) {
            Ok(())
        } else {
            Err(ActorFactoryError::ActorNotFound { actor_id })
        }
    }

    fn fail_tuning(&self, operation: &str) -> Result<()> {
        if self.config.fail_traffic_tuning {
            return Err(ActorFactoryError::simulator(operation, "mock failure"));
        }
        Ok(())
    }

    fn advance_frame(&self) -> u64 {
        self.frame.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn should_fail_spawn(&self, kind: BatchKind, index: usize) -> bool {
        match kind {
            BatchKind::Vehicle => self.config.fail_vehicle_spawns.contains(&index),
            BatchKind::Pedestrian => self.config.fail_pedestrian_spawns.contains(&index),
            BatchKind::Controller => self.config.fail_controller_spawns.contains(&index),
            BatchKind::Other => false,
        }
    }

    fn execute_spawn(&self, kind: BatchKind, index: usize, command: &SpawnCommand) -> CommandResponse {
        if self.should_fail_spawn(kind, index) {
            return CommandResponse::Failed("Spawn failed because of collision at spawn position".into());
        }
        if !self.config.blueprints.iter().any(|bp| bp.id == command.blueprint) {
            return CommandResponse::Failed(format!("blueprint '{}' not found", command.blueprint));
        }
        let mut actors = lock(&self.actors);
        if let Some(parent) = command.parent {
            if !actors.contains_key(&parent) {
                return CommandResponse::Failed(format!("parent actor {parent} not found"));
            }
        }
        let actor_id = self.allocate_actor_id();
        actors.insert(
            actor_id,
            MockActor {
                blueprint: command.blueprint.clone(),
                spawned_at_frame: self.frame.load(Ordering::SeqCst),
            },
        );
        CommandResponse::Ok(actor_id)
    }

    fn execute_destroy(&self, actor_id: ActorId) -> CommandResponse {
        if self.config.fail_destroy.contains(&actor_id) {
            return CommandResponse::Failed("mock failure".into());
        }
        if lock(&self.actors).remove(&actor_id).is_none() {
            return CommandResponse::Failed(format!("actor {actor_id} not found"));
        }
        *lock(&self.destroyed).entry(actor_id).or_insert(0) += 1;
        CommandResponse::Ok(actor_id)
    }

    /// 根据帧号合成确定性的车辆状态
    fn synthesize_state(&self, actor_id: ActorId, actor: &MockActor) -> VehicleState {
        let frame = self.frame.load(Ordering::SeqCst);
        let age = frame.saturating_sub(actor.spawned_at_frame);
        // 每辆车前几帧静止，随后加速到 ~15 m/s
        let phase = (u64::from(actor_id) + age) % 12;
        let speed = if phase < 3 { 0.0 } else { (phase as f64 - 2.0) * 1.5 };
        let gear = if speed == 0.0 { 0 } else { (speed / 5.0) as i32 + 1 };

        VehicleState {
            actor_id,
            velocity: Vector3 {
                x: speed,
                y: 0.0,
                z: 0.0,
            },
            acceleration: Vector3 {
                x: if speed == 0.0 { 0.0 } else { 1.5 },
                y: 0.0,
                z: 0.0,
            },
            rotation: Rotation {
                pitch: (phase as f64 - 6.0) * 0.25,
                yaw: 90.0,
                roll: 0.0,
            },
            control: VehicleControl {
                throttle: if speed == 0.0 { 0.0 } else { 0.6 },
                steer: 0.0,
                brake: if speed == 0.0 { 1.0 } else { 0.0 },
                hand_brake: false,
                reverse: false,
                manual_gear_shift: false,
                gear,
            },
            physics: VehiclePhysics {
                max_rpm: 5800.0,
                torque_curve: vec![
                    TorquePoint { rpm: 0.0, torque: 400.0 },
                    TorquePoint { rpm: 1890.0, torque: 500.0 },
                    TorquePoint { rpm: 5730.0, torque: 400.0 },
                ],
                forward_gear_ratios: vec![3.5, 2.8, 1.8, 1.2, 1.0],
                final_drive_ratio: 4.0,
                tire_friction: vec![3.5; 4],
                wheel_radius_m: vec![0.35; 4],
            },
        }
    }
}

impl Default for MockCarlaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CarlaClient for MockCarlaClient {
    #[instrument(name = "mock_carla_connect", skip(self, _timeout), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16, _timeout: Duration) -> Result<()> {
        if self.config.fail_connect {
            return Err(ActorFactoryError::ConnectionFailed {
                message: format!("no simulator listening on {host}:{port}"),
            });
        }
        *lock(&self.connected) = true;
        self.record(MockCall::Connect);
        Ok(())
    }

    #[instrument(name = "mock_carla_world_settings", skip(self))]
    async fn world_settings(&self) -> Result<WorldSettings> {
        self.ensure_connected()?;
        Ok(self.current_settings())
    }

    #[instrument(name = "mock_carla_apply_settings", skip(self), fields(sync = settings.synchronous_mode))]
    async fn apply_world_settings(&self, settings: WorldSettings) -> Result<u64> {
        self.ensure_connected()?;
        *lock(&self.settings) = settings;
        self.record(MockCall::ApplySettings(settings));
        Ok(self.frame.load(Ordering::SeqCst))
    }

    #[instrument(name = "mock_carla_blueprints", skip(self), fields(filter = %filter))]
    async fn blueprints(&self, filter: &str) -> Result<Vec<BlueprintInfo>> {
        self.ensure_connected()?;
        Ok(self
            .config
            .blueprints
            .iter()
            .filter(|bp| matches_filter(filter, &bp.id))
            .cloned()
            .collect())
    }

    #[instrument(name = "mock_carla_spawn_points", skip(self))]
    async fn spawn_points(&self) -> Result<Vec<Transform>> {
        self.ensure_connected()?;
        Ok((0..self.config.spawn_point_count)
            .map(|i| {
                Transform::at(Location {
                    x: i as f64 * 10.0,
                    y: 0.0,
                    z: 0.3,
                })
            })
            .collect())
    }

    #[instrument(name = "mock_carla_random_navigation_location", skip(self))]
    async fn random_navigation_location(&self) -> Result<Option<Location>> {
        self.ensure_connected()?;
        let n = self.navigation_calls.fetch_add(1, Ordering::SeqCst);
        if self.config.fail_navigation_calls.contains(&(n + 1)) {
            return Err(ActorFactoryError::simulator(
                "random_navigation_location",
                format!("mock failure at call {}", n + 1),
            ));
        }
        if self.config.navigation_samples.is_some_and(|limit| n >= limit) {
            return Ok(None);
        }
        Ok(Some(Location {
            x: (n % 17) as f64 * 3.0,
            y: (n % 5) as f64 * 7.0,
            z: 0.5,
        }))
    }

    #[instrument(name = "mock_carla_apply_batch", skip(self, commands), fields(count = commands.len(), do_tick))]
    async fn apply_batch(&self, commands: Vec<Command>, do_tick: bool) -> Result<Vec<CommandResponse>> {
        self.ensure_connected()?;

        let kind = commands
            .iter()
            .find_map(|c| match c {
                Command::Spawn(spawn) => Some(BatchKind::of(spawn)),
                Command::Destroy(_) => None,
            })
            .unwrap_or(BatchKind::Other);

        let mut spawn_index = 0;
        let responses = commands
            .iter()
            .map(|command| match command {
                Command::Spawn(spawn) => {
                    let response = self.execute_spawn(kind, spawn_index, spawn);
                    spawn_index += 1;
                    response
                }
                Command::Destroy(actor_id) => self.execute_destroy(*actor_id),
            })
            .collect();

        self.record(MockCall::Batch { commands, do_tick });
        if do_tick {
            self.advance_frame();
        }
        Ok(responses)
    }

    #[instrument(name = "mock_carla_vehicle_state", skip(self), fields(actor_id))]
    async fn vehicle_state(&self, actor_id: ActorId) -> Result<VehicleState> {
        self.ensure_connected()?;
        if self.config.fail_vehicle_state.contains(&actor_id) {
            return Err(ActorFactoryError::simulator("vehicle_state", "mock failure"));
        }
        let actors = lock(&self.actors);
        match actors.get(&actor_id) {
            Some(actor) if actor.blueprint.starts_with("vehicle.") => {
                Ok(self.synthesize_state(actor_id, actor))
            }
            _ => Err(ActorFactoryError::ActorNotFound { actor_id }),
        }
    }

    #[instrument(name = "mock_carla_configure_traffic_manager", skip(self, settings), fields(port = settings.port))]
    async fn configure_traffic_manager(&self, settings: &TrafficManagerSettings) -> Result<()> {
        self.ensure_connected()?;
        self.record(MockCall::ConfigureTrafficManager(*settings));
        Ok(())
    }

    async fn set_traffic_manager_synchronous(&self, _port: u16, enabled: bool) -> Result<()> {
        self.ensure_connected()?;
        self.record(MockCall::TrafficManagerSynchronous(enabled));
        Ok(())
    }

    async fn set_global_speed_difference(&self, _port: u16, percentage: f64) -> Result<()> {
        self.ensure_connected()?;
        self.fail_tuning("set_global_speed_difference")?;
        self.record(MockCall::GlobalSpeedDifference(percentage));
        Ok(())
    }

    async fn update_vehicle_lights(&self, _port: u16, actor_id: ActorId, _enabled: bool) -> Result<()> {
        self.ensure_connected()?;
        self.ensure_actor(actor_id)?;
        self.record(MockCall::UpdateVehicleLights(actor_id));
        Ok(())
    }

    async fn set_pedestrians_seed(&self, seed: u64) -> Result<()> {
        self.ensure_connected()?;
        self.fail_tuning("set_pedestrians_seed")?;
        self.record(MockCall::PedestriansSeed(seed));
        Ok(())
    }

    async fn set_pedestrians_cross_factor(&self, fraction: f64) -> Result<()> {
        self.ensure_connected()?;
        self.fail_tuning("set_pedestrians_cross_factor")?;
        self.record(MockCall::PedestriansCrossFactor(fraction));
        Ok(())
    }

    #[instrument(name = "mock_carla_start_walker_controller", skip(self), fields(controller_id))]
    async fn start_walker_controller(&self, controller_id: ActorId) -> Result<()> {
        self.ensure_connected()?;
        self.ensure_actor(controller_id)?;
        self.record(MockCall::StartController(controller_id));
        Ok(())
    }

    #[instrument(name = "mock_carla_stop_walker_controller", skip(self), fields(controller_id))]
    async fn stop_walker_controller(&self, controller_id: ActorId) -> Result<()> {
        self.ensure_connected()?;
        self.ensure_actor(controller_id)?;
        self.record(MockCall::StopController(controller_id));
        Ok(())
    }

    async fn walker_go_to_location(&self, controller_id: ActorId, _location: Location) -> Result<()> {
        self.ensure_connected()?;
        self.ensure_actor(controller_id)?;
        self.record(MockCall::GoToLocation(controller_id));
        Ok(())
    }

    async fn set_walker_max_speed(&self, controller_id: ActorId, speed: f64) -> Result<()> {
        self.ensure_connected()?;
        self.ensure_actor(controller_id)?;
        self.record(MockCall::SetMaxSpeed(controller_id, speed));
        Ok(())
    }

    #[instrument(name = "mock_carla_tick", skip(self))]
    async fn tick(&self) -> Result<u64> {
        self.ensure_connected()?;
        let n = self.tick_count.fetch_add(1, Ordering::SeqCst) + 1;
        if self.config.fail_tick_at == Some(n) {
            return Err(ActorFactoryError::simulator("tick", format!("mock failure at tick {n}")));
        }
        tokio::task::yield_now().await;
        let frame = self.advance_frame();
        self.record(MockCall::Tick(frame));
        self.ticks.send_modify(|ticks| *ticks += 1);
        Ok(frame)
    }

    #[instrument(name = "mock_carla_wait_for_tick", skip(self))]
    async fn wait_for_tick(&self) -> Result<u64> {
        self.ensure_connected()?;
        tokio::task::yield_now().await;
        // 另一个时钟权威推进了仿真
        let frame = self.advance_frame();
        self.record(MockCall::WaitForTick(frame));
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connected(config: MockConfig) -> MockCarlaClient {
        let mut client = MockCarlaClient::with_config(config);
        client
            .connect("localhost", 2000, Duration::from_secs(10))
            .await
            .unwrap();
        client
    }

    fn spawn(blueprint: &str) -> Command {
        Command::Spawn(SpawnCommand::new(blueprint, Transform::default()))
    }

    #[test]
    fn test_filter_matching() {
        assert!(matches_filter("vehicle.*", "vehicle.audi.a2"));
        assert!(matches_filter("vehicle.audi.*", "vehicle.audi.tt"));
        assert!(!matches_filter("vehicle.audi.*", "vehicle.tesla.model3"));
        assert!(matches_filter("walker.pedestrian.0001", "walker.pedestrian.0001"));
        assert!(!matches_filter("walker.pedestrian.0001", "walker.pedestrian.00011"));
        assert!(matches_filter("*model3", "vehicle.tesla.model3"));
        assert!(matches_filter("*.audi.*", "vehicle.audi.etron"));
    }

    #[tokio::test]
    async fn test_requires_connection() {
        let client = MockCarlaClient::new();
        assert!(client.world_settings().await.is_err());
    }

    #[tokio::test]
    async fn test_batch_one_response_per_command() {
        let client = connected(MockConfig {
            fail_vehicle_spawns: vec![1],
            ..Default::default()
        })
        .await;

        let responses = client
            .apply_batch(
                vec![
                    spawn("vehicle.audi.a2"),
                    spawn("vehicle.audi.tt"),
                    spawn("vehicle.does.not.exist"),
                    spawn("vehicle.audi.etron"),
                ],
                false,
            )
            .await
            .unwrap();

        assert_eq!(responses.len(), 4);
        assert!(responses[0].is_ok());
        assert!(!responses[1].is_ok());
        assert!(!responses[2].is_ok());
        assert!(responses[3].is_ok());
        assert_eq!(client.actor_count(), 2);
    }

    #[tokio::test]
    async fn test_destroy_twice_fails_second_time() {
        let client = connected(MockConfig::default()).await;
        let responses = client
            .apply_batch(vec![spawn("vehicle.audi.a2")], false)
            .await
            .unwrap();
        let id = responses[0].actor_id().unwrap();

        let first = client.apply_batch(vec![Command::Destroy(id)], false).await.unwrap();
        let second = client.apply_batch(vec![Command::Destroy(id)], false).await.unwrap();

        assert!(first[0].is_ok());
        assert!(!second[0].is_ok());
        assert_eq!(client.destroy_count(id), 1);
    }

    #[tokio::test]
    async fn test_controller_requires_parent() {
        let client = connected(MockConfig::default()).await;
        let orphan = Command::Spawn(
            SpawnCommand::new("controller.ai.walker", Transform::default()).with_parent(424242),
        );
        let responses = client.apply_batch(vec![orphan], true).await.unwrap();
        assert!(!responses[0].is_ok());
    }

    #[tokio::test]
    async fn test_navigation_sample_limit() {
        let client = connected(MockConfig {
            navigation_samples: Some(2),
            ..Default::default()
        })
        .await;

        assert!(client.random_navigation_location().await.unwrap().is_some());
        assert!(client.random_navigation_location().await.unwrap().is_some());
        assert!(client.random_navigation_location().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tick_failure_injection() {
        let client = connected(MockConfig {
            fail_tick_at: Some(2),
            ..Default::default()
        })
        .await;

        assert!(client.tick().await.is_ok());
        assert!(client.tick().await.is_err());
        assert!(client.tick().await.is_ok());
        assert_eq!(client.tick_count(), 3);
    }

    #[tokio::test]
    async fn test_navigation_failure_injection() {
        let client = connected(MockConfig {
            fail_navigation_calls: vec![2],
            ..Default::default()
        })
        .await;

        assert!(client.random_navigation_location().await.is_ok());
        assert!(client.random_navigation_location().await.is_err());
        assert!(client.random_navigation_location().await.unwrap().is_some());
    }

    /// 订阅端只看到成功的 tick
    #[tokio::test]
    async fn test_tick_subscription_counts_successes() {
        let client = connected(MockConfig {
            fail_tick_at: Some(2),
            ..Default::default()
        })
        .await;
        let ticks = client.subscribe_ticks();

        client.tick().await.unwrap();
        assert!(client.tick().await.is_err());
        client.tick().await.unwrap();
        assert_eq!(*ticks.borrow(), 2);
    }

    #[tokio::test]
    async fn test_vehicle_state_only_for_vehicles() {
        let client = connected(MockConfig::default()).await;
        let responses = client
            .apply_batch(
                vec![spawn("vehicle.audi.a2"), spawn("walker.pedestrian.0001")],
                false,
            )
            .await
            .unwrap();

        let vehicle = responses[0].actor_id().unwrap();
        let walker = responses[1].actor_id().unwrap();
        let state = client.vehicle_state(vehicle).await.unwrap();
        assert_eq!(state.actor_id, vehicle);
        assert!(!state.physics.forward_gear_ratios.is_empty());
        assert!(client.vehicle_state(walker).await.is_err());
    }
}
