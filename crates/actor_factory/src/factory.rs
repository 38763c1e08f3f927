//! ActorFactory 核心实现
//!
//! 批量 spawn 车辆、行人及其 AI 控制器，并负责批量 teardown。
//! 单个 actor 的失败只记录日志并从托管集合中剔除，不会中断整个批次。

use std::fmt;

use contracts::{
    ActorGeneration, ActorId, BlueprintInfo, Command, CommandResponse, ContractError,
    ManagedActorSet, SpawnCommand, Transform,
};
use tracing::{debug, error, info, instrument, warn};

use crate::client::CarlaClient;
use crate::error::{ActorFactoryError, Result};

/// AI 行人控制器蓝图
pub const WALKER_CONTROLLER_BLUEPRINT: &str = "controller.ai.walker";

/// Actor 种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorKind {
    Vehicle,
    Pedestrian,
    Controller,
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vehicle => "vehicle",
            Self::Pedestrian => "pedestrian",
            Self::Controller => "controller",
        }
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个 spawn 批次的结果统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub kind: ActorKind,
    pub requested: usize,
    pub spawned: usize,
    pub failed: usize,
}

impl BatchReport {
    fn empty(kind: ActorKind) -> Self {
        Self {
            kind,
            requested: 0,
            spawned: 0,
            failed: 0,
        }
    }
}

/// Teardown 结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub vehicles_destroyed: usize,
    pub vehicles_failed: usize,
    /// 行人与控制器合计
    pub walkers_destroyed: usize,
    pub walkers_failed: usize,
    pub controllers_stopped: usize,
    pub controllers_stop_failed: usize,
}

impl TeardownReport {
    /// 所有步骤均无失败
    pub fn is_clean(&self) -> bool {
        self.vehicles_failed == 0 && self.walkers_failed == 0 && self.controllers_stop_failed == 0
    }
}

/// Actor Factory
///
/// 负责批量 spawn vehicles / pedestrians / controllers，
/// 并提供 teardown 能力。
pub struct ActorFactory<C: CarlaClient> {
    client: C,
}

impl<C: CarlaClient> ActorFactory<C> {
    /// 创建新的 ActorFactory
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// 底层客户端
    pub fn client(&self) -> &C {
        &self.client
    }

    /// 底层客户端（可变，用于连接）
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// 取回底层客户端
    pub fn into_client(self) -> C {
        self.client
    }

    /// 按过滤器与代际解析蓝图
    ///
    /// - 过滤器只匹配到一个蓝图时忽略代际
    /// - 不支持的代际返回空集合（随后报错）
    /// - `safe_only` 只保留 `base_type == "car"`
    /// - 结果按 id 排序
    #[instrument(
        name = "actor_factory_resolve_blueprints",
        skip(self),
        fields(filter = %filter, generation = %generation, safe_only)
    )]
    pub async fn resolve_blueprints(
        &self,
        filter: &str,
        generation: ActorGeneration,
        safe_only: bool,
    ) -> Result<Vec<BlueprintInfo>> {
        let catalog = self.client.blueprints(filter).await?;

        let mut blueprints = if catalog.len() == 1 {
            catalog
        } else {
            match generation {
                ActorGeneration::All => catalog,
                ActorGeneration::Generation(g) if generation.is_supported() => catalog
                    .into_iter()
                    .filter(|bp| bp.generation() == Some(g))
                    .collect(),
                ActorGeneration::Generation(_) => {
                    warn!("actor generation is not valid, no actor will be spawned");
                    Vec::new()
                }
            }
        };

        if safe_only {
            blueprints.retain(|bp| bp.base_type() == Some("car"));
        }
        blueprints.sort_by(|a, b| a.id.cmp(&b.id));

        if blueprints.is_empty() {
            return Err(ContractError::NoBlueprints {
                filter: filter.to_string(),
                generation: generation.to_string(),
            }
            .into());
        }

        debug!(count = blueprints.len(), "blueprints resolved");
        Ok(blueprints)
    }

    /// 批量 spawn 车辆，成功的按命令顺序登记
    #[instrument(
        name = "actor_factory_spawn_vehicles",
        skip(self, commands, actors),
        fields(requested = commands.len())
    )]
    pub async fn spawn_vehicles(
        &self,
        commands: Vec<SpawnCommand>,
        do_tick: bool,
        actors: &mut ManagedActorSet,
    ) -> Result<BatchReport> {
        let results = self.spawn_batch(ActorKind::Vehicle, commands, do_tick).await?;
        let mut report = BatchReport::empty(ActorKind::Vehicle);
        report.requested = results.len();

        for actor_id in results.into_iter().flatten() {
            if actors.register_vehicle(actor_id) {
                report.spawned += 1;
            } else {
                warn!(actor_id, "duplicate vehicle id returned by simulator");
            }
        }
        report.failed = report.requested - report.spawned;

        info!(spawned = report.spawned, failed = report.failed, "vehicles spawned");
        Ok(report)
    }

    /// 批量 spawn 行人
    ///
    /// 每条命令附带其最大速度；只有成功的行人保留速度。
    #[instrument(
        name = "actor_factory_spawn_pedestrians",
        skip(self, spawns, actors),
        fields(requested = spawns.len())
    )]
    pub async fn spawn_pedestrians(
        &self,
        spawns: Vec<(SpawnCommand, f64)>,
        do_tick: bool,
        actors: &mut ManagedActorSet,
    ) -> Result<BatchReport> {
        let (commands, speeds): (Vec<SpawnCommand>, Vec<f64>) = spawns.into_iter().unzip();
        let results = self.spawn_batch(ActorKind::Pedestrian, commands, do_tick).await?;
        let mut report = BatchReport::empty(ActorKind::Pedestrian);
        report.requested = results.len();

        for (actor_id, speed) in results.into_iter().zip(speeds) {
            let Some(actor_id) = actor_id else { continue };
            if actors.register_pedestrian(actor_id, speed) {
                report.spawned += 1;
            } else {
                warn!(actor_id, "duplicate pedestrian id returned by simulator");
            }
        }
        report.failed = report.requested - report.spawned;

        info!(spawned = report.spawned, failed = report.failed, "pedestrians spawned");
        Ok(report)
    }

    /// 为每个尚未配对的存活行人 spawn 一个 AI 控制器
    ///
    /// 命令严格按存活行人构造，按存活下标配对；没有存活行人时不会发出批次。
    /// 控制器失败的行人继续被托管，但没有控制器。
    #[instrument(name = "actor_factory_spawn_controllers", skip(self, actors))]
    pub async fn spawn_controllers(
        &self,
        do_tick: bool,
        actors: &mut ManagedActorSet,
    ) -> Result<BatchReport> {
        let (slots, commands): (Vec<usize>, Vec<SpawnCommand>) = actors
            .pedestrians()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.controller_id.is_none())
            .map(|(index, p)| {
                (
                    index,
                    SpawnCommand::new(WALKER_CONTROLLER_BLUEPRINT, Transform::default())
                        .with_parent(p.actor_id),
                )
            })
            .unzip();

        let results = self.spawn_batch(ActorKind::Controller, commands, do_tick).await?;
        let mut report = BatchReport::empty(ActorKind::Controller);
        report.requested = results.len();

        for (slot, controller_id) in slots.into_iter().zip(results) {
            let Some(controller_id) = controller_id else { continue };
            if actors.attach_controller(slot, controller_id) {
                report.spawned += 1;
            } else {
                warn!(controller_id, slot, "controller could not be paired");
            }
        }
        report.failed = report.requested - report.spawned;

        info!(spawned = report.spawned, failed = report.failed, "walker controllers spawned");
        Ok(report)
    }

    /// 销毁托管集合中的所有 actors
    ///
    /// 顺序：车辆批量销毁 → 按配对顺序停止控制器 → 控制器与行人批量销毁。
    /// 每一步的失败只记录日志，后续步骤照常执行。集合按值传入，保证只销毁一次。
    #[instrument(
        name = "actor_factory_teardown",
        skip(self, actors),
        fields(
            vehicle_count = actors.vehicle_ids().len(),
            pedestrian_count = actors.pedestrians().len()
        )
    )]
    pub async fn teardown(&self, actors: ManagedActorSet) -> TeardownReport {
        info!("starting teardown");
        let mut report = TeardownReport::default();

        info!(count = actors.vehicle_ids().len(), "destroying vehicles");
        let (ok, failed) = self
            .destroy_batch_safe(ActorKind::Vehicle, actors.vehicle_ids().to_vec())
            .await;
        report.vehicles_destroyed = ok;
        report.vehicles_failed = failed;

        for controller_id in actors.controller_ids() {
            match self.client.stop_walker_controller(controller_id).await {
                Ok(()) => report.controllers_stopped += 1,
                Err(e) => {
                    report.controllers_stop_failed += 1;
                    error!(controller_id, error = %e, "failed to stop walker controller");
                }
            }
        }

        let walker_ids = actors.pedestrian_and_controller_ids();
        info!(count = actors.pedestrians().len(), "destroying walkers");
        let (ok, failed) = self
            .destroy_batch_safe(ActorKind::Pedestrian, walker_ids)
            .await;
        report.walkers_destroyed = ok;
        report.walkers_failed = failed;

        info!(?report, "teardown completed");
        report
    }

    /// 执行一个 spawn 批次，返回与命令一一对应的结果
    async fn spawn_batch(
        &self,
        kind: ActorKind,
        commands: Vec<SpawnCommand>,
        do_tick: bool,
    ) -> Result<Vec<Option<ActorId>>> {
        if commands.is_empty() {
            debug!(%kind, "empty spawn batch skipped");
            return Ok(Vec::new());
        }

        let expected = commands.len();
        let responses = self
            .client
            .apply_batch(commands.into_iter().map(Command::Spawn).collect(), do_tick)
            .await?;
        if responses.len() != expected {
            return Err(ActorFactoryError::simulator(
                "apply_batch",
                format!("expected {expected} responses, got {}", responses.len()),
            ));
        }

        Ok(responses
            .into_iter()
            .enumerate()
            .map(|(index, response)| match response {
                CommandResponse::Ok(actor_id) => Some(actor_id),
                CommandResponse::Failed(message) => {
                    warn!(%kind, index, error = %message, "spawn failed");
                    None
                }
            })
            .collect())
    }

    /// 安全批量销毁（忽略错误，仅记录日志），返回 (成功数, 失败数)
    async fn destroy_batch_safe(&self, kind: ActorKind, actor_ids: Vec<ActorId>) -> (usize, usize) {
        if actor_ids.is_empty() {
            return (0, 0);
        }

        let total = actor_ids.len();
        let commands = actor_ids.iter().copied().map(Command::Destroy).collect();
        match self.client.apply_batch(commands, false).await {
            Ok(responses) => {
                let mut destroyed = 0;
                for (actor_id, response) in actor_ids.iter().zip(&responses) {
                    match response {
                        CommandResponse::Ok(_) => destroyed += 1,
                        CommandResponse::Failed(message) => {
                            error!(%kind, actor_id, error = %message, "failed to destroy actor");
                        }
                    }
                }
                (destroyed, total - destroyed)
            }
            Err(e) => {
                error!(%kind, count = total, error = %e, "destroy batch failed");
                (0, total)
            }
        }
    }
}
