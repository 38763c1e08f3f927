//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置文件 → 编排器 → mock 仿真器的完整运行（无需 CARLA）
//! - 部分失败、时钟权威与 teardown 场景
//! - 随仓库发布的燃油模型与配置样例

#[cfg(test)]
mod contract_tests {
    use std::path::PathBuf;

    fn workspace_file(relative: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .join(relative)
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config =
            config_loader::ConfigLoader::load_from_path(&workspace_file("config/traffic.toml"))
                .unwrap();
        assert_eq!(config.vehicles.count, 30);
        assert_eq!(config.sampling.iterations, 10);
    }

    #[test]
    fn test_shipped_model_predicts_reference_trip() {
        let predictor =
            fuel_predictor::FuelPredictor::load(&workspace_file("models/fuel_consumption.json"))
                .unwrap();
        let prediction = predictor.predict(50.0, 60.0, 1, 1, 0, 1);
        assert!((prediction - 4.725).abs() < 1e-9);
        assert_eq!(
            predictor.predict_trip(&contracts::TripParameters::default()),
            prediction
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use actor_factory::{MockCall, MockCarlaClient, MockConfig, ACTOR_ID_BASE};
    use contracts::{ClockMode, Command, TrafficConfig, TrafficManagerSettings, WorldSettings};
    use fuel_predictor::{FuelPredictor, LinearModel, FEATURE_NAMES};
    use observability::TelemetryAggregator;
    use traffic::{RunOutcome, TrafficError, TrafficOrchestrator};

    fn predictor() -> FuelPredictor {
        FuelPredictor::from_model(LinearModel {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            intercept: 3.0,
            coefficients: vec![0.02, 0.01, 0.0, 0.3, 0.0, 0.2, 0.0, 0.4, 0.0, -0.1],
        })
        .unwrap()
    }

    fn config(vehicles: usize, pedestrians: usize, iterations: u32) -> TrafficConfig {
        let mut config = TrafficConfig::default();
        config.vehicles.count = vehicles;
        config.vehicles.seed = Some(2024);
        config.pedestrians.count = pedestrians;
        config.pedestrians.seed = Some(17);
        config.pedestrians.running_fraction = 0.5;
        config.sampling.iterations = iterations;
        config.estimators.seatbelt_seed = Some(3);
        config
    }

    fn orchestrator(
        config: TrafficConfig,
        mock: MockConfig,
    ) -> TrafficOrchestrator<MockCarlaClient> {
        TrafficOrchestrator::with_predictor(config, MockCarlaClient::with_config(mock), predictor())
    }

    async fn never() {
        std::future::pending::<()>().await
    }

    fn count_calls(client: &MockCarlaClient, pred: impl Fn(&MockCall) -> bool) -> usize {
        client.calls().iter().filter(|&c| pred(c)).count()
    }

    /// 两辆车 × 10 次同步迭代 → 20 条样本，数值均在合法范围
    #[tokio::test]
    async fn test_two_vehicles_ten_iterations() {
        let mut orch = orchestrator(config(2, 0, 10), MockConfig::default());
        let report = orch.start(never()).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.samples.len(), 20);
        for sample in &report.samples {
            let e = &sample.estimates;
            assert!((0.0..=100.0).contains(&e.engine_oil_percent));
            assert!(e.engine_rpm >= 0.0);
            assert!(e.tire_pressure.is_finite());
            assert!(sample.telemetry.speed >= 0.0);
            assert!((-1.0..=1.0).contains(&sample.telemetry.steer));
            assert!((0.0..=1.0).contains(&sample.telemetry.throttle));
            assert!((0.0..=1.0).contains(&sample.telemetry.brake));
        }

        // iterations are in order and each covers both vehicles
        for (i, pair) in report.samples.chunks(2).enumerate() {
            assert!(pair.iter().all(|s| s.iteration == i as u32));
            assert_ne!(pair[0].actor_id, pair[1].actor_id);
        }

        let summary = report.samples.iter().collect::<TelemetryAggregator>().summary();
        assert_eq!(summary.total_samples, 20);
        assert_eq!(summary.vehicles, 2);
        assert_eq!(orch.client().actor_count(), 0);
    }

    /// 生成点少于车辆数 → 按地图顺序使用全部生成点
    #[tokio::test]
    async fn test_fewer_spawn_points_than_vehicles() {
        let mut orch = orchestrator(
            config(8, 0, 1),
            MockConfig {
                spawn_point_count: 3,
                ..Default::default()
            },
        );
        let report = orch.start(never()).await.unwrap();
        assert_eq!(report.vehicles_spawned, 3);

        let xs: Vec<f64> = orch
            .client()
            .spawn_commands()
            .iter()
            .filter(|c| c.blueprint.starts_with("vehicle."))
            .map(|c| c.transform.location.x)
            .collect();
        assert_eq!(xs, vec![0.0, 10.0, 20.0]);
    }

    /// 车辆部分失败 → 只登记成功的车辆，且全部被销毁一次
    #[tokio::test]
    async fn test_partial_vehicle_failure() {
        let mut orch = orchestrator(
            config(4, 0, 2),
            MockConfig {
                fail_vehicle_spawns: vec![1, 3],
                ..Default::default()
            },
        );
        let report = orch.start(never()).await.unwrap();

        assert_eq!(report.vehicles_spawned, 2);
        assert_eq!(report.samples.len(), 4);
        assert_eq!(report.teardown.vehicles_destroyed, 2);
        assert_eq!(orch.client().destroy_count(ACTOR_ID_BASE), 1);
        assert_eq!(orch.client().destroy_count(ACTOR_ID_BASE + 1), 1);
    }

    /// 行人全部生成失败 → 不发送任何控制器命令
    #[tokio::test]
    async fn test_all_pedestrians_fail() {
        let mut orch = orchestrator(
            config(1, 3, 1),
            MockConfig {
                fail_pedestrian_spawns: vec![0, 1, 2],
                ..Default::default()
            },
        );
        let report = orch.start(never()).await.unwrap();

        assert_eq!(report.pedestrians_spawned, 0);
        assert_eq!(report.controllers_spawned, 0);
        let controllers = orch
            .client()
            .spawn_commands()
            .into_iter()
            .filter(|c| c.blueprint == actor_factory::WALKER_CONTROLLER_BLUEPRINT)
            .count();
        assert_eq!(controllers, 0);
        assert_eq!(count_calls(orch.client(), |c| matches!(c, MockCall::StartController(_))), 0);
    }

    /// 行人按存活下标与控制器配对
    #[tokio::test]
    async fn test_controllers_follow_surviving_pedestrians() {
        let mut orch = orchestrator(
            config(0, 4, 1),
            MockConfig {
                fail_pedestrian_spawns: vec![1],
                fail_controller_spawns: vec![0],
                ..Default::default()
            },
        );
        let report = orch.start(never()).await.unwrap();

        assert_eq!(report.pedestrians_spawned, 3);
        assert_eq!(report.controllers_spawned, 2);

        let client = orch.client();
        let parents: Vec<_> = client
            .spawn_commands()
            .into_iter()
            .filter(|c| c.blueprint == actor_factory::WALKER_CONTROLLER_BLUEPRINT)
            .map(|c| c.parent)
            .collect();
        assert_eq!(parents.len(), 3);
        assert!(parents.iter().all(Option::is_some));

        assert_eq!(count_calls(client, |c| matches!(c, MockCall::StopController(_))), 2);
        assert_eq!(client.actor_count(), 0);
    }

    /// 采样中途 tick 失败 → teardown 恰好一次，设置被恢复
    #[tokio::test]
    async fn test_tick_failure_tears_down_once() {
        let mut orch = orchestrator(
            config(2, 2, 10),
            MockConfig {
                fail_tick_at: Some(4),
                ..Default::default()
            },
        );
        let report = orch.start(never()).await.unwrap();

        assert!(matches!(report.outcome, RunOutcome::Aborted { .. }));
        assert_eq!(report.samples.len(), 4);

        let client = orch.client();
        assert_eq!(client.actor_count(), 0);
        // 2 vehicles, 2 pedestrians, 2 controllers
        for id in ACTOR_ID_BASE..ACTOR_ID_BASE + 6 {
            assert_eq!(client.destroy_count(id), 1);
        }
        let destroy_batches = count_calls(client, |c| match c {
            MockCall::Batch { commands, .. } => {
                commands.iter().all(|cmd| matches!(cmd, Command::Destroy(_)))
            }
            _ => false,
        });
        assert_eq!(destroy_batches, 2);
        assert_eq!(client.current_settings(), WorldSettings::default());
        assert!(client.calls().contains(&MockCall::TrafficManagerSynchronous(false)));
    }

    /// 已有其他时钟权威 → 不接管、不恢复、不采样
    #[tokio::test]
    async fn test_foreign_clock_authority() {
        let foreign = WorldSettings {
            synchronous_mode: true,
            no_rendering_mode: false,
            fixed_delta_seconds: Some(0.1),
        };
        let mut orch = orchestrator(
            config(2, 1, 5),
            MockConfig {
                initial_settings: foreign,
                ..Default::default()
            },
        );
        let report = orch.start(never()).await.unwrap();

        assert!(!report.clock_authority);
        assert!(report.samples.is_empty());
        assert_eq!(report.iterations, 5);

        let client = orch.client();
        assert_eq!(client.tick_count(), 0);
        assert_eq!(count_calls(client, |c| matches!(c, MockCall::ApplySettings(_))), 0);
        assert_eq!(client.current_settings(), foreign);
        assert_eq!(client.actor_count(), 0);
    }

    /// 异步模式 → 不修改世界设置
    #[tokio::test]
    async fn test_asynchronous_mode_leaves_settings() {
        let mut cfg = config(2, 0, 3);
        cfg.world.clock_mode = ClockMode::Asynchronous;
        let mut orch = orchestrator(cfg, MockConfig::default());
        let report = orch.start(never()).await.unwrap();

        assert!(!report.clock_authority);
        let client = orch.client();
        assert_eq!(count_calls(client, |c| matches!(c, MockCall::ApplySettings(_))), 0);
        assert_eq!(count_calls(client, |c| matches!(c, MockCall::WaitForTick(_))), 4);
        assert_eq!(client.actor_count(), 0);
    }

    /// 采样中途收到关闭信号 → 保留已采样本，teardown 完整
    #[tokio::test]
    async fn test_interrupt_mid_sampling() {
        let client = MockCarlaClient::new();
        let mut ticks = client.subscribe_ticks();
        let mut orch = TrafficOrchestrator::with_predictor(config(3, 2, 10), client, predictor());

        // tick 1 settles the population; stop once four loop steps have run
        let shutdown = async move {
            let _ = ticks.wait_for(|&n| n >= 5).await;
        };
        let report = orch.start(shutdown).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Interrupted);
        assert_eq!(report.iterations, 4);
        assert_eq!(report.samples.len(), 12);
        assert_eq!(report.samples.last().map(|s| s.iteration), Some(3));

        let client = orch.client();
        assert_eq!(client.actor_count(), 0);
        for id in ACTOR_ID_BASE..ACTOR_ID_BASE + 7 {
            assert_eq!(client.destroy_count(id), 1);
        }
        assert_eq!(client.current_settings(), WorldSettings::default());
    }

    /// 交通管理器设置（混合物理、休眠重生、随机种子）原样下发
    #[tokio::test]
    async fn test_traffic_manager_settings_applied() {
        let mut cfg = config(1, 0, 1);
        cfg.world.hybrid_physics = true;
        cfg.world.hybrid_physics_radius = 55.0;
        cfg.traffic_manager.respawn_dormant = true;
        cfg.traffic_manager.distance_to_leading_vehicle = 4.0;
        cfg.traffic_manager.port = 8123;
        let mut orch = orchestrator(cfg, MockConfig::default());
        orch.start(never()).await.unwrap();

        let expected = TrafficManagerSettings {
            port: 8123,
            synchronous_mode: true,
            distance_to_leading_vehicle: 4.0,
            respawn_dormant_vehicles: true,
            hybrid_physics_radius: Some(55.0),
            random_device_seed: Some(2024),
        };
        let configured: Vec<_> = orch
            .client()
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::ConfigureTrafficManager(settings) => Some(settings),
                _ => None,
            })
            .collect();
        assert_eq!(configured, vec![expected]);
    }

    /// 单次导航采样出错 → 不影响整次运行
    #[tokio::test]
    async fn test_navigation_error_does_not_abort_run() {
        let mut orch = orchestrator(
            config(2, 3, 10),
            MockConfig {
                fail_navigation_calls: vec![4],
                ..Default::default()
            },
        );
        let report = orch.start(never()).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.samples.len(), 20);
        assert_eq!(orch.client().actor_count(), 0);
    }

    /// 相同种子 → 相同的生成计划
    #[tokio::test]
    async fn test_seeded_runs_are_reproducible() {
        let mut first = orchestrator(config(4, 3, 1), MockConfig::default());
        first.start(never()).await.unwrap();
        let mut second = orchestrator(config(4, 3, 1), MockConfig::default());
        second.start(never()).await.unwrap();

        assert_eq!(first.client().spawn_commands(), second.client().spawn_commands());
    }

    /// 缺少燃油模型 → 在任何仿真器调用前失败
    #[tokio::test]
    async fn test_missing_model_fails_early() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(2, 0, 1);
        cfg.fuel.model_path = dir.path().join("missing.json");

        let err = TrafficOrchestrator::from_config(cfg, MockCarlaClient::new()).err();
        assert!(matches!(err, Some(TrafficError::ModelUnavailable(_))));
    }
}
