//! 交通运行指标收集模块
//!
//! 记录 actor 生命周期、时钟推进与遥测采样指标，并在内存中聚合遥测统计。

use std::collections::HashSet;
use std::fmt;

use contracts::{ActorId, TelemetrySample};
use metrics::{counter, gauge, histogram};
use serde::Serialize;

/// 记录一个 spawn 批次的结果
pub fn record_actors_spawned(kind: &str, spawned: usize, failed: usize) {
    counter!("carla_traffic_actors_spawned_total", "kind" => kind.to_string())
        .increment(spawned as u64);
    if failed > 0 {
        counter!("carla_traffic_actors_spawn_failed_total", "kind" => kind.to_string())
            .increment(failed as u64);
    }
    gauge!("carla_traffic_actors_alive", "kind" => kind.to_string()).increment(spawned as f64);
}

/// 记录一个 destroy 批次的结果
pub fn record_actors_destroyed(kind: &str, destroyed: usize, failed: usize) {
    counter!("carla_traffic_actors_destroyed_total", "kind" => kind.to_string())
        .increment(destroyed as u64);
    if failed > 0 {
        counter!("carla_traffic_actors_destroy_failed_total", "kind" => kind.to_string())
            .increment(failed as u64);
    }
    gauge!("carla_traffic_actors_alive", "kind" => kind.to_string()).decrement(destroyed as f64);
}

/// 记录时钟推进
///
/// `authority` 为 true 表示本进程 tick，否则为等待外部 tick。
pub fn record_tick(frame: u64, authority: bool) {
    let mode = if authority { "tick" } else { "wait" };
    counter!("carla_traffic_ticks_total", "mode" => mode).increment(1);
    gauge!("carla_traffic_last_frame").set(frame as f64);
}

/// 记录一条遥测样本及其估计值
pub fn record_sample(sample: &TelemetrySample) {
    counter!("carla_traffic_samples_total").increment(1);
    counter!("carla_traffic_fuel_predictions_total").increment(1);
    histogram!("carla_traffic_vehicle_speed_mps").record(sample.telemetry.speed);
    histogram!("carla_traffic_engine_rpm").record(sample.estimates.engine_rpm);
    histogram!("carla_traffic_engine_oil_percent").record(sample.estimates.engine_oil_percent);
    histogram!("carla_traffic_fuel_consumption").record(sample.fuel_consumption);
}

/// 记录读取车辆状态失败
pub fn record_state_read_failure() {
    counter!("carla_traffic_state_read_failures_total").increment(1);
}

/// 记录 teardown 中的步骤失败
pub fn record_teardown_failure(step: &'static str) {
    counter!("carla_traffic_teardown_failures_total", "step" => step).increment(1);
}

/// 遥测指标聚合器
///
/// 在内存中聚合样本，运行结束时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct TelemetryAggregator {
    /// 样本总数
    pub total_samples: u64,

    /// 出现过的车辆
    pub vehicles: HashSet<ActorId>,

    /// 安全带已系的样本数
    pub seatbelt_fastened: u64,

    pub speed_stats: RunningStats,
    pub rpm_stats: RunningStats,
    pub oil_stats: RunningStats,
    pub tire_pressure_stats: RunningStats,
    pub fuel_stats: RunningStats,
}

impl TelemetryAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, sample: &TelemetrySample) {
        self.total_samples += 1;
        self.vehicles.insert(sample.actor_id);
        if sample.estimates.seatbelt_fastened {
            self.seatbelt_fastened += 1;
        }

        self.speed_stats.push(sample.telemetry.speed);
        self.rpm_stats.push(sample.estimates.engine_rpm);
        self.oil_stats.push(sample.estimates.engine_oil_percent);
        self.tire_pressure_stats.push(sample.estimates.tire_pressure);
        self.fuel_stats.push(sample.fuel_consumption);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> TelemetrySummary {
        TelemetrySummary {
            total_samples: self.total_samples,
            vehicles: self.vehicles.len(),
            seatbelt_rate: if self.total_samples > 0 {
                self.seatbelt_fastened as f64 / self.total_samples as f64 * 100.0
            } else {
                0.0
            },
            speed_mps: StatsSummary::from(&self.speed_stats),
            engine_rpm: StatsSummary::from(&self.rpm_stats),
            engine_oil_percent: StatsSummary::from(&self.oil_stats),
            tire_pressure: StatsSummary::from(&self.tire_pressure_stats),
            fuel_consumption: StatsSummary::from(&self.fuel_stats),
        }
    }
}

impl<'a> FromIterator<&'a TelemetrySample> for TelemetryAggregator {
    fn from_iter<I: IntoIterator<Item = &'a TelemetrySample>>(iter: I) -> Self {
        let mut aggregator = Self::new();
        for sample in iter {
            aggregator.update(sample);
        }
        aggregator
    }
}

/// 遥测摘要
#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetrySummary {
    pub total_samples: u64,
    pub vehicles: usize,
    pub seatbelt_rate: f64,
    pub speed_mps: StatsSummary,
    pub engine_rpm: StatsSummary,
    pub engine_oil_percent: StatsSummary,
    pub tire_pressure: StatsSummary,
    pub fuel_consumption: StatsSummary,
}

impl fmt::Display for TelemetrySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Telemetry Summary ===")?;
        writeln!(f, "Samples: {} ({} vehicles)", self.total_samples, self.vehicles)?;
        writeln!(f, "Speed (m/s): {}", self.speed_mps)?;
        writeln!(f, "Engine RPM: {}", self.engine_rpm)?;
        writeln!(f, "Engine oil (%): {}", self.engine_oil_percent)?;
        writeln!(f, "Tire pressure (psi): {}", self.tire_pressure)?;
        writeln!(f, "Fuel consumption: {}", self.fuel_consumption)?;
        writeln!(f, "Seatbelt fastened: {:.2}%", self.seatbelt_rate)
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值（非有限值被忽略）
    pub fn push(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{VehicleEstimates, VehicleTelemetry};

    fn sample(actor_id: ActorId, speed: f64, fuel: f64, seatbelt: bool) -> TelemetrySample {
        TelemetrySample {
            iteration: 0,
            frame: 1,
            actor_id,
            telemetry: VehicleTelemetry {
                speed,
                acceleration: 0.0,
                throttle: 0.5,
                brake: 0.0,
                steer: 0.0,
                gear: 1,
                manual_gear_shift: false,
                hand_brake: false,
                tire_friction: 3.5,
                max_rpm: 5800.0,
                torque_curve: vec![],
                inclination: 0.0,
            },
            estimates: VehicleEstimates {
                engine_oil_percent: 90.0,
                tire_pressure: 32.0,
                seatbelt_fastened: seatbelt,
                engine_rpm: 1500.0,
            },
            fuel_consumption: fuel,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_running_stats_skips_nan() {
        let mut stats = RunningStats::default();
        stats.push(f64::NAN);
        stats.push(2.0);
        assert_eq!(stats.count(), 1);
        assert_eq!(stats.mean(), 2.0);
    }

    #[test]
    fn test_aggregator_update() {
        let samples = [
            sample(1000, 10.0, 5.0, true),
            sample(1001, 0.0, 4.0, false),
            sample(1000, 12.0, 5.0, false),
        ];
        let aggregator: TelemetryAggregator = samples.iter().collect();

        assert_eq!(aggregator.total_samples, 3);
        assert_eq!(aggregator.vehicles.len(), 2);
        assert_eq!(aggregator.seatbelt_fastened, 1);
        assert!((aggregator.fuel_stats.mean() - 14.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let aggregator: TelemetryAggregator = [sample(1, 10.0, 5.0, true)].iter().collect();
        let output = aggregator.summary().to_string();
        assert!(output.contains("Samples: 1 (1 vehicles)"));
        assert!(output.contains("100.00%"));
    }

    #[test]
    fn test_empty_summary() {
        let summary = TelemetryAggregator::new().summary();
        assert_eq!(summary.speed_mps.to_string(), "N/A");
        assert_eq!(summary.seatbelt_rate, 0.0);
    }
}
