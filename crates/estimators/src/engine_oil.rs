//! Engine oil wear
//!
//! remaining % = 100 - 100 * (time term + wear term), clamped to [0, 100]
//!
//! - time term: `min(1, elapsed / one year)`
//! - wear term: mean of the wear factors, each normalised to [0, 1] by its scale
//!
//! The scales come from `[estimators.wear_scales]`; only the shape of the
//! formula is fixed.

use contracts::VehicleTelemetry;
use serde::{Deserialize, Serialize};

pub use contracts::WearScales;

pub const MAX_ENGINE_OIL_PERCENTAGE: f64 = 100.0;
pub const MIN_ENGINE_OIL_PERCENTAGE: f64 = 0.0;

/// One year in seconds
pub const MAX_TIME_BEFORE_OIL_CHANGE_SECS: f64 = 365.0 * 24.0 * 60.0 * 60.0;

/// Named wear-contributing factors
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WearFactors {
    pub speed: f64,
    pub acceleration: f64,
    pub throttle: f64,
    pub brake: f64,
    pub steer: f64,
    pub gear: i32,
    pub manual_gear_shift: bool,
    pub hand_brake: bool,
    pub tire_friction: f64,
    pub max_rpm: f64,
    pub accelerometer: f64,
}

impl From<&VehicleTelemetry> for WearFactors {
    fn from(t: &VehicleTelemetry) -> Self {
        Self {
            speed: t.speed,
            acceleration: t.acceleration,
            throttle: t.throttle,
            brake: t.brake,
            steer: t.steer,
            gear: t.gear,
            manual_gear_shift: t.manual_gear_shift,
            hand_brake: t.hand_brake,
            tire_friction: t.tire_friction,
            max_rpm: t.max_rpm,
            // CARLA exposes no separate accelerometer on the actor
            accelerometer: t.acceleration,
        }
    }
}

/// |value| / scale clamped to [0, 1]; non-positive scales contribute nothing
fn normalize(value: f64, scale: f64) -> f64 {
    if scale <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    (value.abs() / scale).clamp(0.0, 1.0)
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Engine oil estimator with tunable factor scales
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineOilEstimator {
    pub scales: WearScales,
}

impl EngineOilEstimator {
    pub fn new(scales: WearScales) -> Self {
        Self { scales }
    }

    /// Mean of the normalised factors, in [0, 1]
    pub fn combined_wear(&self, factors: &WearFactors) -> f64 {
        let s = &self.scales;
        let normalized = [
            normalize(factors.speed, s.speed),
            normalize(factors.acceleration, s.acceleration),
            normalize(factors.throttle, s.throttle),
            normalize(factors.brake, s.brake),
            normalize(factors.steer, s.steer),
            normalize(f64::from(factors.gear), s.gear),
            flag(factors.manual_gear_shift),
            flag(factors.hand_brake),
            normalize(factors.tire_friction, s.tire_friction),
            normalize(factors.max_rpm, s.max_rpm),
            normalize(factors.accelerometer, s.accelerometer),
        ];
        normalized.iter().sum::<f64>() / normalized.len() as f64
    }

    /// Remaining oil percentage in [0, 100]
    pub fn estimate(&self, factors: &WearFactors, elapsed_secs: f64) -> f64 {
        let time_fraction = (elapsed_secs.max(0.0) / MAX_TIME_BEFORE_OIL_CHANGE_SECS).min(1.0);
        let wear = self.combined_wear(factors);

        let estimated = MAX_ENGINE_OIL_PERCENTAGE
            - (MAX_ENGINE_OIL_PERCENTAGE - MIN_ENGINE_OIL_PERCENTAGE) * (time_fraction + wear);

        estimated.clamp(MIN_ENGINE_OIL_PERCENTAGE, MAX_ENGINE_OIL_PERCENTAGE)
    }
}

/// Remaining oil percentage with the default scales
pub fn estimate_engine_oil_percentage(factors: &WearFactors, elapsed_secs: f64) -> f64 {
    EngineOilEstimator::default().estimate(factors, elapsed_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_factors() -> WearFactors {
        WearFactors {
            speed: 13.9,
            acceleration: 2.0,
            throttle: 0.7,
            brake: 0.2,
            steer: 0.1,
            gear: 3,
            manual_gear_shift: false,
            hand_brake: false,
            tire_friction: 0.8,
            max_rpm: 6000.0,
            accelerometer: 2.0,
        }
    }

    fn saturated_factors() -> WearFactors {
        WearFactors {
            speed: 1e6,
            acceleration: 1e6,
            throttle: 1.0,
            brake: 1.0,
            steer: -1.0,
            gear: 100,
            manual_gear_shift: true,
            hand_brake: true,
            tire_friction: 1e6,
            max_rpm: 1e9,
            accelerometer: 1e6,
        }
    }

    #[test]
    fn test_one_year_or_more_is_empty() {
        for elapsed in [
            MAX_TIME_BEFORE_OIL_CHANGE_SECS,
            MAX_TIME_BEFORE_OIL_CHANGE_SECS * 3.0,
        ] {
            assert_eq!(estimate_engine_oil_percentage(&WearFactors::default(), elapsed), 0.0);
            assert_eq!(estimate_engine_oil_percentage(&sample_factors(), elapsed), 0.0);
        }
    }

    #[test]
    fn test_fresh_idle_engine_is_full() {
        assert_eq!(estimate_engine_oil_percentage(&WearFactors::default(), 0.0), 100.0);
    }

    #[test]
    fn test_bounds() {
        let factor_sets = [WearFactors::default(), sample_factors(), saturated_factors()];
        let elapsed = [-10.0, 0.0, 1.0, 3600.0, 1e7, 1e12];
        for factors in &factor_sets {
            for &t in &elapsed {
                let pct = estimate_engine_oil_percentage(factors, t);
                assert!((0.0..=100.0).contains(&pct), "{pct} out of range");
            }
        }
    }

    #[test]
    fn test_monotonic_in_time() {
        let factors = sample_factors();
        let mut last = f64::INFINITY;
        for step in 0..20 {
            let t = step as f64 * MAX_TIME_BEFORE_OIL_CHANGE_SECS / 10.0;
            let pct = estimate_engine_oil_percentage(&factors, t);
            assert!(pct <= last);
            last = pct;
        }
    }

    #[test]
    fn test_monotonic_in_wear() {
        let mut factors = WearFactors::default();
        let mut last = f64::INFINITY;
        for speed in [0.0, 10.0, 30.0, 70.0, 200.0] {
            factors.speed = speed;
            let pct = estimate_engine_oil_percentage(&factors, 86_400.0);
            assert!(pct <= last);
            last = pct;
        }
    }

    #[test]
    fn test_booleans_count_as_full_factor() {
        let estimator = EngineOilEstimator::default();
        let mut factors = WearFactors::default();
        factors.hand_brake = true;
        assert!((estimator.combined_wear(&factors) - 1.0 / 11.0).abs() < 1e-12);
    }
}
