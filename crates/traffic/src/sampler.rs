//! Telemetry sampling
//!
//! Builds `VehicleTelemetry` from raw vehicle state and runs the estimators
//! and fuel predictor on it. Uptime and stop duration are tracked per
//! vehicle from the simulated time between sampled frames.

use std::collections::HashMap;

use contracts::{
    ActorId, EstimatorConfig, TelemetrySample, TrafficConfig, TripParameters, VehicleEstimates,
    VehicleState, VehicleTelemetry,
};
use estimators::{
    calculate_engine_rpm, calculate_pressure, vehicle_inclination, EngineOilEstimator,
    SeatbeltPolicy, WearFactors,
};
use fuel_predictor::FuelPredictor;

/// Snapshot of the raw state at one step
pub fn build_telemetry(state: &VehicleState) -> VehicleTelemetry {
    let physics = &state.physics;
    VehicleTelemetry {
        speed: state.velocity.length(),
        acceleration: state.acceleration.length(),
        throttle: state.control.throttle,
        brake: state.control.brake,
        steer: state.control.steer,
        gear: state.control.gear,
        manual_gear_shift: state.control.manual_gear_shift,
        hand_brake: state.control.hand_brake,
        tire_friction: physics.tire_friction.first().copied().unwrap_or_default(),
        max_rpm: physics.max_rpm,
        torque_curve: physics
            .torque_curve
            .iter()
            .map(|p| (p.rpm, p.torque))
            .collect(),
        inclination: vehicle_inclination(&state.rotation),
    }
}

/// Engine RPM from the engaged gear's ratio and the first wheel's radius
fn engine_rpm(state: &VehicleState, speed: f64, fallback_radius: f64) -> f64 {
    let physics = &state.physics;
    let gear = state.control.gear;
    let gear_ratio = usize::try_from(gear - 1)
        .ok()
        .and_then(|index| physics.forward_gear_ratios.get(index))
        .copied()
        .unwrap_or(1.0);
    let radius = physics
        .wheel_radius_m
        .first()
        .copied()
        .filter(|r| *r > 0.0)
        .unwrap_or(fallback_radius);
    calculate_engine_rpm(gear, gear_ratio, physics.final_drive_ratio, speed, radius)
}

/// Simulated time a vehicle has been alive and stationary
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleClock {
    pub uptime: f64,
    /// Length of the current stop, reset once the vehicle moves
    pub stopped_for: f64,
}

impl VehicleClock {
    fn advance(&mut self, dt: f64, stopped: bool) {
        self.uptime += dt;
        if stopped {
            self.stopped_for += dt;
        } else {
            self.stopped_for = 0.0;
        }
    }
}

/// Per-run sampling state
#[derive(Debug)]
pub struct TelemetrySampler {
    estimators: EstimatorConfig,
    trip: TripParameters,
    fixed_delta: f64,
    last_frame: u64,
    oil: EngineOilEstimator,
    seatbelt: SeatbeltPolicy,
    clocks: HashMap<ActorId, VehicleClock>,
}

impl TelemetrySampler {
    /// `start_frame` is the frame the population was settled at
    pub fn new(config: &TrafficConfig, start_frame: u64) -> Self {
        let seatbelt = match config.estimators.seatbelt_seed {
            Some(seed) => SeatbeltPolicy::seeded(seed),
            None => SeatbeltPolicy::from_os_rng(),
        };
        Self {
            estimators: config.estimators.clone(),
            trip: config.fuel.trip,
            fixed_delta: config.world.fixed_delta_seconds,
            last_frame: start_frame,
            oil: EngineOilEstimator::new(config.estimators.wear_scales),
            seatbelt,
            clocks: HashMap::new(),
        }
    }

    /// Simulated seconds since the previous sampled frame
    pub fn begin_iteration(&mut self, frame: u64) -> f64 {
        let frames = frame.saturating_sub(self.last_frame);
        self.last_frame = frame;
        frames as f64 * self.fixed_delta
    }

    pub fn clock(&self, actor_id: ActorId) -> Option<VehicleClock> {
        self.clocks.get(&actor_id).copied()
    }

    /// One sample for one vehicle
    pub fn sample(
        &mut self,
        predictor: &FuelPredictor,
        iteration: u32,
        frame: u64,
        dt: f64,
        state: &VehicleState,
    ) -> TelemetrySample {
        let telemetry = build_telemetry(state);
        let stopped = telemetry.speed < self.estimators.stopped_speed_threshold;

        let clock = self.clocks.entry(state.actor_id).or_default();
        clock.advance(dt, stopped);
        let VehicleClock { uptime, stopped_for } = *clock;

        let estimates = VehicleEstimates {
            engine_oil_percent: self.oil.estimate(
                &WearFactors::from(&telemetry),
                self.estimators.seconds_since_oil_change + uptime,
            ),
            tire_pressure: calculate_pressure(
                self.estimators.initial_tire_pressure,
                uptime,
                stopped_for,
            ),
            seatbelt_fastened: self.seatbelt.infer(uptime, stopped_for),
            engine_rpm: engine_rpm(state, telemetry.speed, self.estimators.rolling_radius_m),
        };

        TelemetrySample {
            iteration,
            frame,
            actor_id: state.actor_id,
            telemetry,
            estimates,
            fuel_consumption: predictor.predict_trip(&self.trip),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Rotation, TorquePoint, Vector3, VehicleControl, VehiclePhysics};
    use fuel_predictor::{LinearModel, FEATURE_NAMES};

    fn predictor() -> FuelPredictor {
        FuelPredictor::from_model(LinearModel {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            intercept: 4.5,
            coefficients: vec![0.0; FEATURE_NAMES.len()],
        })
        .unwrap()
    }

    fn state(actor_id: ActorId, speed: f64, gear: i32) -> VehicleState {
        VehicleState {
            actor_id,
            velocity: Vector3 {
                x: speed * 0.6,
                y: speed * 0.8,
                z: 0.0,
            },
            acceleration: Vector3 {
                x: 0.0,
                y: 0.0,
                z: 2.0,
            },
            rotation: Rotation {
                pitch: 3.0,
                yaw: 0.0,
                roll: 0.0,
            },
            control: VehicleControl {
                gear,
                throttle: 0.5,
                ..Default::default()
            },
            physics: VehiclePhysics {
                max_rpm: 6000.0,
                torque_curve: vec![TorquePoint {
                    rpm: 1000.0,
                    torque: 300.0,
                }],
                forward_gear_ratios: vec![3.0, 2.0],
                final_drive_ratio: 4.0,
                tire_friction: vec![2.5, 3.0],
                wheel_radius_m: vec![0.4],
            },
        }
    }

    fn config() -> TrafficConfig {
        let mut config = TrafficConfig::default();
        config.estimators.seatbelt_seed = Some(1);
        config
    }

    #[test]
    fn test_build_telemetry() {
        let t = build_telemetry(&state(1, 10.0, 2));
        assert!((t.speed - 10.0).abs() < 1e-9);
        assert_eq!(t.acceleration, 2.0);
        assert_eq!(t.tire_friction, 2.5);
        assert_eq!(t.torque_curve, vec![(1000.0, 300.0)]);
        assert_eq!(t.inclination, 3.0);
    }

    #[test]
    fn test_engine_rpm_uses_engaged_gear() {
        let s = state(1, 10.0, 2);
        let expected = calculate_engine_rpm(2, 2.0, 4.0, 10.0, 0.4);
        assert!((engine_rpm(&s, 10.0, 0.35) - expected).abs() < 1e-9);

        let mut no_wheels = state(1, 10.0, 7);
        no_wheels.physics.wheel_radius_m.clear();
        let expected = calculate_engine_rpm(7, 1.0, 4.0, 10.0, 0.35);
        assert!((engine_rpm(&no_wheels, 10.0, 0.35) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_frame_delta_scales_with_fixed_tick() {
        let mut sampler = TelemetrySampler::new(&config(), 10);
        assert!((sampler.begin_iteration(11) - 0.05).abs() < 1e-12);
        assert!((sampler.begin_iteration(14) - 0.15).abs() < 1e-12);
        assert_eq!(sampler.begin_iteration(14), 0.0);
    }

    #[test]
    fn test_stop_duration_resets_on_motion() {
        let predictor = predictor();
        let mut sampler = TelemetrySampler::new(&config(), 0);

        sampler.sample(&predictor, 0, 1, 1.0, &state(7, 0.0, 0));
        sampler.sample(&predictor, 1, 2, 1.0, &state(7, 0.0, 0));
        assert_eq!(
            sampler.clock(7),
            Some(VehicleClock {
                uptime: 2.0,
                stopped_for: 2.0
            })
        );

        sampler.sample(&predictor, 2, 3, 1.0, &state(7, 5.0, 1));
        assert_eq!(
            sampler.clock(7),
            Some(VehicleClock {
                uptime: 3.0,
                stopped_for: 0.0
            })
        );
    }

    #[test]
    fn test_sample_estimates_in_range() {
        let predictor = predictor();
        let mut sampler = TelemetrySampler::new(&config(), 0);
        let sample = sampler.sample(&predictor, 3, 9, 0.05, &state(2, 12.0, 1));

        assert_eq!(sample.iteration, 3);
        assert_eq!(sample.frame, 9);
        assert_eq!(sample.actor_id, 2);
        assert!((0.0..=100.0).contains(&sample.estimates.engine_oil_percent));
        assert!(sample.estimates.engine_rpm > 0.0);
        assert!(!sample.estimates.seatbelt_fastened);
        assert_eq!(sample.fuel_consumption, 4.5);
    }

    #[test]
    fn test_wear_scales_come_from_config() {
        let predictor = predictor();
        let vehicle = state(2, 12.0, 1);

        let mut default_sampler = TelemetrySampler::new(&config(), 0);
        let worn = default_sampler.sample(&predictor, 0, 1, 0.05, &vehicle);

        let mut cfg = config();
        cfg.estimators.wear_scales = contracts::WearScales {
            speed: 0.0,
            acceleration: 0.0,
            throttle: 0.0,
            brake: 0.0,
            steer: 0.0,
            gear: 0.0,
            tire_friction: 0.0,
            max_rpm: 0.0,
            accelerometer: 0.0,
        };
        let mut unscaled = TelemetrySampler::new(&cfg, 0);
        let fresh = unscaled.sample(&predictor, 0, 1, 0.05, &vehicle);

        assert!(fresh.estimates.engine_oil_percent > worn.estimates.engine_oil_percent);
        assert!(fresh.estimates.engine_oil_percent > 99.9);
    }
}
