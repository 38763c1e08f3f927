//! Traffic orchestrator
//!
//! `start` wraps populate and sample in an acquire/release scope. Teardown
//! runs exactly once on every path out of the scope: normal completion,
//! shutdown signal, a failed clock step, or a failed populate step.
//!
//! The shutdown future is polled between populate phases and before every
//! sampling step, so an interrupt at any point after connecting still tears
//! down whatever was created.

use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::time::Duration;

use actor_factory::{ActorFactory, ActorKind, BatchReport, CarlaClient, TeardownReport};
use contracts::{ManagedActorSet, TelemetrySample, TrafficConfig};
use fuel_predictor::FuelPredictor;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::clock::SettingsLease;
use crate::error::{Result, TrafficError};
use crate::population::{
    pedestrian_seed, pedestrian_spawns, plan_spawn_points, sample_navigation_locations,
    seeded_rng, vehicle_commands,
};
use crate::sampler::TelemetrySampler;

/// How the sampling phase ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every configured iteration ran
    Completed,
    /// The shutdown signal fired
    Interrupted,
    /// A clock step failed; samples taken so far are kept
    Aborted { reason: String },
}

/// Result of one `start`
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub samples: Vec<TelemetrySample>,
    pub vehicles_spawned: usize,
    pub pedestrians_spawned: usize,
    pub controllers_spawned: usize,
    /// Clock steps taken by the sampling loop
    pub iterations: u32,
    pub clock_authority: bool,
    pub outcome: RunOutcome,
    #[serde(skip)]
    pub teardown: TeardownReport,
}

/// Bookkeeping filled in while the run progresses
#[derive(Debug, Default)]
struct RunProgress {
    actors: ManagedActorSet,
    samples: Vec<TelemetrySample>,
    vehicles: usize,
    pedestrians: usize,
    controllers: usize,
    iterations: u32,
}

fn record_batch(report: &BatchReport) {
    observability::record_actors_spawned(report.kind.as_str(), report.spawned, report.failed);
}

/// Poll `shutdown` once without waiting. Must not be called again once it returned true.
async fn shutdown_requested<F>(shutdown: &mut Pin<&mut F>) -> bool
where
    F: Future<Output = ()>,
{
    tokio::select! {
        biased;
        () = shutdown.as_mut() => true,
        () = std::future::ready(()) => false,
    }
}

/// Background traffic orchestrator
pub struct TrafficOrchestrator<C: CarlaClient> {
    config: TrafficConfig,
    factory: ActorFactory<C>,
    predictor: FuelPredictor,
}

impl<C: CarlaClient> TrafficOrchestrator<C> {
    /// Load the fuel model named by the config. Fails before any simulator call.
    pub fn from_config(config: TrafficConfig, client: C) -> Result<Self> {
        let predictor = FuelPredictor::load(&config.fuel.model_path)?;
        Ok(Self::with_predictor(config, client, predictor))
    }

    pub fn with_predictor(config: TrafficConfig, client: C, predictor: FuelPredictor) -> Self {
        Self {
            config,
            factory: ActorFactory::new(client),
            predictor,
        }
    }

    pub fn config(&self) -> &TrafficConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        self.factory.client()
    }

    pub fn into_client(self) -> C {
        self.factory.into_client()
    }

    /// Populate the world, sample telemetry, then tear everything down.
    ///
    /// `shutdown` ends the run early, during population or sampling; teardown
    /// still runs. A failed clock step ends the sampling loop and is reported
    /// as `RunOutcome::Aborted`. Fatal populate errors (empty catalogue,
    /// invalid generation, failed batch or settle step) are returned after
    /// teardown.
    #[instrument(
        name = "traffic_start",
        skip(self, shutdown),
        fields(
            host = %self.config.carla.host,
            port = self.config.carla.port,
            vehicles = self.config.vehicles.count,
            pedestrians = self.config.pedestrians.count
        )
    )]
    pub async fn start<F>(&mut self, shutdown: F) -> Result<RunReport>
    where
        F: Future<Output = ()>,
    {
        let carla = &self.config.carla;
        let timeout = Duration::from_secs_f64(carla.timeout_secs);
        if let Err(e) = self
            .factory
            .client_mut()
            .connect(&carla.host, carla.port, timeout)
            .await
        {
            error!(error = %e, "failed to connect to simulator");
            return Err(TrafficError::connection(&carla.host, carla.port, &e));
        }

        let lease = SettingsLease::acquire(self.factory.client(), &self.config).await?;
        let clock_authority = lease.has_authority();

        tokio::pin!(shutdown);
        let mut progress = RunProgress::default();
        let result = self.populate_and_sample(&lease, &mut progress, shutdown).await;

        let actors = progress.actors.take();
        let teardown = self.release(lease, actors).await;

        let outcome = result?;
        info!(
            samples = progress.samples.len(),
            ?outcome,
            "traffic run finished"
        );
        Ok(RunReport {
            samples: progress.samples,
            vehicles_spawned: progress.vehicles,
            pedestrians_spawned: progress.pedestrians,
            controllers_spawned: progress.controllers,
            iterations: progress.iterations,
            clock_authority,
            outcome,
            teardown,
        })
    }

    async fn populate_and_sample<F>(
        &self,
        lease: &SettingsLease,
        progress: &mut RunProgress,
        mut shutdown: Pin<&mut F>,
    ) -> Result<RunOutcome>
    where
        F: Future<Output = ()>,
    {
        if self.populate(lease, progress, &mut shutdown).await?.is_break() {
            info!(
                vehicles = progress.vehicles,
                pedestrians = progress.pedestrians,
                "shutdown requested during population"
            );
            return Ok(RunOutcome::Interrupted);
        }
        self.sample_loop(lease, progress, &mut shutdown).await
    }

    #[instrument(name = "traffic_populate", skip_all)]
    async fn populate<F>(
        &self,
        lease: &SettingsLease,
        progress: &mut RunProgress,
        shutdown: &mut Pin<&mut F>,
    ) -> Result<ControlFlow<()>>
    where
        F: Future<Output = ()>,
    {
        let client = self.factory.client();
        let vehicles = &self.config.vehicles;
        let pedestrians = &self.config.pedestrians;
        let tm_port = self.config.traffic_manager.port;
        let do_tick = lease.has_authority();

        let vehicle_blueprints = self
            .factory
            .resolve_blueprints(&vehicles.filter, vehicles.generation()?, vehicles.safe)
            .await?;
        let pedestrian_blueprints = if pedestrians.count > 0 {
            self.factory
                .resolve_blueprints(&pedestrians.filter, pedestrians.generation()?, false)
                .await?
        } else {
            Vec::new()
        };

        let mut rng = seeded_rng(vehicles.seed);

        let spawn_points = match client.spawn_points().await {
            Ok(points) => points,
            Err(e) => {
                warn!(error = %e, "failed to read spawn points, spawning no vehicles");
                Vec::new()
            }
        };
        let points = plan_spawn_points(spawn_points, vehicles.count, &mut rng);
        let commands = vehicle_commands(&vehicle_blueprints, &points, vehicles.hero, tm_port, &mut rng);
        let report = self
            .factory
            .spawn_vehicles(commands, do_tick, &mut progress.actors)
            .await?;
        record_batch(&report);
        progress.vehicles = report.spawned;

        if vehicles.car_lights_on {
            for &vehicle_id in progress.actors.vehicle_ids() {
                if let Err(e) = client.update_vehicle_lights(tm_port, vehicle_id, true).await {
                    warn!(vehicle_id, error = %e, "failed to enable automatic lights");
                }
            }
        }

        if shutdown_requested(shutdown).await {
            return Ok(ControlFlow::Break(()));
        }

        if pedestrians.count > 0 {
            let seed = pedestrian_seed(pedestrians.seed, &mut rng);
            if let Err(e) = client.set_pedestrians_seed(seed).await {
                warn!(seed, error = %e, "failed to seed pedestrian navigation");
            }
            let mut walker_rng = seeded_rng(Some(seed));

            let locations = sample_navigation_locations(client, pedestrians.count).await;
            let spawns = pedestrian_spawns(
                &pedestrian_blueprints,
                &locations,
                pedestrians.running_fraction,
                &mut walker_rng,
            );
            let report = self
                .factory
                .spawn_pedestrians(spawns, do_tick, &mut progress.actors)
                .await?;
            record_batch(&report);
            progress.pedestrians = report.spawned;

            let report = self
                .factory
                .spawn_controllers(do_tick, &mut progress.actors)
                .await?;
            record_batch(&report);
            progress.controllers = report.spawned;
        }

        if shutdown_requested(shutdown).await {
            return Ok(ControlFlow::Break(()));
        }

        let frame = lease.step(client).await?;
        debug!(frame, "population settled");

        if progress.controllers > 0 {
            self.start_controllers(&progress.actors).await;
        }

        let speed_difference = self.config.traffic_manager.global_speed_difference;
        if let Err(e) = client.set_global_speed_difference(tm_port, speed_difference).await {
            warn!(speed_difference, error = %e, "failed to set global speed difference");
        }

        info!(
            vehicles = progress.vehicles,
            pedestrians = progress.pedestrians,
            controllers = progress.controllers,
            "spawned {} vehicles and {} walkers",
            progress.vehicles,
            progress.pedestrians
        );
        Ok(ControlFlow::Continue(()))
    }

    /// Start each controller, send it somewhere and cap its speed
    async fn start_controllers(&self, actors: &ManagedActorSet) {
        let client = self.factory.client();
        let crossing = self.config.pedestrians.crossing_fraction;
        if let Err(e) = client.set_pedestrians_cross_factor(crossing).await {
            warn!(crossing, error = %e, "failed to set pedestrian crossing factor");
        }

        for pedestrian in actors.pedestrians() {
            let Some(controller_id) = pedestrian.controller_id else {
                continue;
            };
            if let Err(e) = client.start_walker_controller(controller_id).await {
                warn!(controller_id, error = %e, "failed to start walker controller");
                continue;
            }
            match client.random_navigation_location().await {
                Ok(Some(target)) => {
                    if let Err(e) = client.walker_go_to_location(controller_id, target).await {
                        warn!(controller_id, error = %e, "failed to set walker destination");
                    }
                }
                Ok(None) => debug!(controller_id, "no navigable destination sampled"),
                Err(e) => warn!(controller_id, error = %e, "failed to sample walker destination"),
            }
            if let Err(e) = client
                .set_walker_max_speed(controller_id, pedestrian.max_speed)
                .await
            {
                warn!(controller_id, error = %e, "failed to set walker speed");
            }
        }
    }

    #[instrument(name = "traffic_sample_loop", skip_all, fields(iterations = self.config.sampling.iterations))]
    async fn sample_loop<F>(
        &self,
        lease: &SettingsLease,
        progress: &mut RunProgress,
        shutdown: &mut Pin<&mut F>,
    ) -> Result<RunOutcome>
    where
        F: Future<Output = ()>,
    {
        let client = self.factory.client();
        let authority = lease.has_authority();
        if !authority {
            info!("another client drives the clock, waiting for ticks without sampling");
        }

        // created at the first sampled frame so the first delta is one tick
        let mut sampler: Option<TelemetrySampler> = None;

        for iteration in 0..self.config.sampling.iterations {
            let step = tokio::select! {
                biased;
                () = shutdown.as_mut() => {
                    info!(iteration, "shutdown requested, stopping sampling");
                    return Ok(RunOutcome::Interrupted);
                }
                step = lease.step(client) => step,
            };
            let frame = match step {
                Ok(frame) => frame,
                Err(e) => {
                    error!(iteration, error = %e, "clock step failed, aborting sampling");
                    return Ok(RunOutcome::Aborted {
                        reason: e.to_string(),
                    });
                }
            };
            progress.iterations += 1;
            observability::record_tick(frame, authority);

            if !authority {
                continue;
            }

            let sampler = sampler.get_or_insert_with(|| {
                TelemetrySampler::new(&self.config, frame.saturating_sub(1))
            });
            let dt = sampler.begin_iteration(frame);
            for &vehicle_id in progress.actors.vehicle_ids() {
                match client.vehicle_state(vehicle_id).await {
                    Ok(state) => {
                        let sample = sampler.sample(&self.predictor, iteration, frame, dt, &state);
                        observability::record_sample(&sample);
                        progress.samples.push(sample);
                    }
                    Err(e) => {
                        warn!(vehicle_id, error = %e, "failed to read vehicle state, skipping");
                        observability::record_state_read_failure();
                    }
                }
            }
        }
        Ok(RunOutcome::Completed)
    }

    /// Restore settings, then destroy everything the run created
    #[instrument(name = "traffic_release", skip_all, fields(actors = actors.len()))]
    async fn release(&self, lease: SettingsLease, actors: ManagedActorSet) -> TeardownReport {
        let client = self.factory.client();
        if let Err(e) = lease.restore(client).await {
            error!(error = %e, "failed to restore world settings");
            observability::record_teardown_failure("restore_settings");
        }

        info!("destroying {} actors", actors.len());
        let report = self.factory.teardown(actors).await;

        observability::record_actors_destroyed(
            ActorKind::Vehicle.as_str(),
            report.vehicles_destroyed,
            report.vehicles_failed,
        );
        observability::record_actors_destroyed(
            ActorKind::Pedestrian.as_str(),
            report.walkers_destroyed,
            report.walkers_failed,
        );
        if report.vehicles_failed > 0 {
            observability::record_teardown_failure("destroy_vehicles");
        }
        if report.controllers_stop_failed > 0 {
            observability::record_teardown_failure("stop_controllers");
        }
        if report.walkers_failed > 0 {
            observability::record_teardown_failure("destroy_walkers");
        }
        report
    }
}
