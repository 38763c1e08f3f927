//! Clock authority
//!
//! A run probes the world settings before touching them and records exactly
//! what it changed. Only those changes are reverted on release. When another
//! client already drives a synchronous world, the run never claims the clock
//! and never restores it.

use actor_factory::{ActorFactoryError, CarlaClient};
use contracts::{ClockMode, TrafficConfig, WorldSettings};
use tracing::{debug, info, instrument, warn};

/// Settings held by a run between populate and teardown
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsLease {
    previous: WorldSettings,
    applied: WorldSettings,
    claimed_clock: bool,
    changed_rendering: bool,
    tm_port: u16,
}

impl SettingsLease {
    /// Probe the world and establish the settings a run asks for.
    ///
    /// Configures the traffic manager (leading distance, dormant respawn,
    /// hybrid physics, seed, synchronous mode) before the world settings.
    #[instrument(name = "settings_lease_acquire", skip(client, config), fields(mode = ?config.world.clock_mode))]
    pub async fn acquire<C: CarlaClient>(
        client: &C,
        config: &TrafficConfig,
    ) -> Result<Self, ActorFactoryError> {
        let previous = client.world_settings().await?;
        let mut applied = previous;
        let mut claimed_clock = false;

        if config.world.clock_mode == ClockMode::Synchronous {
            if previous.synchronous_mode {
                warn!("world is already synchronous, another client holds the clock");
            } else {
                claimed_clock = true;
                applied.synchronous_mode = true;
                applied.fixed_delta_seconds = Some(config.world.fixed_delta_seconds);
            }
        }

        let changed_rendering = config.world.no_rendering && !previous.no_rendering_mode;
        if changed_rendering {
            applied.no_rendering_mode = true;
        }

        client
            .configure_traffic_manager(&config.traffic_manager_settings())
            .await?;

        if applied != previous {
            let frame = client.apply_world_settings(applied).await?;
            debug!(frame, ?applied, "world settings applied");
        }

        info!(claimed_clock, changed_rendering, "settings established");
        Ok(Self {
            previous,
            applied,
            claimed_clock,
            changed_rendering,
            tm_port: config.traffic_manager.port,
        })
    }

    /// This run drives the simulation clock
    pub fn has_authority(&self) -> bool {
        self.claimed_clock
    }

    /// Settings observed before the run changed anything
    pub fn previous(&self) -> WorldSettings {
        self.previous
    }

    /// Whether release has anything to revert
    pub fn has_changes(&self) -> bool {
        self.claimed_clock || self.changed_rendering
    }

    /// Advance one frame: tick with authority, otherwise wait for a tick
    pub async fn step<C: CarlaClient>(&self, client: &C) -> Result<u64, ActorFactoryError> {
        if self.claimed_clock {
            client.tick().await
        } else {
            client.wait_for_tick().await
        }
    }

    /// Revert exactly what `acquire` changed. Consumes the lease.
    #[instrument(name = "settings_lease_restore", skip(self, client), fields(claimed_clock = self.claimed_clock))]
    pub async fn restore<C: CarlaClient>(self, client: &C) -> Result<(), ActorFactoryError> {
        if !self.has_changes() {
            debug!("no settings to restore");
            return Ok(());
        }

        let mut restored = self.applied;
        if self.claimed_clock {
            restored.synchronous_mode = self.previous.synchronous_mode;
            restored.fixed_delta_seconds = self.previous.fixed_delta_seconds;
        }
        if self.changed_rendering {
            restored.no_rendering_mode = self.previous.no_rendering_mode;
        }
        let settings_result = client.apply_world_settings(restored).await.map(|_| ());

        if self.claimed_clock {
            if let Err(e) = client
                .set_traffic_manager_synchronous(self.tm_port, false)
                .await
            {
                warn!(error = %e, "failed to release traffic manager synchronous mode");
            }
        }

        if settings_result.is_ok() {
            info!("world settings restored");
        }
        settings_result
    }
}
