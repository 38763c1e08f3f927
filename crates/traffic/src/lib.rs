//! # Traffic
//!
//! Background traffic orchestrator for a CARLA world.
//!
//! A run connects, leases the simulation clock, spawns vehicles and
//! pedestrians in batches, samples per-vehicle telemetry for a fixed number
//! of ticks and then destroys everything it created.
//!
//! ```ignore
//! let (stop, mut stopped) = tokio::sync::watch::channel(false);
//! // `stop.send(true)` from a signal handler installed before the run
//! let mut orchestrator = TrafficOrchestrator::from_config(config, MockCarlaClient::new())?;
//! let report = orchestrator
//!     .start(async move {
//!         let _ = stopped.wait_for(|&s| s).await;
//!     })
//!     .await?;
//! ```
//!
//! The shutdown future is first polled after the clock lease is taken, so
//! the signal source must already be registered when `start` is called.

pub mod clock;
pub mod error;
pub mod orchestrator;
pub mod population;
pub mod sampler;

pub use clock::SettingsLease;
pub use error::{Result, TrafficError};
pub use orchestrator::{RunOutcome, RunReport, TrafficOrchestrator};
pub use sampler::{build_telemetry, TelemetrySampler, VehicleClock};
