//! # Actor Factory
//!
//! CARLA actor factory module.
//!
//! Responsibilities:
//! - Abstract the simulator behind `CarlaClient`
//! - Resolve blueprints (safe and generation filters)
//! - Batch-spawn vehicles, pedestrians and walker controllers
//! - Batch teardown of everything a run created
//! - Provide a mock simulator with failure injection
//!
//! ## Feature Flags
//!
//! - `real-carla`: Enable real CARLA client (requires carla crate)

pub mod client;
pub mod error;
pub mod factory;
pub mod mock_client;

#[cfg(feature = "real-carla")]
pub mod carla_client;

pub use client::CarlaClient;
pub use contracts::{ActorId, ManagedActorSet};
pub use error::{ActorFactoryError, Result};
pub use factory::{ActorFactory, ActorKind, BatchReport, TeardownReport, WALKER_CONTROLLER_BLUEPRINT};
pub use mock_client::{
    default_catalog, matches_filter, MockCall, MockCarlaClient, MockConfig, ACTOR_ID_BASE,
};

#[cfg(feature = "real-carla")]
pub use carla_client::RealCarlaClient;
