//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Uses the CARLA simulation frame counter as the primary clock
//! - Durations derived from the fixed tick (`WorldSettings::fixed_delta_seconds`)

mod blueprint;
mod command;
mod error;
mod runtime;
mod telemetry;
mod traffic_config;
mod world;

pub use blueprint::*;
pub use command::*;
pub use error::*;
pub use runtime::*;
pub use telemetry::*;
pub use traffic_config::*;
pub use world::*;
