//! Actor Factory error types

use contracts::{ActorId, ContractError};
use thiserror::Error;

/// Actor Factory specific error
///
/// Per-command batch failures are reported as `CommandResponse::Failed` and
/// never surface here; these variants cover whole-call failures.
#[derive(Debug, Error)]
pub enum ActorFactoryError {
    /// CARLA connection error
    #[error("failed to connect to CARLA: {message}")]
    ConnectionFailed { message: String },

    /// Blueprint lookup error
    #[error("blueprint '{blueprint}' not found")]
    BlueprintNotFound { blueprint: String },

    /// Actor missing from the simulation
    #[error("actor {actor_id} not found")]
    ActorNotFound { actor_id: ActorId },

    /// A simulator call failed as a whole
    #[error("simulator call '{operation}' failed: {message}")]
    Simulator { operation: String, message: String },

    /// Destroy error
    #[error("failed to destroy actor {actor_id}: {message}")]
    DestroyFailed { actor_id: ActorId, message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl ActorFactoryError {
    /// Create not-connected error
    pub fn not_connected() -> Self {
        Self::ConnectionFailed {
            message: "not connected to CARLA server".into(),
        }
    }

    /// Create simulator call error
    pub fn simulator(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Simulator {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ActorFactoryError>;
