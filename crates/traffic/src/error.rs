//! Traffic orchestrator error types

use actor_factory::ActorFactoryError;
use contracts::ContractError;
use fuel_predictor::FuelPredictorError;
use thiserror::Error;

/// Fatal errors of a traffic run
///
/// Per-actor failures never surface here; they are logged and shrink the
/// managed set instead.
#[derive(Debug, Error)]
pub enum TrafficError {
    /// Simulator unreachable
    #[error("failed to connect to CARLA at {host}:{port}: {message}")]
    Connection {
        host: String,
        port: u16,
        message: String,
    },

    /// Blueprint catalog produced nothing usable
    #[error("no blueprints available for filter '{filter}' (generation {generation})")]
    NoBlueprintsAvailable { filter: String, generation: String },

    /// Fuel model could not be loaded
    #[error(transparent)]
    ModelUnavailable(#[from] FuelPredictorError),

    /// A simulator call failed as a whole
    #[error("simulator error: {0}")]
    Simulator(#[source] ActorFactoryError),

    /// Invalid configuration
    #[error(transparent)]
    Config(ContractError),
}

impl TrafficError {
    pub fn connection(host: impl Into<String>, port: u16, source: &ActorFactoryError) -> Self {
        Self::Connection {
            host: host.into(),
            port,
            message: source.to_string(),
        }
    }
}

impl From<ActorFactoryError> for TrafficError {
    fn from(err: ActorFactoryError) -> Self {
        match err {
            ActorFactoryError::Contract(ContractError::NoBlueprints { filter, generation }) => {
                Self::NoBlueprintsAvailable { filter, generation }
            }
            ActorFactoryError::Contract(other) => Self::Config(other),
            other => Self::Simulator(other),
        }
    }
}

impl From<ContractError> for TrafficError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::NoBlueprints { filter, generation } => {
                Self::NoBlueprintsAvailable { filter, generation }
            }
            other => Self::Config(other),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, TrafficError>;
