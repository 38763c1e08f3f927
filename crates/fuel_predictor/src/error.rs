//! Fuel predictor error types

use contracts::ContractError;
use thiserror::Error;

/// Fuel predictor specific error
#[derive(Debug, Error)]
pub enum FuelPredictorError {
    /// Artifact missing, unreadable or not matching the expected layout
    #[error("fuel model unavailable at '{path}': {message}")]
    ModelUnavailable { path: String, message: String },
}

impl FuelPredictorError {
    pub fn unavailable(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<FuelPredictorError> for ContractError {
    fn from(err: FuelPredictorError) -> Self {
        match err {
            FuelPredictorError::ModelUnavailable { path, message } => {
                ContractError::model_unavailable(path, message)
            }
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, FuelPredictorError>;
