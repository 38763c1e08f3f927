//! Errors shared across crate boundaries.
//!
//! Only failures that more than one crate has to name live here. Each crate
//! keeps its own error enum and wraps `ContractError` where needed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContractError {
    /// TOML/JSON could not be decoded into a `TrafficConfig`
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A decoded value is out of range
    #[error("invalid value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Filter and generation left an empty blueprint list
    #[error("no blueprints available for filter '{filter}' (generation {generation})")]
    NoBlueprints { filter: String, generation: String },

    #[error("fuel model unavailable at '{path}': {message}")]
    ModelUnavailable { path: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn model_unavailable(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_field() {
        let err = ContractError::config_validation("pedestrians.running_fraction", "must be in [0, 1]");
        assert_eq!(
            err.to_string(),
            "invalid value for 'pedestrians.running_fraction': must be in [0, 1]"
        );
    }
}
