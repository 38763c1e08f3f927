//! Config validation
//!
//! Rules:
//! - field ranges declared on the contract types (`validator` derive)
//! - generation selectors are "all" or a supported generation number
//! - sampling needs at least one iteration
//! - fuel model path is not empty

use ::validator::{Validate, ValidationErrors, ValidationErrorsKind};
use contracts::{ActorGeneration, ContractError, TrafficConfig};

/// Validate TrafficConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &TrafficConfig) -> Result<(), ContractError> {
    validate_ranges(config)?;
    validate_generation("vehicles.generation", &config.vehicles.generation)?;
    validate_generation("pedestrians.generation", &config.pedestrians.generation)?;
    validate_fuel(config)?;
    Ok(())
}

/// Derived range checks
fn validate_ranges(config: &TrafficConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| {
        let (field, message) = first_error(&errors, String::new())
            .unwrap_or_else(|| ("<root>".to_string(), errors.to_string()));
        ContractError::config_validation(field, message)
    })
}

/// Walk nested validation errors and report the first failing field path
fn first_error(errors: &ValidationErrors, prefix: String) -> Option<(String, String)> {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                if let Some(err) = field_errors.first() {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed '{}' check", err.code));
                    return Some((path, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_error(inner, path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_error(inner, format!("{path}[{idx}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

/// Validate a generation selector
fn validate_generation(field: &str, value: &str) -> Result<(), ContractError> {
    let generation: ActorGeneration = value.parse().map_err(|_| {
        ContractError::config_validation(field, format!("invalid generation '{value}'"))
    })?;

    if !generation.is_supported() {
        return Err(ContractError::config_validation(
            field,
            format!(
                "unsupported generation '{value}', expected 'all' or one of {:?}",
                ActorGeneration::SUPPORTED
            ),
        ));
    }
    Ok(())
}

/// Validate fuel model settings
fn validate_fuel(config: &TrafficConfig) -> Result<(), ContractError> {
    if config.fuel.model_path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "fuel.model_path",
            "model path cannot be empty",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_config() {
        let config = TrafficConfig::default();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_generation() {
        let mut config = TrafficConfig::default();
        config.pedestrians.generation = "3".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("pedestrians.generation"), "got: {err}");
        assert!(err.contains("unsupported generation"), "got: {err}");
    }

    #[test]
    fn test_unparsable_generation() {
        let mut config = TrafficConfig::default();
        config.vehicles.generation = "latest".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("invalid generation"), "got: {err}");
    }

    #[test]
    fn test_zero_iterations() {
        let mut config = TrafficConfig::default();
        config.sampling.iterations = 0;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("sampling.iterations"), "got: {err}");
    }

    #[test]
    fn test_nested_fraction_out_of_range() {
        let mut config = TrafficConfig::default();
        config.pedestrians.crossing_fraction = -0.5;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("pedestrians.crossing_fraction"), "got: {err}");
    }

    #[test]
    fn test_non_positive_tick() {
        let mut config = TrafficConfig::default();
        config.world.fixed_delta_seconds = 0.0;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("fixed_delta_seconds"), "got: {err}");
    }

    #[test]
    fn test_empty_model_path() {
        let mut config = TrafficConfig::default();
        config.fuel.model_path = PathBuf::new();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }
}
