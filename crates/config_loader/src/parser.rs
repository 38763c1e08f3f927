//! Config parsing
//!
//! TOML (primary) and JSON formats.

use contracts::{ContractError, TrafficConfig};

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML config
pub fn parse_toml(content: &str) -> Result<TrafficConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON config
pub fn parse_json(content: &str) -> Result<TrafficConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse according to format
pub fn parse(content: &str, format: ConfigFormat) -> Result<TrafficConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ClockMode;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[world]
clock_mode = "asynchronous"

[pedestrians]
count = 5
running_fraction = 0.25
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.world.clock_mode, ClockMode::Asynchronous);
        assert_eq!(config.pedestrians.count, 5);
        assert_eq!(config.pedestrians.running_fraction, 0.25);
        assert_eq!(config.vehicles.count, 30);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "carla": { "host": "10.0.0.5", "port": 2002 },
            "vehicles": { "count": 4, "hero": true },
            "fuel": { "trip": { "gas_type": "e10", "rain": true } }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.carla.port, 2002);
        assert!(config.vehicles.hero);
        assert!(config.fuel.trip.rain);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
