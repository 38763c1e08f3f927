//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ClockMode, TrafficConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    carla: String,
    clock_mode: ClockMode,
    vehicle_count: usize,
    pedestrian_count: usize,
    iterations: u32,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    carla: format!("{}:{}", config.carla.host, config.carla.port),
                    clock_mode: config.world.clock_mode,
                    vehicle_count: config.vehicles.count,
                    pedestrian_count: config.pedestrians.count,
                    iterations: config.sampling.iterations,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &TrafficConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.world.clock_mode == ClockMode::Asynchronous {
        warnings.push(
            "clock_mode is asynchronous - the run waits for ticks and takes no samples".to_string(),
        );
    }

    if config.vehicles.count == 0 {
        warnings.push("vehicles.count is 0 - no telemetry will be sampled".to_string());
    }

    if !config.fuel.model_path.exists() {
        warnings.push(format!(
            "fuel model not found at {} - run will fail to start",
            config.fuel.model_path.display()
        ));
    }

    if config.vehicles.seed.is_none() {
        warnings.push("vehicles.seed is unset - population is not reproducible".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  CARLA: {}", summary.carla);
            println!("  Clock: {:?}", summary.clock_mode);
            println!("  Vehicles: {}", summary.vehicle_count);
            println!("  Pedestrians: {}", summary.pedestrian_count);
            println!("  Iterations: {}", summary.iterations);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
