//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use contracts::{ClockMode, TrafficConfig};

/// CARLA Traffic - background traffic and vehicle telemetry for CARLA
#[derive(Parser, Debug)]
#[command(
    name = "carla-traffic",
    author,
    version,
    about = "Populate a CARLA world with background traffic and sample vehicle telemetry",
    long_about = "Spawns autopilot vehicles and AI pedestrians into a running CARLA world,\n\
                  steps the simulation, samples per-vehicle telemetry with oil, tire,\n\
                  seatbelt, RPM and fuel estimates, then destroys everything it created."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CARLA_TRAFFIC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CARLA_TRAFFIC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Spawn traffic, sample telemetry, tear down
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config/traffic.toml",
        env = "CARLA_TRAFFIC_CONFIG"
    )]
    pub config: PathBuf,

    /// Override CARLA server host
    #[arg(long, env = "CARLA_HOST")]
    pub host: Option<String>,

    /// Override CARLA server port
    #[arg(short, long, env = "CARLA_PORT")]
    pub port: Option<u16>,

    /// Number of vehicles
    #[arg(short = 'n', long)]
    pub vehicles: Option<usize>,

    /// Number of pedestrians
    #[arg(short = 'w', long)]
    pub pedestrians: Option<usize>,

    /// Sampling iterations
    #[arg(long)]
    pub iterations: Option<u32>,

    /// Leave the clock to another client
    #[arg(long)]
    pub asynchronous: bool,

    /// Vehicle random seed
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Pedestrian random seed
    #[arg(long)]
    pub pedestrian_seed: Option<u64>,

    /// Override the fuel model path
    #[arg(long, env = "CARLA_TRAFFIC_MODEL")]
    pub model: Option<PathBuf>,

    /// Write samples to this file (.json or .csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Validate configuration and exit without connecting
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CARLA_TRAFFIC_METRICS_PORT")]
    pub metrics_port: u16,
}

impl RunArgs {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut TrafficConfig) {
        if let Some(host) = &self.host {
            config.carla.host = host.clone();
        }
        if let Some(port) = self.port {
            config.carla.port = port;
        }
        if let Some(count) = self.vehicles {
            config.vehicles.count = count;
        }
        if let Some(count) = self.pedestrians {
            config.pedestrians.count = count;
        }
        if let Some(iterations) = self.iterations {
            config.sampling.iterations = iterations;
        }
        if self.asynchronous {
            config.world.clock_mode = ClockMode::Asynchronous;
        }
        if let Some(seed) = self.seed {
            config.vehicles.seed = Some(seed);
        }
        if let Some(seed) = self.pedestrian_seed {
            config.pedestrians.seed = Some(seed);
        }
        if let Some(model) = &self.model {
            config.fuel.model_path = model.clone();
        }
    }
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config/traffic.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/traffic.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
