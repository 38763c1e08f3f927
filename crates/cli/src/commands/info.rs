//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::TrafficConfig;
use tracing::info;

use crate::cli::InfoArgs;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let json = config_loader::ConfigLoader::to_json(&config)
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn seed(seed: Option<u64>) -> String {
    seed.map_or_else(|| "random".to_string(), |s| s.to_string())
}

fn print_config_info(config: &TrafficConfig) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               CARLA Traffic Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📍 World");
    println!("   ├─ Version: {:?}", config.version);
    println!(
        "   ├─ CARLA Server: {}:{} (timeout {}s)",
        config.carla.host, config.carla.port, config.carla.timeout_secs
    );
    println!(
        "   ├─ Clock: {:?}, tick {}s",
        config.world.clock_mode, config.world.fixed_delta_seconds
    );
    println!("   ├─ Rendering: {}", if config.world.no_rendering { "off" } else { "on" });
    if config.world.hybrid_physics {
        println!("   └─ Hybrid physics: radius {} m", config.world.hybrid_physics_radius);
    } else {
        println!("   └─ Hybrid physics: off");
    }

    let tm = &config.traffic_manager;
    println!("\n🚦 Traffic Manager");
    println!("   ├─ Port: {}", tm.port);
    println!("   ├─ Leading distance: {} m", tm.distance_to_leading_vehicle);
    println!("   ├─ Respawn dormant: {}", tm.respawn_dormant);
    println!("   └─ Speed difference: {}%", tm.global_speed_difference);

    let v = &config.vehicles;
    println!("\n🚗 Vehicles ({})", v.count);
    println!("   ├─ Filter: {} (generation {})", v.filter, v.generation);
    println!("   ├─ Cars only: {}", v.safe);
    println!("   ├─ Hero: {}, lights: {}", v.hero, v.car_lights_on);
    println!("   └─ Seed: {}", seed(v.seed));

    let p = &config.pedestrians;
    println!("\n🚶 Pedestrians ({})", p.count);
    println!("   ├─ Filter: {} (generation {})", p.filter, p.generation);
    println!(
        "   ├─ Running: {:.0}%, crossing: {:.0}%",
        p.running_fraction * 100.0,
        p.crossing_fraction * 100.0
    );
    println!("   └─ Seed: {}", seed(p.seed));

    let trip = &config.fuel.trip;
    println!("\n⛽ Sampling");
    println!("   ├─ Iterations: {}", config.sampling.iterations);
    println!("   ├─ Fuel model: {}", config.fuel.model_path.display());
    println!(
        "   └─ Trip: {} km at {} km/h, {:?}, AC {}, rain {}, sun {}",
        trip.distance, trip.speed, trip.gas_type, trip.air_conditioning, trip.rain, trip.sun
    );

    println!();
}
