//! Spawn planning
//!
//! Turns resolved blueprints, spawn points and navigation samples into batch
//! commands. All random choices go through the caller's RNG so a seeded run
//! reproduces the same population.

use actor_factory::CarlaClient;
use contracts::{BlueprintInfo, Location, SpawnCommand, Transform};
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

/// Role of the first vehicle when a hero is requested
pub const HERO_ROLE: &str = "hero";

/// Role of every other vehicle
pub const AUTOPILOT_ROLE: &str = "autopilot";

/// Seeded RNG, or OS-seeded without an explicit seed
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Pedestrian seed: explicit, or drawn from the vehicle RNG
pub fn pedestrian_seed(seed: Option<u64>, vehicle_rng: &mut StdRng) -> u64 {
    seed.unwrap_or_else(|| vehicle_rng.random())
}

/// Pick the spawn points vehicles are placed at.
///
/// More points than vehicles: shuffle, then keep the first `count`.
/// Fewer: keep all of them in map order and spawn fewer vehicles.
pub fn plan_spawn_points<R: Rng + ?Sized>(
    mut points: Vec<Transform>,
    count: usize,
    rng: &mut R,
) -> Vec<Transform> {
    if points.len() > count {
        points.shuffle(rng);
        points.truncate(count);
    } else if points.len() < count {
        warn!(
            requested = count,
            available = points.len(),
            "requested {} vehicles, but could only find {} spawn points",
            count,
            points.len()
        );
    }
    points
}

/// One spawn command per planned point
pub fn vehicle_commands<R: Rng + ?Sized>(
    blueprints: &[BlueprintInfo],
    points: &[Transform],
    hero: bool,
    tm_port: u16,
    rng: &mut R,
) -> Vec<SpawnCommand> {
    points
        .iter()
        .enumerate()
        .filter_map(|(n, point)| {
            let blueprint = blueprints.choose(rng)?;
            let mut command = SpawnCommand::new(&blueprint.id, *point);

            for key in ["color", "driver_id"] {
                let value = blueprint
                    .attribute(key)
                    .and_then(|attr| attr.recommended_values.choose(rng));
                if let Some(value) = value {
                    command = command.with_attribute(key, value.as_str());
                }
            }

            let role = if hero && n == 0 { HERO_ROLE } else { AUTOPILOT_ROLE };
            Some(
                command
                    .with_attribute("role_name", role)
                    .with_autopilot(tm_port),
            )
        })
        .collect()
}

/// Walk speed is recommended value 1, run speed recommended value 2
fn pedestrian_speed<R: Rng + ?Sized>(
    blueprint: &BlueprintInfo,
    running_fraction: f64,
    rng: &mut R,
) -> f64 {
    let running = rng.random::<f64>() <= running_fraction;
    let index = if running { 2 } else { 1 };
    let speed = blueprint
        .attribute("speed")
        .and_then(|attr| attr.recommended_values.get(index))
        .and_then(|value| value.parse::<f64>().ok());

    match speed {
        Some(speed) => speed,
        None => {
            warn!(blueprint = %blueprint.id, "walker has no speed");
            0.0
        }
    }
}

/// Pedestrian spawn commands paired with the max speed each one will walk at
pub fn pedestrian_spawns<R: Rng + ?Sized>(
    blueprints: &[BlueprintInfo],
    locations: &[Location],
    running_fraction: f64,
    rng: &mut R,
) -> Vec<(SpawnCommand, f64)> {
    locations
        .iter()
        .filter_map(|location| {
            let blueprint = blueprints.choose(rng)?;
            let mut command = SpawnCommand::new(&blueprint.id, Transform::at(*location));
            if blueprint.has_attribute("is_invincible") {
                command = command.with_attribute("is_invincible", "false");
            }
            let speed = pedestrian_speed(blueprint, running_fraction, rng);
            Some((command, speed))
        })
        .collect()
}

/// Draw up to `count` navigable locations, skipping invalid or failed samples
pub async fn sample_navigation_locations<C: CarlaClient>(client: &C, count: usize) -> Vec<Location> {
    let mut locations = Vec::with_capacity(count);
    for _ in 0..count {
        match client.random_navigation_location().await {
            Ok(Some(location)) => locations.push(location),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "navigation sample failed, skipping"),
        }
    }
    if locations.len() < count {
        debug!(
            requested = count,
            sampled = locations.len(),
            "some navigation samples were invalid"
        );
    }
    locations
}

#[cfg(test)]
mod tests {
    use super::*;
    use actor_factory::default_catalog;
    use contracts::BlueprintAttribute;

    fn points(n: usize) -> Vec<Transform> {
        (0..n)
            .map(|i| {
                Transform::at(Location {
                    x: i as f64,
                    y: 0.0,
                    z: 0.0,
                })
            })
            .collect()
    }

    fn cars() -> Vec<BlueprintInfo> {
        default_catalog()
            .into_iter()
            .filter(|bp| bp.base_type() == Some("car"))
            .collect()
    }

    #[test]
    fn test_fewer_points_keep_map_order() {
        let mut rng = StdRng::seed_from_u64(3);
        let planned = plan_spawn_points(points(3), 5, &mut rng);
        assert_eq!(planned, points(3));
    }

    #[test]
    fn test_more_points_are_shuffled_and_truncated() {
        let mut rng = StdRng::seed_from_u64(3);
        let planned = plan_spawn_points(points(50), 4, &mut rng);
        assert_eq!(planned.len(), 4);
        assert_ne!(planned, points(4));

        let mut again = StdRng::seed_from_u64(3);
        assert_eq!(plan_spawn_points(points(50), 4, &mut again), planned);
    }

    #[test]
    fn test_vehicle_commands_roles_and_autopilot() {
        let mut rng = StdRng::seed_from_u64(11);
        let commands = vehicle_commands(&cars(), &points(3), true, 8000, &mut rng);

        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].attribute("role_name"), Some(HERO_ROLE));
        assert!(commands[1..]
            .iter()
            .all(|c| c.attribute("role_name") == Some(AUTOPILOT_ROLE)));
        assert!(commands.iter().all(|c| c.autopilot_port == Some(8000)));
        assert!(commands.iter().all(|c| c.attribute("color").is_some()));
    }

    #[test]
    fn test_vehicle_commands_without_blueprints() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(vehicle_commands(&[], &points(3), false, 8000, &mut rng).is_empty());
    }

    #[test]
    fn test_pedestrian_speeds() {
        let walker = BlueprintInfo::new("walker.pedestrian.0001")
            .with_attribute("is_invincible", BlueprintAttribute::new("true"))
            .with_attribute(
                "speed",
                BlueprintAttribute::with_recommended("0.0", ["0.0", "1.26", "2.5"]),
            );
        let locations = vec![Location::default(); 4];

        let mut rng = StdRng::seed_from_u64(5);
        let walking = pedestrian_spawns(std::slice::from_ref(&walker), &locations, 0.0, &mut rng);
        assert!(walking.iter().all(|(_, speed)| *speed == 1.26));
        assert!(walking
            .iter()
            .all(|(c, _)| c.attribute("is_invincible") == Some("false")));

        let running = pedestrian_spawns(&[walker], &locations, 1.0, &mut rng);
        assert!(running.iter().all(|(_, speed)| *speed == 2.5));
    }

    #[test]
    fn test_pedestrian_without_speed_attribute() {
        let walker = BlueprintInfo::new("walker.pedestrian.0049");
        let mut rng = StdRng::seed_from_u64(5);
        let spawns = pedestrian_spawns(&[walker], &[Location::default()], 0.0, &mut rng);
        assert_eq!(spawns.len(), 1);
        assert_eq!(spawns[0].1, 0.0);
    }

    #[test]
    fn test_pedestrian_seed_prefers_explicit() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pedestrian_seed(Some(42), &mut rng), 42);

        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        assert_eq!(pedestrian_seed(None, &mut a), pedestrian_seed(None, &mut b));
    }

    #[tokio::test]
    async fn test_failed_navigation_samples_are_skipped() {
        use actor_factory::{MockCarlaClient, MockConfig};
        use std::time::Duration;

        let mut client = MockCarlaClient::with_config(MockConfig {
            fail_navigation_calls: vec![2],
            navigation_samples: Some(3),
            ..Default::default()
        });
        client.connect("localhost", 2000, Duration::from_secs(1)).await.unwrap();

        // call 2 errors, call 4 is past the valid-sample limit
        let locations = sample_navigation_locations(&client, 4).await;
        assert_eq!(locations.len(), 2);
    }
}
