//! Seatbelt inference
//!
//! The decision for short uptimes draws fresh random thresholds on every
//! call, so identical inputs may give different answers. Pass a seeded RNG
//! (or use `SeatbeltPolicy::seeded`) to make a run reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Below this stopped duration the belt is always reported off
pub const MIN_STOPPED_SECS: f64 = 10.0;

/// Above this uptime the belt is always reported on
pub const ALWAYS_FASTENED_UPTIME_SECS: f64 = 30.0;

/// Infer whether the seatbelt is fastened.
///
/// - `stopped_for < 10` → false
/// - `uptime > 30` → true
/// - otherwise true if `uptime` exceeds a draw from [10, 30] or `stopped_for`
///   exceeds an independent draw from [0, 10]
pub fn is_seatbelt<R: Rng + ?Sized>(uptime_secs: f64, stopped_for_secs: f64, rng: &mut R) -> bool {
    if stopped_for_secs < MIN_STOPPED_SECS {
        return false;
    }
    if uptime_secs > ALWAYS_FASTENED_UPTIME_SECS {
        return true;
    }

    let uptime_threshold: u32 = rng.random_range(10..=30);
    let stopped_threshold: u32 = rng.random_range(0..=10);

    uptime_secs > f64::from(uptime_threshold) || stopped_for_secs > f64::from(stopped_threshold)
}

/// Seatbelt inference bound to its own random source
#[derive(Debug, Clone)]
pub struct SeatbeltPolicy {
    rng: StdRng,
}

impl SeatbeltPolicy {
    /// Reproducible policy
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// OS-seeded policy
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn infer(&mut self, uptime_secs: f64, stopped_for_secs: f64) -> bool {
        is_seatbelt(uptime_secs, stopped_for_secs, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_stop_is_never_fastened() {
        let mut rng = StdRng::seed_from_u64(1);
        for uptime in [0.0, 15.0, 31.0, 1000.0] {
            for stopped in [0.0, 5.0, 9.99] {
                assert!(!is_seatbelt(uptime, stopped, &mut rng));
            }
        }
    }

    #[test]
    fn test_long_uptime_is_always_fastened() {
        let mut rng = StdRng::seed_from_u64(2);
        for uptime in [30.5, 60.0, 1e6] {
            for stopped in [10.0, 20.0, 500.0] {
                assert!(is_seatbelt(uptime, stopped, &mut rng));
            }
        }
    }

    #[test]
    fn test_stopped_beyond_range_is_fastened() {
        // stopped_for > 10 beats every possible stopped threshold
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert!(is_seatbelt(0.0, 10.5, &mut rng));
        }
    }

    #[test]
    fn test_seeded_policy_is_reproducible() {
        let mut a = SeatbeltPolicy::seeded(99);
        let mut b = SeatbeltPolicy::seeded(99);
        for step in 0..50 {
            let uptime = 10.0 + (step % 20) as f64;
            assert_eq!(a.infer(uptime, 10.0), b.infer(uptime, 10.0));
        }
    }
}
