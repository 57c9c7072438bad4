//! Inter-track delay computation

use crate::config::RunConfig;
use muse_common::time::seconds_to_duration;
use rand::Rng;
use std::time::Duration;

/// Delay before jitter: halved ahead of short tracks
pub fn base_delay_seconds(config: &RunConfig, track_seconds: Option<f64>) -> f64 {
    match track_seconds {
        Some(secs) if secs < config.short_track_seconds => config.delay_seconds / 2.0,
        _ => config.delay_seconds,
    }
}

/// Delay before the upcoming track, jittered with `rng`
///
/// Jitter is uniform in ±`delay_jitter_seconds`, clamped to the base so the
/// result never goes below zero.
pub fn compute_delay<R: Rng + ?Sized>(
    config: &RunConfig,
    track_seconds: Option<f64>,
    rng: &mut R,
) -> Duration {
    let base = base_delay_seconds(config, track_seconds);
    let spread = config.delay_jitter_seconds.min(base);
    let jitter = if spread > 0.0 {
        rng.gen_range(-spread..=spread)
    } else {
        0.0
    };
    seconds_to_duration(base + jitter)
}

/// What is left of `delay` once synchronous preparation took `spent`
pub fn remaining_after_prep(delay: Duration, spent: Duration) -> Duration {
    delay.saturating_sub(spent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_short_tracks_halve_the_base() {
        let config = RunConfig::default();
        assert_eq!(base_delay_seconds(&config, Some(30.0)), 2.5);
        assert_eq!(base_delay_seconds(&config, Some(240.0)), 5.0);
        assert_eq!(base_delay_seconds(&config, None), 5.0);
    }

    #[test]
    fn test_delay_stays_within_jitter_bounds() {
        let config = RunConfig::default();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..500 {
            let d = compute_delay(&config, Some(200.0), &mut rng).as_secs_f64();
            assert!((3.5..=6.5).contains(&d), "delay {} out of bounds", d);
        }
    }

    #[test]
    fn test_delay_is_never_negative() {
        let config = RunConfig {
            delay_seconds: 0.4,
            delay_jitter_seconds: 10.0,
            ..RunConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..500 {
            let d = compute_delay(&config, Some(10.0), &mut rng);
            assert!(d <= Duration::from_millis(400));
        }
    }

    #[test]
    fn test_zero_delay_has_no_jitter() {
        let config = RunConfig {
            delay_seconds: 0.0,
            ..RunConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(compute_delay(&config, None, &mut rng), Duration::ZERO);
    }

    #[test]
    fn test_prep_time_is_subtracted_with_floor() {
        let delay = Duration::from_secs(5);
        assert_eq!(
            remaining_after_prep(delay, Duration::from_secs(2)),
            Duration::from_secs(3)
        );
        assert_eq!(
            remaining_after_prep(delay, Duration::from_secs(9)),
            Duration::ZERO
        );
    }
}
