//! Jitter and duration utilities
//!
//! Randomized timing keeps the posting cadence from looking mechanical.
//! Every value produced here is a bounded random variable; callers and tests
//! must only rely on the bounds.

use std::time::Duration;

use rand::Rng;

use crate::error::ConfigError;
use crate::policy::PostingPolicy;

/// Minutes into a window's first hour a trigger may be placed (exclusive)
pub const TRIGGER_MINUTE_SPREAD: u32 = 30;

/// Advisory wait before the next attempt after a successful post.
///
/// Uniform in `[min_post_interval, max_post_interval]`, inclusive. The safety
/// gate remains the only thing that enforces spacing.
pub fn next_delay(policy: &PostingPolicy) -> Duration {
    random_between(policy.min_post_interval, policy.max_post_interval)
}

/// Random minute offset for a window's daily trigger, in `[0, 30)`
pub fn window_trigger_minute() -> u32 {
    rand::thread_rng().gen_range(0..TRIGGER_MINUTE_SPREAD)
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Uniformly distributed duration between `min` and `max` inclusive
///
/// Sampled at nanosecond resolution, so the result never leaves the
/// bounds. Returns `min` if the range is empty or inverted.
pub fn random_between(min: Duration, max: Duration) -> Duration {
    let min_ns = min.as_nanos();
    let max_ns = max.as_nanos();
    if max_ns <= min_ns {
        return min;
    }
    let random_ns = rand::thread_rng().gen_range(min_ns..=max_ns);
    Duration::new(
        (random_ns / NANOS_PER_SEC) as u64,
        (random_ns % NANOS_PER_SEC) as u32,
    )
}

/// Parse a human-readable duration such as "4h", "30m" or "1h 30m"
///
/// # Errors
///
/// Returns `ConfigError::InvalidDuration` if the string is empty or
/// cannot be parsed.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidDuration {
            value: input.to_string(),
            reason: "duration cannot be empty".to_string(),
        });
    }

    humantime::parse_duration(trimmed).map_err(|e| ConfigError::InvalidDuration {
        value: input.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_delay_within_bounds() {
        let policy = PostingPolicy::default();
        for _ in 0..10_000 {
            let delay = next_delay(&policy);
            assert!(
                delay >= policy.min_post_interval && delay <= policy.max_post_interval,
                "delay out of range: {:?}",
                delay
            );
        }
    }

    #[test]
    fn test_next_delay_is_not_constant() {
        let policy = PostingPolicy::default();
        let first = next_delay(&policy);
        let varied = (0..100).any(|_| next_delay(&policy) != first);
        assert!(varied, "jitter should vary across samples");
    }

    #[test]
    fn test_window_trigger_minute_range() {
        for _ in 0..1_000 {
            assert!(window_trigger_minute() < TRIGGER_MINUTE_SPREAD);
        }
    }

    #[test]
    fn test_next_delay_respects_sub_millisecond_bounds() {
        let policy = PostingPolicy {
            min_post_interval: Duration::from_micros(1500),
            max_post_interval: Duration::from_micros(3000),
            ..Default::default()
        };
        assert!(policy.validate().is_ok());

        for _ in 0..10_000 {
            let delay = next_delay(&policy);
            assert!(
                delay >= policy.min_post_interval && delay <= policy.max_post_interval,
                "delay out of range: {:?}",
                delay
            );
        }
    }

    #[test]
    fn test_random_between_keeps_fractional_seconds() {
        let min = parse_duration("4h 1500us").unwrap();
        let max = parse_duration("4h 3ms").unwrap();
        for _ in 0..1_000 {
            let d = random_between(min, max);
            assert!(d >= min && d <= max, "{:?} outside [{:?}, {:?}]", d, min, max);
        }
    }

    #[test]
    fn test_random_between_degenerate_range() {
        let d = Duration::from_secs(5);
        assert_eq!(random_between(d, d), d);
        assert_eq!(random_between(d, Duration::from_secs(1)), d);
    }

    #[test]
    fn test_parse_duration_hours() {
        assert_eq!(parse_duration("4h").unwrap(), Duration::from_secs(4 * 3600));
    }

    #[test]
    fn test_parse_duration_compound() {
        assert_eq!(parse_duration("1h 30m").unwrap(), Duration::from_secs(5400));
    }

    #[test]
    fn test_parse_duration_empty() {
        let err = parse_duration("  ").unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("soon").is_err());
    }
}
