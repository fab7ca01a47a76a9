//! Posting policy: the immutable limits every publish decision is made against

use std::time::Duration;

use crate::error::ConfigError;
use crate::scheduling::random_between;
use crate::types::PostingWindow;

/// Platform ceiling on the artifact payload (8 MiB)
pub const MAX_ARTIFACT_BYTES: u64 = 8 * 1024 * 1024;

/// Upper bound for any configured duration
const MAX_CONFIGURED_DURATION: Duration = Duration::from_secs(30 * 24 * 3600);

/// A closed range of durations a random delay is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub const fn zero() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Draw a uniformly distributed duration from the range
    pub fn sample(&self) -> Duration {
        random_between(self.min, self.max)
    }
}

/// Randomized human-like pauses inserted by the publish pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDelays {
    /// Before logging in
    pub pre_login: DelayRange,
    /// After login, before touching the artifact
    pub post_login: DelayRange,
    /// Right before the first upload call
    pub pre_upload: DelayRange,
}

impl Default for HumanDelays {
    fn default() -> Self {
        Self {
            pre_login: DelayRange::new(Duration::from_secs(30), Duration::from_secs(60)),
            post_login: DelayRange::new(Duration::from_secs(60), Duration::from_secs(120)),
            pre_upload: DelayRange::new(Duration::from_secs(30), Duration::from_secs(60)),
        }
    }
}

impl HumanDelays {
    pub fn none() -> Self {
        Self {
            pre_login: DelayRange::zero(),
            post_login: DelayRange::zero(),
            pre_upload: DelayRange::zero(),
        }
    }
}

/// Wait between upload attempts.
///
/// Attempt `n` (zero-based) waits `base + n * step` plus up to `jitter`.
/// Validation requires `step >= jitter`, so consecutive ranges never overlap
/// and a later attempt never waits less than an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBackoff {
    pub base: Duration,
    pub jitter: Duration,
    pub step: Duration,
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(120),
            jitter: Duration::from_secs(60),
            step: Duration::from_secs(60),
        }
    }
}

impl RetryBackoff {
    pub fn none() -> Self {
        Self {
            base: Duration::ZERO,
            jitter: Duration::ZERO,
            step: Duration::ZERO,
        }
    }

    /// Lowest possible wait after attempt `attempt`
    pub fn floor(&self, attempt: u32) -> Duration {
        self.base.saturating_add(self.step.saturating_mul(attempt))
    }

    /// Wait to apply after the zero-based attempt `attempt` failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let floor = self.floor(attempt);
        random_between(floor, floor.saturating_add(self.jitter))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingPolicy {
    pub max_daily_posts: u32,
    pub min_post_interval: Duration,
    pub max_post_interval: Duration,
    pub posting_windows: Vec<PostingWindow>,
    pub max_retries: u32,
    pub retry_backoff: RetryBackoff,
    /// How long publishing stays disabled after an abuse signal
    pub cooldown: Duration,
    pub human_delays: HumanDelays,
}

impl Default for PostingPolicy {
    fn default() -> Self {
        Self {
            max_daily_posts: 3,
            min_post_interval: Duration::from_secs(4 * 3600),
            max_post_interval: Duration::from_secs(8 * 3600),
            posting_windows: vec![
                PostingWindow::new(9, 11),
                PostingWindow::new(14, 16),
                PostingWindow::new(19, 21),
            ],
            max_retries: 3,
            retry_backoff: RetryBackoff::default(),
            cooldown: Duration::from_secs(24 * 3600),
            human_delays: HumanDelays::default(),
        }
    }
}

impl PostingPolicy {
    /// Check whether an hour of the day falls inside any posting window
    pub fn in_window(&self, hour: u32) -> bool {
        self.posting_windows.iter().any(|w| w.contains_hour(hour))
    }

    /// Validate the policy constraints
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPolicy` describing the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::InvalidPolicy(msg));

        if self.max_daily_posts == 0 {
            return invalid("max_daily_posts must be greater than 0".to_string());
        }
        if self.max_retries == 0 {
            return invalid("max_retries must be at least 1".to_string());
        }
        if self.min_post_interval >= self.max_post_interval {
            return invalid(format!(
                "min_post_interval ({}) must be less than max_post_interval ({})",
                humantime::format_duration(self.min_post_interval),
                humantime::format_duration(self.max_post_interval)
            ));
        }
        if self.retry_backoff.step < self.retry_backoff.jitter {
            return invalid("retry_backoff.step must be at least retry_backoff.jitter".to_string());
        }

        let delays = [
            ("human_delays.pre_login", self.human_delays.pre_login),
            ("human_delays.post_login", self.human_delays.post_login),
            ("human_delays.pre_upload", self.human_delays.pre_upload),
        ];
        for (name, range) in delays {
            if range.min > range.max {
                return invalid(format!("{} minimum exceeds maximum", name));
            }
        }

        let durations = [
            ("min_post_interval", self.min_post_interval),
            ("max_post_interval", self.max_post_interval),
            ("cooldown", self.cooldown),
            ("retry_backoff.base", self.retry_backoff.base),
            ("human_delays.post_login", self.human_delays.post_login.max),
        ];
        for (name, value) in durations {
            if value > MAX_CONFIGURED_DURATION {
                return invalid(format!("{} must not exceed 30 days", name));
            }
        }

        if self.posting_windows.is_empty() {
            return invalid("at least one posting window is required".to_string());
        }
        for window in &self.posting_windows {
            if window.start >= window.end || window.end > 24 {
                return invalid(format!(
                    "posting window {}-{} must satisfy start < end <= 24",
                    window.start, window.end
                ));
            }
        }
        for pair in self.posting_windows.windows(2) {
            if pair[1].start < pair[0].end {
                return invalid(format!(
                    "posting windows {} and {} overlap or are out of order",
                    pair[0], pair[1]
                ));
            }
        }

        Ok(())
    }
}

/// Convert a validated std duration for wall-clock arithmetic
pub(crate) fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero())
}
