//! Wall-clock and delay capabilities
//!
//! The pipeline's randomized pauses are part of its anti-detection behavior,
//! so they flow through [`Delay`] rather than calling `tokio::time::sleep`
//! directly. Tests substitute [`NoDelay`] or [`RecordingDelay`] and a
//! [`FixedClock`] without changing the production jitter contract.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};

/// Source of local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The system's local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that reports a settable instant
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Suspension capability used for every pause in a run
#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production delay backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Returns immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Delay for NoDelay {
    async fn sleep(&self, _duration: Duration) {}
}

/// Returns immediately and remembers every requested duration
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    requested: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// All durations requested so far, in order
    pub fn requested(&self) -> Vec<Duration> {
        self.requested
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn sleep(&self, duration: Duration) {
        self.requested
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_fixed_clock_advance() {
        let clock = FixedClock::new(at(9, 0));
        clock.advance(chrono::Duration::minutes(16));
        assert_eq!(clock.now(), at(9, 16));

        clock.set(at(14, 0));
        assert_eq!(clock.now(), at(14, 0));
    }

    #[tokio::test]
    async fn test_recording_delay_records_in_order() {
        let delay = RecordingDelay::new();
        delay.sleep(Duration::from_secs(30)).await;
        delay.sleep(Duration::from_secs(90)).await;
        assert_eq!(
            delay.requested(),
            vec![Duration::from_secs(30), Duration::from_secs(90)]
        );
    }

    #[tokio::test]
    async fn test_tokio_delay_zero_returns() {
        TokioDelay.sleep(Duration::ZERO).await;
    }
}
