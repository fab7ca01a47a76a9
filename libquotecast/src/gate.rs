//! Safety gate: may a publish attempt start now?
//!
//! The check is pure apart from the day-rollover reset. Counters and
//! timestamps only move after a confirmed publish, never on a gate check.

use chrono::{NaiveDateTime, Timelike};
use tracing::info;

use crate::policy::{to_chrono, PostingPolicy};
use crate::state::{SchedulerState, SharedState};

/// Outcome of a gate check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Permit,
    CoolingDown { until: NaiveDateTime },
    DailyLimitReached { count: u32, limit: u32 },
    IntervalNotElapsed { remaining: chrono::Duration },
    OutsideWindow { hour: u32 },
}

impl GateDecision {
    pub fn is_permit(&self) -> bool {
        matches!(self, GateDecision::Permit)
    }
}

impl std::fmt::Display for GateDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateDecision::Permit => write!(f, "permitted"),
            GateDecision::CoolingDown { until } => write!(f, "cooling down until {}", until),
            GateDecision::DailyLimitReached { count, limit } => {
                write!(f, "daily post limit reached ({}/{})", count, limit)
            }
            GateDecision::IntervalNotElapsed { remaining } => write!(
                f,
                "minimum post interval not reached ({} min remaining)",
                remaining.num_minutes()
            ),
            GateDecision::OutsideWindow { hour } => {
                write!(f, "outside of safe posting windows (hour {})", hour)
            }
        }
    }
}

/// Evaluate every gate rule in order and return the first refusal
pub fn check(
    state: &mut SchedulerState,
    policy: &PostingPolicy,
    now: NaiveDateTime,
) -> GateDecision {
    if state.roll_over(now) {
        info!("New day {}, daily post count reset", state.last_reset_day);
    }

    if let Some(until) = state.cooldown_until {
        if now < until {
            return GateDecision::CoolingDown { until };
        }
    }

    if state.daily_post_count >= policy.max_daily_posts {
        return GateDecision::DailyLimitReached {
            count: state.daily_post_count,
            limit: policy.max_daily_posts,
        };
    }

    if let Some(last) = state.last_post_time {
        let elapsed = now - last;
        let min_interval = to_chrono(policy.min_post_interval);
        if elapsed < min_interval {
            return GateDecision::IntervalNotElapsed {
                remaining: min_interval - elapsed,
            };
        }
    }

    let hour = now.hour();
    if !policy.in_window(hour) {
        return GateDecision::OutsideWindow { hour };
    }

    GateDecision::Permit
}

/// `true` if a publish attempt may start at `now`
pub fn can_post_now(
    state: &mut SchedulerState,
    policy: &PostingPolicy,
    now: NaiveDateTime,
) -> bool {
    let decision = check(state, policy, now);
    if !decision.is_permit() {
        info!("Cannot post now: {}", decision);
    }
    decision.is_permit()
}

/// Gate check through the shared handle, as one critical section
pub fn check_shared(
    state: &SharedState,
    policy: &PostingPolicy,
    now: NaiveDateTime,
) -> GateDecision {
    let mut guard = state.lock();
    check(&mut guard, policy, now)
}
