//! Process-wide scheduler state
//!
//! A single [`SchedulerState`] lives for the lifetime of the process, held
//! in memory only. It is reached exclusively through a [`SharedState`]
//! handle; the safety gate and the publish pipeline are its only writers,
//! and the run guard keeps them from ever running concurrently.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{NaiveDate, NaiveDateTime};

use crate::policy::{to_chrono, PostingPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerState {
    /// Successful posts since `last_reset_day` began
    pub daily_post_count: u32,
    /// Local calendar day the counter was last reset
    pub last_reset_day: NaiveDate,
    /// Most recent successful publish
    pub last_post_time: Option<NaiveDateTime>,
    /// Publishing is refused until this instant
    pub cooldown_until: Option<NaiveDateTime>,
}

impl SchedulerState {
    /// Fresh state for a process starting at `now`
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            daily_post_count: 0,
            last_reset_day: now.date(),
            last_post_time: None,
            cooldown_until: None,
        }
    }

    /// Reset the daily counter if `now` falls on a later day
    ///
    /// Returns `true` when a reset happened.
    pub fn roll_over(&mut self, now: NaiveDateTime) -> bool {
        if now.date() != self.last_reset_day {
            self.daily_post_count = 0;
            self.last_reset_day = now.date();
            true
        } else {
            false
        }
    }

    /// Whether a cooldown is active at `now`
    pub fn cooling_down(&self, now: NaiveDateTime) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    /// Record a confirmed successful publish
    pub fn record_success(&mut self, now: NaiveDateTime) {
        self.daily_post_count = self.daily_post_count.saturating_add(1);
        self.last_post_time = Some(now);
    }

    /// Escalate after an abuse signal: no posts until `now + cooldown`
    ///
    /// Also pins the daily counter at its limit so the gate refuses even if
    /// the cooldown is cleared by hand.
    pub fn apply_cooldown(&mut self, policy: &PostingPolicy, now: NaiveDateTime) -> NaiveDateTime {
        let until = now + to_chrono(policy.cooldown);
        self.cooldown_until = Some(until);
        self.daily_post_count = policy.max_daily_posts;
        until
    }
}

/// Cloneable handle to the single scheduler state
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<Mutex<SchedulerState>>,
}

impl SharedState {
    pub fn new(state: SchedulerState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Enter the critical section
    ///
    /// The state is plain data, so a poisoned lock is still usable. Never
    /// hold the guard across an `.await`.
    pub fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SchedulerState {
        self.lock().clone()
    }
}
