//! Daily trigger dispatch
//!
//! One trigger is armed per posting window at `start_hour:MM`, where the
//! minute is picked at random once when the dispatcher is built. The loop
//! wakes at least once a second so a shutdown request is noticed promptly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDateTime};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::coordinator::{RunCoordinator, RunOutcome};
use crate::policy::PostingPolicy;
use crate::scheduling::window_trigger_minute;

const POLL_SLICE: Duration = Duration::from_secs(1);

/// A daily fire time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Trigger {
    pub hour: u32,
    pub minute: u32,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

pub struct Dispatcher {
    triggers: Vec<Trigger>,
}

impl Dispatcher {
    /// Arm one trigger per posting window with a random minute offset
    pub fn from_policy(policy: &PostingPolicy) -> Self {
        let triggers = policy
            .posting_windows
            .iter()
            .map(|w| Trigger {
                hour: w.start,
                minute: window_trigger_minute(),
            })
            .collect();
        Self::with_triggers(triggers)
    }

    pub fn with_triggers(mut triggers: Vec<Trigger>) -> Self {
        triggers.sort();
        Self { triggers }
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// The earliest trigger strictly after `now`, rolling over to tomorrow
    pub fn next_fire_after(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        [0u64, 1]
            .into_iter()
            .filter_map(|offset| now.date().checked_add_days(Days::new(offset)))
            .flat_map(|day| {
                self.triggers
                    .iter()
                    .filter_map(move |t| day.and_hms_opt(t.hour, t.minute, 0))
            })
            .filter(|fire| *fire > now)
            .min()
    }

    /// Fire the coordinator at each trigger until `shutdown` is set
    ///
    /// A run in flight when shutdown is requested is awaited before
    /// returning.
    pub async fn run(
        &self,
        coordinator: Arc<RunCoordinator>,
        clock: Arc<dyn Clock>,
        shutdown: Arc<AtomicBool>,
    ) {
        let armed: Vec<String> = self.triggers.iter().map(|t| t.to_string()).collect();
        info!("Dispatcher armed for {}", armed.join(", "));

        let mut in_flight: Option<JoinHandle<()>> = None;

        while !shutdown.load(Ordering::Relaxed) {
            let Some(fire_at) = self.next_fire_after(clock.now()) else {
                warn!("No triggers armed, dispatcher exiting");
                break;
            };
            info!("Next run at {}", fire_at);

            loop {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                let now = clock.now();
                if now >= fire_at {
                    break;
                }
                let remaining = (fire_at - now).to_std().unwrap_or(Duration::ZERO);
                tokio::time::sleep(remaining.min(POLL_SLICE)).await;
            }
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            if in_flight.as_ref().is_some_and(|h| h.is_finished()) {
                in_flight = None;
            }
            if in_flight.is_some() || coordinator.is_running() {
                warn!("Trigger at {} skipped: previous run still in progress", fire_at);
                continue;
            }

            let decision = coordinator.gate_decision();
            if !decision.is_permit() {
                info!("Trigger at {} skipped: {}", fire_at, decision);
                continue;
            }

            let coordinator = coordinator.clone();
            in_flight = Some(tokio::spawn(async move {
                log_outcome(&coordinator.run_once().await);
            }));
        }

        if let Some(handle) = in_flight {
            info!("Waiting for in-flight run to finish...");
            if let Err(e) = handle.await {
                warn!("Run task ended abnormally: {}", e);
            }
        }
        info!("Dispatcher stopped");
    }
}

pub fn log_outcome(outcome: &RunOutcome) {
    if outcome.cooldown_triggered() {
        warn!("Abuse cooldown active, later triggers will be refused");
    }
    match outcome {
        RunOutcome::Published { confirmation } => {
            info!("Run finished: published {}", confirmation.media_id)
        }
        RunOutcome::Skipped { reason, artifact } => info!(
            "Run finished: skipped ({}), artifact at {}",
            reason,
            artifact.display()
        ),
        RunOutcome::Failed { artifact, error } => match artifact {
            Some(path) => warn!("Run finished: failed ({}), artifact at {}", error, path.display()),
            None => warn!("Run finished: failed ({})", error),
        },
        RunOutcome::AlreadyRunning => warn!("Run refused: already running"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::TRIGGER_MINUTE_SPREAD;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::with_triggers(vec![
            Trigger { hour: 19, minute: 5 },
            Trigger { hour: 9, minute: 12 },
            Trigger { hour: 14, minute: 29 },
        ])
    }

    #[test]
    fn test_triggers_are_sorted() {
        let d = dispatcher();
        let hours: Vec<u32> = d.triggers().iter().map(|t| t.hour).collect();
        assert_eq!(hours, vec![9, 14, 19]);
    }

    #[test]
    fn test_next_fire_same_day() {
        let d = dispatcher();
        assert_eq!(d.next_fire_after(at(10, 6, 0)), Some(at(10, 9, 12)));
        assert_eq!(d.next_fire_after(at(10, 9, 12)), Some(at(10, 14, 29)));
        assert_eq!(d.next_fire_after(at(10, 15, 0)), Some(at(10, 19, 5)));
    }

    #[test]
    fn test_next_fire_rolls_over_midnight() {
        let d = dispatcher();
        assert_eq!(d.next_fire_after(at(10, 19, 5)), Some(at(11, 9, 12)));
        assert_eq!(d.next_fire_after(at(10, 23, 59)), Some(at(11, 9, 12)));
    }

    #[test]
    fn test_next_fire_rolls_over_month_end() {
        let d = dispatcher();
        let last = NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(22, 0, 0)
            .unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(9, 12, 0)
            .unwrap();
        assert_eq!(d.next_fire_after(last), Some(expected));
    }

    #[test]
    fn test_no_triggers() {
        let d = Dispatcher::with_triggers(Vec::new());
        assert_eq!(d.next_fire_after(at(10, 12, 0)), None);
    }

    #[test]
    fn test_from_policy_arms_one_trigger_per_window() {
        let policy = PostingPolicy::default();
        for _ in 0..100 {
            let d = Dispatcher::from_policy(&policy);
            assert_eq!(d.triggers().len(), policy.posting_windows.len());
            for (trigger, window) in d.triggers().iter().zip(&policy.posting_windows) {
                assert_eq!(trigger.hour, window.start);
                assert!(trigger.minute < TRIGGER_MINUTE_SPREAD);
            }
        }
    }

    #[test]
    fn test_trigger_display() {
        assert_eq!(Trigger { hour: 9, minute: 5 }.to_string(), "09:05");
    }
}
