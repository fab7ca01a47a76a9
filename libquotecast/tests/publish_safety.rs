//! Safety properties of the gate and publish pipeline working together
//!
//! These tests verify:
//! - Abuse signals apply the cooldown and pin the daily counter
//! - Login failures short-circuit the upload loop
//! - The artifact size ceiling is inclusive
//! - State only changes after a confirmed publish

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use libquotecast::clock::{FixedClock, NoDelay};
use libquotecast::gate::{check_shared, GateDecision};
use libquotecast::platforms::mock::MockPlatform;
use libquotecast::policy::{HumanDelays, RetryBackoff, MAX_ARTIFACT_BYTES};
use libquotecast::{
    PlatformError, PostingPolicy, PublishError, PublishPipeline, SchedulerState, SharedState,
};
use tempfile::TempDir;

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 15)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn fast_policy() -> PostingPolicy {
    PostingPolicy {
        human_delays: HumanDelays::none(),
        retry_backoff: RetryBackoff::none(),
        ..Default::default()
    }
}

fn write_artifact(dir: &TempDir, bytes: u64) -> PathBuf {
    let path = dir.path().join("quote_post.jpg");
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(bytes).unwrap();
    path
}

struct Harness {
    pipeline: PublishPipeline,
    state: SharedState,
    clock: FixedClock,
    policy: Arc<PostingPolicy>,
}

fn harness(platform: MockPlatform, now: NaiveDateTime) -> Harness {
    let policy = Arc::new(fast_policy());
    let state = SharedState::new(SchedulerState::new(now));
    let clock = FixedClock::new(now);
    let pipeline = PublishPipeline::new(
        Box::new(platform),
        policy.clone(),
        state.clone(),
        Arc::new(NoDelay),
        Arc::new(clock.clone()),
    );
    Harness {
        pipeline,
        state,
        clock,
        policy,
    }
}

#[tokio::test]
async fn test_spam_signal_applies_cooldown() {
    let dir = TempDir::new().unwrap();
    let path = write_artifact(&dir, 1024);
    let mock = MockPlatform::publish_failure("mock", PlatformError::Spam("flagged as spam".into()));
    let h = harness(mock.clone(), at(10, 0));

    let result = h.pipeline.publish(&path, "caption").await;

    match result {
        Err(PublishError::AbuseSuspected { until, .. }) => {
            assert_eq!(until, at(10, 0) + chrono::Duration::hours(24));
        }
        other => panic!("Expected AbuseSuspected, got {:?}", other),
    }
    // Abuse aborts immediately, no further attempts
    assert_eq!(mock.publish_call_count(), 1);

    let snapshot = h.state.snapshot();
    assert_eq!(snapshot.cooldown_until, Some(at(10, 0) + chrono::Duration::hours(24)));
    assert_eq!(snapshot.daily_post_count, h.policy.max_daily_posts);
    assert_eq!(snapshot.last_post_time, None);

    assert!(matches!(
        check_shared(&h.state, &h.policy, at(10, 30)),
        GateDecision::CoolingDown { .. }
    ));
}

#[tokio::test]
async fn test_abuse_during_login_applies_cooldown() {
    let dir = TempDir::new().unwrap();
    let path = write_artifact(&dir, 1024);
    let mock = MockPlatform::login_failure(
        "mock",
        PlatformError::Other("challenge: please wait a few minutes".into()),
    );
    let h = harness(mock.clone(), at(14, 5));

    let result = h.pipeline.publish(&path, "caption").await;

    assert!(matches!(result, Err(PublishError::AbuseSuspected { .. })));
    assert_eq!(mock.publish_call_count(), 0);
    assert!(h.state.snapshot().cooldown_until.is_some());
}

#[tokio::test]
async fn test_session_error_stops_after_one_attempt() {
    let dir = TempDir::new().unwrap();
    let path = write_artifact(&dir, 1024);
    let mock = MockPlatform::publish_failure(
        "mock",
        PlatformError::Other("login_required: session expired".into()),
    );
    let h = harness(mock.clone(), at(9, 30));

    let result = h.pipeline.publish(&path, "caption").await;

    assert!(matches!(result, Err(PublishError::Authentication(_))));
    assert_eq!(mock.publish_call_count(), 1);
    let snapshot = h.state.snapshot();
    assert_eq!(snapshot.daily_post_count, 0);
    assert_eq!(snapshot.cooldown_until, None);
}

#[tokio::test]
async fn test_artifact_exactly_at_limit_is_accepted() {
    let dir = TempDir::new().unwrap();
    let path = write_artifact(&dir, MAX_ARTIFACT_BYTES);
    let mock = MockPlatform::success("mock");
    let h = harness(mock.clone(), at(9, 30));

    h.pipeline.publish(&path, "caption").await.unwrap();

    assert_eq!(mock.image_sizes(), vec![MAX_ARTIFACT_BYTES as usize]);
}

#[tokio::test]
async fn test_oversized_artifact_is_fatal_without_upload() {
    let dir = TempDir::new().unwrap();
    let path = write_artifact(&dir, MAX_ARTIFACT_BYTES + 1);
    let mock = MockPlatform::success("mock");
    let h = harness(mock.clone(), at(9, 30));

    let result = h.pipeline.publish(&path, "caption").await;

    assert!(matches!(
        result,
        Err(PublishError::ArtifactTooLarge { size, limit })
            if size == MAX_ARTIFACT_BYTES + 1 && limit == MAX_ARTIFACT_BYTES
    ));
    assert_eq!(mock.publish_call_count(), 0);
    assert_eq!(h.state.snapshot().daily_post_count, 0);
}

#[tokio::test]
async fn test_missing_artifact_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mock = MockPlatform::success("mock");
    let h = harness(mock.clone(), at(9, 30));

    let result = h
        .pipeline
        .publish(&dir.path().join("nothing.jpg"), "caption")
        .await;

    assert!(matches!(result, Err(PublishError::ArtifactMissing(_))));
    assert_eq!(mock.publish_call_count(), 0);
}

#[tokio::test]
async fn test_exhausted_retries_leave_state_untouched() {
    let dir = TempDir::new().unwrap();
    let path = write_artifact(&dir, 1024);
    let reset = PlatformError::Network("connection reset".into());
    let mock = MockPlatform::publish_failure("mock", reset);
    let h = harness(mock.clone(), at(19, 10));

    let result = h.pipeline.publish(&path, "caption").await;

    match result {
        Err(PublishError::RetriesExhausted { attempts, last }) => {
            assert_eq!(attempts, 3);
            assert_eq!(last, PlatformError::Network("connection reset".into()));
        }
        other => panic!("Expected RetriesExhausted, got {:?}", other),
    }
    assert_eq!(mock.publish_call_count(), 3);
    assert_eq!(h.state.snapshot(), SchedulerState::new(at(19, 10)));
}

#[tokio::test]
async fn test_publish_then_interval_refusal() {
    let dir = TempDir::new().unwrap();
    let path = write_artifact(&dir, 2048);
    let mock = MockPlatform::success("mock");
    let h = harness(mock, at(9, 15));

    assert_eq!(check_shared(&h.state, &h.policy, at(9, 15)), GateDecision::Permit);
    h.pipeline.publish(&path, "first").await.unwrap();

    let snapshot = h.state.snapshot();
    assert_eq!(snapshot.daily_post_count, 1);
    assert_eq!(snapshot.last_post_time, Some(at(9, 15)));

    h.clock.set(at(9, 16));
    assert!(matches!(
        check_shared(&h.state, &h.policy, at(9, 16)),
        GateDecision::IntervalNotElapsed { .. }
    ));

    // Four hours later the window is closed
    assert_eq!(
        check_shared(&h.state, &h.policy, at(13, 15)),
        GateDecision::OutsideWindow { hour: 13 }
    );
    assert_eq!(check_shared(&h.state, &h.policy, at(14, 0)), GateDecision::Permit);
}

#[tokio::test]
async fn test_cooldown_expires_next_day() {
    let dir = TempDir::new().unwrap();
    let path = write_artifact(&dir, 1024);
    let blocked = PlatformError::Blocked("action blocked".into());
    let mock = MockPlatform::publish_failure("mock", blocked);
    let h = harness(mock, at(9, 20));

    let _ = h.pipeline.publish(&path, "caption").await;

    let tomorrow = |h: u32, m: u32| at(h, m) + chrono::Duration::days(1);
    assert!(matches!(
        check_shared(&h.state, &h.policy, tomorrow(9, 19)),
        GateDecision::CoolingDown { .. }
    ));
    // Cooldown over and a new day reset the pinned counter
    assert_eq!(check_shared(&h.state, &h.policy, tomorrow(9, 20)), GateDecision::Permit);
    assert_eq!(h.state.snapshot().daily_post_count, 0);
}

#[test]
fn test_default_backoff_stays_in_documented_range() {
    let backoff = RetryBackoff::default();
    for _ in 0..1000 {
        let first = backoff.delay_for(0);
        assert!(first >= Duration::from_secs(120) && first <= Duration::from_secs(180));
    }
}
