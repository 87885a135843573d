//! # Readiness Gate Timing Tests
//!
//! Runs on paused tokio time so the backoff schedule can be asserted exactly.

use std::time::Duration;

use datastore_testfixtures::error::{ConnectionError, FixtureError};
use datastore_testfixtures::readiness::{wait_ready, BackoffPolicy};
use tokio::time::{sleep, Instant};

const URI: &str = "scheme://127.0.0.1:14330";

fn refused(attempt: u32) -> ConnectionError {
    ConnectionError::ping(URI, format!("connection refused (attempt {attempt})"))
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_before_exceeding_budget() {
    let policy = BackoffPolicy::new(Duration::from_millis(100), 2.0, Duration::from_secs(1));
    let started = Instant::now();
    let mut attempts = 0;

    let error = wait_ready(&policy, || {
        attempts += 1;
        let attempt = attempts;
        async move { Err(refused(attempt)) }
    })
    .await
    .unwrap_err();

    // sleeps of 100 + 200 + 400 ms; the next 800 ms would overshoot
    assert_eq!(started.elapsed(), Duration::from_millis(700));
    assert_eq!(attempts, 4);
    match error {
        FixtureError::ReadinessTimeout {
            attempts,
            last_error,
            ..
        } => {
            assert_eq!(attempts, 4);
            assert_eq!(last_error, refused(4));
        }
        other => panic!("expected readiness timeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_succeeds_after_transient_failures() {
    let policy = BackoffPolicy::new(Duration::from_millis(100), 2.0, Duration::from_secs(5));
    let started = Instant::now();
    let mut attempts = 0;

    wait_ready(&policy, || {
        attempts += 1;
        let attempt = attempts;
        async move {
            if attempt < 3 {
                Err(refused(attempt))
            } else {
                Ok(())
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(attempts, 3);
    assert_eq!(started.elapsed(), Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_interval_cap_bounds_each_sleep() {
    let policy = BackoffPolicy::new(Duration::from_millis(100), 10.0, Duration::from_millis(1_000))
        .with_max_interval(Duration::from_millis(250));
    let started = Instant::now();
    let mut attempts = 0;

    let _ = wait_ready(&policy, || {
        attempts += 1;
        let attempt = attempts;
        async move { Err(refused(attempt)) }
    })
    .await;

    // 100 + 250 + 250 + 250 = 850; another 250 would reach 1100
    assert_eq!(started.elapsed(), Duration::from_millis(850));
    assert_eq!(attempts, 5);
}

#[tokio::test(start_paused = true)]
async fn test_slow_failing_attempt_is_cut_off_at_budget_plus_interval() {
    let policy = BackoffPolicy::new(Duration::from_millis(100), 1.0, Duration::from_secs(1));
    let started = Instant::now();
    let mut attempts = 0;

    let error = wait_ready(&policy, || {
        attempts += 1;
        let attempt = attempts;
        async move {
            sleep(Duration::from_millis(900)).await;
            Err(refused(attempt))
        }
    })
    .await
    .unwrap_err();

    // 900 ms attempt, 100 ms sleep, then a second attempt limited to 100 + 100 ms
    assert_eq!(started.elapsed(), Duration::from_millis(1_100));
    assert!(started.elapsed() <= policy.max_elapsed + policy.initial_interval);
    assert_eq!(attempts, 2);
    assert_eq!(
        error.last_probe_error(),
        Some(&ConnectionError::TimedOut {
            after: Duration::from_millis(100)
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_hung_attempt_times_out() {
    let policy = BackoffPolicy::new(Duration::from_millis(100), 1.0, Duration::from_secs(1));
    let started = Instant::now();

    let error = wait_ready(&policy, || std::future::pending::<Result<(), ConnectionError>>())
        .await
        .unwrap_err();

    assert_eq!(started.elapsed(), Duration::from_millis(1_100));
    match error {
        FixtureError::ReadinessTimeout {
            attempts,
            last_error,
            ..
        } => {
            assert_eq!(attempts, 1);
            assert_eq!(
                last_error,
                ConnectionError::TimedOut {
                    after: Duration::from_millis(1_100)
                }
            );
        }
        other => panic!("expected readiness timeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_attempt_cap_allows_retries_after_hangs() {
    let policy = BackoffPolicy::new(Duration::from_millis(100), 1.0, Duration::from_secs(1))
        .with_probe_timeout(Duration::from_millis(200));
    let started = Instant::now();
    let mut attempts = 0;

    let error = wait_ready(&policy, || {
        attempts += 1;
        std::future::pending::<Result<(), ConnectionError>>()
    })
    .await
    .unwrap_err();

    // attempts end at 200, 500, 800 and 1100 ms with 100 ms sleeps between
    assert_eq!(attempts, 4);
    assert_eq!(started.elapsed(), Duration::from_millis(1_100));
    assert!(matches!(
        error.last_probe_error(),
        Some(ConnectionError::TimedOut { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_late_success_within_limit_counts() {
    let policy = BackoffPolicy::new(Duration::from_millis(100), 1.0, Duration::from_secs(1));
    let started = Instant::now();

    wait_ready(&policy, || async {
        sleep(Duration::from_millis(1_050)).await;
        Ok(())
    })
    .await
    .unwrap();

    assert_eq!(started.elapsed(), Duration::from_millis(1_050));
}

#[tokio::test(start_paused = true)]
async fn test_budget_smaller_than_first_interval_probes_once() {
    let policy = BackoffPolicy::new(Duration::from_secs(1), 1.5, Duration::from_millis(500));
    let mut attempts = 0;

    let error = wait_ready(&policy, || {
        attempts += 1;
        async { Err(refused(1)) }
    })
    .await
    .unwrap_err();

    assert_eq!(attempts, 1);
    assert_eq!(error.last_probe_error(), Some(&refused(1)));
}
