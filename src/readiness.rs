//! # Readiness Gate
//!
//! Turns the variable startup latency of a freshly started instance into a
//! bounded pass/fail. A probe is retried under exponential backoff (fixed base
//! interval, fixed multiplier, capped interval) until it succeeds or the next
//! sleep would push the total wait past the budget.
//!
//! On timeout the error carries the last probe's own failure rather than a
//! generic timeout, so a refused connection and a bad password stay
//! distinguishable in test output.
//!
//! The caller does not proceed until the gate resolves. There is no external
//! cancellation beyond the elapsed-time ceiling.
//!
//! ```rust
//! use datastore_testfixtures::readiness::{wait_ready, BackoffPolicy};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let policy = BackoffPolicy::new(Duration::from_millis(10), 1.5, Duration::from_secs(1));
//! let mut remaining_failures: u32 = 2;
//!
//! wait_ready(&policy, || {
//!     let ready = remaining_failures == 0;
//!     remaining_failures = remaining_failures.saturating_sub(1);
//!     async move {
//!         if ready {
//!             Ok(())
//!         } else {
//!             Err(datastore_testfixtures::ConnectionError::ping("postgres://localhost:5432", "refused"))
//!         }
//!     }
//! })
//! .await
//! .unwrap();
//! # });
//! ```

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, trace, warn};

use crate::config::ReadinessConfig;
use crate::error::{ConnectionError, FixtureError, FixtureResult};

/// Smallest interval or probe limit a policy accepts
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Exponential backoff bounded by a maximum elapsed time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
    pub max_elapsed: Duration,
    /// Upper bound for a single probe, further limited by the remaining budget
    pub probe_timeout: Duration,
}

impl BackoffPolicy {
    /// Intervals never shrink: a multiplier below 1.0 (or not finite) becomes
    /// 1.0 and a zero initial interval becomes [`MIN_INTERVAL`].
    pub fn new(initial_interval: Duration, multiplier: f64, max_elapsed: Duration) -> Self {
        let multiplier = if multiplier.is_finite() && multiplier >= 1.0 {
            multiplier
        } else {
            1.0
        };
        Self {
            initial_interval: initial_interval.max(MIN_INTERVAL),
            multiplier,
            max_interval: Duration::MAX,
            max_elapsed,
            probe_timeout: Duration::MAX,
        }
    }

    /// Cap each interval; a cap below the initial interval is raised to it
    pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval.max(self.initial_interval);
        self
    }

    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout.max(MIN_INTERVAL);
        self
    }

    /// Interval following `current`
    pub fn next_interval(&self, current: Duration) -> Duration {
        // float-to-int casts saturate, so an overflowing product lands on the cap
        let scaled = (current.as_nanos() as f64 * self.multiplier).round();
        Duration::from_nanos(scaled as u64).min(self.max_interval)
    }

    /// Time allowed for a probe started `elapsed` into the wait
    fn attempt_limit(&self, elapsed: Duration, interval: Duration) -> Duration {
        self.max_elapsed
            .saturating_sub(elapsed)
            .saturating_add(interval)
            .min(self.probe_timeout)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&ReadinessConfig::default())
    }
}

impl From<&ReadinessConfig> for BackoffPolicy {
    fn from(config: &ReadinessConfig) -> Self {
        Self::new(
            config.initial_interval(),
            config.multiplier,
            config.max_elapsed(),
        )
        .with_max_interval(config.max_interval())
        .with_probe_timeout(config.probe_timeout())
    }
}

/// Probe until success or until the budget in `policy` is spent
///
/// Returns [`FixtureError::ReadinessTimeout`] holding the last probe error.
/// Each probe is cut off once it would run past `max_elapsed` plus the current
/// interval, so the gate never returns later than that. A probe cut off this
/// way fails with [`ConnectionError::TimedOut`].
pub async fn wait_ready<F, Fut>(policy: &BackoffPolicy, mut probe: F) -> FixtureResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), ConnectionError>>,
{
    let started = Instant::now();
    let mut interval = policy.initial_interval;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let limit = policy.attempt_limit(started.elapsed(), interval);
        let outcome = match timeout(limit, probe()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ConnectionError::TimedOut { after: limit }),
        };
        let last_error = match outcome {
            Ok(()) => {
                debug!(
                    attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Readiness probe succeeded"
                );
                return Ok(());
            }
            Err(error) => error,
        };

        let elapsed = started.elapsed();
        if elapsed.saturating_add(interval) > policy.max_elapsed {
            warn!(
                attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %last_error,
                "Readiness budget exhausted"
            );
            return Err(FixtureError::ReadinessTimeout {
                attempts,
                elapsed,
                last_error,
            });
        }

        trace!(
            attempt = attempts,
            retry_in_ms = interval.as_millis() as u64,
            error = %last_error,
            "Readiness probe failed, backing off"
        );
        sleep(interval).await;
        interval = policy.next_interval(interval);
    }
}
