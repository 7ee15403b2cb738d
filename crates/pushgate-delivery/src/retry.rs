//! Cycle pacing for push workers.
//!
//! The timer a worker waits on belongs to the retry policy, not to the
//! worker: swapping in a different pacing strategy requires no worker
//! changes. Two policies exist: a fixed-period linear one, and a
//! feedback-driven slow-start one that speeds up while cycles succeed and
//! backs off while they fail.

use std::{pin::Pin, time::Duration};

use tokio::time::{Instant, Sleep};

use crate::subscription::RetryPolicyConfig;

/// Policy tag for the fixed-period variant.
pub const LINEAR_RETRY_POLICY: &str = "linear";
/// Policy tag for the feedback-driven variant.
pub const SLOW_START_RETRY_POLICY: &str = "slowstart";

/// First interval of a slow-start policy.
pub const SLOW_START_INITIAL_INTERVAL: Duration = Duration::from_secs(1);
/// Fastest cycle a slow-start policy will reach.
pub const SLOW_START_LOWER_TIME_BOUND: Duration = Duration::from_millis(300);
/// Slowest cycle a slow-start policy will reach.
pub const SLOW_START_UPPER_TIME_BOUND: Duration = Duration::from_secs(24 * 60 * 60);

/// Provides a worker the time events pacing its push cycle.
pub trait RetryPolicy: Send + Sync {
    /// Rearms the timer for the next cycle. Policies may take the outcome
    /// of the cycle that just finished into account; an empty `last_err`
    /// means it succeeded end-to-end.
    fn reset(&mut self, last_err: &str);

    /// The armed timer the worker waits on.
    fn timer(&mut self) -> Pin<&mut Sleep>;
}

/// Unknown policy tag encountered by the factory.
#[derive(Debug, Clone)]
pub struct UnknownRetryPolicy {
    /// The unrecognized tag.
    pub policy_type: String,
}

/// Creates the retry policy a subscription's descriptor names.
///
/// Must be called from within a tokio runtime; the policy arms its timer
/// on construction.
pub fn new_retry_policy(
    cfg: &RetryPolicyConfig,
) -> Result<Box<dyn RetryPolicy>, UnknownRetryPolicy> {
    match cfg.policy_type.as_str() {
        LINEAR_RETRY_POLICY => Ok(Box::new(Linear::new(Duration::from_millis(u64::from(
            cfg.period,
        ))))),
        SLOW_START_RETRY_POLICY => Ok(Box::new(SlowStart::new())),
        other => Err(UnknownRetryPolicy {
            policy_type: other.to_string(),
        }),
    }
}

/// Fixed-period pacing: the timer rearms at the configured period no matter
/// how the cycle went. The first cycle fires immediately.
pub struct Linear {
    period: Duration,
    timer: Pin<Box<Sleep>>,
}

impl Linear {
    /// Creates a linear policy with the given period.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            timer: Box::pin(tokio::time::sleep(Duration::ZERO)),
        }
    }
}

impl RetryPolicy for Linear {
    fn reset(&mut self, _last_err: &str) {
        self.timer.as_mut().reset(Instant::now() + self.period);
    }

    fn timer(&mut self) -> Pin<&mut Sleep> {
        self.timer.as_mut()
    }
}

/// Feedback-driven pacing: halve the interval while cycles keep succeeding,
/// double it while they fail, snap back to the initial interval when a
/// failing subscription recovers.
pub struct SlowStart {
    previous_interval: Duration,
    previous_error: bool,
    timer: Pin<Box<Sleep>>,
}

impl SlowStart {
    /// Creates a slow-start policy armed at the initial interval.
    pub fn new() -> Self {
        Self {
            previous_interval: SLOW_START_INITIAL_INTERVAL,
            previous_error: false,
            timer: Box::pin(tokio::time::sleep(SLOW_START_INITIAL_INTERVAL)),
        }
    }
}

impl Default for SlowStart {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicy for SlowStart {
    fn reset(&mut self, last_err: &str) {
        let (interval, had_error) =
            next_slow_start_interval(self.previous_interval, self.previous_error, last_err);
        self.previous_interval = interval;
        self.previous_error = had_error;
        self.timer.as_mut().reset(Instant::now() + interval);
    }

    fn timer(&mut self) -> Pin<&mut Sleep> {
        self.timer.as_mut()
    }
}

/// Computes the next slow-start interval and error flag.
///
/// - sustained success halves the interval, floored at the lower bound;
/// - any failure doubles it, capped at the upper bound, and raises the flag;
/// - the first success after a failure snaps back to the initial interval
///   and clears the flag.
fn next_slow_start_interval(
    previous_interval: Duration,
    previous_error: bool,
    last_err: &str,
) -> (Duration, bool) {
    if !last_err.is_empty() {
        return (
            std::cmp::min(previous_interval * 2, SLOW_START_UPPER_TIME_BOUND),
            true,
        );
    }

    if previous_error {
        return (SLOW_START_INITIAL_INTERVAL, false);
    }

    (
        std::cmp::max(previous_interval / 2, SLOW_START_LOWER_TIME_BOUND),
        false,
    )
}
