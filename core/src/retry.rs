//! Retry policies.
//!
//! A policy decides two things after a failed attempt: how long to wait, and
//! which endpoint the next attempt targets. Policies never perform I/O; the
//! execution engine owns sending and sleeping.
//!
//! [`RetryPolicyFactory`] is the shareable configuration stored in
//! [`RequestOptions`](crate::RequestOptions). Each call asks it for a fresh
//! [`RetryPolicy`] instance that may keep state across the attempts of that
//! call only.

use std::fmt::Debug;
use std::time::{Duration, Instant};

use log::debug;
use rand::Rng;

use crate::operation::RequestResult;
use crate::{Error, LocationMode, OperationContext, StorageLocation};

/// Everything a policy knows about the attempt that just failed.
#[derive(Debug)]
pub struct RetryContext<'a> {
    current_retry_count: u32,
    last_result: &'a RequestResult,
    last_error: &'a Error,
    next_location: StorageLocation,
    location_mode: LocationMode,
}

impl<'a> RetryContext<'a> {
    /// Create a retry context.
    pub fn new(
        current_retry_count: u32,
        last_result: &'a RequestResult,
        last_error: &'a Error,
        next_location: StorageLocation,
        location_mode: LocationMode,
    ) -> Self {
        Self {
            current_retry_count,
            last_result,
            last_error,
            next_location,
            location_mode,
        }
    }

    /// Number of retries already performed, `0` after the first attempt.
    pub fn current_retry_count(&self) -> u32 {
        self.current_retry_count
    }

    /// Result of the attempt that just failed.
    pub fn last_result(&self) -> &RequestResult {
        self.last_result
    }

    /// Error of the attempt that just failed.
    pub fn last_error(&self) -> &Error {
        self.last_error
    }

    /// Location the selector would use next if the mode is kept.
    pub fn next_location(&self) -> StorageLocation {
        self.next_location
    }

    /// Effective location mode of the call.
    pub fn location_mode(&self) -> LocationMode {
        self.location_mode
    }
}

/// A decision to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryInfo {
    target_location: StorageLocation,
    updated_location_mode: LocationMode,
    retry_interval: Duration,
}

impl RetryInfo {
    /// Create a retry decision.
    pub fn new(
        target_location: StorageLocation,
        updated_location_mode: LocationMode,
        retry_interval: Duration,
    ) -> Self {
        Self {
            target_location,
            updated_location_mode,
            retry_interval,
        }
    }

    /// Retry at the selector's next location, keeping the mode.
    pub fn from_context(ctx: &RetryContext<'_>, retry_interval: Duration) -> Self {
        Self::new(ctx.next_location(), ctx.location_mode(), retry_interval)
    }

    /// Location of the next attempt.
    pub fn target_location(&self) -> StorageLocation {
        self.target_location
    }

    /// Location mode for the rest of the call.
    pub fn updated_location_mode(&self) -> LocationMode {
        self.updated_location_mode
    }

    /// Delay before the next attempt.
    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }
}

/// Per-call retry state machine.
pub trait RetryPolicy: Debug + Send {
    /// Decide whether to retry. `None` stops the call with the last error.
    fn evaluate(&mut self, ctx: &RetryContext<'_>) -> Option<RetryInfo>;

    /// Whether a failure while building the request should be retried.
    ///
    /// Build failures usually mean a malformed operation, so the default is
    /// to surface them immediately.
    fn retry_build_error(&self, _err: &Error) -> bool {
        false
    }
}

/// Shareable retry configuration producing one [`RetryPolicy`] per call.
pub trait RetryPolicyFactory: Debug + Send + Sync + 'static {
    /// Create the policy instance for a new call.
    fn create_instance(&self, op_ctx: &OperationContext) -> Box<dyn RetryPolicy>;
}

/// Never retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn evaluate(&mut self, _: &RetryContext<'_>) -> Option<RetryInfo> {
        None
    }
}

impl RetryPolicyFactory for NoRetry {
    fn create_instance(&self, _: &OperationContext) -> Box<dyn RetryPolicy> {
        Box::new(NoRetry)
    }
}

/// Retry with a fixed delay between attempts.
#[derive(Debug, Clone)]
pub struct LinearRetry {
    delta_backoff: Duration,
    max_attempts: u32,
    tracker: LocationTracker,
}

impl Default for LinearRetry {
    fn default() -> Self {
        Self::new(DEFAULT_CLIENT_BACKOFF, DEFAULT_CLIENT_RETRY_COUNT)
    }
}

impl LinearRetry {
    /// Create a linear policy.
    pub fn new(delta_backoff: Duration, max_attempts: u32) -> Self {
        Self {
            delta_backoff,
            max_attempts,
            tracker: LocationTracker::default(),
        }
    }
}

impl RetryPolicy for LinearRetry {
    fn evaluate(&mut self, ctx: &RetryContext<'_>) -> Option<RetryInfo> {
        let secondary_not_found = self.tracker.observe(ctx);
        if ctx.current_retry_count() >= self.max_attempts
            || !is_retryable(ctx, secondary_not_found)
        {
            return None;
        }

        let interval = self.delta_backoff;
        Some(self.tracker.retry_info(ctx, secondary_not_found, interval))
    }
}

impl RetryPolicyFactory for LinearRetry {
    fn create_instance(&self, _: &OperationContext) -> Box<dyn RetryPolicy> {
        Box::new(Self::new(self.delta_backoff, self.max_attempts))
    }
}

/// Retry with a randomized exponential delay.
///
/// The n-th retry waits `min_backoff + (2^n - 1) * delta_backoff * jitter`,
/// capped at `max_backoff`, where `jitter` is uniform in `[0.8, 1.2]`.
#[derive(Debug, Clone)]
pub struct ExponentialRetry {
    delta_backoff: Duration,
    max_attempts: u32,
    min_backoff: Duration,
    max_backoff: Duration,
    tracker: LocationTracker,
}

/// Default number of retries.
pub const DEFAULT_CLIENT_RETRY_COUNT: u32 = 3;
/// Default delta backoff.
pub const DEFAULT_CLIENT_BACKOFF: Duration = Duration::from_secs(30);
/// Default minimum backoff of [`ExponentialRetry`].
pub const DEFAULT_MIN_BACKOFF: Duration = Duration::from_secs(3);
/// Default maximum backoff of [`ExponentialRetry`].
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(90);

impl Default for ExponentialRetry {
    fn default() -> Self {
        Self {
            delta_backoff: DEFAULT_CLIENT_BACKOFF,
            max_attempts: DEFAULT_CLIENT_RETRY_COUNT,
            min_backoff: DEFAULT_MIN_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            tracker: LocationTracker::default(),
        }
    }
}

impl ExponentialRetry {
    /// Create an exponential policy with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delta backoff.
    pub fn with_delta_backoff(mut self, delta_backoff: Duration) -> Self {
        self.delta_backoff = delta_backoff;
        self
    }

    /// Set the number of retries after the first attempt.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the lower bound of each delay.
    pub fn with_min_backoff(mut self, min_backoff: Duration) -> Self {
        self.min_backoff = min_backoff;
        self
    }

    /// Set the upper bound of each delay.
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    fn backoff(&self, retry_count: u32) -> Duration {
        let jitter = rand::thread_rng().gen_range(0.8..=1.2);
        let factor = 2f64.powi(retry_count.min(30) as i32) - 1.0;
        let increment = self.delta_backoff.as_secs_f64() * jitter * factor;

        let interval = self.min_backoff.as_secs_f64() + increment;
        Duration::from_secs_f64(interval.min(self.max_backoff.as_secs_f64()))
    }
}

impl RetryPolicy for ExponentialRetry {
    fn evaluate(&mut self, ctx: &RetryContext<'_>) -> Option<RetryInfo> {
        let secondary_not_found = self.tracker.observe(ctx);
        if ctx.current_retry_count() >= self.max_attempts
            || !is_retryable(ctx, secondary_not_found)
        {
            return None;
        }

        let interval = self.backoff(ctx.current_retry_count());
        Some(self.tracker.retry_info(ctx, secondary_not_found, interval))
    }
}

impl RetryPolicyFactory for ExponentialRetry {
    fn create_instance(&self, _: &OperationContext) -> Box<dyn RetryPolicy> {
        Box::new(Self {
            tracker: LocationTracker::default(),
            ..self.clone()
        })
    }
}

/// Status classification shared by the built-in policies.
///
/// Network failures, 408 and 5xx other than 501/505 are retried. A 404 from
/// the secondary is retried too: the replica may simply lag behind.
fn is_retryable(ctx: &RetryContext<'_>, secondary_not_found: bool) -> bool {
    if ctx.last_error().is_usage_error() {
        return false;
    }

    let Some(status) = ctx.last_result().status else {
        return true;
    };
    if secondary_not_found {
        return true;
    }

    let code = status.as_u16();
    !(((300..500).contains(&code) && code != 408) || code == 501 || code == 505)
}

/// Remembers when each location was last tried.
#[derive(Debug, Clone, Default)]
struct LocationTracker {
    last_primary_attempt: Option<Instant>,
    last_secondary_attempt: Option<Instant>,
}

impl LocationTracker {
    /// Record the failed attempt, returns whether it was a 404 on secondary.
    fn observe(&mut self, ctx: &RetryContext<'_>) -> bool {
        let result = ctx.last_result();
        let finished_at = result.finished_at.unwrap_or_else(Instant::now);

        match result.target_location {
            StorageLocation::Primary => {
                self.last_primary_attempt = Some(finished_at);
                false
            }
            StorageLocation::Secondary => {
                self.last_secondary_attempt = Some(finished_at);
                result.status == Some(http::StatusCode::NOT_FOUND)
            }
        }
    }

    fn retry_info(
        &self,
        ctx: &RetryContext<'_>,
        secondary_not_found: bool,
        interval: Duration,
    ) -> RetryInfo {
        let (target, mode) =
            if secondary_not_found && ctx.location_mode() != LocationMode::SecondaryOnly {
                (StorageLocation::Primary, LocationMode::PrimaryOnly)
            } else {
                (ctx.next_location(), ctx.location_mode())
            };

        // Time already spent since the last try at the target counts
        // towards the delay.
        let last_attempt = match target {
            StorageLocation::Primary => self.last_primary_attempt,
            StorageLocation::Secondary => self.last_secondary_attempt,
        };
        let interval = remaining_interval(interval, last_attempt, Instant::now());

        debug!(
            "retry {} scheduled against {target} in {interval:?}",
            ctx.current_retry_count() + 1
        );
        RetryInfo::new(target, mode, interval)
    }
}

/// `interval` less the time elapsed at `now` since `last_attempt`.
fn remaining_interval(interval: Duration, last_attempt: Option<Instant>, now: Instant) -> Duration {
    match last_attempt {
        Some(at) => interval.saturating_sub(now.saturating_duration_since(at)),
        None => interval,
    }
}
