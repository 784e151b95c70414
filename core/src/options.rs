use std::sync::Arc;
use std::time::Duration;

use crate::retry::{ExponentialRetry, RetryPolicyFactory};
use crate::LocationMode;

/// Per-call options.
///
/// Every field is optional. A service client keeps one `RequestOptions` as
/// its defaults, and each call fills the gaps of its own options from them
/// with [`RequestOptions::apply_defaults`] before running.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    retry_policy: Option<Arc<dyn RetryPolicyFactory>>,
    location_mode: Option<LocationMode>,
    timeout: Option<Duration>,
}

impl RequestOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry policy.
    pub fn with_retry_policy(mut self, policy: impl RetryPolicyFactory) -> Self {
        self.retry_policy = Some(Arc::new(policy));
        self
    }

    /// Set the location mode.
    pub fn with_location_mode(mut self, mode: LocationMode) -> Self {
        self.location_mode = Some(mode);
        self
    }

    /// Set the server side timeout of each attempt.
    ///
    /// Sent as the `timeout` query parameter, in whole seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fill every unset field from `defaults`.
    pub fn apply_defaults(&self, defaults: &RequestOptions) -> RequestOptions {
        RequestOptions {
            retry_policy: self
                .retry_policy
                .clone()
                .or_else(|| defaults.retry_policy.clone()),
            location_mode: self.location_mode.or(defaults.location_mode),
            timeout: self.timeout.or(defaults.timeout),
        }
    }

    /// Retry policy factory, [`ExponentialRetry`] when unset.
    pub fn retry_policy(&self) -> Arc<dyn RetryPolicyFactory> {
        self.retry_policy
            .clone()
            .unwrap_or_else(|| Arc::new(ExponentialRetry::default()))
    }

    /// Location mode, [`LocationMode::PrimaryOnly`] when unset.
    pub fn location_mode(&self) -> LocationMode {
        self.location_mode.unwrap_or_default()
    }

    /// Server side timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
