//! Rate limiting implementation
//!
//! Outgoing requests are throttled with a governor token bucket. When the
//! server still answers `429 Too Many Requests`, a [`RateLimitHandler`]
//! decides whether to wait and retry or to give up.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for rate limiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per second
    pub requests_per_second: u32,
    /// Burst size (max tokens in bucket)
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_size: 10,
        }
    }
}

impl RateLimiterConfig {
    /// Create a new rate limiter config
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }
}

/// Token bucket rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config.
    ///
    /// Zero values are raised to one.
    pub fn new(config: &RateLimiterConfig) -> Self {
        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(per_second).allow_burst(burst);

        Self {
            limiter: Arc::new(Governor::direct(quota)),
        }
    }

    /// Wait until a request can be made
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&RateLimiterConfig::default())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish()
    }
}

// ============================================================================
// 429 handling
// ============================================================================

/// Decision taken after the server rejected a request with HTTP 429
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitAction {
    /// Sleep for the given duration, then send the request again
    Retry(Duration),
    /// Give up and surface `Error::RateLimited`
    Fail,
}

/// Hook invoked whenever the server answers `429 Too Many Requests`
pub trait RateLimitHandler: Send + Sync {
    /// `attempt` is 0-based; `retry_after` is the server's `Retry-After` hint
    fn on_rate_limited(&self, attempt: u32, max_retries: u32, retry_after: Duration)
        -> RateLimitAction;
}

/// Waits for the server's `Retry-After` while retries remain
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryAfter;

impl RateLimitHandler for RetryAfter {
    fn on_rate_limited(
        &self,
        attempt: u32,
        max_retries: u32,
        retry_after: Duration,
    ) -> RateLimitAction {
        if attempt < max_retries {
            RateLimitAction::Retry(retry_after)
        } else {
            RateLimitAction::Fail
        }
    }
}

/// Never retries; every 429 becomes an error
#[derive(Debug, Clone, Copy, Default)]
pub struct FailOnRateLimit;

impl RateLimitHandler for FailOnRateLimit {
    fn on_rate_limited(&self, _: u32, _: u32, _: Duration) -> RateLimitAction {
        RateLimitAction::Fail
    }
}
