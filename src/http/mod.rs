//! HTTP client module
//!
//! Provides the HTTP transport with retry, rate limiting, and backoff.
//!
//! # Features
//!
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **429 Hook**: [`RateLimitHandler`] decides how to react to throttling
//! - **Authentication**: Billomat credential headers from the auth module

mod client;
mod rate_limit;

pub use client::{
    HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig,
    DEFAULT_RETRY_AFTER_SECS,
};
pub use rate_limit::{
    FailOnRateLimit, RateLimitAction, RateLimitHandler, RateLimiter, RateLimiterConfig,
    RetryAfter,
};

#[cfg(test)]
mod tests;
