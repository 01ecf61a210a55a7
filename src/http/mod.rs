//! HTTP transport module
//!
//! Provides the GET transport with retry and the header-driven rate limiter.
//!
//! # Features
//!
//! - **Automatic Retries**: Bounded retry on 429/5xx and connection failures
//! - **Exponential Backoff**: `factor * 2^attempt`, capped
//! - **Rate Limiting**: Waits driven by `X-RateLimit-*` and `Retry-After`
//! - **Cancellation**: Every wait can be interrupted by a shared token

mod client;
mod rate_limit;

pub use client::{HttpRequest, RetryTransport, TransportConfig, TransportConfigBuilder};
pub use rate_limit::{
    RateLimitSignal, RateLimiter, RateLimiterConfig, ThrottleOutcome, HEADER_REMAINING,
    HEADER_RESET, HEADER_RETRY_AFTER,
};
