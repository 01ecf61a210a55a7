//! Header-driven rate limiting
//!
//! The server tells us how much quota is left and when it resets. The
//! limiter reads those headers after every exchange and suspends the caller
//! when the quota is nearly gone or the server already refused a request.

use crate::events::{default_sink, CrawlEvent, SharedSink};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Remaining request quota in the current window
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
/// Unix epoch second at which the quota window resets
pub const HEADER_RESET: &str = "x-ratelimit-reset";
/// Seconds to wait before retrying
pub const HEADER_RETRY_AFTER: &str = "retry-after";

/// Configuration for rate limiting
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Throttle pre-emptively when the remaining quota drops below this
    pub low_water_mark: i64,
    /// Wait used when neither a reset time nor Retry-After is available
    pub default_wait: Duration,
    /// Added on top of the reset time to absorb clock skew
    pub reset_buffer: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            low_water_mark: 10,
            default_wait: Duration::from_secs(60),
            reset_buffer: Duration::from_secs(1),
        }
    }
}

impl RateLimiterConfig {
    /// Create a new rate limiter config
    pub fn new(low_water_mark: i64, default_wait: Duration) -> Self {
        Self {
            low_water_mark,
            default_wait,
            ..Self::default()
        }
    }
}

/// Rate limit information carried by one response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitSignal {
    /// `X-RateLimit-Remaining`
    pub remaining: Option<i64>,
    /// `X-RateLimit-Reset`; a value of 0 counts as absent
    pub reset_epoch_seconds: Option<i64>,
    /// `Retry-After`, in seconds
    pub retry_after_seconds: Option<u64>,
}

impl RateLimitSignal {
    /// Read the signal from response headers. Unparseable values count as absent.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            remaining: header_number(headers, HEADER_REMAINING),
            reset_epoch_seconds: header_number::<i64>(headers, HEADER_RESET).filter(|r| *r != 0),
            retry_after_seconds: header_number(headers, HEADER_RETRY_AFTER),
        }
    }

    /// Whether the remaining quota is below `low_water_mark`
    pub fn is_low(&self, low_water_mark: i64) -> bool {
        self.remaining.is_some_and(|r| r < low_water_mark)
    }
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// What a call to [`RateLimiter::throttle`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleOutcome {
    /// Quota was fine, nothing to wait for
    NotRequired,
    /// The caller was suspended for this long
    Waited(Duration),
    /// The wait was interrupted by cancellation
    Cancelled,
}

impl ThrottleOutcome {
    /// Check if the wait was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Suspends the caller based on rate limit headers
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    events: SharedSink,
    cancel: CancellationToken,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            events: default_sink(),
            cancel: CancellationToken::new(),
        }
    }

    /// Report waits to this sink
    #[must_use]
    pub fn with_events(mut self, events: SharedSink) -> Self {
        self.events = events;
        self
    }

    /// Interrupt waits when this token is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// How long the caller must wait, or `None` when no throttling is needed.
    ///
    /// With a reset time the wait is `max(reset - now + buffer, 0)`. Without
    /// one it is `Retry-After`, falling back to the configured default.
    pub fn wait_duration(
        &self,
        signal: &RateLimitSignal,
        force_wait: bool,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        if !force_wait && !signal.is_low(self.config.low_water_mark) {
            return None;
        }

        let wait = match signal.reset_epoch_seconds {
            Some(reset) => {
                let buffer_ms = self.config.reset_buffer.as_millis() as i64;
                let wait_ms = reset
                    .saturating_mul(1000)
                    .saturating_add(buffer_ms)
                    .saturating_sub(now.timestamp_millis())
                    .max(0);
                Duration::from_millis(wait_ms as u64)
            }
            None => signal
                .retry_after_seconds
                .map_or(self.config.default_wait, Duration::from_secs),
        };
        Some(wait)
    }

    /// Inspect response headers and wait until it is safe to continue
    pub async fn throttle(&self, headers: &HeaderMap, force_wait: bool) -> ThrottleOutcome {
        let signal = RateLimitSignal::from_headers(headers);
        self.throttle_signal(&signal, force_wait).await
    }

    /// Same as [`throttle`](Self::throttle) for an already parsed signal
    pub async fn throttle_signal(
        &self,
        signal: &RateLimitSignal,
        force_wait: bool,
    ) -> ThrottleOutcome {
        let Some(wait) = self.wait_duration(signal, force_wait, Utc::now()) else {
            return ThrottleOutcome::NotRequired;
        };

        if wait.is_zero() {
            return ThrottleOutcome::Waited(wait);
        }

        self.events.emit(&CrawlEvent::RateLimitWait {
            wait,
            remaining: signal.remaining,
            forced: force_wait,
        });

        tokio::select! {
            () = tokio::time::sleep(wait) => ThrottleOutcome::Waited(wait),
            () = self.cancel.cancelled() => {
                self.events.emit(&CrawlEvent::WaitCancelled { during: "rate limit wait" });
                ThrottleOutcome::Cancelled
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
