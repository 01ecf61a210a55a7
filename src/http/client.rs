//! GET transport with bounded retry
//!
//! Provides a transport that handles:
//! - Automatic retries on transient statuses (429, 500, 502, 503, 504)
//! - Retries on connection errors and timeouts
//! - Exponential backoff seeded by a configurable factor
//! - Cancellation of the delay between attempts

use crate::error::{is_retryable_status, Error, Result};
use crate::events::{default_sink, CrawlEvent, SharedSink};
use crate::types::{Method, StringMap};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Configuration for the retry transport
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Backoff factor in seconds; attempt `n` waits `factor * 2^n`
    pub backoff_factor: f64,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Default headers for all requests
    pub default_headers: StringMap,
    /// User agent string
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            backoff_factor: 0.5,
            max_backoff: Duration::from_secs(120),
            default_headers: StringMap::new(),
            user_agent: format!("org-crawler/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl TransportConfig {
    /// Create a new config builder
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }
}

/// Builder for transport config
#[derive(Default)]
pub struct TransportConfigBuilder {
    config: TransportConfig,
}

impl TransportConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, factor: f64, max: Duration) -> Self {
        self.config.backoff_factor = factor;
        self.config.max_backoff = max;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> TransportConfig {
        self.config
    }
}

/// A single request handed to the transport
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    /// HTTP method; only GET is sent
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Request headers, applied after the default headers
    pub headers: StringMap,
}

impl HttpRequest {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: StringMap::new(),
        }
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the method
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }
}

/// GET transport with retry on transient failures
pub struct RetryTransport {
    client: Client,
    config: TransportConfig,
    events: SharedSink,
    cancel: CancellationToken,
}

impl RetryTransport {
    /// Create a new transport with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(TransportConfig::default())
    }

    /// Create a new transport with custom configuration
    pub fn with_config(config: TransportConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            config,
            events: default_sink(),
            cancel: CancellationToken::new(),
        })
    }

    /// Report retries to this sink
    #[must_use]
    pub fn with_events(mut self, events: SharedSink) -> Self {
        self.events = events;
        self
    }

    /// Interrupt backoff delays when this token is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Make a GET request to `url` with the default headers
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.send(&HttpRequest::get(url)).await
    }

    /// Send a request, retrying transient failures.
    ///
    /// Once retries are exhausted on a retryable status, the last response is
    /// returned as `Ok`. Non-retryable statuses are returned on first sight.
    /// Transport failures that outlive the retry budget are returned as `Err`.
    pub async fn send(&self, request: &HttpRequest) -> Result<Response> {
        if request.method != Method::GET {
            return Err(Error::UnsupportedMethod {
                method: request.method.to_string(),
            });
        }

        let max_retries = self.config.max_retries;
        let mut attempt = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let mut req = self.client.get(&request.url);
            for (key, value) in &self.config.default_headers {
                req = req.header(key.as_str(), value.as_str());
            }
            for (key, value) in &request.headers {
                req = req.header(key.as_str(), value.as_str());
            }

            match req.send().await {
                Ok(response) => {
                    let status = response.status();
                    if !is_retryable_status(status.as_u16()) || attempt >= max_retries {
                        return Ok(response);
                    }

                    let delay = retry_after_for(&response)
                        .unwrap_or_else(|| self.calculate_backoff(attempt));
                    self.backoff(attempt, status.as_u16().to_string(), delay)
                        .await?;
                }
                Err(e) => {
                    if self.cancel.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                    if !(e.is_connect() || e.is_timeout()) || attempt >= max_retries {
                        if e.is_timeout() {
                            return Err(Error::Timeout {
                                timeout_ms: self.config.timeout.as_millis() as u64,
                            });
                        }
                        return Err(Error::Http(e));
                    }

                    let reason = if e.is_timeout() {
                        "timeout".to_string()
                    } else {
                        "connection error".to_string()
                    };
                    self.backoff(attempt, reason, self.calculate_backoff(attempt))
                        .await?;
                }
            }

            attempt += 1;
        }
    }

    /// Emit a retry event and sleep, unless cancelled first
    async fn backoff(&self, attempt: u32, reason: String, delay: Duration) -> Result<()> {
        self.events.emit(&CrawlEvent::RetryScheduled {
            attempt: attempt + 1,
            max_attempts: self.config.max_retries + 1,
            reason,
            delay,
        });

        tokio::select! {
            () = tokio::time::sleep(delay) => Ok(()),
            () = self.cancel.cancelled() => {
                self.events.emit(&CrawlEvent::WaitCancelled { during: "retry backoff" });
                Err(Error::Cancelled)
            }
        }
    }

    /// Calculate backoff delay for a given attempt (0-based)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let factor = self.config.backoff_factor.max(0.0);
        let seconds = factor * 2f64.powi(attempt.min(32) as i32);
        let delay = Duration::try_from_secs_f64(seconds).unwrap_or(self.config.max_backoff);
        std::cmp::min(delay, self.config.max_backoff)
    }
}

impl std::fmt::Debug for RetryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Numeric Retry-After on 429/503, which the server uses to pace retries
fn retry_after_for(response: &Response) -> Option<Duration> {
    if !matches!(
        response.status(),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
    ) {
        return None;
    }
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
