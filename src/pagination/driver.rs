//! Pagination driver
//!
//! Walks a page-numbered collection from page 1 until a short page, pausing
//! for rate limits along the way. The page cursor only advances once a page
//! has been captured, so an abort never loses or duplicates items.

use super::types::{FetchOutcome, PageRequest, PageState, PAGE_SIZE};
use crate::error::Error;
use crate::events::{default_sink, CrawlEvent, SharedSink};
use crate::http::{RateLimiter, RetryTransport, ThrottleOutcome};
use crate::types::RawItem;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Body marker of a 403 caused by an exhausted quota
const RATE_LIMIT_MARKER: &str = "rate limit exceeded";

/// Longest error body kept in an abort reason
const MAX_ERROR_BODY: usize = 200;

/// What one page exchange produced
enum PageStep {
    /// Items were captured; `cancelled` if the pre-emptive wait was interrupted
    Items { items: Vec<RawItem>, cancelled: bool },
    /// The server refused the page because the quota is gone
    RateLimited(HeaderMap),
    /// The page cannot be fetched
    Failed(String),
}

/// Fetches every page of a collection endpoint
pub struct PaginationDriver {
    transport: RetryTransport,
    limiter: RateLimiter,
    events: SharedSink,
    cancel: CancellationToken,
}

impl PaginationDriver {
    /// Create a driver from its transport and rate limiter
    pub fn new(transport: RetryTransport, limiter: RateLimiter) -> Self {
        Self {
            transport,
            limiter,
            events: default_sink(),
            cancel: CancellationToken::new(),
        }
    }

    /// Report events from the driver, its transport and its limiter to this sink
    #[must_use]
    pub fn with_events(mut self, events: SharedSink) -> Self {
        self.transport = self.transport.with_events(events.clone());
        self.limiter = self.limiter.with_events(events.clone());
        self.events = events;
        self
    }

    /// Share one cancellation token between the driver, its transport and its limiter
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.transport = self.transport.with_cancellation(cancel.clone());
        self.limiter = self.limiter.with_cancellation(cancel.clone());
        self.cancel = cancel;
        self
    }

    /// Get the transport
    pub fn transport(&self) -> &RetryTransport {
        &self.transport
    }

    /// Get the rate limiter
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Fetch all pages of `base_url`.
    ///
    /// Never fails: whatever was captured before an unrecoverable error is
    /// returned with `partial` set.
    pub async fn fetch_all(&self, base_url: &str) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();
        let mut state = PageState::Fetching(1);
        let mut rate_limited = 0;

        loop {
            state = match state {
                PageState::Fetching(page) => {
                    self.step(base_url, page, &mut outcome, &mut rate_limited)
                        .await
                }
                PageState::Done => {
                    self.events.emit(&CrawlEvent::FetchCompleted {
                        pages: outcome.pages_fetched,
                        items: outcome.items.len(),
                    });
                    return outcome;
                }
                PageState::Aborted(reason) => {
                    let page = outcome.pages_fetched + 1;
                    self.events.emit(&CrawlEvent::FetchAborted {
                        page,
                        items: outcome.items.len(),
                        reason: reason.clone(),
                    });
                    outcome.partial = true;
                    outcome.abort_reason = Some(reason);
                    return outcome;
                }
            };
        }
    }

    /// Fetch one page and decide where the state machine goes next.
    ///
    /// `rate_limited` counts consecutive rate-limit refusals of the current page.
    async fn step(
        &self,
        base_url: &str,
        page: u32,
        outcome: &mut FetchOutcome,
        rate_limited: &mut u32,
    ) -> PageState {
        if self.cancel.is_cancelled() {
            return PageState::Aborted(Error::Cancelled.to_string());
        }

        let request = PageRequest::new(base_url, page);
        self.events.emit(&CrawlEvent::PageRequested {
            page,
            url: request.url(),
        });
        outcome.pages_requested += 1;

        match self.fetch_page(&request).await {
            PageStep::Items { items, cancelled } => {
                *rate_limited = 0;
                let count = items.len();
                self.events.emit(&CrawlEvent::PageFetched { page, items: count });
                if count == 0 {
                    return PageState::Done;
                }

                outcome.items.extend(items);
                outcome.pages_fetched += 1;

                if count < PAGE_SIZE {
                    PageState::Done
                } else if cancelled {
                    PageState::Aborted(Error::Cancelled.to_string())
                } else {
                    PageState::Fetching(page + 1)
                }
            }
            PageStep::RateLimited(headers) => {
                self.events.emit(&CrawlEvent::RateLimitExceeded { page });
                let waited = match self.limiter.throttle(&headers, true).await {
                    ThrottleOutcome::Cancelled => {
                        return PageState::Aborted(Error::Cancelled.to_string())
                    }
                    ThrottleOutcome::Waited(waited) => waited,
                    ThrottleOutcome::NotRequired => Duration::ZERO,
                };
                let cancelled = self.pause_before_retry(*rate_limited, waited).await;
                *rate_limited = rate_limited.saturating_add(1);
                if cancelled {
                    PageState::Aborted(Error::Cancelled.to_string())
                } else {
                    PageState::Fetching(page)
                }
            }
            PageStep::Failed(reason) => PageState::Aborted(reason),
        }
    }

    /// Sleep until the refused page has been held back for at least the
    /// limiter's reset buffer, or the transport's backoff for the `streak`-th
    /// consecutive refusal if that is longer. Returns `true` if cancelled.
    async fn pause_before_retry(&self, streak: u32, waited: Duration) -> bool {
        let floor = self
            .limiter
            .config()
            .reset_buffer
            .max(self.transport.calculate_backoff(streak));
        let pause = floor.saturating_sub(waited);
        if pause.is_zero() {
            return false;
        }

        self.events.emit(&CrawlEvent::RateLimitWait {
            wait: pause,
            remaining: None,
            forced: true,
        });

        tokio::select! {
            () = tokio::time::sleep(pause) => false,
            () = self.cancel.cancelled() => {
                self.events.emit(&CrawlEvent::WaitCancelled { during: "rate limit retry pause" });
                true
            }
        }
    }

    async fn fetch_page(&self, request: &PageRequest) -> PageStep {
        let response = match self.transport.send(&request.to_http_request()).await {
            Ok(response) => response,
            Err(e) => return PageStep::Failed(e.to_string()),
        };

        let status = response.status();
        let headers = response.headers().clone();

        if status.is_success() {
            let throttle = self.limiter.throttle(&headers, false).await;
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => return PageStep::Failed(Error::Http(e).to_string()),
            };
            return match serde_json::from_str::<Vec<RawItem>>(&body) {
                Ok(items) => PageStep::Items {
                    items,
                    cancelled: throttle.is_cancelled(),
                },
                Err(e) => PageStep::Failed(
                    Error::decode(format!("page {} is not a list of objects: {e}", request.page()))
                        .to_string(),
                ),
            };
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::FORBIDDEN && is_rate_limit_body(&body) {
            return PageStep::RateLimited(headers);
        }

        PageStep::Failed(Error::http_status(status.as_u16(), truncate(&body)).to_string())
    }
}

impl std::fmt::Debug for PaginationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationDriver")
            .field("transport", &self.transport)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

fn is_rate_limit_body(body: &str) -> bool {
    body.to_lowercase().contains(RATE_LIMIT_MARKER)
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod driver_helpers_tests {
    use super::*;

    #[test]
    fn test_rate_limit_marker_is_case_insensitive() {
        assert!(is_rate_limit_body(
            r#"{"message":"API rate limit exceeded for 1.2.3.4."}"#
        ));
        assert!(is_rate_limit_body("RATE LIMIT EXCEEDED"));
        assert!(!is_rate_limit_body(r#"{"message":"Resource not accessible"}"#));
    }

    #[test]
    fn test_truncate_long_bodies() {
        let long = "x".repeat(500);
        let cut = truncate(&long);
        assert_eq!(cut.len(), MAX_ERROR_BODY + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("  short  "), "short");
    }
}
