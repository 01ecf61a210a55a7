//! Structured crawl events
//!
//! Components never log directly. Each one is handed an [`EventSink`] at
//! construction and reports what happens through [`CrawlEvent`] values.
//! [`TracingSink`] forwards events to `tracing`, [`MemorySink`] keeps them
//! for inspection.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Severity of a crawl event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// General information
    Info,
    /// Warning
    Warn,
    /// Error (non-fatal)
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Something worth reporting that happened during a crawl
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlEvent {
    /// A page request is about to be sent
    PageRequested {
        /// Page cursor
        page: u32,
        /// Fully built page URL
        url: String,
    },
    /// A page was captured
    PageFetched {
        /// Page cursor
        page: u32,
        /// Number of items on the page
        items: usize,
    },
    /// The transport is backing off before another attempt
    RetryScheduled {
        /// Attempt that just failed (1-based)
        attempt: u32,
        /// Total attempts allowed
        max_attempts: u32,
        /// Status code or transport failure description
        reason: String,
        /// Delay before the next attempt
        delay: Duration,
    },
    /// The rate limiter is suspending the caller
    RateLimitWait {
        /// How long the caller will be suspended
        wait: Duration,
        /// Remaining quota reported by the server, if any
        remaining: Option<i64>,
        /// Whether the wait was forced by an exceeded limit
        forced: bool,
    },
    /// The server rejected a page because the rate limit was exceeded
    RateLimitExceeded {
        /// Page cursor that will be re-requested
        page: u32,
    },
    /// A suspension was interrupted by cancellation
    WaitCancelled {
        /// Where the suspension happened
        during: &'static str,
    },
    /// Pagination reached the last page
    FetchCompleted {
        /// Pages captured
        pages: u32,
        /// Items accumulated
        items: usize,
    },
    /// Pagination was abandoned
    FetchAborted {
        /// Page cursor that could not be fetched
        page: u32,
        /// Items accumulated before the abort
        items: usize,
        /// Why the page was abandoned
        reason: String,
    },
    /// An item could not be turned into a record and was skipped
    RecordSkipped {
        /// Position of the item in the fetched sequence
        index: usize,
        /// Item name, when it had one
        name: Option<String>,
        /// Extraction failure
        reason: String,
    },
    /// An organization crawl finished
    OrgFetched {
        /// Organization name
        org: String,
        /// Records produced
        records: usize,
        /// Whether the result is known to be incomplete
        partial: bool,
    },
}

impl CrawlEvent {
    /// The level this event should be reported at
    pub fn level(&self) -> LogLevel {
        match self {
            Self::PageRequested { .. } | Self::PageFetched { .. } => LogLevel::Debug,
            Self::RetryScheduled { .. }
            | Self::RateLimitWait { .. }
            | Self::RateLimitExceeded { .. }
            | Self::WaitCancelled { .. }
            | Self::RecordSkipped { .. } => LogLevel::Warn,
            Self::FetchAborted { .. } => LogLevel::Error,
            Self::FetchCompleted { .. } => LogLevel::Info,
            Self::OrgFetched { partial, .. } => {
                if *partial {
                    LogLevel::Warn
                } else {
                    LogLevel::Info
                }
            }
        }
    }

    /// Short machine-friendly name of the event
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PageRequested { .. } => "page_requested",
            Self::PageFetched { .. } => "page_fetched",
            Self::RetryScheduled { .. } => "retry_scheduled",
            Self::RateLimitWait { .. } => "rate_limit_wait",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::WaitCancelled { .. } => "wait_cancelled",
            Self::FetchCompleted { .. } => "fetch_completed",
            Self::FetchAborted { .. } => "fetch_aborted",
            Self::RecordSkipped { .. } => "record_skipped",
            Self::OrgFetched { .. } => "org_fetched",
        }
    }
}

impl fmt::Display for CrawlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageRequested { page, url } => write!(f, "Fetching page {page}: {url}"),
            Self::PageFetched { page, items } => write!(f, "Page {page}: fetched {items} items"),
            Self::RetryScheduled {
                attempt,
                max_attempts,
                reason,
                delay,
            } => write!(
                f,
                "Request failed with {reason}, attempt {attempt}/{max_attempts}, retrying in {delay:?}"
            ),
            Self::RateLimitWait {
                wait,
                remaining,
                forced,
            } => {
                if *forced {
                    write!(f, "Rate limit exceeded. Waiting for {:.2} seconds", wait.as_secs_f64())
                } else {
                    write!(
                        f,
                        "Rate limit almost exceeded ({} remaining). Waiting for {:.2} seconds",
                        remaining.map_or_else(|| "?".to_string(), |r| r.to_string()),
                        wait.as_secs_f64()
                    )
                }
            }
            Self::RateLimitExceeded { page } => {
                write!(f, "Rate limit exceeded on page {page}, retrying the same page")
            }
            Self::WaitCancelled { during } => write!(f, "Cancelled while waiting ({during})"),
            Self::FetchCompleted { pages, items } => {
                write!(f, "Fetched {items} items in {pages} pages")
            }
            Self::FetchAborted {
                page,
                items,
                reason,
            } => write!(
                f,
                "Abandoned pagination at page {page} with {items} items collected: {reason}"
            ),
            Self::RecordSkipped {
                index,
                name,
                reason,
            } => match name {
                Some(name) => write!(f, "Skipping item {index} ({name}): {reason}"),
                None => write!(f, "Skipping item {index}: {reason}"),
            },
            Self::OrgFetched {
                org,
                records,
                partial,
            } => {
                if *partial {
                    write!(f, "Fetched {records} repositories from {org} (partial result)")
                } else {
                    write!(f, "Successfully fetched {records} repositories from {org}")
                }
            }
        }
    }
}

/// Receiver of crawl events
pub trait EventSink: Send + Sync {
    /// Handle one event
    fn emit(&self, event: &CrawlEvent);
}

/// Shared handle to an event sink
pub type SharedSink = Arc<dyn EventSink>;

/// Sink used when the caller does not provide one
pub fn default_sink() -> SharedSink {
    Arc::new(TracingSink)
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &CrawlEvent) {
        let kind = event.kind();
        match event.level() {
            LogLevel::Debug => tracing::debug!(event = kind, "{event}"),
            LogLevel::Info => tracing::info!(event = kind, "{event}"),
            LogLevel::Warn => tracing::warn!(event = kind, "{event}"),
            LogLevel::Error => tracing::error!(event = kind, "{event}"),
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &CrawlEvent) {}
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<CrawlEvent>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events, oldest first
    pub fn events(&self) -> Vec<CrawlEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of recorded events matching `predicate`
    pub fn count(&self, predicate: impl Fn(&CrawlEvent) -> bool) -> usize {
        self.events
            .lock()
            .map(|events| events.iter().filter(|e| predicate(e)).count())
            .unwrap_or(0)
    }

    /// Number of recorded events of the given kind
    pub fn count_kind(&self, kind: &str) -> usize {
        self.count(|e| e.kind() == kind)
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &CrawlEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_levels() {
        let fetched = CrawlEvent::PageFetched { page: 1, items: 3 };
        assert_eq!(fetched.level(), LogLevel::Debug);

        let skipped = CrawlEvent::RecordSkipped {
            index: 0,
            name: None,
            reason: "missing".to_string(),
        };
        assert_eq!(skipped.level(), LogLevel::Warn);

        let aborted = CrawlEvent::FetchAborted {
            page: 2,
            items: 100,
            reason: "connection refused".to_string(),
        };
        assert_eq!(aborted.level(), LogLevel::Error);

        let done = CrawlEvent::OrgFetched {
            org: "rust-lang".to_string(),
            records: 10,
            partial: false,
        };
        assert_eq!(done.level(), LogLevel::Info);
    }

    #[test]
    fn test_event_display() {
        let event = CrawlEvent::OrgFetched {
            org: "Azure".to_string(),
            records: 250,
            partial: false,
        };
        assert_eq!(
            event.to_string(),
            "Successfully fetched 250 repositories from Azure"
        );

        let event = CrawlEvent::RateLimitWait {
            wait: Duration::from_millis(1500),
            remaining: None,
            forced: true,
        };
        assert_eq!(event.to_string(), "Rate limit exceeded. Waiting for 1.50 seconds");

        let event = CrawlEvent::RecordSkipped {
            index: 4,
            name: Some("widget".to_string()),
            reason: "Missing required field(s): html_url".to_string(),
        };
        assert_eq!(
            event.to_string(),
            "Skipping item 4 (widget): Missing required field(s): html_url"
        );
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.emit(&CrawlEvent::PageFetched { page: 1, items: 100 });
        sink.emit(&CrawlEvent::PageFetched { page: 2, items: 5 });
        sink.emit(&CrawlEvent::FetchCompleted { pages: 2, items: 105 });

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], CrawlEvent::PageFetched { page: 1, items: 100 });
        assert_eq!(sink.count_kind("page_fetched"), 2);
        assert_eq!(sink.count_kind("fetch_aborted"), 0);
    }

    #[test]
    fn test_null_and_tracing_sinks_accept_events() {
        let event = CrawlEvent::WaitCancelled { during: "test" };
        NullSink.emit(&event);
        TracingSink.emit(&event);
        default_sink().emit(&event);
    }
}
