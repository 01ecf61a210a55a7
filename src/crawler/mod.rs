//! Organization crawl
//!
//! Wires the transport, rate limiter, pagination driver and extractor
//! together for one operation: list every repository of an organization.
//!
//! # Overview
//!
//! - `OrgCrawler` - Builds the pipeline from a [`CrawlerConfig`]
//! - `OrgRepos` - Records plus what was skipped and whether the list is partial
//!
//! Items that fail extraction are skipped with a warning. A partially
//! fetched collection is still returned; only an invalid organization
//! name or API URL is an error.

mod types;

pub use types::{OrgRepos, SkippedItem};

use crate::config::CrawlerConfig;
use crate::error::Result;
use crate::events::{default_sink, CrawlEvent, SharedSink};
use crate::extract::{RecordExtractor, RepositoryRecord};
use crate::http::{RateLimiter, RetryTransport};
use crate::pagination::PaginationDriver;
use crate::types::{JsonValue, RawItem};
use tokio_util::sync::CancellationToken;

/// Fetches and normalizes an organization's repositories
pub struct OrgCrawler {
    config: CrawlerConfig,
    driver: PaginationDriver,
    extractor: RecordExtractor,
    events: SharedSink,
}

impl OrgCrawler {
    /// Build a crawler from configuration
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        config.validate()?;
        let transport = RetryTransport::with_config(config.transport_config())?;
        let limiter = RateLimiter::new(config.rate_limiter_config());
        Ok(Self::from_parts(
            config,
            PaginationDriver::new(transport, limiter),
        ))
    }

    /// Build a crawler around an existing driver
    pub fn from_parts(config: CrawlerConfig, driver: PaginationDriver) -> Self {
        Self {
            config,
            driver,
            extractor: RecordExtractor::new(),
            events: default_sink(),
        }
    }

    /// Report events from every component to this sink
    #[must_use]
    pub fn with_events(mut self, events: SharedSink) -> Self {
        self.driver = self.driver.with_events(events.clone());
        self.events = events;
        self
    }

    /// Make every wait of the crawl interruptible through this token
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.driver = self.driver.with_cancellation(cancel);
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Fetch all repositories of `org`
    pub async fn fetch_organization_repos(&self, org: &str) -> Result<OrgRepos> {
        let url = self.config.org_repos_url(org)?;
        let outcome = self.driver.fetch_all(&url).await;
        let (records, skipped) = self.extract_all(&outcome.items);

        let repos = OrgRepos {
            org: org.trim().to_string(),
            records,
            partial: outcome.partial,
            skipped,
            pages_requested: outcome.pages_requested,
            abort_reason: outcome.abort_reason,
        };

        self.events.emit(&CrawlEvent::OrgFetched {
            org: repos.org.clone(),
            records: repos.records.len(),
            partial: repos.partial,
        });

        Ok(repos)
    }

    /// Extract every item, skipping and reporting the ones that fail
    pub fn extract_all(&self, items: &[RawItem]) -> (Vec<RepositoryRecord>, Vec<SkippedItem>) {
        let mut records = Vec::with_capacity(items.len());
        let mut skipped = Vec::new();

        for (index, item) in items.iter().enumerate() {
            match self.extractor.extract(item) {
                Ok(record) => records.push(record),
                Err(e) => {
                    let name = item
                        .get("name")
                        .and_then(JsonValue::as_str)
                        .map(str::to_string);
                    let reason = e.to_string();
                    self.events.emit(&CrawlEvent::RecordSkipped {
                        index,
                        name: name.clone(),
                        reason: reason.clone(),
                    });
                    skipped.push(SkippedItem {
                        index,
                        name,
                        reason,
                    });
                }
            }
        }

        (records, skipped)
    }
}

impl std::fmt::Debug for OrgCrawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrgCrawler")
            .field("config", &self.config)
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
