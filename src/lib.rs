// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]

//! # Org Crawler
//!
//! Fetches every repository of a GitHub organization through the
//! page-numbered REST listing and normalizes each one into a
//! [`RepositoryRecord`].
//!
//! ## Features
//!
//! - **Retrying transport**: exponential backoff on 429/5xx and network errors
//! - **Rate limit pacing**: sleeps until the quota resets when it runs low
//! - **Pagination**: walks `?per_page=100&page=N` until a short page
//! - **Partial results**: a failed page keeps everything fetched before it
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use org_crawler::{CrawlerConfig, OrgCrawler, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = CrawlerConfig::default().with_token("ghp_...");
//!     let crawler = OrgCrawler::new(config)?;
//!
//!     let repos = crawler.fetch_organization_repos("Azure").await?;
//!     println!("Total repositories fetched: {}", repos.len());
//!     if repos.partial {
//!         eprintln!("incomplete: {:?}", repos.abort_reason);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         OrgCrawler                          │
//! │   fetch_organization_repos(org) → OrgRepos { records, .. }  │
//! └─────────────────────────────────────────────────────────────┘
//!                  │                               │
//! ┌────────────────┴──────────────┐   ┌────────────┴────────────┐
//! │       PaginationDriver        │   │     RecordExtractor     │
//! │  Fetching(page) → Done        │   │  RawItem → Repository   │
//! │                 → Aborted     │   │            Record       │
//! └───────────────────────────────┘   └─────────────────────────┘
//!          │                 │
//! ┌────────┴───────┐ ┌───────┴────────┐
//! │ RetryTransport │ │  RateLimiter   │
//! │ backoff, 429,  │ │ X-RateLimit-*  │
//! │ 5xx, timeouts  │ │ Retry-After    │
//! └────────────────┘ └────────────────┘
//! ```
//!
//! Every component reports what it does through an [`EventSink`]; the
//! default sink writes to `tracing`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Crawl events and sinks
pub mod events;

/// Crawler configuration
pub mod config;

/// HTTP transport with retry and rate limiting
pub mod http;

/// Page-numbered collection fetching
pub mod pagination;

/// Repository record extraction
pub mod extract;

/// Organization crawl
pub mod crawler;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::CrawlerConfig;
pub use crawler::{OrgCrawler, OrgRepos, SkippedItem};
pub use events::{CrawlEvent, EventSink, MemorySink, NullSink, SharedSink, TracingSink};
pub use extract::{RecordExtractor, RepositoryRecord};
pub use http::{RateLimiter, RateLimiterConfig, RetryTransport, TransportConfig};
pub use pagination::{FetchOutcome, PaginationDriver};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
