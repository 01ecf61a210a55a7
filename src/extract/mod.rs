//! Record extraction module
//!
//! Turns raw repository items into [`RepositoryRecord`]s.
//!
//! # Overview
//!
//! Required fields are checked explicitly: every absent one is named in a
//! single [`Error::MissingFields`](crate::Error::MissingFields). Optional
//! fields become `None` when absent or null. Timestamps that do not match
//! the API's format are passed through unchanged.

mod extractor;
mod types;

pub use extractor::{format_timestamp, RecordExtractor, REQUIRED_FIELDS};
pub use types::RepositoryRecord;
