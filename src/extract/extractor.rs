//! Raw item to record mapping

use super::types::RepositoryRecord;
use crate::error::{Error, Result};
use crate::types::{JsonValue, RawItem};
use chrono::NaiveDateTime;

/// Fields an item must carry to become a record
pub const REQUIRED_FIELDS: [&str; 4] = ["name", "stargazers_count", "forks_count", "html_url"];

/// Timestamp format used by the API (`2023-01-01T00:00:00Z`)
const INPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Timestamp format of [`RepositoryRecord::last_updated`]
const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reformat an API timestamp, passing unparseable input through unchanged
pub fn format_timestamp(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, INPUT_TIMESTAMP_FORMAT).map_or_else(
        |_| raw.to_string(),
        |ts| ts.format(OUTPUT_TIMESTAMP_FORMAT).to_string(),
    )
}

/// Maps raw repository items into records
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordExtractor;

impl RecordExtractor {
    /// Create a new extractor
    pub fn new() -> Self {
        Self
    }

    /// Build a record from one item.
    ///
    /// Fails with [`Error::MissingFields`] listing every absent required
    /// field, or [`Error::InvalidField`] when a required field has the wrong
    /// type.
    pub fn extract(&self, item: &RawItem) -> Result<RepositoryRecord> {
        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| !item.contains_key(*field))
            .collect();
        if !missing.is_empty() {
            return Err(Error::missing_fields(missing));
        }

        Ok(RepositoryRecord {
            name: required_str(item, "name")?,
            description: optional_str(item, "description"),
            url: required_str(item, "html_url")?,
            stars: required_count(item, "stargazers_count")?,
            forks: required_count(item, "forks_count")?,
            language: optional_str(item, "language"),
            last_updated: item
                .get("updated_at")
                .and_then(JsonValue::as_str)
                .filter(|s| !s.is_empty())
                .map(format_timestamp),
        })
    }
}

fn required_str(item: &RawItem, field: &str) -> Result<String> {
    item.get(field)
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::invalid_field(field, "string"))
}

fn required_count(item: &RawItem, field: &str) -> Result<u64> {
    item.get(field)
        .and_then(JsonValue::as_u64)
        .ok_or_else(|| Error::invalid_field(field, "non-negative integer"))
}

fn optional_str(item: &RawItem, field: &str) -> Option<String> {
    item.get(field)
        .and_then(JsonValue::as_str)
        .map(str::to_string)
}
