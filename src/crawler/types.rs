//! Crawl result types

use crate::extract::RepositoryRecord;
use serde::Serialize;

/// An item that could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    /// Position in the fetched sequence
    pub index: usize,
    /// Item name, when it had one
    pub name: Option<String>,
    /// Extraction failure
    pub reason: String,
}

/// Repositories fetched for one organization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrgRepos {
    /// Organization name
    pub org: String,
    /// Records in server order
    pub records: Vec<RepositoryRecord>,
    /// True when pagination was abandoned before the last page
    pub partial: bool,
    /// Items dropped during extraction
    pub skipped: Vec<SkippedItem>,
    /// HTTP exchanges started by pagination
    pub pages_requested: u32,
    /// Why pagination was abandoned, for partial results
    pub abort_reason: Option<String>,
}

impl OrgRepos {
    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no records were produced
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
