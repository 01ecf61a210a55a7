//! Pagination types
//!
//! Page requests and the outcome of walking a collection.

use crate::http::HttpRequest;
use crate::types::RawItem;

/// Items requested per page. A shorter page is the last one.
pub const PAGE_SIZE: usize = 100;

/// Query parameter carrying the page size
pub const PER_PAGE_PARAM: &str = "per_page";

/// Query parameter carrying the page cursor
pub const PAGE_PARAM: &str = "page";

/// One page of a collection endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    base_url: String,
    page: u32,
}

impl PageRequest {
    /// Create a request for `page` (1-based; 0 is treated as 1)
    pub fn new(base_url: impl Into<String>, page: u32) -> Self {
        Self {
            base_url: base_url.into(),
            page: page.max(1),
        }
    }

    /// Page cursor
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Collection URL without paging parameters
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Page URL: paging parameters are appended with `&` when the base URL
    /// already has a query string, `?` otherwise
    pub fn url(&self) -> String {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{separator}{PER_PAGE_PARAM}={PAGE_SIZE}&{PAGE_PARAM}={}",
            self.base_url, self.page
        )
    }

    /// Transport request for this page
    pub fn to_http_request(&self) -> HttpRequest {
        HttpRequest::get(self.url())
    }
}

/// Everything a pagination run produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    /// Items in server order: page order, then in-page order
    pub items: Vec<RawItem>,
    /// True when fetching was abandoned before the last page
    pub partial: bool,
    /// HTTP exchanges started, including same-page rate limit retries
    pub pages_requested: u32,
    /// Pages whose items were captured
    pub pages_fetched: u32,
    /// Why fetching was abandoned, for partial outcomes
    pub abort_reason: Option<String>,
}

impl FetchOutcome {
    /// Check if every page was fetched
    pub fn is_complete(&self) -> bool {
        !self.partial
    }

    /// Number of items collected
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if no items were collected
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Where the driver's state machine is
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PageState {
    /// Fetching this page
    Fetching(u32),
    /// The last page was captured
    Done,
    /// Fetching was abandoned
    Aborted(String),
}
