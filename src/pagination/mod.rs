//! Pagination module
//!
//! Page-number pagination over a collection endpoint.
//!
//! # Overview
//!
//! [`PaginationDriver`] requests `?per_page=100&page=N` for N = 1, 2, ...
//! through the retry transport, consults the rate limiter after every
//! exchange, and stops at the first page holding fewer than 100 items.
//! A 403 caused by an exceeded rate limit is waited out and the same page is
//! requested again. Any other failure ends the walk with a partial
//! [`FetchOutcome`].

mod driver;
mod types;

pub use driver::PaginationDriver;
pub use types::{FetchOutcome, PageRequest, PAGE_PARAM, PAGE_SIZE, PER_PAGE_PARAM};
