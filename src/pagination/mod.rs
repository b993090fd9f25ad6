//! Pagination module
//!
//! Turns a "fetch one page of resource X" primitive into "fetch all of X".
//!
//! # Overview
//!
//! Billomat reports `@total` and `@per_page` alongside every page. The
//! number of pages is derived once, from the first page, as
//! `ceil(total / per_page)`. Two strategies share that contract:
//!
//! - [`fetch_all_pages`] / [`Paginator`]: sequential, one request in flight,
//!   fails fast by default and annotates the failing page.
//! - [`BatchCollector`]: dispatches many requests at once and merges the
//!   results when every request has settled. Lenient by default: a failed
//!   request is logged and contributes nothing.
//!
//! The error behaviour of both is governed by [`FailurePolicy`].

mod aggregator;
mod concurrent;
pub mod envelope;
mod types;

pub use crate::types::FailurePolicy;
pub use aggregator::{fetch_all_pages, Paginator};
pub use concurrent::{BatchCollector, BatchOptions, BatchOutcome};
pub use envelope::{page_count, parse_count, parse_page};
pub use types::{PageFetcher, PageRequest, PageResult, DEFAULT_PER_PAGE};
