//! Pagination types and traits
//!
//! Defines the page request/result records and the fetcher seam used by
//! both aggregation strategies.

use crate::error::Result;
use crate::resource::Resource;
use crate::types::{Filters, Record};
use async_trait::async_trait;

/// Page size used when the caller does not choose one.
///
/// Large enough that most collections fit into a single round trip.
pub const DEFAULT_PER_PAGE: u32 = 1000;

/// Request for one page of one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Resource being listed
    pub resource: Resource,
    /// 1-based page number
    pub page: u32,
    /// Requested page size
    pub per_page: u32,
    /// Resource-specific search parameters
    pub filters: Filters,
}

impl PageRequest {
    /// Create a request for the first page with the default page size
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            filters: Filters::new(),
        }
    }

    /// Set the page size
    #[must_use]
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Add a filter parameter
    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.filters.insert(key.into(), value.to_string());
        self
    }

    /// Replace all filter parameters
    #[must_use]
    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    /// Copy of this request pointing at another page
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    /// Query parameters for this request.
    ///
    /// `page` and `per_page` always win over filters of the same name.
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .filters
            .iter()
            .filter(|(key, _)| key.as_str() != "page" && key.as_str() != "per_page")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        params.push(("per_page".to_string(), self.per_page.to_string()));
        params.push(("page".to_string(), self.page.to_string()));
        params
    }
}

/// One page as reported by the server
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    /// Records on this page, in server order
    pub items: Vec<Record>,
    /// Server-reported number of matching records across all pages
    pub total: f64,
    /// Server-reported page size
    pub per_page: f64,
    /// Page number this result belongs to
    pub page: u32,
}

impl PageResult {
    /// Create a page result
    pub fn new(items: Vec<Record>, total: f64, per_page: f64, page: u32) -> Self {
        Self {
            items,
            total,
            per_page,
            page,
        }
    }

    /// Number of pages implied by this page's total and page size.
    ///
    /// Counts stay fractional until the division, so `@total = 2000.5` at
    /// 1000 per page needs 3 pages.
    pub fn page_count(&self) -> u64 {
        super::envelope::page_count(self.total, self.per_page)
    }

    /// Whether the server reported no matching records at all
    pub fn is_empty_collection(&self) -> bool {
        self.total <= 0.0
    }
}

/// Anything that can fetch one page of a resource
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page described by `request`
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResult>;
}
