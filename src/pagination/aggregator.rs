//! Sequential pagination aggregator
//!
//! Fetches page 1, derives the page count from its reported total and page
//! size, then walks pages 2..=N one at a time.

use super::types::{PageFetcher, PageRequest, PageResult};
use crate::error::{Error, Result};
use crate::types::{FailurePolicy, Record};
use std::future::Future;
use tracing::{debug, info, warn};

/// Fetch every page of one collection, one request at a time.
///
/// `fetch_page` is called with 1-based page numbers in increasing order.
/// The page count is fixed by the total and page size observed on page 1;
/// later changes to the reported total are ignored.
///
/// A failure on page 1 is always returned, since without it the page count
/// is unknown. Failures on later pages follow `policy`: [`FailurePolicy::FailFast`]
/// returns the error annotated with the page number and discards everything
/// fetched so far, [`FailurePolicy::LogAndSkip`] logs it and moves on.
pub async fn fetch_all_pages<F, Fut>(
    label: &str,
    mut fetch_page: F,
    policy: FailurePolicy,
) -> Result<Vec<Record>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PageResult>>,
{
    let first = fetch_page(1)
        .await
        .map_err(|e| Error::page_fetch(label, 1, e))?;

    if first.is_empty_collection() {
        debug!("{label}: server reports no records");
        return Ok(Vec::new());
    }

    let total = first.total;
    let pages = first.page_count();
    debug!(
        "{label}: {total} records at {} per page, {pages} page(s)",
        first.per_page
    );

    let mut records = first.items;
    let mut page: u64 = 2;

    while page <= pages {
        let page_number = page as u32;
        match fetch_page(page_number).await {
            Ok(result) => {
                debug!(
                    "{label}: page {page_number}/{pages} returned {} record(s)",
                    result.items.len()
                );
                records.extend(result.items);
            }
            Err(e) if policy.is_fail_fast() => {
                return Err(Error::page_fetch(label, page_number, e));
            }
            Err(e) => {
                warn!("{label}: skipping page {page_number}/{pages}: {e}");
            }
        }
        page += 1;
    }

    if records.len() as u64 != total as u64 {
        warn!(
            "{label}: collected {} record(s) but the first page reported {total}",
            records.len()
        );
    }
    info!("{label}: collected {} record(s)", records.len());

    Ok(records)
}

/// Sequential aggregation bound to a [`PageFetcher`] and a base request
pub struct Paginator<'a, P: PageFetcher + ?Sized> {
    fetcher: &'a P,
    request: PageRequest,
    policy: FailurePolicy,
}

impl<'a, P: PageFetcher + ?Sized> Paginator<'a, P> {
    /// Create a paginator for `request`; its page number is ignored
    pub fn new(fetcher: &'a P, request: PageRequest) -> Self {
        Self {
            fetcher,
            request,
            policy: FailurePolicy::FailFast,
        }
    }

    /// Set the failure policy
    #[must_use]
    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The request pages are derived from
    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    /// Fetch every page and return all records in page order
    pub async fn fetch_all(&self) -> Result<Vec<Record>> {
        let fetcher = self.fetcher;
        let base = &self.request;
        fetch_all_pages(
            base.resource.path,
            |page| {
                let request = base.with_page(page);
                async move { fetcher.fetch_page(&request).await }
            },
            self.policy,
        )
        .await
    }
}

impl<P: PageFetcher + ?Sized> std::fmt::Debug for Paginator<'_, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("request", &self.request)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
