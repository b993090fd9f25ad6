//! Concurrent collector
//!
//! Dispatches a batch of page requests without waiting for each one in
//! turn and merges the results once every request has settled.
//!
//! All bookkeeping lives in one [`BatchCollector`] value per invocation, so
//! batches started by different callers never share state. Completions are
//! driven from a single task through `buffer_unordered`, which means the
//! accumulator needs no lock.
//!
//! A first-page request whose reported total spans several pages is
//! followed up: its remaining pages are dispatched in a later round and
//! merged behind its first page.

use super::types::{PageRequest, PageResult};
use crate::error::{Error, Result};
use crate::types::{FailurePolicy, Record};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Options for one concurrent batch
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// What to do when a single request fails
    pub policy: FailurePolicy,
    /// Upper bound on requests in flight (`None` = whole batch at once)
    pub max_in_flight: Option<usize>,
    /// Per-request deadline (`None` = wait indefinitely)
    pub request_timeout: Option<Duration>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::LogAndSkip,
            max_in_flight: None,
            request_timeout: None,
        }
    }
}

impl BatchOptions {
    /// Create default batch options (lenient, unbounded, no timeout)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the failure policy
    #[must_use]
    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Limit the number of requests in flight
    #[must_use]
    pub fn max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = Some(limit);
        self
    }

    /// Give up on a single request after `timeout`
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

/// Merged result of a batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Records from every successful request
    pub records: Vec<Record>,
    /// Requests that returned a page
    pub succeeded: usize,
    /// Requests whose contribution was dropped
    pub failed: usize,
}

impl BatchOutcome {
    /// Whether any request in the batch was dropped
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Records returned by one settled request
#[derive(Debug)]
struct Contribution {
    /// Index of the batch member the request belongs to
    member: usize,
    page: u32,
    items: Vec<Record>,
}

/// Accumulator for one batch invocation
#[derive(Debug)]
pub struct BatchCollector {
    options: BatchOptions,
    outstanding: usize,
    contributions: Vec<Contribution>,
    succeeded: usize,
    failed: usize,
}

impl BatchCollector {
    /// Create a collector with the given options
    pub fn new(options: BatchOptions) -> Self {
        Self {
            options,
            outstanding: 0,
            contributions: Vec::new(),
            succeeded: 0,
            failed: 0,
        }
    }

    /// Number of requests dispatched but not yet settled
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Run every request and flatten the results in completion order.
    ///
    /// Records of one batch member keep their server order, including pages
    /// fetched as follow-ups. Members appear in the order their first page
    /// completed.
    pub async fn collect<F, Fut>(self, requests: Vec<PageRequest>, fetch: F) -> Result<Vec<Record>>
    where
        F: Fn(PageRequest) -> Fut,
        Fut: Future<Output = Result<PageResult>>,
    {
        Ok(self.collect_with_outcome(requests, fetch).await?.records)
    }

    /// Like [`collect`](Self::collect), also reporting how many requests were dropped
    pub async fn collect_with_outcome<F, Fut>(
        mut self,
        requests: Vec<PageRequest>,
        fetch: F,
    ) -> Result<BatchOutcome>
    where
        F: Fn(PageRequest) -> Fut,
        Fut: Future<Output = Result<PageResult>>,
    {
        let members = requests.into_iter().enumerate().collect();
        self.run(members, &fetch).await?;
        Ok(self.finish())
    }

    /// Fetch every page of one collection concurrently.
    ///
    /// Page 1 is fetched first to learn the total; pages 2..=N are then
    /// requested together and the result is reassembled in page order, so
    /// the output matches the sequential aggregator. Page 1 failing is always
    /// an error.
    pub async fn collect_all_pages<F, Fut>(
        mut self,
        base: &PageRequest,
        fetch: F,
    ) -> Result<BatchOutcome>
    where
        F: Fn(PageRequest) -> Fut,
        Fut: Future<Output = Result<PageResult>>,
    {
        let label = base.resource.path;
        let first = fetch(base.with_page(1))
            .await
            .map_err(|e| Error::page_fetch(label, 1, e))?;

        if first.is_empty_collection() {
            debug!("{label}: server reports no records");
            return Ok(BatchOutcome {
                succeeded: 1,
                ..BatchOutcome::default()
            });
        }

        let pages = first.page_count();
        debug!("{label}: {} records, fetching {pages} page(s) concurrently", first.total);

        self.succeeded += 1;
        self.contributions.push(Contribution {
            member: 0,
            page: 1,
            items: first.items,
        });

        let rest = (2..=pages).map(|p| (0, base.with_page(p as u32))).collect();
        self.run(rest, &fetch).await?;

        Ok(self.finish())
    }

    /// Dispatch `requests` and any follow-up pages they uncover, round by round
    async fn run<F, Fut>(&mut self, requests: Vec<(usize, PageRequest)>, fetch: &F) -> Result<()>
    where
        F: Fn(PageRequest) -> Fut,
        Fut: Future<Output = Result<PageResult>>,
    {
        let mut round = requests;

        while !round.is_empty() {
            let limit = self.options.max_in_flight.unwrap_or(round.len()).max(1);
            let timeout = self.options.request_timeout;

            self.outstanding += round.len();
            debug!(
                "dispatching {} request(s), up to {limit} in flight",
                self.outstanding
            );

            let mut follow_ups = Vec::new();
            let mut completions = stream::iter(round.into_iter().map(|(member, request)| {
                let pending = fetch(request.clone());
                async move {
                    let result = match timeout {
                        Some(limit) => tokio::time::timeout(limit, pending)
                            .await
                            .unwrap_or_else(|_| {
                                Err(Error::Timeout {
                                    timeout_ms: limit.as_millis() as u64,
                                })
                            }),
                        None => pending.await,
                    };
                    (member, request, result)
                }
            }))
            .buffer_unordered(limit);

            while let Some((member, request, result)) = completions.next().await {
                follow_ups.extend(self.settle(member, &request, result)?);
            }

            round = follow_ups;
        }

        Ok(())
    }

    /// Record the completion of one request; each request settles exactly once.
    ///
    /// Returns the remaining pages when a first page reports more than one.
    fn settle(
        &mut self,
        member: usize,
        request: &PageRequest,
        result: Result<PageResult>,
    ) -> Result<Vec<(usize, PageRequest)>> {
        self.outstanding -= 1;

        match result {
            Ok(page) => {
                self.succeeded += 1;

                let pages = page.page_count();
                let follow_ups = if request.page == 1 && pages > 1 {
                    info!(
                        "{} {:?}: {} records span {pages} pages, fetching pages 2..={pages}",
                        request.resource.path, request.filters, page.total
                    );
                    (2..=pages)
                        .map(|p| (member, request.with_page(p as u32)))
                        .collect()
                } else {
                    Vec::new()
                };

                self.contributions.push(Contribution {
                    member,
                    page: request.page,
                    items: page.items,
                });
                Ok(follow_ups)
            }
            Err(e) if self.options.policy.is_fail_fast() => {
                Err(Error::page_fetch(request.resource.path, request.page, e))
            }
            Err(e) => {
                self.failed += 1;
                warn!(
                    "{} page {} {:?}: dropping contribution: {e}",
                    request.resource.path, request.page, request.filters
                );
                Ok(Vec::new())
            }
        }
    }

    fn finish(mut self) -> BatchOutcome {
        debug_assert_eq!(self.outstanding, 0);

        // Members rank by the completion of their first contribution, pages
        // within a member by page number
        let mut rank: HashMap<usize, usize> = HashMap::new();
        for contribution in &self.contributions {
            let next = rank.len();
            rank.entry(contribution.member).or_insert(next);
        }
        self.contributions
            .sort_by_key(|c| (rank.get(&c.member).copied().unwrap_or(usize::MAX), c.page));

        let records: Vec<Record> = self
            .contributions
            .into_iter()
            .flat_map(|c| c.items)
            .collect();

        if self.failed > 0 {
            warn!(
                "batch finished with {} failed request(s); result may be incomplete",
                self.failed
            );
        }
        info!(
            "batch collected {} record(s) from {} request(s)",
            records.len(),
            self.succeeded
        );

        BatchOutcome {
            records,
            succeeded: self.succeeded,
            failed: self.failed,
        }
    }
}

impl Default for BatchCollector {
    fn default() -> Self {
        Self::new(BatchOptions::default())
    }
}
