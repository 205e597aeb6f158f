//! Paginated search aggregation.
//!
//! # Design
//! The search endpoint returns one page at a time plus a `meta` block. The
//! `Paginator` reads page 1, plans how many pages to walk from that meta, and
//! then fetches the remaining pages strictly in order, because whether page
//! `n + 1` is requested at all depends on what page `n` returned.
//!
//! Page 1 is fetched once: its records are the first slice of the result, so
//! the number of requests issued equals the number of pages consumed.
//!
//! Once page 1 has succeeded, failures are absorbed. A later page that errors,
//! a tripped `CancelFlag` or an expired deadline all end the walk early and
//! the records gathered so far are returned with a `StopReason` saying why.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::client::MarketClient;
use crate::error::ApiError;
use crate::http::Transport;
use crate::types::{PageMeta, Record, SearchQuery};

/// Shared flag a caller can trip from another thread to stop an aggregation
/// before its next page fetch.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why an aggregation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Page 1 reported `total == 0`.
    Empty,
    /// Every planned page was consumed.
    Exhausted,
    /// `page` held fewer records than requested before the plan ran out.
    ShortPage { page: u32 },
    /// Fetching `page` failed; see `AggregationResult::last_error`.
    Failed { page: u32 },
    /// The cancel flag was set before `page` was requested.
    Cancelled { page: u32 },
    /// The deadline passed before `page` was requested.
    DeadlineExceeded { page: u32 },
}

/// Records gathered by one aggregation, in ascending page order.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult {
    pub records: Vec<Record>,
    /// `meta.total` as reported by page 1.
    pub total: u64,
    /// Pages the plan called for after applying `max_pages`.
    pub pages_planned: u32,
    /// Search requests issued, page 1 included.
    pub requests: u32,
    pub stop: StopReason,
    pub last_error: Option<ApiError>,
}

impl AggregationResult {
    fn new(total: u64, pages_planned: u32) -> Self {
        Self {
            records: Vec::new(),
            total,
            pages_planned,
            requests: 1,
            stop: StopReason::Exhausted,
            last_error: None,
        }
    }

    /// True unless the walk was cut short by an error, cancellation or deadline.
    pub fn completed_fully(&self) -> bool {
        matches!(
            self.stop,
            StopReason::Empty | StopReason::Exhausted | StopReason::ShortPage { .. }
        )
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Append one page; returns false when that page ends the walk.
    fn absorb(&mut self, page: u32, records: Vec<Record>, per_page: u32) -> bool {
        let count = records.len();
        self.records.extend(records);
        debug!(page, pages = self.pages_planned, count, "page absorbed");
        if (count as u64) < u64::from(per_page) {
            if page < self.pages_planned {
                info!(page, count, per_page, "short page, assuming end of results");
                self.stop = StopReason::ShortPage { page };
            }
            return false;
        }
        true
    }
}

/// Number of pages to walk: `last_page` when the server sent one, otherwise
/// `ceil(total / per_page)`, then capped by `max_pages`.
pub fn plan_pages(meta: &PageMeta, per_page: u32, max_pages: Option<u32>) -> u32 {
    let per_page = u64::from(per_page.max(1));
    let computed = meta.total.div_ceil(per_page).min(u64::from(u32::MAX)) as u32;
    let needed = meta.last_page.unwrap_or(computed);
    match max_pages {
        Some(cap) => needed.min(cap),
        None => needed,
    }
}

/// Walks every page of a search query through a `MarketClient`.
#[derive(Debug, Clone)]
pub struct Paginator<'a> {
    client: &'a MarketClient,
    max_pages: Option<u32>,
    cancel: Option<CancelFlag>,
    deadline: Option<Instant>,
}

impl<'a> Paginator<'a> {
    pub fn new(client: &'a MarketClient) -> Self {
        Self {
            client,
            max_pages: None,
            cancel: None,
            deadline: None,
        }
    }

    pub fn max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn cancel_on(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Fetch every page of `query`, starting from page 1 whatever page the
    /// query names. Only a failure on page 1 is returned as `Err`.
    pub fn aggregate<T: Transport + ?Sized>(
        &self,
        transport: &T,
        query: &SearchQuery,
    ) -> Result<AggregationResult, ApiError> {
        let per_page = query.page_size();
        let first = self.client.fetch_page(transport, &query.clone().page(1))?;
        let total = first.meta.total;

        if total == 0 {
            debug!(term = query.term(), "search reported no results");
            let mut result = AggregationResult::new(0, 0);
            result.stop = StopReason::Empty;
            return Ok(result);
        }

        let pages_planned = plan_pages(&first.meta, per_page, self.max_pages);
        info!(
            total,
            pages = pages_planned,
            per_page,
            term = query.term(),
            "aggregating search results"
        );

        let mut result = AggregationResult::new(total, pages_planned);
        if pages_planned == 0 || !result.absorb(1, first.records, per_page) {
            return Ok(result);
        }

        for page in 2..=pages_planned {
            if let Some(stop) = self.interrupted(page) {
                warn!(page, ?stop, "aggregation interrupted, returning partial results");
                result.stop = stop;
                break;
            }

            result.requests += 1;
            let fetched = match self.client.fetch_page(transport, &query.clone().page(page)) {
                Ok(fetched) => fetched,
                Err(e) => {
                    warn!(
                        page,
                        error = %e,
                        gathered = result.records.len(),
                        "page fetch failed, returning partial results"
                    );
                    result.stop = StopReason::Failed { page };
                    result.last_error = Some(e);
                    break;
                }
            };

            if !result.absorb(page, fetched.records, per_page) {
                break;
            }
        }

        info!(
            records = result.records.len(),
            requests = result.requests,
            complete = result.completed_fully(),
            "aggregation finished"
        );
        Ok(result)
    }

    fn interrupted(&self, page: u32) -> Option<StopReason> {
        if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
            return Some(StopReason::Cancelled { page });
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(StopReason::DeadlineExceeded { page });
        }
        None
    }
}

impl MarketClient {
    /// Every page of `query`, optionally capped at `max_pages`.
    pub fn search_all<T: Transport + ?Sized>(
        &self,
        transport: &T,
        query: &SearchQuery,
        max_pages: Option<u32>,
    ) -> Result<AggregationResult, ApiError> {
        Paginator::new(self).max_pages(max_pages).aggregate(transport, query)
    }
}
