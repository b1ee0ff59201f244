//! Lazy page iteration over a [`DataSource`]

use super::models::{Endpoint, Page, PageCursor, PageRequest};
use super::DataSource;
use crate::domain::FetchError;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Walks one listing page by page
///
/// The cursor only moves after a successful fetch, so calling
/// [`next_page`](Paginator::next_page) again after an error requests the
/// same page.
pub struct Paginator {
    source: Arc<dyn DataSource>,
    endpoint: Endpoint,
    limit: usize,
    since: Option<DateTime<Utc>>,
    cursor: Option<PageCursor>,
    pages_fetched: u32,
}

impl Paginator {
    pub fn new(
        source: Arc<dyn DataSource>,
        endpoint: Endpoint,
        limit: usize,
        since: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            source,
            endpoint,
            limit,
            since,
            cursor: Some(PageCursor::default()),
            pages_fetched: 0,
        }
    }

    /// The request the next call will issue, `None` when exhausted
    pub fn pending_request(&self) -> Option<PageRequest> {
        self.cursor.as_ref().map(|cursor| PageRequest {
            endpoint: self.endpoint,
            limit: self.limit,
            cursor: cursor.clone(),
            since: self.since,
        })
    }

    /// Fetches the next page, or `Ok(None)` once the listing is exhausted
    pub async fn next_page(&mut self) -> Result<Option<Page>, FetchError> {
        let Some(request) = self.pending_request() else {
            return Ok(None);
        };

        let page = self.source.fetch_page(&request).await?;
        self.cursor = page.next.clone();
        self.pages_fetched += 1;

        crate::log_page_fetched!(self.endpoint, self.pages_fetched, page.records.len());
        Ok(Some(page))
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_none()
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }
}
