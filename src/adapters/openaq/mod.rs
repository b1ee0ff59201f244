//! OpenAQ source adapter
//!
//! [`DataSource`] is the seam between the sync pipeline and the remote API.
//! [`OpenAqClient`] implements it over HTTP; tests substitute scripted sources.

pub mod client;
pub mod models;
pub mod paginator;

pub use client::OpenAqClient;
pub use models::{Endpoint, Page, PageCursor, PageRequest};
pub use paginator::Paginator;

use crate::domain::FetchError;
use async_trait::async_trait;

/// A paginated source of raw JSON records
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetches one page
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] classified as transient or fatal.
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page, FetchError>;
}
