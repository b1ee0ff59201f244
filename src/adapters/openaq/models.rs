//! Page request and response models for the OpenAQ API
//!
//! Responses have the shape `{ "meta": {...}, "results": [...] }`. Records are
//! kept as raw JSON; interpreting fields is the normalizer's job.

use crate::domain::FetchError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fmt;

/// Resource fetched from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `/locations`: reference data for regions and sites
    Locations,
    /// `/measurements`: time-series observations
    Measurements,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Locations => "/locations",
            Endpoint::Measurements => "/measurements",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Locations => "locations",
            Endpoint::Measurements => "measurements",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position within a paginated listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// 1-based page number
    Number(u32),
    /// Opaque cursor returned in `meta.next`
    Token(String),
}

impl Default for PageCursor {
    fn default() -> Self {
        PageCursor::Number(1)
    }
}

/// One page request
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub endpoint: Endpoint,
    pub limit: usize,
    pub cursor: PageCursor,
    /// Lower bound on observation time (inclusive); measurements only
    pub since: Option<DateTime<Utc>>,
}

impl PageRequest {
    /// Query string parameters for this request
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.limit.to_string())];

        match &self.cursor {
            PageCursor::Number(n) => params.push(("page", n.to_string())),
            PageCursor::Token(token) => params.push(("cursor", token.clone())),
        }

        if self.endpoint == Endpoint::Measurements {
            if let Some(since) = self.since {
                params.push((
                    "date_from",
                    since.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                ));
            }
            params.push(("order_by", "date".to_string()));
            params.push(("sort", "asc".to_string()));
        }

        params
    }
}

/// A decoded page of raw records
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<Value>,
    /// Where the next page starts, `None` once the listing is exhausted
    pub next: Option<PageCursor>,
}

impl Page {
    /// Decodes a response body for `request`
    ///
    /// The listing is exhausted when the page is short or `meta.next` is
    /// present and null. A string `meta.next` becomes the next cursor;
    /// otherwise page numbers advance by one.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::SchemaViolation`] when `results` is missing or
    /// not an array.
    pub fn from_body(request: &PageRequest, body: Value) -> Result<Self, FetchError> {
        let Value::Object(mut body) = body else {
            return Err(FetchError::SchemaViolation(
                "response body is not a JSON object".to_string(),
            ));
        };

        let records = match body.remove("results") {
            Some(Value::Array(records)) => records,
            Some(_) => {
                return Err(FetchError::SchemaViolation(
                    "'results' is not an array".to_string(),
                ))
            }
            None => {
                return Err(FetchError::SchemaViolation(
                    "'results' is missing".to_string(),
                ))
            }
        };

        let meta_next = body
            .get("meta")
            .and_then(Value::as_object)
            .and_then(|meta| meta.get("next"));

        let next = if records.len() < request.limit {
            None
        } else {
            match meta_next {
                Some(Value::Null) => None,
                Some(Value::String(token)) if !token.is_empty() => {
                    Some(PageCursor::Token(token.clone()))
                }
                _ => match &request.cursor {
                    PageCursor::Number(n) => Some(PageCursor::Number(n + 1)),
                    // A cursor-paged listing that stops handing out cursors is done
                    PageCursor::Token(_) => None,
                },
            }
        };

        Ok(Page { records, next })
    }
}
