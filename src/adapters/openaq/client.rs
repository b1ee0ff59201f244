//! HTTP client for the OpenAQ API

use super::models::{Endpoint, Page, PageRequest};
use super::DataSource;
use crate::config::{SecretString, SourceConfig};
use crate::domain::{AirSyncError, FetchError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, StatusCode};
use secrecy::ExposeSecret;
use std::time::Duration;

/// Header carrying the optional API key
const API_KEY_HEADER: &str = "X-API-Key";

/// Longest response body excerpt kept in error messages
const ERROR_BODY_LIMIT: usize = 512;

/// reqwest-backed [`DataSource`]
///
/// # Example
///
/// ```no_run
/// use airsync::adapters::openaq::{DataSource, Endpoint, OpenAqClient, PageCursor, PageRequest};
/// use airsync::config::SourceConfig;
///
/// # async fn example() -> airsync::domain::Result<()> {
/// let client = OpenAqClient::new(&SourceConfig::default())?;
/// let page = client
///     .fetch_page(&PageRequest {
///         endpoint: Endpoint::Locations,
///         limit: 100,
///         cursor: PageCursor::default(),
///         since: None,
///     })
///     .await?;
/// println!("{} locations", page.records.len());
/// # Ok(())
/// # }
/// ```
pub struct OpenAqClient {
    client: Client,
    locations_base_url: String,
    measurements_base_url: String,
    api_key: Option<SecretString>,
}

impl OpenAqClient {
    /// Builds a client with the configured per-request timeout
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("airsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AirSyncError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            locations_base_url: config.locations_base_url.trim_end_matches('/').to_string(),
            measurements_base_url: config
                .measurements_base_url
                .trim_end_matches('/')
                .to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url_for(&self, endpoint: Endpoint) -> String {
        let base = match endpoint {
            Endpoint::Locations => &self.locations_base_url,
            Endpoint::Measurements => &self.measurements_base_url,
        };
        format!("{base}{}", endpoint.path())
    }
}

#[async_trait]
impl DataSource for OpenAqClient {
    async fn fetch_page(&self, request: &PageRequest) -> std::result::Result<Page, FetchError> {
        let url = self.url_for(request.endpoint);

        tracing::debug!(
            url = %url,
            cursor = ?request.cursor,
            limit = request.limit,
            "Requesting page"
        );

        let mut builder = self.client.get(&url).query(&request.query_params());
        if let Some(ref key) = self.api_key {
            builder = builder.header(API_KEY_HEADER, key.expose_secret().as_str());
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();

        if !status.is_success() {
            let retry_after_secs = retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, retry_after_secs, &body));
        }

        let text = response.text().await.map_err(map_transport_error)?;
        let body: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            FetchError::InvalidResponse(format!("{} returned invalid JSON: {e}", request.endpoint))
        })?;

        Page::from_body(request, body)
    }
}

fn map_transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(err.to_string())
    } else if err.is_decode() {
        FetchError::InvalidResponse(err.to_string())
    } else {
        FetchError::Connection(err.to_string())
    }
}

fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Maps a non-success status to a fetch error
fn classify_status(status: StatusCode, retry_after_secs: Option<u64>, body: &str) -> FetchError {
    let message: String = body.chars().take(ERROR_BODY_LIMIT).collect();

    if status == StatusCode::TOO_MANY_REQUESTS {
        FetchError::RateLimited {
            retry_after_secs,
            message,
        }
    } else if status.is_server_error() {
        FetchError::ServerError {
            status: status.as_u16(),
            message,
        }
    } else {
        FetchError::ClientError {
            status: status.as_u16(),
            message,
        }
    }
}
