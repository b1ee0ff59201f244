//! Domain error types
//!
//! This module defines the error hierarchy for airsync.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main airsync error type
///
/// This is the primary error type used throughout the application.
/// It wraps the fetch and store error families and provides context for
/// error handling at the command boundary.
#[derive(Debug, Error)]
pub enum AirSyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Remote API errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Persistence errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Classification of a fetch failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Network failure, timeout, rate limit or 5xx. The caller may retry.
    Transient,
    /// 4xx or a response that violates the expected shape. The stream must abort.
    Fatal,
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchErrorKind::Transient => write!(f, "TransientFetchError"),
            FetchErrorKind::Fatal => write!(f, "FatalFetchError"),
        }
    }
}

/// Remote API errors
///
/// Errors that occur when fetching pages from the source API.
/// These errors don't expose third-party HTTP client types.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Failed to connect to the API server
    #[error("Failed to connect to API server: {0}")]
    Connection(String),

    /// Request exceeded its timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Rate limit exceeded (429)
    #[error("Rate limit exceeded, retry after {retry_after_secs:?}s: {message}")]
    RateLimited {
        retry_after_secs: Option<u64>,
        message: String,
    },

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Response decoded but does not have the expected shape
    #[error("Unexpected response shape: {0}")]
    SchemaViolation(String),
}

impl FetchError {
    /// Transient/fatal classification of this error
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Connection(_)
            | FetchError::Timeout(_)
            | FetchError::RateLimited { .. }
            | FetchError::ServerError { .. } => FetchErrorKind::Transient,
            FetchError::ClientError { .. }
            | FetchError::InvalidResponse(_)
            | FetchError::SchemaViolation(_) => FetchErrorKind::Fatal,
        }
    }

    /// Whether the failed request may be retried
    pub fn is_transient(&self) -> bool {
        self.kind() == FetchErrorKind::Transient
    }

    /// Minimum delay requested by the server before retrying, if any
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            FetchError::RateLimited {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }
}

/// Persistence errors
///
/// Natural-key conflicts are never reported here; they resolve to a
/// [`WriteOutcome`](crate::adapters::database::WriteOutcome).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Store cannot be reached or no connection is available
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A query or statement failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema setup failed
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Stored data could not be decoded
    #[error("Invalid stored data: {0}")]
    Decode(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for AirSyncError {
    fn from(err: std::io::Error) -> Self {
        AirSyncError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for AirSyncError {
    fn from(err: serde_json::Error) -> Self {
        AirSyncError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for AirSyncError {
    fn from(err: toml::de::Error) -> Self {
        AirSyncError::Configuration(format!("TOML parse error: {err}"))
    }
}
