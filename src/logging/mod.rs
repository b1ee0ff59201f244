//! Logging and observability
//!
//! Structured logging through `tracing`, plus a few macros that keep the
//! field names of recurring sync events consistent.
//!
//! ```no_run
//! use airsync::logging::init_logging;
//! use airsync::config::LoggingConfig;
//!
//! let _guard = init_logging("info", &LoggingConfig::default()).expect("logging");
//! tracing::info!("airsync started");
//! ```

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log one fetched page
///
/// ```no_run
/// use airsync::log_page_fetched;
///
/// log_page_fetched!("measurements", 3, 100);
/// ```
#[macro_export]
macro_rules! log_page_fetched {
    ($endpoint:expr, $page:expr, $records:expr) => {
        tracing::debug!(
            endpoint = %$endpoint,
            page = $page,
            records = $records,
            "Fetched page"
        );
    };
}

/// Log a retry attempt
///
/// ```no_run
/// use airsync::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying request"
        );
    };
}

/// Log a sync phase transition
#[macro_export]
macro_rules! log_phase_transition {
    ($from:expr, $to:expr) => {
        tracing::info!(from = %$from, to = %$to, "Sync phase changed");
    };
}

/// Log an error with context
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
