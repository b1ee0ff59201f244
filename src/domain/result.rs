//! Result type alias for airsync
//!
//! This module provides a convenient Result type alias that uses AirSyncError
//! as the error type.

use super::errors::AirSyncError;

/// Result type alias for airsync operations
///
/// # Examples
///
/// ```
/// use airsync::domain::result::Result;
/// use airsync::domain::errors::AirSyncError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(AirSyncError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, AirSyncError>;
