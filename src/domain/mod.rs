//! Domain models and types for airsync.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Natural-key identifiers** ([`RegionCode`], [`SiteCode`], [`PollutantCode`], [`StreamKey`])
//! - **Canonical records** ([`Region`], [`MonitoringSite`], [`Pollutant`], [`Measurement`])
//! - **Alerting types** ([`AlertRule`], [`SiteAlert`])
//! - **Error types** ([`AirSyncError`], [`FetchError`], [`StoreError`])
//! - **Result type alias** ([`Result`])
//!
//! Identifiers use the newtype pattern so a site code can never be passed
//! where a pollutant code is expected:
//!
//! ```rust
//! use airsync::domain::{PollutantCode, SiteCode};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let site = SiteCode::new("2178")?;
//! let pollutant = PollutantCode::new("PM25")?;
//! assert_eq!(pollutant.as_str(), "pm25");
//! # let _ = site;
//! # Ok(())
//! # }
//! ```

pub mod alert;
pub mod errors;
pub mod ids;
pub mod records;
pub mod result;

// Re-export commonly used types for convenience
pub use alert::{AlertRule, AlertState, Comparison, SiteAlert};
pub use errors::{AirSyncError, FetchError, FetchErrorKind, StoreError};
pub use ids::{AlertRuleCode, PollutantCode, RegionCode, SiteCode, StreamKey};
pub use records::{Measurement, MeasurementKey, MonitoringSite, Pollutant, Region};
pub use result::Result;
