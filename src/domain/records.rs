//! Canonical record types
//!
//! These are the normalized shapes the store persists. Every record carries
//! its natural key; the store enforces uniqueness on it.

use super::ids::{PollutantCode, RegionCode, SiteCode, StreamKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic grouping for monitoring sites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Natural key, `"{country}|{name}"`
    pub code: RegionCode,

    /// Display name
    pub name: String,

    /// ISO country code, `"XX"` when the source omits it
    pub country: String,
}

/// A monitoring location that reports measurements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringSite {
    /// Natural key (source location id)
    pub code: SiteCode,

    /// Region this site belongs to
    pub region_code: RegionCode,

    /// Display name
    pub name: String,

    /// Free-form location description, empty when unknown
    pub description: String,

    /// Latitude in decimal degrees
    pub latitude: Option<f64>,

    /// Longitude in decimal degrees
    pub longitude: Option<f64>,
}

/// A measured substance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pollutant {
    /// Natural key (lower-cased parameter code)
    pub code: PollutantCode,

    /// Display name
    pub name: String,

    /// Unit of measure, e.g. `µg/m³`
    pub unit: String,
}

impl Pollutant {
    /// Builds the catalog entry for a code first seen with `unit`
    pub fn from_code(code: PollutantCode, unit: impl Into<String>) -> Self {
        Self {
            name: code.display_name(),
            code,
            unit: unit.into(),
        }
    }
}

/// Uniqueness key of a measurement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeasurementKey {
    pub site_code: SiteCode,
    pub pollutant_code: PollutantCode,
    pub observed_at: DateTime<Utc>,
}

impl std::fmt::Display for MeasurementKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}@{}",
            self.site_code,
            self.pollutant_code,
            self.observed_at.to_rfc3339()
        )
    }
}

/// A single observed value. Append-only once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Stream this measurement was ingested from
    pub stream: StreamKey,

    /// Reporting site
    pub site_code: SiteCode,

    /// Measured pollutant
    pub pollutant_code: PollutantCode,

    /// Observation time reported by the source
    pub observed_at: DateTime<Utc>,

    /// Observed value, never negative
    pub value: f64,

    /// Unit the value is expressed in
    pub unit: String,

    /// Identifier from the source, if it provides one
    pub external_id: Option<String>,

    /// When airsync stored the row
    pub ingested_at: DateTime<Utc>,
}

impl Measurement {
    /// The `(site, pollutant, observed_at)` uniqueness key
    pub fn key(&self) -> MeasurementKey {
        MeasurementKey {
            site_code: self.site_code.clone(),
            pollutant_code: self.pollutant_code.clone(),
            observed_at: self.observed_at,
        }
    }
}
