//! Raw record normalization
//!
//! Turns source JSON into canonical records. Normalization never fails: a
//! record that cannot be interpreted becomes [`NormalizeOutcome::Skip`] with a
//! [`SkipReason`], and the caller counts and logs it.

pub mod location;
pub mod measurement;

pub use location::{normalize_location, LocationRecord};
pub use measurement::{normalize_measurement, MeasurementRecord};

use crate::domain::SiteCode;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

/// Result of normalizing one raw record
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeOutcome<T> {
    Record(T),
    Skip(SkipReason),
}

impl<T> NormalizeOutcome<T> {
    pub fn record(self) -> Option<T> {
        match self {
            NormalizeOutcome::Record(record) => Some(record),
            NormalizeOutcome::Skip(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            NormalizeOutcome::Record(_) => None,
            NormalizeOutcome::Skip(reason) => Some(*reason),
        }
    }
}

/// Why a record was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    NotAnObject,
    MissingSiteId,
    UnknownSite,
    MissingPollutant,
    MissingValue,
    InvalidValue,
    MissingTimestamp,
    InvalidTimestamp,
}

impl SkipReason {
    /// Stable snake_case code used in logs and summaries
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::NotAnObject => "not_an_object",
            SkipReason::MissingSiteId => "missing_site_id",
            SkipReason::UnknownSite => "unknown_site",
            SkipReason::MissingPollutant => "missing_pollutant",
            SkipReason::MissingValue => "missing_value",
            SkipReason::InvalidValue => "invalid_value",
            SkipReason::MissingTimestamp => "missing_timestamp",
            SkipReason::InvalidTimestamp => "invalid_timestamp",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Site codes known to the store or seen during this run
#[derive(Debug, Clone, Default)]
pub struct SiteIndex {
    codes: HashSet<SiteCode>,
}

impl SiteIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: SiteCode) -> bool {
        self.codes.insert(code)
    }

    pub fn contains(&self, code: &SiteCode) -> bool {
        self.codes.contains(code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl FromIterator<SiteCode> for SiteIndex {
    fn from_iter<I: IntoIterator<Item = SiteCode>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().collect(),
        }
    }
}

/// Identifier that the source may send as a number or a string
fn id_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-blank string among `keys`
fn first_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Parses RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS[.f]` taken as UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
