//! Store abstraction
//!
//! Every write is keyed on the record's natural key and is idempotent:
//! replaying the same input leaves the store unchanged and reports
//! [`WriteOutcome::Unchanged`] or [`WriteOutcome::Duplicate`] instead of
//! failing.

use crate::domain::{
    AlertRule, Measurement, MonitoringSite, Pollutant, PollutantCode, Region, Result, SiteAlert,
    SiteCode, StreamKey,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Result of a keyed write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No row with this key existed
    Inserted,
    /// A row existed and at least one attribute changed
    Updated,
    /// A row existed with identical attributes
    Unchanged,
    /// Insert-only record whose key is already stored
    Duplicate,
}

impl WriteOutcome {
    /// Whether the store's contents changed
    pub fn is_write(&self) -> bool {
        matches!(self, WriteOutcome::Inserted | WriteOutcome::Updated)
    }
}

/// Row counts reported by `status`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub regions: u64,
    pub sites: u64,
    pub pollutants: u64,
    pub measurements: u64,
    pub alert_rules: u64,
    pub active_alerts: u64,
}

/// Persistence for the sync pipeline
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name for logs (`postgresql`, `memory`)
    fn backend_name(&self) -> &'static str;

    /// Test the connection
    ///
    /// # Errors
    ///
    /// Returns a store error if the backend cannot be reached.
    async fn test_connection(&self) -> Result<()>;

    /// Create tables and constraints if they do not exist
    async fn ensure_schema(&self) -> Result<()>;

    /// Insert or update a region by code
    async fn upsert_region(&self, region: &Region) -> Result<WriteOutcome>;

    /// Insert or update a site by code. The region must already exist.
    async fn upsert_site(&self, site: &MonitoringSite) -> Result<WriteOutcome>;

    /// Insert a pollutant if absent; update its unit when a different
    /// non-empty unit is reported
    async fn ensure_pollutant(&self, pollutant: &Pollutant) -> Result<WriteOutcome>;

    /// Insert a measurement unless its `(site, pollutant, observed_at)` key
    /// is already stored, in which case [`WriteOutcome::Duplicate`] is returned
    async fn insert_measurement(&self, measurement: &Measurement) -> Result<WriteOutcome>;

    /// Codes of every stored site
    async fn site_codes(&self) -> Result<Vec<SiteCode>>;

    /// Display name of a stored site, `None` when the code is unknown
    async fn site_name(&self, code: &SiteCode) -> Result<Option<String>>;

    /// Latest stored observation time for `stream`, `None` when empty
    async fn latest_observed_at(&self, stream: &StreamKey) -> Result<Option<DateTime<Utc>>>;

    /// Measurements observed at or after `since`, oldest first
    async fn measurements_since(&self, since: DateTime<Utc>) -> Result<Vec<Measurement>>;

    /// Most recent measurements, newest first
    async fn latest_measurements(&self, limit: usize) -> Result<Vec<Measurement>>;

    /// Active rules watching `(site, pollutant)`
    async fn active_rules_for(
        &self,
        site: &SiteCode,
        pollutant: &PollutantCode,
    ) -> Result<Vec<AlertRule>>;

    /// All rules, active or not
    async fn alert_rules(&self) -> Result<Vec<AlertRule>>;

    /// Insert a rule unless one with the same code or the same
    /// `(site, pollutant, name)` exists
    async fn insert_alert_rule(&self, rule: &AlertRule) -> Result<WriteOutcome>;

    /// Refresh the rule's active alert from `measurement`, or open one.
    ///
    /// Returns [`WriteOutcome::Inserted`] for a new alert,
    /// [`WriteOutcome::Updated`] when an active alert moved to this
    /// measurement and [`WriteOutcome::Unchanged`] when it already pointed here.
    async fn record_alert(&self, rule: &AlertRule, measurement: &Measurement)
        -> Result<WriteOutcome>;

    /// Alerts currently in the `active` state
    async fn active_alerts(&self) -> Result<Vec<SiteAlert>>;

    /// Row counts per table
    async fn counts(&self) -> Result<StoreCounts>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_outcome_is_write() {
        assert!(WriteOutcome::Inserted.is_write());
        assert!(WriteOutcome::Updated.is_write());
        assert!(!WriteOutcome::Unchanged.is_write());
        assert!(!WriteOutcome::Duplicate.is_write());
    }
}
