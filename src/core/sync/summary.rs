//! Sync run summary and reporting

use super::phase::SyncPhase;
use crate::core::normalize::SkipReason;
use crate::domain::{AirSyncError, FetchError};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Counters for the `/locations` stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceCounts {
    /// Raw records received
    pub seen: usize,
    /// Locations whose region or site changed
    pub written: usize,
    /// Records that could not be normalized
    pub skipped: usize,
    pub regions_inserted: usize,
    pub regions_updated: usize,
    pub sites_inserted: usize,
    pub sites_updated: usize,
}

/// Counters for the `/measurements` stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurementCounts {
    /// Raw records received
    pub seen: usize,
    /// Records that normalized into a measurement
    pub normalized: usize,
    /// Records that could not be normalized
    pub skipped: usize,
    /// Measurements newly stored
    pub written: usize,
    /// Measurements whose key was already stored
    pub duplicates: usize,
    pub pollutants_created: usize,
}

/// Classification of a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    TransientFetch,
    FatalFetch,
    Store,
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::TransientFetch => "TransientFetchError",
            FailureKind::FatalFetch => "FatalFetchError",
            FailureKind::Store => "StoreError",
            FailureKind::Internal => "InternalError",
        };
        f.write_str(name)
    }
}

/// Why a run ended in [`SyncPhase::Failed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&FetchError> for SyncFailure {
    fn from(err: &FetchError) -> Self {
        let kind = if err.is_transient() {
            FailureKind::TransientFetch
        } else {
            FailureKind::FatalFetch
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

impl From<&AirSyncError> for SyncFailure {
    fn from(err: &AirSyncError) -> Self {
        match err {
            AirSyncError::Fetch(fetch) => fetch.into(),
            AirSyncError::Store(_) => Self {
                kind: FailureKind::Store,
                message: err.to_string(),
            },
            _ => Self {
                kind: FailureKind::Internal,
                message: err.to_string(),
            },
        }
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Outcome of one sync run
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    pub reference: ReferenceCounts,
    pub measurements: MeasurementCounts,
    /// Skips per reason across both stages
    pub skip_reasons: BTreeMap<SkipReason, usize>,
    pub alerts_triggered: usize,
    pub alert_rules_seeded: usize,
    pub pages_fetched: u32,
    pub retries: u32,
    pub phase: SyncPhase,
    pub failure: Option<SyncFailure>,
    pub duration: Duration,
    /// Inclusive lower bound used for the measurement fetch
    pub window_start: Option<DateTime<Utc>>,
    /// Watermark after the run
    pub final_watermark: Option<DateTime<Utc>>,
}

impl SyncSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_skip(&mut self, reason: SkipReason) {
        *self.skip_reasons.entry(reason).or_insert(0) += 1;
    }

    pub fn exit_code(&self) -> i32 {
        self.phase.exit_code()
    }

    /// One-line human-readable report
    pub fn summary_line(&self) -> String {
        let r = &self.reference;
        let m = &self.measurements;
        let mut line = format!(
            "phase={} locations(seen={} written={} skipped={}) regions(+{} ~{}) sites(+{} ~{}) \
             measurements(seen={} normalized={} skipped={} written={} duplicates={}) \
             pollutants_created={} alerts_triggered={} duration={:.1}s",
            self.phase,
            r.seen,
            r.written,
            r.skipped,
            r.regions_inserted,
            r.regions_updated,
            r.sites_inserted,
            r.sites_updated,
            m.seen,
            m.normalized,
            m.skipped,
            m.written,
            m.duplicates,
            m.pollutants_created,
            self.alerts_triggered,
            self.duration.as_secs_f64(),
        );

        match self.final_watermark {
            Some(ts) => line.push_str(&format!(" watermark={}", ts.to_rfc3339())),
            None => line.push_str(" watermark=none"),
        }
        if let Some(ref failure) = self.failure {
            line.push_str(&format!(" failure=\"{failure}\""));
        }
        line
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            phase = %self.phase,
            locations_seen = self.reference.seen,
            locations_written = self.reference.written,
            locations_skipped = self.reference.skipped,
            measurements_seen = self.measurements.seen,
            measurements_written = self.measurements.written,
            measurements_duplicates = self.measurements.duplicates,
            measurements_skipped = self.measurements.skipped,
            pollutants_created = self.measurements.pollutants_created,
            alerts_triggered = self.alerts_triggered,
            pages = self.pages_fetched,
            retries = self.retries,
            duration_ms = self.duration.as_millis() as u64,
            "Sync finished"
        );

        for (reason, count) in &self.skip_reasons {
            tracing::info!(reason = %reason, count = count, "Skipped records");
        }

        if let Some(ref failure) = self.failure {
            tracing::error!(kind = %failure.kind, message = %failure.message, "Sync failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StoreError;

    #[test]
    fn test_record_skip_groups_by_reason() {
        let mut summary = SyncSummary::new();
        summary.record_skip(SkipReason::MissingPollutant);
        summary.record_skip(SkipReason::MissingPollutant);
        summary.record_skip(SkipReason::UnknownSite);

        assert_eq!(summary.skip_reasons[&SkipReason::MissingPollutant], 2);
        assert_eq!(summary.skip_reasons[&SkipReason::UnknownSite], 1);
    }

    #[test]
    fn test_failure_classification() {
        let transient = FetchError::ServerError {
            status: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(SyncFailure::from(&transient).kind, FailureKind::TransientFetch);

        let fatal: AirSyncError = FetchError::SchemaViolation("no results".into()).into();
        assert_eq!(SyncFailure::from(&fatal).kind, FailureKind::FatalFetch);

        let store: AirSyncError = StoreError::Unavailable("down".into()).into();
        let failure = SyncFailure::from(&store);
        assert_eq!(failure.kind, FailureKind::Store);
        assert!(failure.to_string().starts_with("StoreError: "));
    }

    #[test]
    fn test_summary_line() {
        let mut summary = SyncSummary::new();
        summary.phase = SyncPhase::Done;
        summary.measurements.written = 3;
        summary.measurements.duplicates = 1;

        let line = summary.summary_line();
        assert!(line.starts_with("phase=done"));
        assert!(line.contains("written=3 duplicates=1"));
        assert!(line.contains("watermark=none"));
        assert!(!line.contains("failure="));
        assert_eq!(summary.exit_code(), 0);
    }
}
