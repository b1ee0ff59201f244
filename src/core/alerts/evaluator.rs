//! Rule evaluation against stored measurements

use crate::adapters::database::{Store, WriteOutcome};
use crate::domain::{Measurement, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Checks measurements against the active rules for their site and pollutant
pub struct AlertEvaluator {
    store: Arc<dyn Store>,
}

impl AlertEvaluator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Evaluates one measurement, returning how many alerts it opened or moved
    ///
    /// Each triggered rule refreshes its active alert, or opens one when the
    /// rule has none. An alert already pointing at this measurement is not
    /// counted again.
    pub async fn evaluate_measurement(&self, measurement: &Measurement) -> Result<usize> {
        let rules = self
            .store
            .active_rules_for(&measurement.site_code, &measurement.pollutant_code)
            .await?;

        let mut triggered = 0;
        for rule in rules.iter().filter(|rule| rule.is_triggered(measurement.value)) {
            let outcome = self.store.record_alert(rule, measurement).await?;
            if !outcome.is_write() {
                continue;
            }
            if outcome == WriteOutcome::Inserted {
                tracing::info!(
                    rule = %rule.code,
                    site = %measurement.site_code,
                    pollutant = %measurement.pollutant_code,
                    value = measurement.value,
                    threshold = rule.threshold,
                    "Alert raised"
                );
            } else {
                tracing::debug!(rule = %rule.code, "Alert refreshed");
            }
            triggered += 1;
        }
        Ok(triggered)
    }

    /// Re-evaluates everything observed at or after `since`, oldest first
    pub async fn evaluate_since(&self, since: DateTime<Utc>) -> Result<usize> {
        let measurements = self.store.measurements_since(since).await?;
        let mut triggered = 0;
        for measurement in &measurements {
            triggered += self.evaluate_measurement(measurement).await?;
        }

        tracing::debug!(
            since = %since.to_rfc3339(),
            measurements = measurements.len(),
            triggered = triggered,
            "Re-evaluated recent measurements"
        );
        Ok(triggered)
    }
}
