//! Demo alert rules derived from recent data

use crate::adapters::database::{Store, WriteOutcome};
use crate::domain::{
    AirSyncError, AlertRule, AlertRuleCode, Comparison, Measurement, PollutantCode, Result,
    SiteCode,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Code prefix shared by generated rules
pub const DEMO_RULE_PREFIX: &str = "demo-alert";

/// How many recent measurements are scanned for candidate pairs
const SCAN_LIMIT: usize = 1000;

/// Threshold just under an observed value: `value * 0.9`, half-up to 3 decimals
pub fn demo_threshold(value: f64) -> f64 {
    let scaled = value * 0.9 * 1000.0;
    // Snap float noise first so 11.1105 does not round as 11.110499..
    let snapped = (scaled * 1e6).round() / 1e6;
    snapped.round() / 1000.0
}

fn demo_rule_code(site: &SiteCode, pollutant: &PollutantCode) -> Result<AlertRuleCode> {
    AlertRuleCode::new(format!("{DEMO_RULE_PREFIX}|{site}|{pollutant}"))
        .map_err(AirSyncError::Validation)
}

fn demo_rule(measurement: &Measurement, site_name: &str) -> Result<AlertRule> {
    Ok(AlertRule {
        code: demo_rule_code(&measurement.site_code, &measurement.pollutant_code)?,
        site_code: measurement.site_code.clone(),
        pollutant_code: measurement.pollutant_code.clone(),
        name: format!(
            "{} {} alert",
            site_name,
            measurement.pollutant_code.display_name()
        ),
        threshold: demo_threshold(measurement.value),
        comparison: Comparison::Above,
        active: true,
    })
}

/// Creates up to `max_rules` demo rules, one per recent `(site, pollutant)`
///
/// Nothing is created once `max_rules` demo rules exist. Returns the number
/// of rules created.
pub async fn ensure_demo_rules(store: &Arc<dyn Store>, max_rules: usize) -> Result<usize> {
    if max_rules == 0 {
        return Ok(0);
    }

    let existing: Vec<AlertRule> = store
        .alert_rules()
        .await?
        .into_iter()
        .filter(|rule| rule.code.as_str().starts_with(DEMO_RULE_PREFIX))
        .collect();
    if existing.len() >= max_rules {
        tracing::debug!(existing = existing.len(), "Demo alert rules already present");
        return Ok(0);
    }

    let mut seen: HashSet<(SiteCode, PollutantCode)> = existing
        .into_iter()
        .map(|rule| (rule.site_code, rule.pollutant_code))
        .collect();

    let mut created = 0;
    for measurement in store.latest_measurements(SCAN_LIMIT).await? {
        if created >= max_rules {
            break;
        }
        let pair = (measurement.site_code.clone(), measurement.pollutant_code.clone());
        if !seen.insert(pair) {
            continue;
        }

        let site_name = store
            .site_name(&measurement.site_code)
            .await?
            .unwrap_or_else(|| measurement.site_code.to_string());
        let rule = demo_rule(&measurement, &site_name)?;
        if store.insert_alert_rule(&rule).await? == WriteOutcome::Inserted {
            tracing::info!(
                rule = %rule.code,
                threshold = rule.threshold,
                "Created demo alert rule"
            );
            created += 1;
        }
    }

    Ok(created)
}
