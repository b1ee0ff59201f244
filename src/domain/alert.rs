//! Site alert rules and alerts
//!
//! A rule watches one `(site, pollutant)` pair and fires when a measured value
//! crosses its threshold. Each rule has at most one alert in the `active`
//! state; a new breach refreshes that alert instead of opening another.

use super::ids::{AlertRuleCode, PollutantCode, SiteCode};
use super::records::{Measurement, MeasurementKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a threshold comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Fires when the value is greater than or equal to the threshold
    #[default]
    Above,
    /// Fires when the value is less than or equal to the threshold
    Below,
}

impl Comparison {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Above => "above",
            Comparison::Below => "below",
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "above" => Ok(Comparison::Above),
            "below" => Ok(Comparison::Below),
            other => Err(format!(
                "Invalid comparison '{other}'. Must be one of: above, below"
            )),
        }
    }
}

/// Threshold configured for a site/pollutant combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub code: AlertRuleCode,
    pub site_code: SiteCode,
    pub pollutant_code: PollutantCode,
    pub name: String,
    pub threshold: f64,
    pub comparison: Comparison,
    pub active: bool,
}

impl AlertRule {
    /// Whether `value` breaches the configured threshold
    pub fn is_triggered(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self.comparison {
            Comparison::Above => value >= self.threshold,
            Comparison::Below => value <= self.threshold,
        }
    }

    /// Whether `measurement` references the same site and pollutant
    pub fn matches(&self, measurement: &Measurement) -> bool {
        self.site_code == measurement.site_code && self.pollutant_code == measurement.pollutant_code
    }
}

/// Lifecycle state of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    #[default]
    Active,
    Acknowledged,
    Muted,
}

impl AlertState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::Active => "active",
            AlertState::Acknowledged => "acknowledged",
            AlertState::Muted => "muted",
        }
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(AlertState::Active),
            "acknowledged" => Ok(AlertState::Acknowledged),
            "muted" => Ok(AlertState::Muted),
            other => Err(format!("Unknown alert state '{other}'")),
        }
    }
}

/// An alert raised by a rule breach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteAlert {
    pub rule_code: AlertRuleCode,
    pub measurement: MeasurementKey,
    pub triggered_at: DateTime<Utc>,
    pub value: f64,
    pub state: AlertState,
}

impl SiteAlert {
    /// Opens a new active alert for `rule` from `measurement`
    pub fn raise(rule: &AlertRule, measurement: &Measurement) -> Self {
        Self {
            rule_code: rule.code.clone(),
            measurement: measurement.key(),
            triggered_at: measurement.observed_at,
            value: measurement.value,
            state: AlertState::Active,
        }
    }

    /// Points an existing alert at a newer breaching measurement
    pub fn refresh(&mut self, measurement: &Measurement) {
        self.measurement = measurement.key();
        self.triggered_at = measurement.observed_at;
        self.value = measurement.value;
        self.state = AlertState::Active;
    }

    pub fn is_active(&self) -> bool {
        self.state == AlertState::Active
    }
}
