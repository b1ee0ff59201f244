//! Row decoding for the PostgreSQL adapter

use crate::domain::{
    AlertRule, AlertRuleCode, AlertState, Comparison, Measurement, MeasurementKey,
    PollutantCode, Result, SiteAlert, SiteCode, StoreError, StreamKey,
};
use chrono::{DateTime, Utc};
use tokio_postgres::Row;

/// Columns selected for a measurement, in [`measurement_from_row`] order
pub const MEASUREMENT_COLUMNS: &str =
    "stream, site_code, pollutant_code, observed_at, value, unit, external_id, ingested_at";

/// Columns selected for a rule, in [`alert_rule_from_row`] order
pub const ALERT_RULE_COLUMNS: &str =
    "code, site_code, pollutant_code, name, threshold, comparison, active";

/// Columns selected for an alert, in [`site_alert_from_row`] order
pub const SITE_ALERT_COLUMNS: &str =
    "rule_code, site_code, pollutant_code, observed_at, triggered_at, value, state";

fn get<'a, T>(row: &'a Row, idx: usize) -> Result<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(idx)
        .map_err(|e| StoreError::Decode(format!("column {idx}: {e}")).into())
}

fn decode_key<T>(
    value: String,
    parse: impl FnOnce(String) -> std::result::Result<T, String>,
) -> Result<T> {
    parse(value).map_err(|e| StoreError::Decode(e).into())
}

pub fn measurement_from_row(row: &Row) -> Result<Measurement> {
    Ok(Measurement {
        stream: decode_key(get(row, 0)?, StreamKey::new)?,
        site_code: decode_key(get(row, 1)?, SiteCode::new)?,
        pollutant_code: decode_key(get(row, 2)?, PollutantCode::new)?,
        observed_at: get::<DateTime<Utc>>(row, 3)?,
        value: get(row, 4)?,
        unit: get(row, 5)?,
        external_id: get(row, 6)?,
        ingested_at: get::<DateTime<Utc>>(row, 7)?,
    })
}

pub fn alert_rule_from_row(row: &Row) -> Result<AlertRule> {
    let comparison: String = get(row, 5)?;
    Ok(AlertRule {
        code: decode_key(get(row, 0)?, AlertRuleCode::new)?,
        site_code: decode_key(get(row, 1)?, SiteCode::new)?,
        pollutant_code: decode_key(get(row, 2)?, PollutantCode::new)?,
        name: get(row, 3)?,
        threshold: get(row, 4)?,
        comparison: comparison
            .parse::<Comparison>()
            .map_err(StoreError::Decode)?,
        active: get(row, 6)?,
    })
}

pub fn site_alert_from_row(row: &Row) -> Result<SiteAlert> {
    let state: String = get(row, 6)?;
    Ok(SiteAlert {
        rule_code: decode_key(get(row, 0)?, AlertRuleCode::new)?,
        measurement: MeasurementKey {
            site_code: decode_key(get(row, 1)?, SiteCode::new)?,
            pollutant_code: decode_key(get(row, 2)?, PollutantCode::new)?,
            observed_at: get::<DateTime<Utc>>(row, 3)?,
        },
        triggered_at: get::<DateTime<Utc>>(row, 4)?,
        value: get(row, 5)?,
        state: state.parse::<AlertState>().map_err(StoreError::Decode)?,
    })
}
