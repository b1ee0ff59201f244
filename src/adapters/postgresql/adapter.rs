//! PostgreSQL implementation of [`Store`]
//!
//! Upserts use `ON CONFLICT ... DO UPDATE ... WHERE ... IS DISTINCT FROM` so
//! an unchanged row is not rewritten; `RETURNING (xmax = 0)` tells a fresh
//! insert apart from an update, and no returned row means unchanged.

use super::client::PostgreSQLClient;
use super::models::{
    alert_rule_from_row, measurement_from_row, site_alert_from_row, ALERT_RULE_COLUMNS,
    MEASUREMENT_COLUMNS, SITE_ALERT_COLUMNS,
};
use crate::adapters::database::{Store, StoreCounts, WriteOutcome};
use crate::domain::{
    AirSyncError, AlertRule, AlertState, Measurement, MonitoringSite, Pollutant, PollutantCode,
    Region, Result, SiteAlert, SiteCode, StoreError, StreamKey,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_postgres::Row;

/// PostgreSQL adapter
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

fn query_failed(err: tokio_postgres::Error) -> AirSyncError {
    StoreError::QueryFailed(err.to_string()).into()
}

/// Reads the `RETURNING (xmax = 0)` result of an upsert
fn upsert_outcome(rows: &[Row]) -> Result<WriteOutcome> {
    match rows.first() {
        None => Ok(WriteOutcome::Unchanged),
        Some(row) => {
            let inserted: bool = row
                .try_get(0)
                .map_err(|e| StoreError::Decode(e.to_string()))?;
            Ok(if inserted {
                WriteOutcome::Inserted
            } else {
                WriteOutcome::Updated
            })
        }
    }
}

fn count(row: &Row, idx: usize) -> Result<u64> {
    let n: i64 = row
        .try_get(idx)
        .map_err(|e| StoreError::Decode(e.to_string()))?;
    Ok(n.max(0) as u64)
}

#[async_trait]
impl Store for PostgreSQLAdapter {
    fn backend_name(&self) -> &'static str {
        "postgresql"
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.client.ensure_schema().await
    }

    async fn upsert_region(&self, region: &Region) -> Result<WriteOutcome> {
        let rows = self
            .client
            .query(
                "INSERT INTO regions (code, name, country) VALUES ($1, $2, $3)
                 ON CONFLICT (code) DO UPDATE
                    SET name = EXCLUDED.name, country = EXCLUDED.country, updated_at = NOW()
                    WHERE (regions.name, regions.country)
                        IS DISTINCT FROM (EXCLUDED.name, EXCLUDED.country)
                 RETURNING (xmax = 0) AS inserted",
                &[&region.code.as_str(), &region.name, &region.country],
            )
            .await?;
        upsert_outcome(&rows)
    }

    async fn upsert_site(&self, site: &MonitoringSite) -> Result<WriteOutcome> {
        let rows = self
            .client
            .query(
                "INSERT INTO monitoring_sites
                    (code, region_code, name, description, latitude, longitude)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (code) DO UPDATE
                    SET region_code = EXCLUDED.region_code,
                        name = EXCLUDED.name,
                        description = EXCLUDED.description,
                        latitude = EXCLUDED.latitude,
                        longitude = EXCLUDED.longitude,
                        updated_at = NOW()
                    WHERE (monitoring_sites.region_code, monitoring_sites.name,
                           monitoring_sites.description, monitoring_sites.latitude,
                           monitoring_sites.longitude)
                        IS DISTINCT FROM (EXCLUDED.region_code, EXCLUDED.name,
                           EXCLUDED.description, EXCLUDED.latitude, EXCLUDED.longitude)
                 RETURNING (xmax = 0) AS inserted",
                &[
                    &site.code.as_str(),
                    &site.region_code.as_str(),
                    &site.name,
                    &site.description,
                    &site.latitude,
                    &site.longitude,
                ],
            )
            .await?;
        upsert_outcome(&rows)
    }

    async fn ensure_pollutant(&self, pollutant: &Pollutant) -> Result<WriteOutcome> {
        let rows = self
            .client
            .query(
                "INSERT INTO pollutants (code, name, unit) VALUES ($1, $2, $3)
                 ON CONFLICT (code) DO UPDATE SET unit = EXCLUDED.unit
                    WHERE EXCLUDED.unit <> '' AND pollutants.unit IS DISTINCT FROM EXCLUDED.unit
                 RETURNING (xmax = 0) AS inserted",
                &[&pollutant.code.as_str(), &pollutant.name, &pollutant.unit],
            )
            .await?;
        upsert_outcome(&rows)
    }

    async fn insert_measurement(&self, measurement: &Measurement) -> Result<WriteOutcome> {
        let inserted = self
            .client
            .execute(
                "INSERT INTO measurements
                    (stream, site_code, pollutant_code, observed_at, value, unit,
                     external_id, ingested_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT ON CONSTRAINT uq_measurement_key DO NOTHING",
                &[
                    &measurement.stream.as_str(),
                    &measurement.site_code.as_str(),
                    &measurement.pollutant_code.as_str(),
                    &measurement.observed_at,
                    &measurement.value,
                    &measurement.unit,
                    &measurement.external_id,
                    &measurement.ingested_at,
                ],
            )
            .await?;

        Ok(if inserted == 0 {
            WriteOutcome::Duplicate
        } else {
            WriteOutcome::Inserted
        })
    }

    async fn site_codes(&self) -> Result<Vec<SiteCode>> {
        let rows = self
            .client
            .query("SELECT code FROM monitoring_sites ORDER BY code", &[])
            .await?;

        rows.iter()
            .map(|row| {
                let code: String = row
                    .try_get(0)
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                SiteCode::new(code).map_err(|e| StoreError::Decode(e).into())
            })
            .collect()
    }

    async fn site_name(&self, code: &SiteCode) -> Result<Option<String>> {
        let rows = self
            .client
            .query(
                "SELECT name FROM monitoring_sites WHERE code = $1",
                &[&code.as_str()],
            )
            .await?;

        rows.first()
            .map(|row| {
                row.try_get::<_, String>(0)
                    .map_err(|e| StoreError::Decode(e.to_string()).into())
            })
            .transpose()
    }

    async fn latest_observed_at(&self, stream: &StreamKey) -> Result<Option<DateTime<Utc>>> {
        let rows = self
            .client
            .query(
                "SELECT MAX(observed_at) FROM measurements WHERE stream = $1",
                &[&stream.as_str()],
            )
            .await?;

        match rows.first() {
            Some(row) => row
                .try_get::<_, Option<DateTime<Utc>>>(0)
                .map_err(|e| StoreError::Decode(e.to_string()).into()),
            None => Ok(None),
        }
    }

    async fn measurements_since(&self, since: DateTime<Utc>) -> Result<Vec<Measurement>> {
        let rows = self
            .client
            .query(
                &format!(
                    "SELECT {MEASUREMENT_COLUMNS} FROM measurements
                     WHERE observed_at >= $1 ORDER BY observed_at ASC"
                ),
                &[&since],
            )
            .await?;
        rows.iter().map(measurement_from_row).collect()
    }

    async fn latest_measurements(&self, limit: usize) -> Result<Vec<Measurement>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self
            .client
            .query(
                &format!(
                    "SELECT {MEASUREMENT_COLUMNS} FROM measurements
                     ORDER BY observed_at DESC LIMIT $1"
                ),
                &[&limit],
            )
            .await?;
        rows.iter().map(measurement_from_row).collect()
    }

    async fn active_rules_for(
        &self,
        site: &SiteCode,
        pollutant: &PollutantCode,
    ) -> Result<Vec<AlertRule>> {
        let rows = self
            .client
            .query(
                &format!(
                    "SELECT {ALERT_RULE_COLUMNS} FROM site_alert_rules
                     WHERE active AND site_code = $1 AND pollutant_code = $2
                     ORDER BY code"
                ),
                &[&site.as_str(), &pollutant.as_str()],
            )
            .await?;
        rows.iter().map(alert_rule_from_row).collect()
    }

    async fn alert_rules(&self) -> Result<Vec<AlertRule>> {
        let rows = self
            .client
            .query(
                &format!("SELECT {ALERT_RULE_COLUMNS} FROM site_alert_rules ORDER BY code"),
                &[],
            )
            .await?;
        rows.iter().map(alert_rule_from_row).collect()
    }

    async fn insert_alert_rule(&self, rule: &AlertRule) -> Result<WriteOutcome> {
        let inserted = self
            .client
            .execute(
                "INSERT INTO site_alert_rules
                    (code, site_code, pollutant_code, name, threshold, comparison, active)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT DO NOTHING",
                &[
                    &rule.code.as_str(),
                    &rule.site_code.as_str(),
                    &rule.pollutant_code.as_str(),
                    &rule.name,
                    &rule.threshold,
                    &rule.comparison.as_str(),
                    &rule.active,
                ],
            )
            .await?;

        Ok(if inserted == 0 {
            WriteOutcome::Duplicate
        } else {
            WriteOutcome::Inserted
        })
    }

    async fn record_alert(
        &self,
        rule: &AlertRule,
        measurement: &Measurement,
    ) -> Result<WriteOutcome> {
        let mut conn = self.client.connection().await?;
        let tx = conn.transaction().await.map_err(query_failed)?;

        let site = measurement.site_code.as_str();
        let pollutant = measurement.pollutant_code.as_str();
        let active = AlertState::Active.as_str();

        let current = tx
            .query_opt(
                "SELECT id, site_code, pollutant_code, observed_at FROM site_alerts
                 WHERE rule_code = $1 AND state = $2
                 FOR UPDATE",
                &[&rule.code.as_str(), &active],
            )
            .await
            .map_err(query_failed)?;

        // Refresh the active alert, else reactivate this measurement's alert, else open one
        let target_id: Option<i64> = match current {
            Some(row) => {
                let same_measurement = row.try_get::<_, String>(1).ok().as_deref() == Some(site)
                    && row.try_get::<_, String>(2).ok().as_deref() == Some(pollutant)
                    && row.try_get::<_, DateTime<Utc>>(3).ok() == Some(measurement.observed_at);
                if same_measurement {
                    tx.commit().await.map_err(query_failed)?;
                    return Ok(WriteOutcome::Unchanged);
                }
                Some(row.try_get(0).map_err(|e| StoreError::Decode(e.to_string()))?)
            }
            None => tx
                .query_opt(
                    "SELECT id FROM site_alerts
                     WHERE rule_code = $1 AND site_code = $2 AND pollutant_code = $3
                       AND observed_at = $4
                     LIMIT 1",
                    &[&rule.code.as_str(), &site, &pollutant, &measurement.observed_at],
                )
                .await
                .map_err(query_failed)?
                .map(|row| row.try_get(0))
                .transpose()
                .map_err(|e| StoreError::Decode(e.to_string()))?,
        };

        let outcome = match target_id {
            Some(id) => {
                tx.execute(
                    "UPDATE site_alerts
                     SET site_code = $2, pollutant_code = $3, observed_at = $4,
                         triggered_at = $4, value = $5, state = $6
                     WHERE id = $1",
                    &[
                        &id,
                        &site,
                        &pollutant,
                        &measurement.observed_at,
                        &measurement.value,
                        &active,
                    ],
                )
                .await
                .map_err(query_failed)?;
                WriteOutcome::Updated
            }
            None => {
                tx.execute(
                    "INSERT INTO site_alerts
                        (rule_code, site_code, pollutant_code, observed_at, triggered_at, value, state)
                     VALUES ($1, $2, $3, $4, $4, $5, $6)",
                    &[
                        &rule.code.as_str(),
                        &site,
                        &pollutant,
                        &measurement.observed_at,
                        &measurement.value,
                        &active,
                    ],
                )
                .await
                .map_err(query_failed)?;
                WriteOutcome::Inserted
            }
        };

        tx.commit().await.map_err(query_failed)?;
        Ok(outcome)
    }

    async fn active_alerts(&self) -> Result<Vec<SiteAlert>> {
        let rows = self
            .client
            .query(
                &format!(
                    "SELECT {SITE_ALERT_COLUMNS} FROM site_alerts
                     WHERE state = 'active' ORDER BY triggered_at DESC"
                ),
                &[],
            )
            .await?;
        rows.iter().map(site_alert_from_row).collect()
    }

    async fn counts(&self) -> Result<StoreCounts> {
        let rows = self
            .client
            .query(
                "SELECT
                    (SELECT COUNT(*) FROM regions),
                    (SELECT COUNT(*) FROM monitoring_sites),
                    (SELECT COUNT(*) FROM pollutants),
                    (SELECT COUNT(*) FROM measurements),
                    (SELECT COUNT(*) FROM site_alert_rules),
                    (SELECT COUNT(*) FROM site_alerts WHERE state = 'active')",
                &[],
            )
            .await?;

        let row = rows
            .first()
            .ok_or_else(|| StoreError::Decode("count query returned no rows".to_string()))?;

        Ok(StoreCounts {
            regions: count(row, 0)?,
            sites: count(row, 1)?,
            pollutants: count(row, 2)?,
            measurements: count(row, 3)?,
            alert_rules: count(row, 4)?,
            active_alerts: count(row, 5)?,
        })
    }
}
