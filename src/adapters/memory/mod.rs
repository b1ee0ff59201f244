//! Process-local [`Store`]
//!
//! Backs `database_target = "memory"` and the pipeline tests. Contents live
//! only as long as the process. Natural-key semantics match the PostgreSQL
//! adapter.

use crate::adapters::database::{Store, StoreCounts, WriteOutcome};
use crate::domain::{
    AlertRule, AlertRuleCode, Measurement, MeasurementKey, MonitoringSite, Pollutant,
    PollutantCode, Region, RegionCode, Result, SiteAlert, SiteCode, StoreError, StreamKey,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    regions: HashMap<RegionCode, Region>,
    sites: HashMap<SiteCode, MonitoringSite>,
    pollutants: HashMap<PollutantCode, Pollutant>,
    measurements: BTreeMap<MeasurementKey, Measurement>,
    rules: BTreeMap<AlertRuleCode, AlertRule>,
    alerts: Vec<SiteAlert>,
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored measurement ordered by key
    pub async fn measurements(&self) -> Vec<Measurement> {
        self.tables.read().await.measurements.values().cloned().collect()
    }

    pub async fn regions(&self) -> Vec<Region> {
        let mut regions: Vec<_> = self.tables.read().await.regions.values().cloned().collect();
        regions.sort_by(|a, b| a.code.cmp(&b.code));
        regions
    }

    pub async fn sites(&self) -> Vec<MonitoringSite> {
        let mut sites: Vec<_> = self.tables.read().await.sites.values().cloned().collect();
        sites.sort_by(|a, b| a.code.cmp(&b.code));
        sites
    }

    pub async fn pollutant(&self, code: &PollutantCode) -> Option<Pollutant> {
        self.tables.read().await.pollutants.get(code).cloned()
    }

    /// Every alert, in creation order
    pub async fn alerts(&self) -> Vec<SiteAlert> {
        self.tables.read().await.alerts.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert_region(&self, region: &Region) -> Result<WriteOutcome> {
        let mut tables = self.tables.write().await;
        Ok(upsert(&mut tables.regions, region.code.clone(), region))
    }

    async fn upsert_site(&self, site: &MonitoringSite) -> Result<WriteOutcome> {
        let mut tables = self.tables.write().await;
        if !tables.regions.contains_key(&site.region_code) {
            return Err(StoreError::QueryFailed(format!(
                "site {} references unknown region {}",
                site.code, site.region_code
            ))
            .into());
        }
        Ok(upsert(&mut tables.sites, site.code.clone(), site))
    }

    async fn ensure_pollutant(&self, pollutant: &Pollutant) -> Result<WriteOutcome> {
        let mut tables = self.tables.write().await;
        match tables.pollutants.get_mut(&pollutant.code) {
            None => {
                tables
                    .pollutants
                    .insert(pollutant.code.clone(), pollutant.clone());
                Ok(WriteOutcome::Inserted)
            }
            Some(existing) if !pollutant.unit.is_empty() && existing.unit != pollutant.unit => {
                existing.unit = pollutant.unit.clone();
                Ok(WriteOutcome::Updated)
            }
            Some(_) => Ok(WriteOutcome::Unchanged),
        }
    }

    async fn insert_measurement(&self, measurement: &Measurement) -> Result<WriteOutcome> {
        let mut tables = self.tables.write().await;
        if !tables.sites.contains_key(&measurement.site_code) {
            return Err(StoreError::QueryFailed(format!(
                "measurement references unknown site {}",
                measurement.site_code
            ))
            .into());
        }
        if !tables.pollutants.contains_key(&measurement.pollutant_code) {
            return Err(StoreError::QueryFailed(format!(
                "measurement references unknown pollutant {}",
                measurement.pollutant_code
            ))
            .into());
        }

        let key = measurement.key();
        if tables.measurements.contains_key(&key) {
            return Ok(WriteOutcome::Duplicate);
        }
        tables.measurements.insert(key, measurement.clone());
        Ok(WriteOutcome::Inserted)
    }

    async fn site_codes(&self) -> Result<Vec<SiteCode>> {
        let mut codes: Vec<_> = self.tables.read().await.sites.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }

    async fn site_name(&self, code: &SiteCode) -> Result<Option<String>> {
        Ok(self
            .tables
            .read()
            .await
            .sites
            .get(code)
            .map(|site| site.name.clone()))
    }

    async fn latest_observed_at(&self, stream: &StreamKey) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .tables
            .read()
            .await
            .measurements
            .values()
            .filter(|m| &m.stream == stream)
            .map(|m| m.observed_at)
            .max())
    }

    async fn measurements_since(&self, since: DateTime<Utc>) -> Result<Vec<Measurement>> {
        let mut rows: Vec<_> = self
            .tables
            .read()
            .await
            .measurements
            .values()
            .filter(|m| m.observed_at >= since)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.observed_at);
        Ok(rows)
    }

    async fn latest_measurements(&self, limit: usize) -> Result<Vec<Measurement>> {
        let mut rows: Vec<_> = self
            .tables
            .read()
            .await
            .measurements
            .values()
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn active_rules_for(
        &self,
        site: &SiteCode,
        pollutant: &PollutantCode,
    ) -> Result<Vec<AlertRule>> {
        Ok(self
            .tables
            .read()
            .await
            .rules
            .values()
            .filter(|r| r.active && &r.site_code == site && &r.pollutant_code == pollutant)
            .cloned()
            .collect())
    }

    async fn alert_rules(&self) -> Result<Vec<AlertRule>> {
        Ok(self.tables.read().await.rules.values().cloned().collect())
    }

    async fn insert_alert_rule(&self, rule: &AlertRule) -> Result<WriteOutcome> {
        let mut tables = self.tables.write().await;
        let clashes = tables.rules.values().any(|r| {
            r.code == rule.code
                || (r.site_code == rule.site_code
                    && r.pollutant_code == rule.pollutant_code
                    && r.name == rule.name)
        });
        if clashes {
            return Ok(WriteOutcome::Duplicate);
        }
        tables.rules.insert(rule.code.clone(), rule.clone());
        Ok(WriteOutcome::Inserted)
    }

    async fn record_alert(
        &self,
        rule: &AlertRule,
        measurement: &Measurement,
    ) -> Result<WriteOutcome> {
        let mut tables = self.tables.write().await;
        let key = measurement.key();

        if let Some(alert) = tables
            .alerts
            .iter_mut()
            .find(|a| a.rule_code == rule.code && a.is_active())
        {
            if alert.measurement == key {
                return Ok(WriteOutcome::Unchanged);
            }
            alert.refresh(measurement);
            return Ok(WriteOutcome::Updated);
        }

        // One alert row per (rule, measurement); a muted or acknowledged one is reactivated
        if let Some(alert) = tables
            .alerts
            .iter_mut()
            .find(|a| a.rule_code == rule.code && a.measurement == key)
        {
            alert.refresh(measurement);
            return Ok(WriteOutcome::Updated);
        }

        tables.alerts.push(SiteAlert::raise(rule, measurement));
        Ok(WriteOutcome::Inserted)
    }

    async fn active_alerts(&self) -> Result<Vec<SiteAlert>> {
        Ok(self
            .tables
            .read()
            .await
            .alerts
            .iter()
            .filter(|a| a.is_active())
            .cloned()
            .collect())
    }

    async fn counts(&self) -> Result<StoreCounts> {
        let tables = self.tables.read().await;
        Ok(StoreCounts {
            regions: tables.regions.len() as u64,
            sites: tables.sites.len() as u64,
            pollutants: tables.pollutants.len() as u64,
            measurements: tables.measurements.len() as u64,
            alert_rules: tables.rules.len() as u64,
            active_alerts: tables.alerts.iter().filter(|a| a.is_active()).count() as u64,
        })
    }
}

fn upsert<K, V>(table: &mut HashMap<K, V>, key: K, value: &V) -> WriteOutcome
where
    K: std::hash::Hash + Eq,
    V: Clone + PartialEq,
{
    match table.get_mut(&key) {
        None => {
            table.insert(key, value.clone());
            WriteOutcome::Inserted
        }
        Some(existing) if existing != value => {
            *existing = value.clone();
            WriteOutcome::Updated
        }
        Some(_) => WriteOutcome::Unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AlertState, Comparison};
    use chrono::TimeZone;

    fn region() -> Region {
        Region {
            code: RegionCode::from_parts("DE", "Berlin").unwrap(),
            name: "Berlin".to_string(),
            country: "DE".to_string(),
        }
    }

    fn site() -> MonitoringSite {
        MonitoringSite {
            code: SiteCode::new("100").unwrap(),
            region_code: region().code,
            name: "Mitte".to_string(),
            description: String::new(),
            latitude: Some(52.52),
            longitude: Some(13.40),
        }
    }

    fn measurement(hour: u32, value: f64) -> Measurement {
        let observed_at = Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap();
        Measurement {
            stream: StreamKey::default(),
            site_code: site().code,
            pollutant_code: PollutantCode::new("pm25").unwrap(),
            observed_at,
            value,
            unit: "µg/m³".to_string(),
            external_id: None,
            ingested_at: observed_at,
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.upsert_region(&region()).await.unwrap();
        store.upsert_site(&site()).await.unwrap();
        store
            .ensure_pollutant(&Pollutant::from_code(
                PollutantCode::new("pm25").unwrap(),
                "µg/m³",
            ))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_region_upsert_outcomes() {
        let store = MemoryStore::new();
        assert_eq!(
            store.upsert_region(&region()).await.unwrap(),
            WriteOutcome::Inserted
        );
        assert_eq!(
            store.upsert_region(&region()).await.unwrap(),
            WriteOutcome::Unchanged
        );

        let mut renamed = region();
        renamed.name = "Berlin (City)".to_string();
        assert_eq!(
            store.upsert_region(&renamed).await.unwrap(),
            WriteOutcome::Updated
        );
        assert_eq!(store.counts().await.unwrap().regions, 1);
    }

    #[tokio::test]
    async fn test_site_requires_region() {
        let store = MemoryStore::new();
        assert!(store.upsert_site(&site()).await.is_err());
    }

    #[tokio::test]
    async fn test_pollutant_unit_updates_only_when_reported() {
        let store = seeded().await;
        let code = PollutantCode::new("pm25").unwrap();

        let blank = Pollutant::from_code(code.clone(), "");
        assert_eq!(
            store.ensure_pollutant(&blank).await.unwrap(),
            WriteOutcome::Unchanged
        );

        let changed = Pollutant::from_code(code.clone(), "ppm");
        assert_eq!(
            store.ensure_pollutant(&changed).await.unwrap(),
            WriteOutcome::Updated
        );
        assert_eq!(store.pollutant(&code).await.unwrap().unit, "ppm");
    }

    #[tokio::test]
    async fn test_measurement_duplicate_and_watermark() {
        let store = seeded().await;
        assert_eq!(
            store.latest_observed_at(&StreamKey::default()).await.unwrap(),
            None
        );

        assert_eq!(
            store.insert_measurement(&measurement(1, 10.0)).await.unwrap(),
            WriteOutcome::Inserted
        );
        assert_eq!(
            store.insert_measurement(&measurement(1, 99.0)).await.unwrap(),
            WriteOutcome::Duplicate
        );
        store.insert_measurement(&measurement(3, 12.0)).await.unwrap();

        let latest = store.latest_observed_at(&StreamKey::default()).await.unwrap();
        assert_eq!(latest, Some(measurement(3, 0.0).observed_at));

        let other = StreamKey::new("other").unwrap();
        assert_eq!(store.latest_observed_at(&other).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_recent_measurement_queries() {
        let store = seeded().await;
        for hour in [1, 2, 3] {
            store
                .insert_measurement(&measurement(hour, hour as f64))
                .await
                .unwrap();
        }

        let latest = store.latest_measurements(2).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].value, 3.0);

        let since = store
            .measurements_since(measurement(2, 0.0).observed_at)
            .await
            .unwrap();
        let values: Vec<f64> = since.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![2.0, 3.0]);
    }

    #[tokio::test]
    async fn test_single_active_alert_per_rule() {
        let store = seeded().await;
        let rule = AlertRule {
            code: AlertRuleCode::new("r1").unwrap(),
            site_code: site().code,
            pollutant_code: PollutantCode::new("pm25").unwrap(),
            name: "High PM".to_string(),
            threshold: 5.0,
            comparison: Comparison::Above,
            active: true,
        };
        assert_eq!(
            store.insert_alert_rule(&rule).await.unwrap(),
            WriteOutcome::Inserted
        );
        assert_eq!(
            store.insert_alert_rule(&rule).await.unwrap(),
            WriteOutcome::Duplicate
        );

        let first = measurement(1, 10.0);
        let second = measurement(2, 20.0);
        assert_eq!(
            store.record_alert(&rule, &first).await.unwrap(),
            WriteOutcome::Inserted
        );
        assert_eq!(
            store.record_alert(&rule, &first).await.unwrap(),
            WriteOutcome::Unchanged
        );
        assert_eq!(
            store.record_alert(&rule, &second).await.unwrap(),
            WriteOutcome::Updated
        );

        let alerts = store.active_alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].value, 20.0);
        assert_eq!(alerts[0].state, AlertState::Active);
    }
}
