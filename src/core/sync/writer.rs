//! Keyed writes of normalized records

use crate::adapters::database::{Store, WriteOutcome};
use crate::core::normalize::{LocationRecord, MeasurementRecord};
use crate::domain::{PollutantCode, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Store outcomes for one location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationWrite {
    pub region: WriteOutcome,
    pub site: WriteOutcome,
}

impl LocationWrite {
    pub fn is_write(&self) -> bool {
        self.region.is_write() || self.site.is_write()
    }
}

/// Store outcomes for one measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementWrite {
    pub pollutant: WriteOutcome,
    pub measurement: WriteOutcome,
}

/// Writes normalized records in dependency order
///
/// A region is written before its site and a pollutant before its
/// measurement. Pollutants already ensured during this run with the same
/// unit are not written again.
pub struct UpsertWriter {
    store: Arc<dyn Store>,
    known_units: HashMap<PollutantCode, String>,
}

impl UpsertWriter {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            known_units: HashMap::new(),
        }
    }

    pub async fn write_location(&mut self, record: &LocationRecord) -> Result<LocationWrite> {
        let region = self.store.upsert_region(&record.region).await?;
        let site = self.store.upsert_site(&record.site).await?;
        Ok(LocationWrite { region, site })
    }

    pub async fn write_measurement(
        &mut self,
        record: &MeasurementRecord,
    ) -> Result<MeasurementWrite> {
        let pollutant = self.ensure_pollutant(record).await?;
        let measurement = self.store.insert_measurement(&record.measurement).await?;
        Ok(MeasurementWrite {
            pollutant,
            measurement,
        })
    }

    async fn ensure_pollutant(&mut self, record: &MeasurementRecord) -> Result<WriteOutcome> {
        let pollutant = &record.pollutant;
        if let Some(unit) = self.known_units.get(&pollutant.code) {
            if pollutant.unit.is_empty() || *unit == pollutant.unit {
                return Ok(WriteOutcome::Unchanged);
            }
        }

        let outcome = self.store.ensure_pollutant(pollutant).await?;
        self.known_units
            .insert(pollutant.code.clone(), pollutant.unit.clone());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::{
        Measurement, MonitoringSite, Pollutant, Region, RegionCode, SiteCode, StreamKey,
    };
    use chrono::{TimeZone, Utc};

    fn location() -> LocationRecord {
        let region_code = RegionCode::from_parts("NL", "Utrecht").unwrap();
        LocationRecord {
            region: Region {
                code: region_code.clone(),
                name: "Utrecht".to_string(),
                country: "NL".to_string(),
            },
            site: MonitoringSite {
                code: SiteCode::new("636").unwrap(),
                region_code,
                name: "Utrecht-Kardinaal de Jongweg".to_string(),
                description: String::new(),
                latitude: Some(52.1),
                longitude: Some(5.1),
            },
        }
    }

    fn measurement(hour: u32, unit: &str) -> MeasurementRecord {
        let observed_at = Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap();
        let code = PollutantCode::new("no2").unwrap();
        MeasurementRecord {
            pollutant: Pollutant::from_code(code.clone(), unit),
            measurement: Measurement {
                stream: StreamKey::default(),
                site_code: SiteCode::new("636").unwrap(),
                pollutant_code: code,
                observed_at,
                value: 21.4,
                unit: unit.to_string(),
                external_id: None,
                ingested_at: observed_at,
            },
        }
    }

    #[tokio::test]
    async fn test_location_rewrite_is_unchanged() {
        let mut writer = UpsertWriter::new(Arc::new(MemoryStore::new()));

        let first = writer.write_location(&location()).await.unwrap();
        assert_eq!(first.region, WriteOutcome::Inserted);
        assert_eq!(first.site, WriteOutcome::Inserted);
        assert!(first.is_write());

        let second = writer.write_location(&location()).await.unwrap();
        assert!(!second.is_write());
    }

    #[tokio::test]
    async fn test_measurement_duplicates_and_pollutant_cache() {
        let store = Arc::new(MemoryStore::new());
        let mut writer = UpsertWriter::new(store.clone());
        writer.write_location(&location()).await.unwrap();

        let first = writer.write_measurement(&measurement(1, "µg/m³")).await.unwrap();
        assert_eq!(first.pollutant, WriteOutcome::Inserted);
        assert_eq!(first.measurement, WriteOutcome::Inserted);

        let next_hour = writer.write_measurement(&measurement(2, "µg/m³")).await.unwrap();
        assert_eq!(next_hour.pollutant, WriteOutcome::Unchanged);
        assert_eq!(next_hour.measurement, WriteOutcome::Inserted);

        let replay = writer.write_measurement(&measurement(1, "µg/m³")).await.unwrap();
        assert_eq!(replay.measurement, WriteOutcome::Duplicate);

        assert_eq!(store.measurements().await.len(), 2);
    }
}
