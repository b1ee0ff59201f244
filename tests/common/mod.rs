//! Shared fixtures for sync integration tests

#![allow(dead_code)]

use airsync::adapters::database::{Store, StoreCounts, WriteOutcome};
use airsync::adapters::memory::MemoryStore;
use airsync::adapters::openaq::{DataSource, Endpoint, Page, PageCursor, PageRequest};
use airsync::config::AlertsConfig;
use airsync::core::sync::{RetryPolicy, SyncOptions};
use airsync::domain::{
    AlertRule, FetchError, Measurement, MonitoringSite, Pollutant, PollutantCode, Region,
    Result as StoreResult, SiteAlert, SiteCode, StoreError, StreamKey,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;
use tokio::sync::watch;

/// In-process stand-in for the OpenAQ API
///
/// Serves fixed record lists page by page through [`Page::from_body`],
/// filters measurements by `since`, and can fail or request shutdown on
/// chosen pages.
#[derive(Default)]
pub struct ScriptedSource {
    locations: Mutex<Vec<Value>>,
    measurements: Mutex<Vec<Value>>,
    failures: Mutex<Vec<(Endpoint, u32, FetchError)>>,
    cancel_after: Mutex<Option<(Endpoint, u32, watch::Sender<bool>)>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedSource {
    pub fn new(locations: Vec<Value>, measurements: Vec<Value>) -> Arc<Self> {
        let source = Self::default();
        *source.locations.lock().unwrap() = locations;
        *source.measurements.lock().unwrap() = measurements;
        Arc::new(source)
    }

    pub fn set_measurements(&self, measurements: Vec<Value>) {
        *self.measurements.lock().unwrap() = measurements;
    }

    /// Fails the next request for `page` of `endpoint` with `error`
    pub fn fail(&self, endpoint: Endpoint, page: u32, error: FetchError) {
        self.failures.lock().unwrap().push((endpoint, page, error));
    }

    /// Requests shutdown right after serving `page` of `endpoint`
    pub fn cancel_after(&self, endpoint: Endpoint, page: u32, shutdown: watch::Sender<bool>) {
        *self.cancel_after.lock().unwrap() = Some((endpoint, page, shutdown));
    }

    pub fn requests_for(&self, endpoint: Endpoint) -> Vec<PageRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.endpoint == endpoint)
            .cloned()
            .collect()
    }
}

fn observed_at(record: &Value) -> Option<DateTime<Utc>> {
    let raw = record.get("date")?.get("utc")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[async_trait]
impl DataSource for ScriptedSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page, FetchError> {
        self.requests.lock().unwrap().push(request.clone());
        let page = match request.cursor {
            PageCursor::Number(n) => n,
            PageCursor::Token(_) => panic!("scripted source only pages by number"),
        };

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(pos) = failures
                .iter()
                .position(|(endpoint, p, _)| *endpoint == request.endpoint && *p == page)
            {
                return Err(failures.remove(pos).2);
            }
        }

        let records: Vec<Value> = match request.endpoint {
            Endpoint::Locations => self.locations.lock().unwrap().clone(),
            Endpoint::Measurements => self
                .measurements
                .lock()
                .unwrap()
                .iter()
                .filter(|m| match (request.since, observed_at(m)) {
                    (Some(since), Some(ts)) => ts >= since,
                    _ => true,
                })
                .cloned()
                .collect(),
        };
        let start = (page as usize - 1) * request.limit;
        let results: Vec<Value> = records
            .into_iter()
            .skip(start)
            .take(request.limit)
            .collect();

        if let Some((endpoint, p, shutdown)) = self.cancel_after.lock().unwrap().as_ref() {
            if *endpoint == request.endpoint && *p == page {
                let _ = shutdown.send(true);
            }
        }

        Page::from_body(
            request,
            json!({ "meta": { "page": page, "limit": request.limit }, "results": results }),
        )
    }
}

/// [`MemoryStore`] that loses its connection at a chosen measurement insert
///
/// Calls before the `fail_from`-th `insert_measurement` succeed; that call
/// and every later one return [`StoreError::Unavailable`]. Everything else
/// delegates to the wrapped store.
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    fail_from: usize,
    inserts: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>, fail_from: usize) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_from,
            inserts: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Store for FlakyStore {
    fn backend_name(&self) -> &'static str {
        "flaky"
    }

    async fn test_connection(&self) -> StoreResult<()> {
        self.inner.test_connection().await
    }

    async fn ensure_schema(&self) -> StoreResult<()> {
        self.inner.ensure_schema().await
    }

    async fn upsert_region(&self, region: &Region) -> StoreResult<WriteOutcome> {
        self.inner.upsert_region(region).await
    }

    async fn upsert_site(&self, site: &MonitoringSite) -> StoreResult<WriteOutcome> {
        self.inner.upsert_site(site).await
    }

    async fn ensure_pollutant(&self, pollutant: &Pollutant) -> StoreResult<WriteOutcome> {
        self.inner.ensure_pollutant(pollutant).await
    }

    async fn insert_measurement(&self, measurement: &Measurement) -> StoreResult<WriteOutcome> {
        let call = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if call >= self.fail_from {
            return Err(StoreError::Unavailable("connection reset".to_string()).into());
        }
        self.inner.insert_measurement(measurement).await
    }

    async fn site_codes(&self) -> StoreResult<Vec<SiteCode>> {
        self.inner.site_codes().await
    }

    async fn site_name(&self, code: &SiteCode) -> StoreResult<Option<String>> {
        self.inner.site_name(code).await
    }

    async fn latest_observed_at(&self, stream: &StreamKey) -> StoreResult<Option<DateTime<Utc>>> {
        self.inner.latest_observed_at(stream).await
    }

    async fn measurements_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<Measurement>> {
        self.inner.measurements_since(since).await
    }

    async fn latest_measurements(&self, limit: usize) -> StoreResult<Vec<Measurement>> {
        self.inner.latest_measurements(limit).await
    }

    async fn active_rules_for(
        &self,
        site: &SiteCode,
        pollutant: &PollutantCode,
    ) -> StoreResult<Vec<AlertRule>> {
        self.inner.active_rules_for(site, pollutant).await
    }

    async fn alert_rules(&self) -> StoreResult<Vec<AlertRule>> {
        self.inner.alert_rules().await
    }

    async fn insert_alert_rule(&self, rule: &AlertRule) -> StoreResult<WriteOutcome> {
        self.inner.insert_alert_rule(rule).await
    }

    async fn record_alert(
        &self,
        rule: &AlertRule,
        measurement: &Measurement,
    ) -> StoreResult<WriteOutcome> {
        self.inner.record_alert(rule, measurement).await
    }

    async fn active_alerts(&self) -> StoreResult<Vec<SiteAlert>> {
        self.inner.active_alerts().await
    }

    async fn counts(&self) -> StoreResult<StoreCounts> {
        self.inner.counts().await
    }
}

pub fn location(id: u64, city: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Station {id}"),
        "city": city,
        "country": { "code": "DE", "name": "Germany" },
        "coordinates": { "latitude": 52.5, "longitude": 13.4 }
    })
}

pub fn measurement(site: u64, parameter: &str, value: f64, at: DateTime<Utc>) -> Value {
    json!({
        "locationId": site,
        "parameter": parameter,
        "value": value,
        "unit": "µg/m³",
        "date": { "utc": at.to_rfc3339() }
    })
}

/// Whole seconds, `hours` before now
pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    let now = Utc::now().timestamp();
    DateTime::from_timestamp(now - hours * 3600, 0).unwrap()
}

pub fn options(page_limit: usize) -> SyncOptions {
    SyncOptions {
        page_limit,
        lookback: Duration::days(7),
        stream: StreamKey::default(),
        retry: RetryPolicy {
            max_attempts: 3,
            initial_delay: StdDuration::from_millis(1),
            max_delay: StdDuration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        alerts: AlertsConfig::default(),
    }
}
