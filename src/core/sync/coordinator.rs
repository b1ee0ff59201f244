//! Sync coordinator - drives one run through reference and measurement stages
//!
//! The run fetches `/locations` to completion, derives the measurement
//! window from the watermark, then fetches `/measurements` since that window
//! start. Every write is idempotent, so a run that stops anywhere can be
//! repeated without cleanup.

use super::phase::SyncPhase;
use super::retry::RetryPolicy;
use super::summary::{SyncFailure, SyncSummary};
use super::writer::UpsertWriter;
use crate::adapters::database::{Store, WriteOutcome};
use crate::adapters::openaq::{DataSource, Endpoint, Page, Paginator};
use crate::config::{
    AirSyncConfig, AlertsConfig, MAX_INITIAL_LOOKBACK_DAYS, MAX_RECENT_WINDOW_HOURS,
};
use crate::core::alerts::{ensure_demo_rules, AlertEvaluator};
use crate::core::normalize::{
    normalize_location, normalize_measurement, NormalizeOutcome, SiteIndex, SkipReason,
};
use crate::core::state::WatermarkStore;
use crate::domain::{AirSyncError, FetchError, StreamKey};
use chrono::{Duration, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Settings for one run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub page_limit: usize,
    pub lookback: Duration,
    pub stream: StreamKey,
    pub retry: RetryPolicy,
    pub alerts: AlertsConfig,
}

impl SyncOptions {
    pub fn from_config(config: &AirSyncConfig) -> Self {
        Self {
            page_limit: config.source.page_limit,
            lookback: Duration::days(
                config
                    .source
                    .initial_lookback_days
                    .clamp(0, MAX_INITIAL_LOOKBACK_DAYS),
            ),
            stream: config.source.stream.clone(),
            retry: RetryPolicy::from_config(&config.source.retry),
            alerts: config.alerts.clone(),
        }
    }
}

/// Why a run stopped early
enum Halt {
    Cancelled,
    Failed(SyncFailure),
}

impl From<FetchError> for Halt {
    fn from(err: FetchError) -> Self {
        Halt::Failed(SyncFailure::from(&err))
    }
}

impl From<AirSyncError> for Halt {
    fn from(err: AirSyncError) -> Self {
        Halt::Failed(SyncFailure::from(&err))
    }
}

type Step<T> = std::result::Result<T, Halt>;

/// Sync coordinator
pub struct SyncCoordinator {
    source: Arc<dyn DataSource>,
    store: Arc<dyn Store>,
    options: SyncOptions,
    shutdown: watch::Receiver<bool>,
    writer: UpsertWriter,
    evaluator: AlertEvaluator,
    sites: SiteIndex,
    summary: SyncSummary,
}

impl SyncCoordinator {
    pub fn new(
        source: Arc<dyn DataSource>,
        store: Arc<dyn Store>,
        options: SyncOptions,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            writer: UpsertWriter::new(store.clone()),
            evaluator: AlertEvaluator::new(store.clone()),
            source,
            store,
            options,
            shutdown,
            sites: SiteIndex::new(),
            summary: SyncSummary::new(),
        }
    }

    /// Execute the run
    ///
    /// Never returns an error: failures and cancellation end up in the
    /// summary's phase and failure fields, with every count gathered so far.
    pub async fn run(mut self) -> SyncSummary {
        let start_time = Instant::now();
        tracing::info!(
            backend = self.store.backend_name(),
            stream = %self.options.stream,
            page_limit = self.options.page_limit,
            "Starting sync"
        );

        let outcome = self.execute().await;
        match outcome {
            Ok(()) => self.transition(SyncPhase::Done),
            Err(Halt::Cancelled) => {
                tracing::warn!("Sync cancelled, stopping at page boundary");
                self.transition(SyncPhase::Cancelled);
            }
            Err(Halt::Failed(failure)) => {
                crate::log_error_with_context!(failure, self.summary.phase.as_str());
                self.summary.failure = Some(failure);
                self.transition(SyncPhase::Failed);
            }
        }

        // Reported even after a failure: everything written so far is durable
        match self.store.latest_observed_at(&self.options.stream).await {
            Ok(watermark) => self.summary.final_watermark = watermark,
            Err(e) => tracing::warn!(error = %e, "Could not read final watermark"),
        }

        self.summary.duration = start_time.elapsed();
        self.summary
    }

    async fn execute(&mut self) -> Step<()> {
        self.sync_reference().await?;
        self.sync_measurements().await?;
        self.seed_demo_rules().await
    }

    async fn sync_reference(&mut self) -> Step<()> {
        self.transition(SyncPhase::FetchingReference);
        self.sites = self.store.site_codes().await?.into_iter().collect();
        tracing::debug!(known_sites = self.sites.len(), "Loaded site index");

        let mut paginator = Paginator::new(
            self.source.clone(),
            Endpoint::Locations,
            self.options.page_limit,
            None,
        );
        while let Some(page) = self.next_page(&mut paginator).await? {
            self.transition(SyncPhase::WritingReference);
            self.write_reference_page(page).await?;
            self.transition(SyncPhase::FetchingReference);
        }

        tracing::info!(
            seen = self.summary.reference.seen,
            written = self.summary.reference.written,
            skipped = self.summary.reference.skipped,
            "Reference data synced"
        );
        Ok(())
    }

    async fn write_reference_page(&mut self, page: Page) -> Step<()> {
        for raw in &page.records {
            self.summary.reference.seen += 1;
            let record = match normalize_location(raw) {
                NormalizeOutcome::Record(record) => record,
                NormalizeOutcome::Skip(reason) => {
                    self.summary.reference.skipped += 1;
                    self.record_skip(Endpoint::Locations, reason);
                    continue;
                }
            };

            let write = self.writer.write_location(&record).await?;
            let counts = &mut self.summary.reference;
            match write.region {
                WriteOutcome::Inserted => counts.regions_inserted += 1,
                WriteOutcome::Updated => counts.regions_updated += 1,
                _ => {}
            }
            match write.site {
                WriteOutcome::Inserted => counts.sites_inserted += 1,
                WriteOutcome::Updated => counts.sites_updated += 1,
                _ => {}
            }
            if write.is_write() {
                counts.written += 1;
            }
            self.sites.insert(record.site.code);
        }
        Ok(())
    }

    async fn sync_measurements(&mut self) -> Step<()> {
        self.transition(SyncPhase::ComputingWatermark);
        let watermarks = WatermarkStore::new(self.store.clone());
        let (watermark, window_start) = watermarks
            .fetch_window_start(&self.options.stream, self.options.lookback)
            .await?;
        self.summary.window_start = Some(window_start);
        tracing::info!(
            watermark = %watermark,
            window_start = %window_start.to_rfc3339(),
            "Computed measurement window"
        );

        self.transition(SyncPhase::FetchingMeasurements);
        let mut paginator = Paginator::new(
            self.source.clone(),
            Endpoint::Measurements,
            self.options.page_limit,
            Some(window_start),
        );
        while let Some(page) = self.next_page(&mut paginator).await? {
            self.transition(SyncPhase::WritingMeasurements);
            self.write_measurement_page(page).await?;
            self.transition(SyncPhase::FetchingMeasurements);
        }

        let counts = &self.summary.measurements;
        tracing::info!(
            seen = counts.seen,
            written = counts.written,
            duplicates = counts.duplicates,
            skipped = counts.skipped,
            "Measurements synced"
        );
        Ok(())
    }

    async fn write_measurement_page(&mut self, page: Page) -> Step<()> {
        for raw in &page.records {
            self.summary.measurements.seen += 1;
            let record = match normalize_measurement(raw, &self.sites, &self.options.stream) {
                NormalizeOutcome::Record(record) => record,
                NormalizeOutcome::Skip(reason) => {
                    self.summary.measurements.skipped += 1;
                    self.record_skip(Endpoint::Measurements, reason);
                    continue;
                }
            };
            self.summary.measurements.normalized += 1;

            let write = self.writer.write_measurement(&record).await?;
            if write.pollutant == WriteOutcome::Inserted {
                self.summary.measurements.pollutants_created += 1;
            }
            match write.measurement {
                WriteOutcome::Inserted => {
                    self.summary.measurements.written += 1;
                    if self.options.alerts.enabled {
                        self.summary.alerts_triggered += self
                            .evaluator
                            .evaluate_measurement(&record.measurement)
                            .await?;
                    }
                }
                _ => self.summary.measurements.duplicates += 1,
            }
        }
        Ok(())
    }

    async fn seed_demo_rules(&mut self) -> Step<()> {
        let alerts = &self.options.alerts;
        if !alerts.enabled || !alerts.seed_demo_rules {
            return Ok(());
        }
        let recent_window =
            Duration::hours(alerts.recent_window_hours.clamp(1, MAX_RECENT_WINDOW_HOURS));

        let created = ensure_demo_rules(&self.store, alerts.max_demo_rules).await?;
        self.summary.alert_rules_seeded = created;
        if created > 0 {
            let now = Utc::now();
            let since = now.checked_sub_signed(recent_window).unwrap_or(now);
            self.summary.alerts_triggered += self.evaluator.evaluate_since(since).await?;
        }
        Ok(())
    }

    /// Fetches the next page, retrying transient failures
    async fn next_page(&mut self, paginator: &mut Paginator) -> Step<Option<Page>> {
        let max_attempts = self.options.retry.max_attempts;
        let mut attempt = 1;
        loop {
            if self.is_cancelled() {
                return Err(Halt::Cancelled);
            }

            match paginator.next_page().await {
                Ok(page) => {
                    if page.is_some() {
                        self.summary.pages_fetched += 1;
                    }
                    return Ok(page);
                }
                Err(e) if e.is_transient() && self.options.retry.allows_retry_after(attempt) => {
                    let delay = self.options.retry.delay_for(attempt, e.retry_after_secs());
                    attempt += 1;
                    crate::log_retry_attempt!(attempt, max_attempts, e);
                    tracing::debug!(
                        endpoint = %paginator.endpoint(),
                        delay_ms = delay.as_millis() as u64,
                        "Backing off"
                    );
                    self.summary.retries += 1;

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = wait_for_shutdown(&mut self.shutdown) => return Err(Halt::Cancelled),
                    }
                }
                Err(e) => {
                    tracing::error!(
                        endpoint = %paginator.endpoint(),
                        attempt = attempt,
                        error = %e,
                        "Page fetch failed"
                    );
                    return Err(e.into());
                }
            }
        }
    }

    fn record_skip(&mut self, endpoint: Endpoint, reason: SkipReason) {
        tracing::debug!(endpoint = %endpoint, reason = %reason, "Skipped record");
        self.summary.record_skip(reason);
    }

    fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn transition(&mut self, next: SyncPhase) {
        let current = self.summary.phase;
        if current == next {
            return;
        }
        if current.is_page_step(next) {
            tracing::trace!(from = %current, to = %next, "Sync phase changed");
        } else {
            crate::log_phase_transition!(current, next);
        }
        self.summary.phase = next;
    }
}

/// Resolves once shutdown is requested; never resolves if the sender is gone
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
