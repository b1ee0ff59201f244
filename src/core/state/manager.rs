//! Watermark lookup over the store

use crate::adapters::database::Store;
use crate::core::state::watermark::Watermark;
use crate::domain::{Result, StreamKey};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Derives watermarks and fetch windows from stored measurements
pub struct WatermarkStore {
    store: Arc<dyn Store>,
}

impl WatermarkStore {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Latest stored observation time for `stream`
    ///
    /// # Errors
    ///
    /// Returns a store error if the lookup fails.
    pub async fn current_watermark(&self, stream: &StreamKey) -> Result<Watermark> {
        let observed_at = self.store.latest_observed_at(stream).await?;
        Ok(Watermark::new(stream.clone(), observed_at))
    }

    /// Inclusive lower bound for the next measurement fetch
    ///
    /// The watermark itself when one exists, otherwise `now - lookback`.
    /// Records at exactly the watermark are fetched again and resolve to
    /// duplicates, so nothing observed at that instant is lost.
    pub async fn fetch_window_start(
        &self,
        stream: &StreamKey,
        lookback: Duration,
    ) -> Result<(Watermark, DateTime<Utc>)> {
        let watermark = self.current_watermark(stream).await?;
        let start = window_start(&watermark, lookback, Utc::now());
        Ok((watermark, start))
    }
}

fn window_start(watermark: &Watermark, lookback: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
    watermark.observed_at.unwrap_or_else(|| {
        now.checked_sub_signed(lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use chrono::TimeZone;

    #[test]
    fn test_window_start_uses_watermark() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let watermark = Watermark::new(StreamKey::default(), Some(ts));

        assert_eq!(window_start(&watermark, Duration::days(7), now), ts);
    }

    #[test]
    fn test_window_start_falls_back_to_lookback() {
        let now = Utc.with_ymd_and_hms(2024, 6, 8, 0, 0, 0).unwrap();
        let watermark = Watermark::new(StreamKey::default(), None);

        assert_eq!(
            window_start(&watermark, Duration::days(7), now),
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_window_start_saturates_on_oversized_lookback() {
        let now = Utc.with_ymd_and_hms(2024, 6, 8, 0, 0, 0).unwrap();
        let watermark = Watermark::new(StreamKey::default(), None);

        assert_eq!(
            window_start(&watermark, Duration::days(100_000_000), now),
            DateTime::<Utc>::MIN_UTC
        );
    }

    #[tokio::test]
    async fn test_empty_store_has_no_watermark() {
        let watermarks = WatermarkStore::new(Arc::new(MemoryStore::new()));
        let (watermark, start) = watermarks
            .fetch_window_start(&StreamKey::default(), Duration::days(7))
            .await
            .unwrap();

        assert!(watermark.is_empty());
        assert!(start < Utc::now());
    }
}
