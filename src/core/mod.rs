//! Core sync logic for airsync.
//!
//! # Modules
//!
//! - [`normalize`] - Raw JSON records to canonical records
//! - [`state`] - Watermark derivation for incremental fetches
//! - [`sync`] - Run orchestration, retries and keyed writes
//! - [`alerts`] - Site alert rule evaluation
//!
//! # Sync Workflow
//!
//! 1. **Reference**: page through `/locations`, upsert regions and sites
//! 2. **Watermark**: take the latest stored observation time, or the lookback
//! 3. **Measurements**: page through `/measurements` since the window start
//! 4. **Alerts**: evaluate each newly stored measurement
//! 5. **Report**: return a [`sync::SyncSummary`]
//!
//! # Example
//!
//! ```rust,no_run
//! use airsync::adapters::database::create_store;
//! use airsync::adapters::openaq::OpenAqClient;
//! use airsync::config::load_config;
//! use airsync::core::sync::{SyncCoordinator, SyncOptions};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("airsync.toml")?;
//! let store = create_store(&config)?;
//! let source = Arc::new(OpenAqClient::new(&config.source)?);
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let options = SyncOptions::from_config(&config);
//! let summary = SyncCoordinator::new(source, store, options, shutdown_rx)
//!     .run()
//!     .await;
//! println!("{}", summary.summary_line());
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod normalize;
pub mod state;
pub mod sync;
