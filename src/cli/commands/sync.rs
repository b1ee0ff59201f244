//! Sync command implementation
//!
//! Runs one incremental sync and exits with a code derived from the final
//! phase: 0 done, 1 failed, 130 cancelled, 2 configuration error, 4 store
//! connection error.

use crate::adapters::database::create_store;
use crate::adapters::openaq::OpenAqClient;
use crate::config::{load_config, AirSyncConfig};
use crate::core::sync::{SyncCoordinator, SyncOptions, SyncPhase};
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the sync command
#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Override attempts per page fetch (1-10)
    #[arg(long)]
    pub max_attempts: Option<usize>,

    /// Override records requested per page (1-1000)
    #[arg(long)]
    pub page_limit: Option<usize>,

    /// Skip alert evaluation for this run
    #[arg(long)]
    pub no_alerts: bool,
}

impl SyncArgs {
    /// Applies CLI overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut AirSyncConfig) {
        if let Some(max_attempts) = self.max_attempts {
            tracing::info!(max_attempts, "Overriding retry attempts from CLI");
            config.source.retry.max_attempts = max_attempts;
        }
        if let Some(page_limit) = self.page_limit {
            tracing::info!(page_limit, "Overriding page limit from CLI");
            config.source.page_limit = page_limit;
        }
        if self.no_alerts {
            tracing::info!("Disabling alert evaluation from CLI");
            config.alerts.enabled = false;
        }
    }

    /// Execute the sync command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting sync command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                crate::log_error_with_context!(e, "loading configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        self.apply_overrides(&mut config);
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        let store = match create_store(&config) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Failed to create store: {e}");
                return Ok(2);
            }
        };

        if let Err(e) = store.test_connection().await {
            crate::log_error_with_context!(e, "connecting to store");
            eprintln!("Failed to connect to {} store: {e}", store.backend_name());
            return Ok(4);
        }
        if let Err(e) = store.ensure_schema().await {
            crate::log_error_with_context!(e, "preparing schema");
            eprintln!("Failed to prepare schema: {e}");
            return Ok(4);
        }

        let source = match OpenAqClient::new(&config.source) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                eprintln!("Failed to create API client: {e}");
                return Ok(2);
            }
        };

        println!("🚀 Starting sync...");
        let coordinator = SyncCoordinator::new(
            source,
            store,
            SyncOptions::from_config(&config),
            shutdown_signal,
        );
        let summary = coordinator.run().await;
        summary.log_summary();

        println!();
        println!("{}", summary.summary_line());
        match summary.phase {
            SyncPhase::Done => println!("✅ Sync completed"),
            SyncPhase::Cancelled => {
                println!("⚠️  Sync interrupted. Stored data is consistent; run again to continue.")
            }
            _ => println!("❌ Sync failed"),
        }

        Ok(summary.exit_code())
    }
}
