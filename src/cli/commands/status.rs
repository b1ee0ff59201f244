//! Status command implementation
//!
//! Prints the current watermark and row counts of the configured store.

use crate::adapters::database::create_store;
use crate::config::{load_config, DatabaseTarget};
use crate::core::state::WatermarkStore;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// List active alerts
    #[arg(long)]
    pub alerts: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking sync status");

        println!("📊 Sync Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        if config.database_target == DatabaseTarget::Memory {
            println!("ℹ️  database_target is 'memory'; nothing is kept between runs.");
            return Ok(0);
        }

        let store = match create_store(&config) {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to create store");
                println!("   Error: {e}");
                return Ok(2);
            }
        };
        if let Err(e) = store.test_connection().await {
            println!("❌ Failed to connect to database");
            println!("   Error: {e}");
            return Ok(4);
        }

        let watermarks = WatermarkStore::new(store.clone());
        let watermark = watermarks
            .current_watermark(&config.source.stream)
            .await?;
        let counts = store.counts().await?;

        match watermark.observed_at {
            Some(ts) => println!(
                "Watermark ({}): {}",
                watermark.stream,
                ts.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            None => {
                println!("Watermark ({}): none", watermark.stream);
                println!("Run 'airsync sync' to start syncing data.");
            }
        }
        println!();
        println!("{:<16} {:>12}", "Table", "Rows");
        println!("{}", "-".repeat(29));
        for (table, rows) in [
            ("regions", counts.regions),
            ("sites", counts.sites),
            ("pollutants", counts.pollutants),
            ("measurements", counts.measurements),
            ("alert rules", counts.alert_rules),
            ("active alerts", counts.active_alerts),
        ] {
            println!("{table:<16} {rows:>12}");
        }

        if self.alerts {
            let alerts = store.active_alerts().await?;
            println!();
            if alerts.is_empty() {
                println!("No active alerts.");
            }
            for alert in alerts {
                println!(
                    "🔔 {} {} = {} at {}",
                    alert.rule_code,
                    alert.measurement.pollutant_code,
                    alert.value,
                    alert.triggered_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
        }

        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_memory_target_reports_nothing_persisted() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "database_target = \"memory\"\n\n[source]").unwrap();

        let code = StatusArgs::default()
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_missing_config() {
        let code = StatusArgs::default()
            .execute("/nonexistent/airsync.toml")
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
