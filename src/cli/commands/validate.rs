//! Validate config command implementation

use crate::adapters::postgresql::redact_connection_string;
use crate::config::{load_config, DatabaseTarget};
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug, Default)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading also validates every section
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Locations URL: {}", config.source.locations_base_url);
        println!("  Measurements URL: {}", config.source.measurements_base_url);
        println!(
            "  API Key: {}",
            if config.source.api_key.is_some() {
                "set"
            } else {
                "not set"
            }
        );
        println!("  Page Limit: {}", config.source.page_limit);
        println!("  Stream: {}", config.source.stream);
        println!(
            "  Retries: {} attempts, {}ms initial delay",
            config.source.retry.max_attempts, config.source.retry.initial_delay_ms
        );
        println!("  Database Target: {}", config.database_target);

        if config.database_target == DatabaseTarget::PostgreSQL {
            if let Some(ref pg_config) = config.postgresql {
                println!(
                    "  PostgreSQL Connection: {}",
                    redact_connection_string(pg_config.connection_string.expose_secret().as_str())
                );
                println!("  Max Connections: {}", pg_config.max_connections);
                println!("  SSL Mode: {}", pg_config.ssl_mode);
            }
        }

        println!(
            "  Alerts: {}{}",
            if config.alerts.enabled {
                "enabled"
            } else {
                "disabled"
            },
            if config.alerts.seed_demo_rules {
                " (demo rules)"
            } else {
                ""
            }
        );
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
    async fn test_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "database_target = \"memory\"\n\n[source]\npage_limit = 50").unwrap();

        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_invalid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "database_target = \"memory\"\n\n[source]\npage_limit = 0").unwrap();

        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
