//! Store factory
//!
//! Builds the [`Store`] selected by `database_target`.

use crate::adapters::database::traits::Store;
use crate::adapters::memory::MemoryStore;
use crate::adapters::postgresql::{PostgreSQLAdapter, PostgreSQLClient};
use crate::config::schema::{AirSyncConfig, DatabaseTarget};
use crate::domain::{AirSyncError, Result};
use std::sync::Arc;

/// Create the configured store
///
/// The store is not contacted here; call `test_connection` and
/// `ensure_schema` before use.
///
/// # Errors
///
/// Returns a configuration error if the selected backend has no settings
/// or its settings are unusable.
pub fn create_store(config: &AirSyncConfig) -> Result<Arc<dyn Store>> {
    match config.database_target {
        DatabaseTarget::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                AirSyncError::Configuration(
                    "postgresql configuration is required when database_target = 'postgresql'"
                        .to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL store");
            let client = PostgreSQLClient::new(pg_config)?;
            Ok(Arc::new(PostgreSQLAdapter::new(client)))
        }
        DatabaseTarget::Memory => {
            tracing::info!("Creating in-memory store; nothing will persist after this run");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{AlertsConfig, ApplicationConfig, LoggingConfig, SourceConfig};

    fn config(target: DatabaseTarget) -> AirSyncConfig {
        AirSyncConfig {
            application: ApplicationConfig::default(),
            source: SourceConfig::default(),
            database_target: target,
            postgresql: None,
            alerts: AlertsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_memory_store_created() {
        let store = create_store(&config(DatabaseTarget::Memory)).unwrap();
        assert_eq!(store.backend_name(), "memory");
    }

    #[test]
    fn test_postgresql_without_section_fails() {
        let result = create_store(&config(DatabaseTarget::PostgreSQL));
        assert!(matches!(result, Err(AirSyncError::Configuration(_))));
    }
}
