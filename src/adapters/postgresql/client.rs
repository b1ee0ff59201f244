//! PostgreSQL connection pool

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{AirSyncError, Result, StoreError};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};

/// Pooled PostgreSQL client
///
/// Every connection handed out has `statement_timeout` applied.
pub struct PostgreSQLClient {
    pool: Pool,
    statement_timeout_ms: u64,
    connection_string_safe: String,
}

impl PostgreSQLClient {
    /// Create a new pool
    ///
    /// No connection is opened until the first query.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the connection string or TLS setup
    /// is invalid.
    pub fn new(config: &PostgreSQLConfig) -> Result<Self> {
        let conn_str = config.connection_string.expose_secret();
        let mut pg_config: tokio_postgres::Config = conn_str.as_str().parse().map_err(|e| {
            AirSyncError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
        })?;
        pg_config.connect_timeout(Duration::from_secs(config.connection_timeout_seconds));

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = match config.ssl_mode.as_str() {
            "disable" => {
                pg_config.ssl_mode(SslMode::Disable);
                Manager::from_config(pg_config, NoTls, manager_config)
            }
            mode => {
                pg_config.ssl_mode(if mode == "require" {
                    SslMode::Require
                } else {
                    SslMode::Prefer
                });
                let connector = native_tls::TlsConnector::builder().build().map_err(|e| {
                    AirSyncError::Configuration(format!("Failed to build TLS connector: {e}"))
                })?;
                let tls = postgres_native_tls::MakeTlsConnector::new(connector);
                Manager::from_config(pg_config, tls, manager_config)
            }
        };

        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| {
                AirSyncError::Configuration(format!("Failed to create connection pool: {e}"))
            })?;

        Ok(Self {
            pool,
            statement_timeout_ms: config.statement_timeout_seconds * 1000,
            connection_string_safe: redact_connection_string(conn_str.as_str()),
        })
    }

    /// Get a connection from the pool with the statement timeout applied
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if no connection can be obtained.
    pub async fn connection(&self) -> Result<Object> {
        let client = self.pool.get().await.map_err(|e| {
            StoreError::Unavailable(format!("Failed to get connection from pool: {e}"))
        })?;

        client
            .batch_execute(&format!(
                "SET statement_timeout = {}",
                self.statement_timeout_ms
            ))
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to set statement timeout: {e}")))?;

        Ok(client)
    }

    pub async fn test_connection(&self) -> Result<()> {
        let client = self.connection().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| StoreError::Unavailable(format!("Connection test failed: {e}")))?;

        tracing::info!(
            target_db = %self.connection_string_safe,
            "PostgreSQL connection test successful"
        );
        Ok(())
    }

    /// Runs the bundled migration; every statement is `IF NOT EXISTS`
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.connection().await?;
        let migration_sql = include_str!("../../../migrations/001_initial_schema.sql");

        client
            .batch_execute(migration_sql)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        tracing::info!("PostgreSQL schema initialized");
        Ok(())
    }

    /// Execute a query and return rows
    pub async fn query(&self, query: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        let client = self.connection().await?;
        client
            .query(query, params)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()).into())
    }

    /// Execute a statement and return the number of affected rows
    pub async fn execute(&self, statement: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        let client = self.connection().await?;
        client
            .execute(statement, params)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()).into())
    }

    /// Connection string with credentials removed, for logs
    pub fn connection_string_safe(&self) -> &str {
        &self.connection_string_safe
    }
}

/// Replaces everything before the host with `***`
pub fn redact_connection_string(conn_str: &str) -> String {
    conn_str
        .rsplit_once('@')
        .map(|(_, host)| format!("postgresql://***@{host}"))
        .unwrap_or_else(|| "postgresql://***".to_string())
}
