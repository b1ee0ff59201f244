//! Configuration management for airsync.
//!
//! Configuration is read from a TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `AIRSYNC_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation before anything connects
//!
//! # Example Configuration
//!
//! ```toml
//! database_target = "postgresql"
//!
//! [application]
//! log_level = "info"
//!
//! [source]
//! locations_base_url = "https://api.openaq.org/v3"
//! measurements_base_url = "https://api.openaq.org/v2"
//! api_key = "${OPENAQ_API_KEY}"
//! page_limit = 100
//!
//! [source.retry]
//! max_attempts = 3
//!
//! [postgresql]
//! connection_string = "${AIRSYNC_DATABASE_URL}"
//!
//! [alerts]
//! enabled = true
//! seed_demo_rules = false
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    AirSyncConfig, AlertsConfig, ApplicationConfig, DatabaseTarget, LoggingConfig,
    PostgreSQLConfig, RetryConfig, SourceConfig, MAX_INITIAL_LOOKBACK_DAYS,
    MAX_RECENT_WINDOW_HOURS,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
