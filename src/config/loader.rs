//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{AirSyncConfig, DatabaseTarget};
use super::secret::secret_string;
use crate::domain::errors::AirSyncError;
use crate::domain::result::Result;
use crate::domain::StreamKey;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into AirSyncConfig
/// 4. Applies environment variable overrides (AIRSYNC_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`AirSyncError::Configuration`] if the file is missing or
/// unreadable, a referenced variable is unset, parsing fails or validation
/// fails.
///
/// # Examples
///
/// ```no_run
/// use airsync::config::load_config;
///
/// let config = load_config("airsync.toml").expect("Failed to load config");
/// println!("page limit: {}", config.source.page_limit);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<AirSyncConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(AirSyncError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        AirSyncError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: AirSyncConfig = toml::from_str(&contents)
        .map_err(|e| AirSyncError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        AirSyncError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched so documented placeholders do not have
/// to be set.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| AirSyncError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&cap[0], &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(AirSyncError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        AirSyncError::Configuration(format!("Invalid value '{value}' for {name}"))
    })
}

/// Applies environment variable overrides using the AIRSYNC_* prefix
///
/// Variables follow the pattern `AIRSYNC_<SECTION>_<KEY>`, for example
/// `AIRSYNC_SOURCE_PAGE_LIMIT` or `AIRSYNC_POSTGRESQL_CONNECTION_STRING`.
fn apply_env_overrides(config: &mut AirSyncConfig) -> Result<()> {
    let var = |name: &str| std::env::var(name).ok();

    if let Some(val) = var("AIRSYNC_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Source overrides
    if let Some(val) = var("AIRSYNC_SOURCE_LOCATIONS_BASE_URL") {
        config.source.locations_base_url = val;
    }
    if let Some(val) = var("AIRSYNC_SOURCE_MEASUREMENTS_BASE_URL") {
        config.source.measurements_base_url = val;
    }
    if let Some(val) = var("AIRSYNC_SOURCE_API_KEY") {
        config.source.api_key = Some(secret_string(val));
    }
    if let Some(val) = var("AIRSYNC_SOURCE_PAGE_LIMIT") {
        config.source.page_limit = parse_override("AIRSYNC_SOURCE_PAGE_LIMIT", &val)?;
    }
    if let Some(val) = var("AIRSYNC_SOURCE_TIMEOUT_SECONDS") {
        config.source.timeout_seconds = parse_override("AIRSYNC_SOURCE_TIMEOUT_SECONDS", &val)?;
    }
    if let Some(val) = var("AIRSYNC_SOURCE_INITIAL_LOOKBACK_DAYS") {
        config.source.initial_lookback_days =
            parse_override("AIRSYNC_SOURCE_INITIAL_LOOKBACK_DAYS", &val)?;
    }
    if let Some(val) = var("AIRSYNC_SOURCE_STREAM") {
        config.source.stream = StreamKey::new(val).map_err(AirSyncError::Configuration)?;
    }
    if let Some(val) = var("AIRSYNC_SOURCE_RETRY_MAX_ATTEMPTS") {
        config.source.retry.max_attempts =
            parse_override("AIRSYNC_SOURCE_RETRY_MAX_ATTEMPTS", &val)?;
    }

    if let Some(val) = var("AIRSYNC_DATABASE_TARGET") {
        config.database_target = match val.to_lowercase().as_str() {
            "postgresql" => DatabaseTarget::PostgreSQL,
            "memory" => DatabaseTarget::Memory,
            other => {
                return Err(AirSyncError::Configuration(format!(
                    "Invalid AIRSYNC_DATABASE_TARGET '{other}'. Must be one of: postgresql, memory"
                )))
            }
        };
    }

    // PostgreSQL overrides (only if PostgreSQL is configured)
    if let Some(ref mut pg) = config.postgresql {
        if let Some(val) = var("AIRSYNC_POSTGRESQL_CONNECTION_STRING") {
            pg.connection_string = secret_string(val);
        }
        if let Some(val) = var("AIRSYNC_POSTGRESQL_MAX_CONNECTIONS") {
            pg.max_connections = parse_override("AIRSYNC_POSTGRESQL_MAX_CONNECTIONS", &val)?;
        }
        if let Some(val) = var("AIRSYNC_POSTGRESQL_SSL_MODE") {
            pg.ssl_mode = val;
        }
    }

    // Alert overrides
    if let Some(val) = var("AIRSYNC_ALERTS_ENABLED") {
        config.alerts.enabled = parse_override("AIRSYNC_ALERTS_ENABLED", &val)?;
    }
    if let Some(val) = var("AIRSYNC_ALERTS_SEED_DEMO_RULES") {
        config.alerts.seed_demo_rules = parse_override("AIRSYNC_ALERTS_SEED_DEMO_RULES", &val)?;
    }

    // Logging overrides
    if let Some(val) = var("AIRSYNC_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("AIRSYNC_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Some(val) = var("AIRSYNC_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
