use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual
/// environment so it can be tested with a pure `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<bool>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let source_base_url = require("CHARMTRACK_SOURCE_BASE_URL")?;

    let env = parse_environment(&or_default("CHARMTRACK_ENV", "development"));
    let bind_addr = parse_addr("CHARMTRACK_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("CHARMTRACK_LOG_LEVEL", "info");
    let charms_path = PathBuf::from(or_default("CHARMTRACK_CHARMS_PATH", "./config/charms.yaml"));

    let source_request_timeout_secs = parse_u64("CHARMTRACK_SOURCE_REQUEST_TIMEOUT_SECS", "30")?;
    let source_user_agent = or_default(
        "CHARMTRACK_SOURCE_USER_AGENT",
        "charmtrack/0.1 (price-tracking)",
    );
    let source_max_retries = parse_u32("CHARMTRACK_SOURCE_MAX_RETRIES", "3")?;
    let source_retry_backoff_base_secs =
        parse_u64("CHARMTRACK_SOURCE_RETRY_BACKOFF_BASE_SECS", "5")?;

    let refresh_interval_secs = parse_u64("CHARMTRACK_REFRESH_INTERVAL_SECS", "300")?;
    let refresh_enabled = parse_bool("CHARMTRACK_REFRESH_ENABLED", "true")?;

    let rate_limit_max_requests = parse_usize("CHARMTRACK_RATE_LIMIT_MAX_REQUESTS", "120")?;
    let rate_limit_window_secs = parse_u64("CHARMTRACK_RATE_LIMIT_WINDOW_SECS", "60")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        charms_path,
        source_base_url,
        source_request_timeout_secs,
        source_user_agent,
        source_max_retries,
        source_retry_backoff_base_secs,
        refresh_interval_secs,
        refresh_enabled,
        rate_limit_max_requests,
        rate_limit_window_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
