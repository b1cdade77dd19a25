use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Fetch timeouts outside this window are rejected at startup.
const FETCH_TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 10..=120;

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
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a `HashMap` lookup.
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

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("CWATCH_ENV", "development"))?;

    let bind_addr: SocketAddr =
        parse_as("CWATCH_BIND_ADDR", &or_default("CWATCH_BIND_ADDR", "0.0.0.0:3000"))?;
    let log_level = or_default("CWATCH_LOG_LEVEL", "info");
    let entities_path = PathBuf::from(or_default(
        "CWATCH_ENTITIES_PATH",
        "./config/entities.yaml",
    ));
    let filters_path = optional("CWATCH_FILTERS_PATH").map(PathBuf::from);

    let db_max_connections: u32 = parse_as(
        "CWATCH_DB_MAX_CONNECTIONS",
        &or_default("CWATCH_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections: u32 = parse_as(
        "CWATCH_DB_MIN_CONNECTIONS",
        &or_default("CWATCH_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs: u64 = parse_as(
        "CWATCH_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("CWATCH_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    let fetch_timeout_secs: u64 = parse_as(
        "CWATCH_FETCH_TIMEOUT_SECS",
        &or_default("CWATCH_FETCH_TIMEOUT_SECS", "30"),
    )?;
    if !FETCH_TIMEOUT_RANGE_SECS.contains(&fetch_timeout_secs) {
        return Err(ConfigError::InvalidEnvVar {
            var: "CWATCH_FETCH_TIMEOUT_SECS".to_string(),
            reason: format!(
                "{fetch_timeout_secs} is outside {}..={}",
                FETCH_TIMEOUT_RANGE_SECS.start(),
                FETCH_TIMEOUT_RANGE_SECS.end()
            ),
        });
    }
    let fetch_user_agent = or_default(
        "CWATCH_FETCH_USER_AGENT",
        "cwatch/0.1 (competitive-intelligence)",
    );
    let render_proxy_url = optional("CWATCH_RENDER_PROXY_URL");
    let fetch_max_retries: u32 = parse_as(
        "CWATCH_FETCH_MAX_RETRIES",
        &or_default("CWATCH_FETCH_MAX_RETRIES", "2"),
    )?;
    let fetch_backoff_ms: u64 = parse_as(
        "CWATCH_FETCH_BACKOFF_MS",
        &or_default("CWATCH_FETCH_BACKOFF_MS", "1000"),
    )?;
    let max_concurrent_units: usize = parse_as(
        "CWATCH_MAX_CONCURRENT_UNITS",
        &or_default("CWATCH_MAX_CONCURRENT_UNITS", "4"),
    )?;

    let classifier_url = optional("CWATCH_CLASSIFIER_URL");
    let classifier_api_key = optional("CWATCH_CLASSIFIER_API_KEY");
    let classifier_model = or_default("CWATCH_CLASSIFIER_MODEL", "gpt-4o-mini");
    let classifier_timeout_secs: u64 = parse_as(
        "CWATCH_CLASSIFIER_TIMEOUT_SECS",
        &or_default("CWATCH_CLASSIFIER_TIMEOUT_SECS", "45"),
    )?;
    let classifier_max_retries: u32 = parse_as(
        "CWATCH_CLASSIFIER_MAX_RETRIES",
        &or_default("CWATCH_CLASSIFIER_MAX_RETRIES", "2"),
    )?;

    let min_signal_score: u8 = parse_as(
        "CWATCH_MIN_SIGNAL_SCORE",
        &or_default("CWATCH_MIN_SIGNAL_SCORE", "3"),
    )?;
    if !(1..=10).contains(&min_signal_score) {
        return Err(ConfigError::InvalidEnvVar {
            var: "CWATCH_MIN_SIGNAL_SCORE".to_string(),
            reason: format!("{min_signal_score} is outside 1..=10"),
        });
    }
    let signal_retention_days: i64 = parse_as(
        "CWATCH_SIGNAL_RETENTION_DAYS",
        &or_default("CWATCH_SIGNAL_RETENTION_DAYS", "90"),
    )?;
    let hash_dedup_days: i64 = parse_as(
        "CWATCH_HASH_DEDUP_DAYS",
        &or_default("CWATCH_HASH_DEDUP_DAYS", "7"),
    )?;
    let pattern_window_days: i64 = parse_as(
        "CWATCH_PATTERN_WINDOW_DAYS",
        &or_default("CWATCH_PATTERN_WINDOW_DAYS", "30"),
    )?;
    let pattern_signal_cap: i64 = parse_as(
        "CWATCH_PATTERN_SIGNAL_CAP",
        &or_default("CWATCH_PATTERN_SIGNAL_CAP", "300"),
    )?;
    let collect_cron = or_default("CWATCH_COLLECT_CRON", "0 0 */6 * * *");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        entities_path,
        filters_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        fetch_timeout_secs,
        fetch_user_agent,
        render_proxy_url,
        fetch_max_retries,
        fetch_backoff_ms,
        max_concurrent_units,
        classifier_url,
        classifier_api_key,
        classifier_model,
        classifier_timeout_secs,
        classifier_max_retries,
        min_signal_score,
        signal_retention_days,
        hash_dedup_days,
        pattern_window_days,
        pattern_signal_cap,
        collect_cron,
    })
}

/// Parse a raw env-var value, mapping parse failures to [`ConfigError::InvalidEnvVar`].
fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CWATCH_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
