use crate::app_config::{
    AppConfig, Environment, DEFAULT_JUNK_TITLE_KEYWORDS, DEFAULT_JUNK_URL_KEYWORDS,
    DEFAULT_USER_AGENTS,
};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
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
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a pure
/// `HashMap` lookup, no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_num = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let narrow = |var: &str, value: u64| -> Result<u32, ConfigError> {
        u32::try_from(value).map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let widen = |var: &str, value: u64| -> Result<usize, ConfigError> {
        usize::try_from(value).map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let list = |var: &str, separator: char, default: &[&str]| -> Vec<String> {
        match lookup(var) {
            Ok(raw) => split_list(&raw, separator),
            Err(_) => default.iter().map(|s| (*s).to_string()).collect(),
        }
    };

    let database_url = lookup("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());
    let env = parse_environment(&or_default("BIZSCRAPE_ENV", "development"));

    let bind_addr = or_default("BIZSCRAPE_BIND_ADDR", "0.0.0.0:8000")
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: "BIZSCRAPE_BIND_ADDR".to_string(),
            reason: e.to_string(),
        })?;
    let log_level = or_default("BIZSCRAPE_LOG_LEVEL", "info");

    let db_max_connections = narrow(
        "BIZSCRAPE_DB_MAX_CONNECTIONS",
        parse_num("BIZSCRAPE_DB_MAX_CONNECTIONS", "10")?,
    )?;
    let db_min_connections = narrow(
        "BIZSCRAPE_DB_MIN_CONNECTIONS",
        parse_num("BIZSCRAPE_DB_MIN_CONNECTIONS", "1")?,
    )?;
    let db_acquire_timeout_secs = parse_num("BIZSCRAPE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let fetch_max_concurrency = widen(
        "BIZSCRAPE_FETCH_MAX_CONCURRENCY",
        parse_num("BIZSCRAPE_FETCH_MAX_CONCURRENCY", "8")?,
    )?;
    let fetch_timeout_ms = parse_num("BIZSCRAPE_FETCH_TIMEOUT_MS", "20000")?;
    let fetch_max_attempts = narrow(
        "BIZSCRAPE_FETCH_MAX_ATTEMPTS",
        parse_num("BIZSCRAPE_FETCH_MAX_ATTEMPTS", "3")?,
    )?;
    let fetch_backoff_base_ms = parse_num("BIZSCRAPE_FETCH_BACKOFF_BASE_MS", "750")?;
    let host_min_interval_ms = parse_num("BIZSCRAPE_HOST_MIN_INTERVAL_MS", "250")?;
    let session_timeout_secs = parse_num("BIZSCRAPE_SESSION_TIMEOUT_SECS", "0")?;
    let request_max_urls = widen(
        "BIZSCRAPE_REQUEST_MAX_URLS",
        parse_num("BIZSCRAPE_REQUEST_MAX_URLS", "50")?,
    )?;
    let min_title_words = widen(
        "BIZSCRAPE_MIN_TITLE_WORDS",
        parse_num("BIZSCRAPE_MIN_TITLE_WORDS", "2")?,
    )?;

    let user_agents = list("BIZSCRAPE_USER_AGENTS", '|', DEFAULT_USER_AGENTS.as_slice());
    if user_agents.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "BIZSCRAPE_USER_AGENTS".to_string(),
            reason: "user agent pool must not be empty".to_string(),
        });
    }
    let junk_title_keywords = list(
        "BIZSCRAPE_JUNK_TITLE_KEYWORDS",
        ',',
        DEFAULT_JUNK_TITLE_KEYWORDS.as_slice(),
    );
    let junk_url_keywords = list(
        "BIZSCRAPE_JUNK_URL_KEYWORDS",
        ',',
        DEFAULT_JUNK_URL_KEYWORDS.as_slice(),
    );

    let scheduler_enabled = parse_bool(
        "BIZSCRAPE_SCHEDULER_ENABLED",
        &or_default("BIZSCRAPE_SCHEDULER_ENABLED", "true"),
    )?;
    let scheduler_interval_hours = or_default("BIZSCRAPE_SCHEDULER_INTERVAL_HOURS", "6")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|h| h.is_finite() && *h > 0.0)
        .ok_or_else(|| ConfigError::InvalidEnvVar {
            var: "BIZSCRAPE_SCHEDULER_INTERVAL_HOURS".to_string(),
            reason: "expected a positive number of hours".to_string(),
        })?;
    let seed_urls = list("BIZSCRAPE_SEED_URLS", ',', &[] as &[&str]);

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        fetch_max_concurrency,
        fetch_timeout_ms,
        fetch_max_attempts,
        fetch_backoff_base_ms,
        host_min_interval_ms,
        session_timeout_secs,
        request_max_urls,
        user_agents,
        junk_title_keywords,
        junk_url_keywords,
        min_title_words,
        scheduler_enabled,
        scheduler_interval_hours,
        seed_urls,
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

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

fn split_list(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
