use crate::app_config::{AppConfig, Environment};
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
/// Does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Parse and validate configuration through `lookup`, so tests can feed a
/// plain map instead of mutating the process environment.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("GEOSCOUT_ENV", "development"))?;
    let log_level = or_default("GEOSCOUT_LOG_LEVEL", "info");
    let user_agent = or_default("GEOSCOUT_USER_AGENT", "geoscout/0.1 (poi-search)");

    let http_timeout_secs = parse_u64("GEOSCOUT_HTTP_TIMEOUT_SECS", "20")?;
    let max_retries = parse_u32("GEOSCOUT_MAX_RETRIES", "3")?;
    let retry_initial_delay_ms = parse_u64("GEOSCOUT_RETRY_INITIAL_DELAY_MS", "500")?;
    let retry_max_delay_ms = parse_u64("GEOSCOUT_RETRY_MAX_DELAY_MS", "10000")?;
    if retry_max_delay_ms < retry_initial_delay_ms {
        return Err(invalid(
            "GEOSCOUT_RETRY_MAX_DELAY_MS",
            format!("must be >= GEOSCOUT_RETRY_INITIAL_DELAY_MS ({retry_initial_delay_ms})"),
        ));
    }

    let nominatim_url = or_default("GEOSCOUT_NOMINATIM_URL", "https://nominatim.openstreetmap.org");
    let nominatim_min_interval_ms = parse_u64("GEOSCOUT_NOMINATIM_MIN_INTERVAL_MS", "1000")?;
    let overpass_url = or_default("GEOSCOUT_OVERPASS_URL", "https://overpass-api.de");
    let overpass_min_interval_ms = parse_u64("GEOSCOUT_OVERPASS_MIN_INTERVAL_MS", "500")?;
    let ors_url = or_default("GEOSCOUT_ORS_URL", "https://api.openrouteservice.org");
    let ors_api_key = lookup("ORS_API_KEY").ok().filter(|k| !k.trim().is_empty());
    let ors_requests_per_minute = parse_u32("GEOSCOUT_ORS_REQUESTS_PER_MINUTE", "40")?;
    if ors_requests_per_minute == 0 {
        return Err(invalid(
            "GEOSCOUT_ORS_REQUESTS_PER_MINUTE",
            "must be greater than zero".to_string(),
        ));
    }
    let osrm_url = or_default("GEOSCOUT_OSRM_URL", "https://router.project-osrm.org");

    let max_results = parse_usize("GEOSCOUT_MAX_RESULTS", "20")?;
    if !(1..=100).contains(&max_results) {
        return Err(invalid(
            "GEOSCOUT_MAX_RESULTS",
            format!("{max_results} is outside 1..=100"),
        ));
    }

    let threshold_raw = or_default("GEOSCOUT_LOW_CONFIDENCE_THRESHOLD", "0.5");
    let low_confidence_threshold = threshold_raw
        .parse::<f64>()
        .map_err(|e| invalid("GEOSCOUT_LOW_CONFIDENCE_THRESHOLD", e.to_string()))?;
    if !(0.0..=1.0).contains(&low_confidence_threshold) {
        return Err(invalid(
            "GEOSCOUT_LOW_CONFIDENCE_THRESHOLD",
            format!("{threshold_raw} is outside [0, 1]"),
        ));
    }

    Ok(AppConfig {
        env,
        log_level,
        user_agent,
        http_timeout_secs,
        max_retries,
        retry_initial_delay_ms,
        retry_max_delay_ms,
        nominatim_url,
        nominatim_min_interval_ms,
        overpass_url,
        overpass_min_interval_ms,
        ors_url,
        ors_api_key,
        ors_requests_per_minute,
        osrm_url,
        max_results,
        low_confidence_threshold,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "GEOSCOUT_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
