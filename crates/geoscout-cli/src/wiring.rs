//! Builds the adapter bundle from configuration.

use std::sync::Arc;
use std::time::Duration;

use geoscout_core::AppConfig;
use geoscout_engine::{Orchestrator, OrchestratorSettings, RuleBasedClassifier, Services};
use geoscout_services::{
    HttpSettings, IsochroneProvider, NominatimGeocoder, OpenRouteServiceClient, OsrmRouter,
    OverpassPoiSource, RateLimitConfig, RateLimiter, ResilientCaller, RetryPolicy, Router,
    UnavailableIsochrones,
};

fn retry_policy(config: &AppConfig) -> RetryPolicy {
    RetryPolicy {
        max_retries: config.max_retries,
        initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
        max_delay: Duration::from_millis(config.retry_max_delay_ms),
        attempt_timeout: Some(Duration::from_secs(config.http_timeout_secs)),
        ..RetryPolicy::default()
    }
}

fn http(config: &AppConfig, base_url: &str) -> HttpSettings {
    HttpSettings::new(base_url)
        .with_timeout_secs(config.http_timeout_secs)
        .with_user_agent(&config.user_agent)
}

/// Each external service gets its own limiter so one slow provider never
/// throttles the others.
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be built.
pub(crate) fn build_services(config: &AppConfig) -> anyhow::Result<Services> {
    let policy = retry_policy(config);

    let nominatim_limiter = Arc::new(RateLimiter::new(RateLimitConfig::min_interval(
        Duration::from_millis(config.nominatim_min_interval_ms),
    )));
    let geocoder = NominatimGeocoder::new(
        http(config, &config.nominatim_url),
        ResilientCaller::new("nominatim", nominatim_limiter, policy.clone()),
    )?;

    let overpass_limiter = Arc::new(RateLimiter::new(RateLimitConfig::min_interval(
        Duration::from_millis(config.overpass_min_interval_ms),
    )));
    let pois = OverpassPoiSource::new(
        http(config, &config.overpass_url),
        ResilientCaller::new("overpass", overpass_limiter, policy.clone()),
    )?;

    let (isochrones, router): (Arc<dyn IsochroneProvider>, Arc<dyn Router>) =
        if let Some(api_key) = &config.ors_api_key {
            let limiter = Arc::new(RateLimiter::new(RateLimitConfig::per_minute(
                config.ors_requests_per_minute,
            )));
            let ors = Arc::new(OpenRouteServiceClient::new(
                http(config, &config.ors_url),
                api_key,
                ResilientCaller::new("openrouteservice", limiter, policy),
            )?);
            let isochrones: Arc<dyn IsochroneProvider> = ors.clone();
            (isochrones, ors)
        } else {
            tracing::info!("ORS_API_KEY not set; routing through OSRM without isochrones");
            let osrm = OsrmRouter::new(
                http(config, &config.osrm_url),
                ResilientCaller::unthrottled("osrm", policy),
            )?;
            let isochrones: Arc<dyn IsochroneProvider> =
                Arc::new(UnavailableIsochrones::new("ORS_API_KEY is not set"));
            (isochrones, Arc::new(osrm))
        };

    Ok(Services::new(Arc::new(geocoder), isochrones, Arc::new(pois), router))
}

/// # Errors
///
/// Returns an error if the adapters cannot be built.
pub(crate) fn build_orchestrator(config: &AppConfig) -> anyhow::Result<Orchestrator> {
    Ok(Orchestrator::new(
        build_services(config)?,
        Arc::new(RuleBasedClassifier::new()),
        OrchestratorSettings::from_config(config),
    ))
}
