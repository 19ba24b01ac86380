#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub nominatim_url: String,
    pub nominatim_min_interval_ms: u64,
    pub overpass_url: String,
    pub overpass_min_interval_ms: u64,
    pub ors_url: String,
    pub ors_api_key: Option<String>,
    pub ors_requests_per_minute: u32,
    pub osrm_url: String,
    pub max_results: usize,
    pub low_confidence_threshold: f64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("user_agent", &self.user_agent)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_initial_delay_ms", &self.retry_initial_delay_ms)
            .field("retry_max_delay_ms", &self.retry_max_delay_ms)
            .field("nominatim_url", &self.nominatim_url)
            .field("nominatim_min_interval_ms", &self.nominatim_min_interval_ms)
            .field("overpass_url", &self.overpass_url)
            .field("overpass_min_interval_ms", &self.overpass_min_interval_ms)
            .field("ors_url", &self.ors_url)
            .field("ors_api_key", &self.ors_api_key.as_ref().map(|_| "[redacted]"))
            .field("ors_requests_per_minute", &self.ors_requests_per_minute)
            .field("osrm_url", &self.osrm_url)
            .field("max_results", &self.max_results)
            .field("low_confidence_threshold", &self.low_confidence_threshold)
            .finish()
    }
}
