use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::ServiceError;

/// Longest slice of an error body kept in [`ServiceError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Connection settings shared by the HTTP adapters.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl HttpSettings {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: 20,
            user_agent: concat!("geoscout/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// `base_url` joined with `path`, without doubled slashes.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn build_client(&self, service: &'static str) -> Result<Client, ServiceError> {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&self.user_agent)
            .build()
            .map_err(|source| ServiceError::Http { service, source })
    }
}

pub(crate) fn transport_error(service: &'static str) -> impl Fn(reqwest::Error) -> ServiceError {
    move |source| ServiceError::Http { service, source }
}

/// Maps non-2xx responses to typed errors; 429 carries the `Retry-After` hint.
pub(crate) async fn check_status(
    service: &'static str,
    response: Response,
) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        return Err(ServiceError::RateLimited {
            service,
            retry_after_secs,
        });
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(ServiceError::Status {
        service,
        status: status.as_u16(),
        body,
    })
}

/// Reads the body as text and deserializes it, labelling failures with `context`.
pub(crate) async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    context: &str,
    response: Response,
) -> Result<T, ServiceError> {
    let text = response.text().await.map_err(transport_error(service))?;
    serde_json::from_str(&text).map_err(|source| ServiceError::Deserialize {
        context: context.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let settings = HttpSettings::new("http://localhost:8080/");
        assert_eq!(
            settings.endpoint("/api/interpreter"),
            "http://localhost:8080/api/interpreter"
        );
        assert_eq!(settings.endpoint("search"), "http://localhost:8080/search");
    }

    #[test]
    fn builder_overrides_defaults() {
        let settings = HttpSettings::new("http://x")
            .with_timeout_secs(3)
            .with_user_agent("probe/1.0");
        assert_eq!(settings.timeout_secs, 3);
        assert_eq!(settings.user_agent, "probe/1.0");
    }
}
