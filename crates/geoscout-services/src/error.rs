use thiserror::Error;

/// Errors raised by external service adapters.
///
/// Variants separate transient conditions (worth a retry) from permanent
/// ones; [`ServiceError::is_retriable`] is the default retry predicate.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error from {service}: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response other than 429.
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// HTTP 429; `retry_after_secs` comes from the `Retry-After` header.
    #[error("rate limited by {service} (retry after {retry_after_secs:?}s)")]
    RateLimited {
        service: &'static str,
        retry_after_secs: Option<u64>,
    },

    /// A single attempt exceeded its time budget.
    #[error("{service} call timed out after {elapsed_ms} ms")]
    Timeout {
        service: &'static str,
        elapsed_ms: u64,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The service answered but could not satisfy the request (no route,
    /// malformed input). Never retried.
    #[error("{service} rejected the request: {message}")]
    Rejected {
        service: &'static str,
        message: String,
    },

    #[error("{service} does not support {what}")]
    Unsupported {
        service: &'static str,
        what: String,
    },

    #[error("{service} is not configured: {reason}")]
    NotConfigured {
        service: &'static str,
        reason: String,
    },

    /// Explicitly marked transient by the adapter.
    #[error("transient failure in {service}: {message}")]
    Transient {
        service: &'static str,
        message: String,
    },

    /// Explicitly marked permanent by the adapter.
    #[error("permanent failure in {service}: {message}")]
    Permanent {
        service: &'static str,
        message: String,
    },
}

impl ServiceError {
    /// Returns `true` for errors worth retrying after a back-off delay.
    ///
    /// **Retriable:** timeouts, connection failures, HTTP 5xx, HTTP 429 and
    /// errors explicitly marked transient.
    ///
    /// **Not retriable:** 4xx responses, rejected or unsupported requests,
    /// malformed bodies, missing configuration and explicitly permanent errors.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            ServiceError::Http { source, .. } => {
                source.is_timeout()
                    || source.is_connect()
                    || source.status().is_some_and(|s| s.is_server_error())
            }
            ServiceError::Status { status, .. } => (500..600).contains(status),
            ServiceError::RateLimited { .. }
            | ServiceError::Timeout { .. }
            | ServiceError::Transient { .. } => true,
            ServiceError::Deserialize { .. }
            | ServiceError::Rejected { .. }
            | ServiceError::Unsupported { .. }
            | ServiceError::NotConfigured { .. }
            | ServiceError::Permanent { .. } => false,
        }
    }

    /// Name of the service that failed, when known.
    #[must_use]
    pub fn service(&self) -> Option<&'static str> {
        match self {
            ServiceError::Http { service, .. }
            | ServiceError::Status { service, .. }
            | ServiceError::RateLimited { service, .. }
            | ServiceError::Timeout { service, .. }
            | ServiceError::Rejected { service, .. }
            | ServiceError::Unsupported { service, .. }
            | ServiceError::NotConfigured { service, .. }
            | ServiceError::Transient { service, .. }
            | ServiceError::Permanent { service, .. } => Some(service),
            ServiceError::Deserialize { .. } => None,
        }
    }

    /// HTTP status associated with the failure, when there was one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ServiceError::Http { source, .. } => source.status().map(|s| s.as_u16()),
            ServiceError::Status { status, .. } => Some(*status),
            ServiceError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            ServiceError::Timeout { .. } => true,
            ServiceError::Http { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}
