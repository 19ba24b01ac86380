//! The single return contract shared by every use case and the orchestrator.
//!
//! Expected failure modes are values, not panics: callers branch on
//! `Ok`/`Err` and, for successes, on the optional [`Advisory`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::GeoError;

/// Closed error/advisory taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NoResultsFound,
    TimeConstraintExceeded,
    UpstreamServiceError,
    TimeoutError,
    ClassificationLowConfidence,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::NoResultsFound => "NO_RESULTS_FOUND",
            ErrorCode::TimeConstraintExceeded => "TIME_CONSTRAINT_EXCEEDED",
            ErrorCode::UpstreamServiceError => "UPSTREAM_SERVICE_ERROR",
            ErrorCode::TimeoutError => "TIMEOUT_ERROR",
            ErrorCode::ClassificationLowConfidence => "CLASSIFICATION_LOW_CONFIDENCE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed failure returned by a use case or the orchestrator.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct UseCaseError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl UseCaseError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<GeoError> for UseCaseError {
    fn from(err: GeoError) -> Self {
        UseCaseError::validation(err.to_string())
    }
}

/// Non-fatal signal attached to a success, e.g. "no results" or "low
/// confidence classification".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub code: ErrorCode,
    pub message: String,
}

impl Advisory {
    pub fn no_results(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::NoResultsFound,
            message: message.into(),
        }
    }

    pub fn low_confidence(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::ClassificationLowConfidence,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    pub execution_time_ms: u64,
    /// Adapter calls issued, summed across nested steps (retries excluded).
    pub api_calls_count: u32,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisory: Option<Advisory>,
}

impl ExecutionMetadata {
    /// Folds a nested step's counters and warnings into `self`. The first
    /// advisory seen is kept.
    pub fn absorb(&mut self, nested: &ExecutionMetadata) {
        self.api_calls_count += nested.api_calls_count;
        self.warnings.extend(nested.warnings.iter().cloned());
        if self.advisory.is_none() {
            self.advisory.clone_from(&nested.advisory);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseCaseOutput<T> {
    pub data: T,
    pub metadata: ExecutionMetadata,
}

impl<T> UseCaseOutput<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> UseCaseOutput<U> {
        UseCaseOutput {
            data: f(self.data),
            metadata: self.metadata,
        }
    }

    #[must_use]
    pub fn is_empty_result(&self) -> bool {
        self.metadata
            .advisory
            .as_ref()
            .is_some_and(|a| a.code == ErrorCode::NoResultsFound)
    }
}

pub type UseCaseResult<T> = Result<UseCaseOutput<T>, UseCaseError>;
