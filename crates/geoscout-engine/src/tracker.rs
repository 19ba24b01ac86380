use std::time::Instant;

use geoscout_core::{
    Advisory, ErrorCode, ExecutionMetadata, UseCaseError, UseCaseOutput, UseCaseResult,
};
use geoscout_services::ServiceError;
use serde_json::json;

/// Per-invocation counters: elapsed time, adapter calls issued and warnings.
#[derive(Debug)]
pub(crate) struct ExecutionTracker {
    started: Instant,
    api_calls: u32,
    warnings: Vec<String>,
}

impl ExecutionTracker {
    pub(crate) fn start() -> Self {
        Self {
            started: Instant::now(),
            api_calls: 0,
            warnings: Vec::new(),
        }
    }

    /// Counts adapter calls; call before issuing them so concurrent batches
    /// are counted even when one of them fails.
    pub(crate) fn record_calls(&mut self, count: usize) {
        self.api_calls = self
            .api_calls
            .saturating_add(u32::try_from(count).unwrap_or(u32::MAX));
    }

    pub(crate) fn record_call(&mut self) {
        self.record_calls(1);
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(warning = %message, "use case degraded");
        self.warnings.push(message);
    }

    /// Folds a nested step's metadata into this tracker.
    pub(crate) fn absorb(&mut self, nested: &ExecutionMetadata) {
        self.api_calls = self.api_calls.saturating_add(nested.api_calls_count);
        self.warnings.extend(nested.warnings.iter().cloned());
    }

    pub(crate) fn metadata(&self, advisory: Option<Advisory>) -> ExecutionMetadata {
        ExecutionMetadata {
            execution_time_ms: u64::try_from(self.started.elapsed().as_millis())
                .unwrap_or(u64::MAX),
            api_calls_count: self.api_calls,
            warnings: self.warnings.clone(),
            advisory,
        }
    }

    pub(crate) fn succeed<T>(&self, data: T) -> UseCaseResult<T> {
        Ok(UseCaseOutput {
            data,
            metadata: self.metadata(None),
        })
    }

    pub(crate) fn succeed_empty<T>(&self, data: T, message: impl Into<String>) -> UseCaseResult<T> {
        Ok(UseCaseOutput {
            data,
            metadata: self.metadata(Some(Advisory::no_results(message))),
        })
    }
}

/// Maps an adapter failure onto the use-case taxonomy: timeouts become
/// `TIMEOUT_ERROR`, everything else `UPSTREAM_SERVICE_ERROR`.
pub(crate) fn upstream_error(operation: &str, err: &ServiceError) -> UseCaseError {
    let code = if err.is_timeout() {
        ErrorCode::TimeoutError
    } else {
        ErrorCode::UpstreamServiceError
    };
    UseCaseError::new(code, format!("{operation} failed: {err}")).with_details(json!({
        "service": err.service(),
        "status": err.status(),
    }))
}
