//! Free text to structured intent.

mod rules;

pub use rules::{
    RuleBasedClassifier, DEFAULT_DETOUR_MINUTES, DEFAULT_ENROUTE_TOTAL_MINUTES,
    DEFAULT_NEAR_POI_MINUTES, DEFAULT_WITHIN_MINUTES,
};

use async_trait::async_trait;
use geoscout_core::{ClassifiedQuery, QueryContext, UseCaseError};

/// Maps a query plus conversation context to a [`ClassifiedQuery`].
///
/// Implementations degrade to a low-confidence or unknown classification
/// rather than failing; blank input is the only error.
#[async_trait]
pub trait QueryClassifier: Send + Sync {
    /// # Errors
    ///
    /// `VALIDATION_ERROR` when `text` is empty or whitespace.
    async fn classify(
        &self,
        text: &str,
        context: &QueryContext,
    ) -> Result<ClassifiedQuery, UseCaseError>;
}
