use async_trait::async_trait;
use geoscout_core::{Isochrone, Location, TransportMode};

use crate::error::ServiceError;
use crate::ports::IsochroneProvider;

/// Stand-in isochrone provider for deployments without an isochrone backend.
///
/// Always fails with [`ServiceError::NotConfigured`]; the within-time use case
/// answers with its radius fallback instead.
#[derive(Debug, Clone)]
pub struct UnavailableIsochrones {
    reason: String,
}

impl UnavailableIsochrones {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl IsochroneProvider for UnavailableIsochrones {
    async fn isochrones(
        &self,
        _origin: &Location,
        _ranges_seconds: &[u32],
        _transport: TransportMode,
    ) -> Result<Isochrone, ServiceError> {
        Err(ServiceError::NotConfigured {
            service: "isochrones",
            reason: self.reason.clone(),
        })
    }
}
