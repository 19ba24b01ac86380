use std::fmt;
use std::sync::Arc;

use geoscout_services::{Geocoder, IsochroneProvider, PoiSource, Router};

/// Adapter bundle injected into every use case and the orchestrator.
///
/// Cloning is cheap; all adapters are shared behind `Arc`.
#[derive(Clone)]
pub struct Services {
    pub geocoder: Arc<dyn Geocoder>,
    pub isochrones: Arc<dyn IsochroneProvider>,
    pub pois: Arc<dyn PoiSource>,
    pub router: Arc<dyn Router>,
}

impl Services {
    #[must_use]
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        isochrones: Arc<dyn IsochroneProvider>,
        pois: Arc<dyn PoiSource>,
        router: Arc<dyn Router>,
    ) -> Self {
        Self {
            geocoder,
            isochrones,
            pois,
            router,
        }
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
