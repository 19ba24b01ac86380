//! Adapter traits consumed by the use-case engine.
//!
//! Each trait covers one external capability. Implementations are injected as
//! `Arc<dyn Trait>` so use cases can be exercised against in-memory fakes.

use async_trait::async_trait;
use geoscout_core::{
    Isochrone, Location, Poi, PoiFilters, PoiType, RouteSummary, SearchArea, TransportMode,
    TravelMatrix,
};

use crate::error::ServiceError;

/// Free-text address or place name to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Candidate locations, best match first. An empty vector means no match.
    async fn geocode(&self, query: &str) -> Result<Vec<Location>, ServiceError>;
}

/// Reachable-area polygons from an origin.
#[async_trait]
pub trait IsochroneProvider: Send + Sync {
    /// One polygon per entry of `ranges_seconds`.
    async fn isochrones(
        &self,
        origin: &Location,
        ranges_seconds: &[u32],
        transport: TransportMode,
    ) -> Result<Isochrone, ServiceError>;
}

/// Points of interest inside an area.
#[async_trait]
pub trait PoiSource: Send + Sync {
    /// POIs of `poi_type` inside `area`, in source order. Each POI's
    /// `source_rank` is its position in that order.
    async fn find_pois(
        &self,
        area: &SearchArea,
        poi_type: PoiType,
        filters: &PoiFilters,
    ) -> Result<Vec<Poi>, ServiceError>;
}

/// Routes and travel-time matrices.
#[async_trait]
pub trait Router: Send + Sync {
    /// Route visiting `waypoints` in order (at least two).
    async fn route(
        &self,
        waypoints: &[Location],
        transport: TransportMode,
    ) -> Result<RouteSummary, ServiceError>;

    /// Travel durations and distances from every source to every destination.
    async fn matrix(
        &self,
        sources: &[Location],
        destinations: &[Location],
        transport: TransportMode,
    ) -> Result<TravelMatrix, ServiceError>;
}
