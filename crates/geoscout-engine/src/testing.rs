//! In-memory adapters for engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use geoscout_core::geometry::circle_ring;
use geoscout_core::{
    Isochrone, IsochronePolygon, Location, Poi, PoiFilters, PoiType, RouteSummary, SearchArea,
    TransportMode, TravelMatrix,
};
use geoscout_services::{Geocoder, IsochroneProvider, PoiSource, Router, ServiceError};

use crate::services::Services;

pub(crate) fn loc(lat: f64, lng: f64) -> Location {
    Location::new(lat, lng).unwrap()
}

/// Central London; every scenario is laid out around it.
pub(crate) fn origin() -> Location {
    loc(51.5074, -0.1278)
}

/// A POI `north_m` metres north and `east_m` east of `from`.
pub(crate) fn poi_at(
    id: &str,
    poi_type: PoiType,
    from: &Location,
    north_m: f64,
    east_m: f64,
) -> Poi {
    Poi::new(id, id, poi_type, from.offset(north_m, east_m))
}

fn unavailable(service: &'static str) -> ServiceError {
    ServiceError::Status {
        service,
        status: 503,
        body: "unavailable".to_owned(),
    }
}

#[derive(Default)]
pub(crate) struct FakeGeocoder {
    places: HashMap<String, Location>,
    fail: bool,
    pub(crate) calls: AtomicUsize,
}

impl FakeGeocoder {
    pub(crate) fn with_place(mut self, name: &str, location: Location) -> Self {
        self.places.insert(name.to_lowercase(), location);
        self
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, query: &str) -> Result<Vec<Location>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(unavailable("nominatim"));
        }
        Ok(self
            .places
            .get(&query.to_lowercase())
            .cloned()
            .into_iter()
            .collect())
    }
}

/// Answers with a circle of a fixed radius, or fails when no radius is set.
#[derive(Default)]
pub(crate) struct FakeIsochrones {
    radius_m: Option<f64>,
    no_polygons: bool,
    pub(crate) calls: AtomicUsize,
}

impl FakeIsochrones {
    pub(crate) fn circle(radius_m: f64) -> Self {
        Self {
            radius_m: Some(radius_m),
            ..Self::default()
        }
    }

    pub(crate) fn failing() -> Self {
        Self::default()
    }

    /// Succeeds without any polygon.
    pub(crate) fn empty() -> Self {
        Self {
            radius_m: Some(0.0),
            no_polygons: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl IsochroneProvider for FakeIsochrones {
    async fn isochrones(
        &self,
        origin: &Location,
        ranges_seconds: &[u32],
        transport: TransportMode,
    ) -> Result<Isochrone, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let radius_m = self.radius_m.ok_or_else(|| unavailable("openrouteservice"))?;
        let ranges = if self.no_polygons { &[][..] } else { ranges_seconds };
        Ok(Isochrone {
            origin: origin.clone(),
            transport,
            polygons: ranges
                .iter()
                .map(|&time_seconds| IsochronePolygon {
                    time_seconds,
                    exterior: circle_ring(origin, radius_m, 64),
                    holes: Vec::new(),
                })
                .collect(),
        })
    }
}

/// Returns the stored POIs of the requested type that fall inside the
/// area's bounding box, in insertion order.
#[derive(Default)]
pub(crate) struct FakePois {
    pois: Vec<Poi>,
    fail: bool,
    pub(crate) calls: AtomicUsize,
    pub(crate) areas: Mutex<Vec<SearchArea>>,
    pub(crate) filters: Mutex<Vec<PoiFilters>>,
}

impl FakePois {
    pub(crate) fn new(pois: Vec<Poi>) -> Self {
        let pois = pois
            .into_iter()
            .enumerate()
            .map(|(rank, poi)| poi.with_rank(rank))
            .collect();
        Self {
            pois,
            ..Self::default()
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PoiSource for FakePois {
    async fn find_pois(
        &self,
        area: &SearchArea,
        poi_type: PoiType,
        filters: &PoiFilters,
    ) -> Result<Vec<Poi>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.areas.lock().unwrap().push(area.clone());
        self.filters.lock().unwrap().push(filters.clone());
        if self.fail {
            return Err(unavailable("overpass"));
        }
        let bbox = area.bounding_box();
        Ok(self
            .pois
            .iter()
            .filter(|p| p.poi_type == poi_type && bbox.contains(&p.location))
            .cloned()
            .collect())
    }
}

type DurationFn = dyn Fn(&Location, &Location, TransportMode) -> Option<f64> + Send + Sync;

/// Routes with a scripted duration function; by default straight-line
/// distance at the mode's reference speed.
pub(crate) struct FakeRouter {
    duration_s: Box<DurationFn>,
    fail_matrix: bool,
    pub(crate) route_calls: AtomicUsize,
    pub(crate) matrix_calls: AtomicUsize,
}

impl Default for FakeRouter {
    fn default() -> Self {
        Self::scripted(|a, b, mode| Some(a.distance_to(b) / mode.reference_speed_mps()))
    }
}

impl FakeRouter {
    pub(crate) fn scripted(
        duration_s: impl Fn(&Location, &Location, TransportMode) -> Option<f64>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            duration_s: Box::new(duration_s),
            fail_matrix: false,
            route_calls: AtomicUsize::new(0),
            matrix_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn without_matrix(mut self) -> Self {
        self.fail_matrix = true;
        self
    }
}

#[async_trait]
impl Router for FakeRouter {
    async fn route(
        &self,
        waypoints: &[Location],
        transport: TransportMode,
    ) -> Result<RouteSummary, ServiceError> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        let mut summary = RouteSummary {
            distance_m: 0.0,
            duration_s: 0.0,
            geometry: None,
            steps: Vec::new(),
        };
        for leg in waypoints.windows(2) {
            summary.distance_m += leg[0].distance_to(&leg[1]);
            summary.duration_s += (self.duration_s)(&leg[0], &leg[1], transport).ok_or_else(
                || ServiceError::Rejected {
                    service: "osrm",
                    message: "NoRoute: no route found".to_owned(),
                },
            )?;
        }
        Ok(summary)
    }

    async fn matrix(
        &self,
        sources: &[Location],
        destinations: &[Location],
        transport: TransportMode,
    ) -> Result<TravelMatrix, ServiceError> {
        self.matrix_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_matrix {
            return Err(unavailable("osrm"));
        }
        Ok(TravelMatrix {
            durations_s: sources
                .iter()
                .map(|s| {
                    destinations
                        .iter()
                        .map(|d| (self.duration_s)(s, d, transport))
                        .collect()
                })
                .collect(),
            distances_m: sources
                .iter()
                .map(|s| destinations.iter().map(|d| Some(s.distance_to(d))).collect())
                .collect(),
        })
    }
}

/// Handles to every fake plus the [`Services`] bundle wrapping them.
pub(crate) struct Fakes {
    pub(crate) geocoder: Arc<FakeGeocoder>,
    pub(crate) isochrones: Arc<FakeIsochrones>,
    pub(crate) pois: Arc<FakePois>,
    pub(crate) router: Arc<FakeRouter>,
}

impl Fakes {
    pub(crate) fn new(pois: Vec<Poi>) -> Self {
        Self {
            geocoder: Arc::new(FakeGeocoder::default()),
            isochrones: Arc::new(FakeIsochrones::failing()),
            pois: Arc::new(FakePois::new(pois)),
            router: Arc::new(FakeRouter::default()),
        }
    }

    pub(crate) fn with_geocoder(mut self, geocoder: FakeGeocoder) -> Self {
        self.geocoder = Arc::new(geocoder);
        self
    }

    pub(crate) fn with_isochrones(mut self, isochrones: FakeIsochrones) -> Self {
        self.isochrones = Arc::new(isochrones);
        self
    }

    pub(crate) fn with_poi_source(mut self, pois: FakePois) -> Self {
        self.pois = Arc::new(pois);
        self
    }

    pub(crate) fn with_router(mut self, router: FakeRouter) -> Self {
        self.router = Arc::new(router);
        self
    }

    pub(crate) fn services(&self) -> Services {
        Services::new(
            self.geocoder.clone(),
            self.isochrones.clone(),
            self.pois.clone(),
            self.router.clone(),
        )
    }
}
