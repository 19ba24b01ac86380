//! POIs worth stopping at on the way to a destination.

use futures::future::join;
use geoscout_core::geometry::distance_to_polyline_m;
use geoscout_core::{
    BoundingBox, ErrorCode, Location, PlaceRef, Poi, PoiFilters, PoiType, SearchArea,
    TransportMode, UseCaseError, UseCaseResult,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{check_range, cmp_f64, DEFAULT_MAX_RESULTS, MAX_RESULTS_RANGE, TIME_LIMIT_MINUTES};
use crate::services::Services;
use crate::tracker::{upstream_error, ExecutionTracker};

/// Candidates closest to the route that are sent to the routing engine.
pub const MAX_CORRIDOR_CANDIDATES: usize = 25;

/// Longest trip accepted, stopover included.
const MAX_TOTAL_MINUTES: std::ops::RangeInclusive<u32> = 1..=600;

/// Half-width of the search corridor around the direct route.
#[must_use]
pub fn corridor_width_m(transport: TransportMode) -> f64 {
    match transport {
        TransportMode::Walking => 300.0,
        TransportMode::Cycling => 750.0,
        TransportMode::PublicTransport => 1_000.0,
        TransportMode::Driving => 2_000.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrouteParams {
    pub location: Location,
    pub destination: PlaceRef,
    pub poi_type: PoiType,
    pub transport: TransportMode,
    pub max_total_time_minutes: u32,
    pub max_detour_minutes: u32,
    pub max_results: usize,
}

impl EnrouteParams {
    #[must_use]
    pub fn new(
        location: Location,
        destination: PlaceRef,
        poi_type: PoiType,
        transport: TransportMode,
        max_total_time_minutes: u32,
        max_detour_minutes: u32,
    ) -> Self {
        Self {
            location,
            destination,
            poi_type,
            transport,
            max_total_time_minutes,
            max_detour_minutes,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrouteResult {
    pub destination: Location,
    pub direct_duration_minutes: f64,
    pub direct_distance_m: f64,
    pub corridor_width_m: f64,
    /// Sorted by ascending detour. `durations_minutes` holds the leg from
    /// the user to the POI.
    pub pois: Vec<Poi>,
}

/// Finds stopovers along the direct route whose detour and total trip time
/// stay within the caller's limits.
///
/// # Errors
///
/// - `VALIDATION_ERROR` for out-of-range params or a destination that does
///   not geocode.
/// - `TIME_CONSTRAINT_EXCEEDED` when candidates exist but every one breaks a
///   limit.
/// - `UPSTREAM_SERVICE_ERROR` / `TIMEOUT_ERROR` when an adapter fails.
pub async fn enroute(services: &Services, params: EnrouteParams) -> UseCaseResult<EnrouteResult> {
    check_range(
        "max_total_time_minutes",
        params.max_total_time_minutes,
        &MAX_TOTAL_MINUTES,
    )?;
    check_range(
        "max_detour_minutes",
        params.max_detour_minutes,
        &TIME_LIMIT_MINUTES,
    )?;
    check_range("max_results", params.max_results, &MAX_RESULTS_RANGE)?;

    let mut tracker = ExecutionTracker::start();
    let origin = params.location;
    let transport = params.transport;

    let destination = match params.destination {
        PlaceRef::Coordinates(location) => location,
        PlaceRef::Text(text) => {
            tracker.record_call();
            let found = services
                .geocoder
                .geocode(&text)
                .await
                .map_err(|err| upstream_error("destination geocoding", &err))?;
            found.into_iter().next().ok_or_else(|| {
                UseCaseError::validation(format!("destination \"{text}\" could not be located"))
            })?
        }
    };

    tracker.record_call();
    let direct = services
        .router
        .route(&[origin.clone(), destination.clone()], transport)
        .await
        .map_err(|err| upstream_error("direct route", &err))?;
    let direct_minutes = direct.duration_minutes();

    let corridor: Vec<Location> = match direct.geometry {
        Some(line) if line.len() >= 2 => line,
        _ => vec![origin.clone(), destination.clone()],
    };
    let width_m = corridor_width_m(transport);
    let bbox = BoundingBox::enclosing(&corridor)
        .unwrap_or_else(|| BoundingBox::around(&origin, 0.0))
        .expanded_by(width_m);

    tracker.record_call();
    let found = services
        .pois
        .find_pois(
            &SearchArea::BoundingBox(bbox),
            params.poi_type,
            &PoiFilters::default(),
        )
        .await
        .map_err(|err| upstream_error("POI search", &err))?;

    let mut candidates: Vec<(f64, Poi)> = found
        .into_iter()
        .map(|poi| (distance_to_polyline_m(&poi.location, &corridor), poi))
        .filter(|(off_route, _)| *off_route <= width_m)
        .collect();
    candidates.sort_by(|(a, pa), (b, pb)| {
        a.total_cmp(b).then(pa.source_rank.cmp(&pb.source_rank))
    });
    candidates.truncate(MAX_CORRIDOR_CANDIDATES);

    let mut result = EnrouteResult {
        destination,
        direct_duration_minutes: direct_minutes,
        direct_distance_m: direct.distance_m,
        corridor_width_m: width_m,
        pois: Vec::new(),
    };

    if candidates.is_empty() {
        let message = format!("no {} within {width_m:.0} m of the route", params.poi_type);
        return tracker.succeed_empty(result, message);
    }

    let stops: Vec<Location> = candidates.iter().map(|(_, p)| p.location.clone()).collect();
    let from_origin = std::slice::from_ref(&origin);
    let to_destination = std::slice::from_ref(&result.destination);

    tracker.record_calls(2);
    let (first_legs, second_legs) = join(
        services.router.matrix(from_origin, &stops, transport),
        services.router.matrix(&stops, to_destination, transport),
    )
    .await;
    let first_legs = first_legs.map_err(|err| upstream_error("travel times to stops", &err))?;
    let second_legs =
        second_legs.map_err(|err| upstream_error("travel times from stops", &err))?;

    let max_total = f64::from(params.max_total_time_minutes);
    let max_detour = f64::from(params.max_detour_minutes);
    let mut routable = 0usize;
    let mut best_detour = f64::INFINITY;
    let mut best_total = f64::INFINITY;

    for (idx, (_, mut poi)) in candidates.into_iter().enumerate() {
        let (Some(leg1), Some(leg2)) =
            (first_legs.duration_s(0, idx), second_legs.duration_s(idx, 0))
        else {
            tracing::debug!(poi = %poi.id, "stopover not routable");
            continue;
        };
        routable += 1;
        let leg1_minutes = leg1 / 60.0;
        let total = leg1_minutes + leg2 / 60.0;
        let detour = total - direct_minutes;
        best_detour = best_detour.min(detour);
        best_total = best_total.min(total);
        if detour > max_detour || total > max_total {
            continue;
        }
        poi.detour_minutes = Some(detour);
        poi.distance_m = Some(origin.distance_to(&poi.location));
        poi.durations_minutes.insert(transport, leg1_minutes);
        result.pois.push(poi);
    }

    if result.pois.is_empty() {
        if routable == 0 {
            tracker.warn("no stopover could be routed");
            let message = format!("no routable {} along the route", params.poi_type);
            return tracker.succeed_empty(result, message);
        }
        return Err(UseCaseError::new(
            ErrorCode::TimeConstraintExceeded,
            format!(
                "every {} along the route exceeds a {} min detour or a {} min total trip",
                params.poi_type, params.max_detour_minutes, params.max_total_time_minutes
            ),
        )
        .with_details(json!({
            "candidates": routable,
            "direct_duration_minutes": direct_minutes,
            "smallest_detour_minutes": best_detour,
            "shortest_total_minutes": best_total,
            "max_detour_minutes": params.max_detour_minutes,
            "max_total_time_minutes": params.max_total_time_minutes,
        })));
    }

    result.pois.sort_by(|a, b| {
        cmp_f64(a.detour_minutes, b.detour_minutes)
            .then(cmp_f64(a.distance_m, b.distance_m))
            .then(a.source_rank.cmp(&b.source_rank))
    });
    result.pois.truncate(params.max_results);
    tracing::debug!(found = result.pois.len(), "enroute search complete");
    tracker.succeed(result)
}

#[cfg(test)]
#[path = "enroute_test.rs"]
mod tests;
