//! POIs reachable from a location within a travel-time budget.

use geoscout_core::{
    BoundingBox, Isochrone, Location, Poi, PoiFilters, PoiType, SearchArea, TransportMode,
    UseCaseResult,
};
use serde::{Deserialize, Serialize};

use super::search::attach_durations;
use super::{
    check_range, sort_by_distance, DEFAULT_MAX_RESULTS, MAX_RESULTS_RANGE, TIME_LIMIT_MINUTES,
};
use crate::services::Services;
use crate::tracker::{upstream_error, ExecutionTracker};

pub const FALLBACK_RADIUS_WARNING: &str = "isochrone service unavailable, used fallback radius";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithinTimeParams {
    pub location: Location,
    pub poi_type: PoiType,
    pub time_minutes: u32,
    pub transport: TransportMode,
    #[serde(default)]
    pub cuisine: Option<String>,
    /// Modes to report travel times for; each costs one matrix call.
    #[serde(default)]
    pub duration_modes: Vec<TransportMode>,
    pub max_results: usize,
}

impl WithinTimeParams {
    /// Params with no cuisine, durations for `transport` only, and the
    /// default result cap.
    #[must_use]
    pub fn new(
        location: Location,
        poi_type: PoiType,
        time_minutes: u32,
        transport: TransportMode,
    ) -> Self {
        Self {
            location,
            poi_type,
            time_minutes,
            transport,
            cuisine: None,
            duration_modes: vec![transport],
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Which reachability test decided membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Containment {
    Isochrone { time_seconds: u32 },
    Radius { radius_m: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithinTimeResult {
    pub origin: Location,
    pub containment: Containment,
    pub pois: Vec<Poi>,
}

enum Reachable {
    Isochrone { isochrone: Isochrone, max_seconds: u32 },
    Radius { center: Location, radius_m: f64 },
}

impl Reachable {
    fn contains(&self, point: &Location) -> bool {
        match self {
            Reachable::Isochrone {
                isochrone,
                max_seconds,
            } => isochrone.contains_within(point, *max_seconds),
            Reachable::Radius { center, radius_m } => center.distance_to(point) <= *radius_m,
        }
    }

    fn search_area(&self) -> SearchArea {
        match self {
            Reachable::Isochrone { isochrone, .. } => {
                // is_empty() was checked before construction
                let bbox = isochrone
                    .bounding_box()
                    .unwrap_or_else(|| BoundingBox::around(&isochrone.origin, 0.0));
                SearchArea::BoundingBox(bbox)
            }
            Reachable::Radius { center, radius_m } => SearchArea::Radius {
                center: center.clone(),
                radius_m: *radius_m,
            },
        }
    }

    fn strategy(&self) -> Containment {
        match self {
            Reachable::Isochrone { max_seconds, .. } => Containment::Isochrone {
                time_seconds: *max_seconds,
            },
            Reachable::Radius { radius_m, .. } => Containment::Radius {
                radius_m: *radius_m,
            },
        }
    }
}

/// Finds POIs of a type reachable within `time_minutes` by `transport`.
///
/// Uses the isochrone service when it answers; otherwise falls back to a
/// circle of `reference speed × time` and records a warning. Results are
/// sorted by straight-line distance (ties by source rank) and capped.
///
/// # Errors
///
/// `VALIDATION_ERROR` for out-of-range params; `UPSTREAM_SERVICE_ERROR` or
/// `TIMEOUT_ERROR` when the POI source fails.
pub async fn within_time(
    services: &Services,
    params: WithinTimeParams,
) -> UseCaseResult<WithinTimeResult> {
    check_range("time_minutes", params.time_minutes, &TIME_LIMIT_MINUTES)?;
    check_range("max_results", params.max_results, &MAX_RESULTS_RANGE)?;

    let mut tracker = ExecutionTracker::start();
    let origin = params.location;
    let max_seconds = params.time_minutes * 60;

    tracker.record_call();
    let reachable = match services
        .isochrones
        .isochrones(&origin, &[max_seconds], params.transport)
        .await
    {
        Ok(isochrone) if !isochrone.is_empty() => Reachable::Isochrone {
            isochrone,
            max_seconds,
        },
        outcome => {
            if let Err(err) = outcome {
                tracing::debug!(error = %err, "isochrone lookup failed");
            }
            tracker.warn(FALLBACK_RADIUS_WARNING);
            Reachable::Radius {
                center: origin.clone(),
                radius_m: params
                    .transport
                    .reachable_radius_m(f64::from(params.time_minutes)),
            }
        }
    };

    let filters = PoiFilters {
        cuisine: match params.cuisine {
            Some(cuisine) if params.poi_type.is_restaurant_like() => Some(cuisine),
            Some(cuisine) => {
                tracker.warn(format!(
                    "cuisine filter \"{cuisine}\" ignored for {}",
                    params.poi_type
                ));
                None
            }
            None => None,
        },
        limit: None,
    };

    tracker.record_call();
    let candidates = services
        .pois
        .find_pois(&reachable.search_area(), params.poi_type, &filters)
        .await
        .map_err(|err| upstream_error("POI search", &err))?;

    let mut pois: Vec<Poi> = candidates
        .into_iter()
        .filter(|poi| reachable.contains(&poi.location))
        .map(|mut poi| {
            poi.distance_m = Some(origin.distance_to(&poi.location));
            poi
        })
        .collect();
    sort_by_distance(&mut pois);
    pois.truncate(params.max_results);

    let mut modes = params.duration_modes;
    modes.sort();
    modes.dedup();
    attach_durations(services, &mut tracker, &origin, &mut pois, &modes).await;

    tracing::debug!(
        poi_type = %params.poi_type,
        found = pois.len(),
        "within-time search complete"
    );

    let result = WithinTimeResult {
        containment: reachable.strategy(),
        origin,
        pois,
    };
    if result.pois.is_empty() {
        let message = format!(
            "no {} reachable within {} minutes by {}",
            params.poi_type, params.time_minutes, params.transport
        );
        return tracker.succeed_empty(result, message);
    }
    tracker.succeed(result)
}

#[cfg(test)]
#[path = "within_time_test.rs"]
mod tests;
