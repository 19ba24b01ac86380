//! POIs of one type close to the nearest POI of another type, e.g. "cafes
//! within 5 minutes of the nearest park".

use std::cmp::Ordering;

use geoscout_core::{
    Location, Poi, PoiFilters, PoiType, SearchArea, TransportMode, UseCaseError, UseCaseResult,
};
use serde::{Deserialize, Serialize};

use super::nearest::{DEFAULT_INITIAL_RADIUS_M, DEFAULT_MAX_EXPANSIONS};
use super::search::expanding_search;
use super::{check_range, cmp_f64, DEFAULT_MAX_RESULTS, MAX_RESULTS_RANGE, TIME_LIMIT_MINUTES};
use crate::services::Services;
use crate::tracker::{upstream_error, ExecutionTracker};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearPoiParams {
    pub location: Location,
    /// What the user wants to find.
    pub primary_type: PoiType,
    /// Type of the anchor the results must be close to.
    pub secondary_type: PoiType,
    pub transport: TransportMode,
    pub max_time_from_secondary_minutes: u32,
    #[serde(default)]
    pub cuisine: Option<String>,
    pub max_results: usize,
}

impl NearPoiParams {
    #[must_use]
    pub fn new(
        location: Location,
        primary_type: PoiType,
        secondary_type: PoiType,
        transport: TransportMode,
        max_time_from_secondary_minutes: u32,
    ) -> Self {
        Self {
            location,
            primary_type,
            secondary_type,
            transport,
            max_time_from_secondary_minutes,
            cuisine: None,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Where the anchor-to-candidate durations came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationSource {
    Matrix,
    /// Straight-line distance at the mode's reference speed.
    Estimated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearPoiResult {
    pub anchor: Option<Poi>,
    pub pois: Vec<Poi>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_source: Option<DurationSource>,
}

/// Finds the nearest `secondary_type` POI to the user, then the
/// `primary_type` POIs reachable from it within the time limit.
///
/// # Errors
///
/// `VALIDATION_ERROR` for out-of-range params; `UPSTREAM_SERVICE_ERROR` or
/// `TIMEOUT_ERROR` when a POI search fails. A failed duration matrix is
/// not an error: straight-line estimates are used instead.
pub async fn near_poi(services: &Services, params: NearPoiParams) -> UseCaseResult<NearPoiResult> {
    validate(&params)?;
    let mut tracker = ExecutionTracker::start();

    let anchors = expanding_search(
        services,
        &mut tracker,
        &params.location,
        params.secondary_type,
        &PoiFilters::default(),
        DEFAULT_INITIAL_RADIUS_M,
        DEFAULT_MAX_EXPANSIONS,
    )
    .await?;
    let Some(anchor) = anchors.pois.into_iter().next() else {
        let message = format!(
            "no {} found within {:.0} m to search around",
            params.secondary_type, anchors.radius_m
        );
        let empty = NearPoiResult {
            anchor: None,
            pois: Vec::new(),
            duration_source: None,
        };
        return tracker.succeed_empty(empty, message);
    };
    tracing::debug!(anchor = %anchor.id, "near-poi anchor selected");
    search_around(services, tracker, params, anchor).await
}

/// Like [`near_poi`], but around an anchor found by an earlier step.
/// `distance_m` is still measured from `params.location`.
///
/// # Errors
///
/// As for [`near_poi`].
pub async fn near_poi_around(
    services: &Services,
    params: NearPoiParams,
    anchor: Poi,
) -> UseCaseResult<NearPoiResult> {
    validate(&params)?;
    search_around(services, ExecutionTracker::start(), params, anchor).await
}

fn validate(params: &NearPoiParams) -> Result<(), UseCaseError> {
    check_range(
        "max_time_from_secondary_minutes",
        params.max_time_from_secondary_minutes,
        &TIME_LIMIT_MINUTES,
    )?;
    check_range("max_results", params.max_results, &MAX_RESULTS_RANGE)
}

async fn search_around(
    services: &Services,
    mut tracker: ExecutionTracker,
    params: NearPoiParams,
    anchor: Poi,
) -> UseCaseResult<NearPoiResult> {
    let limit_minutes = f64::from(params.max_time_from_secondary_minutes);
    let radius_m = params.transport.reachable_radius_m(limit_minutes);
    let filters = PoiFilters {
        cuisine: params
            .cuisine
            .filter(|_| params.primary_type.is_restaurant_like()),
        limit: None,
    };
    tracker.record_call();
    let area = SearchArea::Radius {
        center: anchor.location.clone(),
        radius_m,
    };
    let candidates: Vec<Poi> = services
        .pois
        .find_pois(&area, params.primary_type, &filters)
        .await
        .map_err(|err| upstream_error("POI search", &err))?
        .into_iter()
        .filter(|poi| poi.id != anchor.id)
        .filter(|poi| anchor.location.distance_to(&poi.location) <= radius_m)
        .collect();

    let mut duration_source = None;
    let mut pois = Vec::new();
    if !candidates.is_empty() {
        let destinations: Vec<Location> = candidates.iter().map(|p| p.location.clone()).collect();
        tracker.record_call();
        let minutes: Vec<Option<f64>> = match services
            .router
            .matrix(
                std::slice::from_ref(&anchor.location),
                &destinations,
                params.transport,
            )
            .await
        {
            Ok(matrix) => {
                duration_source = Some(DurationSource::Matrix);
                (0..candidates.len())
                    .map(|idx| matrix.duration_s(0, idx).map(|s| s / 60.0))
                    .collect()
            }
            Err(err) => {
                tracker.warn(format!(
                    "travel times from anchor unavailable, using straight-line estimates: {err}"
                ));
                duration_source = Some(DurationSource::Estimated);
                candidates
                    .iter()
                    .map(|p| {
                        let distance = anchor.location.distance_to(&p.location);
                        Some(params.transport.estimate_minutes(distance))
                    })
                    .collect()
            }
        };

        pois = candidates
            .into_iter()
            .zip(minutes)
            .filter_map(|(mut poi, duration)| {
                let duration = duration.filter(|d| *d <= limit_minutes)?;
                poi.distance_from_anchor_m = Some(anchor.location.distance_to(&poi.location));
                poi.distance_m = Some(params.location.distance_to(&poi.location));
                poi.durations_minutes.insert(params.transport, duration);
                Some(poi)
            })
            .collect();
        let transport = params.transport;
        pois.sort_by(|a, b| by_duration_from_anchor(a, b, transport));
        pois.truncate(params.max_results);
    }

    let result = NearPoiResult {
        anchor: Some(anchor),
        pois,
        duration_source,
    };
    if result.pois.is_empty() {
        let message = format!(
            "no {} within {} minutes of the nearest {}",
            params.primary_type, params.max_time_from_secondary_minutes, params.secondary_type
        );
        return tracker.succeed_empty(result, message);
    }
    tracker.succeed(result)
}

fn by_duration_from_anchor(a: &Poi, b: &Poi, transport: TransportMode) -> Ordering {
    cmp_f64(
        a.durations_minutes.get(&transport).copied(),
        b.durations_minutes.get(&transport).copied(),
    )
    .then(cmp_f64(a.distance_from_anchor_m, b.distance_from_anchor_m))
    .then(a.source_rank.cmp(&b.source_rank))
}

#[cfg(test)]
#[path = "near_poi_test.rs"]
mod tests;
