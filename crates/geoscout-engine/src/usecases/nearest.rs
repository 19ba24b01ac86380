use geoscout_core::{
    Location, Poi, PoiFilters, PoiType, TransportMode, UseCaseError, UseCaseResult,
};
use serde::{Deserialize, Serialize};

use super::check_range;
use super::search::{attach_durations, expanding_search};
use crate::services::Services;
use crate::tracker::ExecutionTracker;

pub const DEFAULT_MAX_ALTERNATIVES: usize = 4;
pub const DEFAULT_INITIAL_RADIUS_M: f64 = 1_000.0;
pub const DEFAULT_MAX_EXPANSIONS: u32 = 3;
pub const MAX_EXPANSIONS: u32 = 6;
pub const MAX_INITIAL_RADIUS_M: f64 = 50_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestParams {
    pub location: Location,
    pub poi_type: PoiType,
    pub transport: TransportMode,
    pub max_alternatives: usize,
    /// Fetch travel times for the winner and alternatives (one matrix call).
    pub include_duration: bool,
    pub initial_radius_m: f64,
    pub max_expansions: u32,
}

impl NearestParams {
    #[must_use]
    pub fn new(location: Location, poi_type: PoiType, transport: TransportMode) -> Self {
        Self {
            location,
            poi_type,
            transport,
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
            include_duration: true,
            initial_radius_m: DEFAULT_INITIAL_RADIUS_M,
            max_expansions: DEFAULT_MAX_EXPANSIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestResult {
    pub nearest: Option<Poi>,
    pub alternatives: Vec<Poi>,
    /// Radius of the search that produced the answer.
    pub search_radius_m: f64,
}

/// Finds the closest POI of a type by straight-line distance, widening the
/// search circle while nothing is found.
///
/// # Errors
///
/// `VALIDATION_ERROR` for a radius outside `(0, MAX_INITIAL_RADIUS_M]` or more
/// than [`MAX_EXPANSIONS`] expansions; `UPSTREAM_SERVICE_ERROR` or
/// `TIMEOUT_ERROR` when the POI source fails.
pub async fn nearest(services: &Services, params: NearestParams) -> UseCaseResult<NearestResult> {
    if !params.initial_radius_m.is_finite() || params.initial_radius_m <= 0.0 {
        return Err(UseCaseError::validation(format!(
            "initial_radius_m must be positive, got {}",
            params.initial_radius_m
        )));
    }
    check_range(
        "initial_radius_m",
        params.initial_radius_m,
        &(0.0..=MAX_INITIAL_RADIUS_M),
    )?;
    check_range("max_expansions", params.max_expansions, &(0..=MAX_EXPANSIONS))?;

    let mut tracker = ExecutionTracker::start();
    let search = expanding_search(
        services,
        &mut tracker,
        &params.location,
        params.poi_type,
        &PoiFilters::default(),
        params.initial_radius_m,
        params.max_expansions,
    )
    .await?;

    let mut ranked = search.pois;
    ranked.truncate(params.max_alternatives.saturating_add(1));
    if params.include_duration {
        attach_durations(
            services,
            &mut tracker,
            &params.location,
            &mut ranked,
            &[params.transport],
        )
        .await;
    }

    let mut ranked = ranked.into_iter();
    let result = NearestResult {
        nearest: ranked.next(),
        alternatives: ranked.collect(),
        search_radius_m: search.radius_m,
    };

    match &result.nearest {
        Some(poi) => {
            tracing::debug!(poi = %poi.id, radius_m = search.radius_m, "nearest match found");
            tracker.succeed(result)
        }
        None => {
            let message = format!(
                "no {} found within {:.0} m",
                params.poi_type, search.radius_m
            );
            tracker.succeed_empty(result, message)
        }
    }
}

#[cfg(test)]
#[path = "nearest_test.rs"]
mod tests;
