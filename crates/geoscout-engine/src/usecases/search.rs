use futures::future::join_all;
use geoscout_core::{Location, Poi, PoiFilters, PoiType, SearchArea, TransportMode, UseCaseError};

use super::sort_by_distance;
use crate::services::Services;
use crate::tracker::{upstream_error, ExecutionTracker};

/// Outcome of a radius search: matches sorted by distance, and the radius
/// that produced them.
#[derive(Debug)]
pub(crate) struct RadiusSearch {
    pub(crate) pois: Vec<Poi>,
    pub(crate) radius_m: f64,
}

/// Searches a circle around `center`, doubling the radius up to
/// `max_expansions` times while nothing is found.
///
/// Returned POIs carry `distance_m` from `center` and lie inside the final
/// radius.
pub(crate) async fn expanding_search(
    services: &Services,
    tracker: &mut ExecutionTracker,
    center: &Location,
    poi_type: PoiType,
    filters: &PoiFilters,
    initial_radius_m: f64,
    max_expansions: u32,
) -> Result<RadiusSearch, UseCaseError> {
    let mut radius_m = initial_radius_m;
    let mut expansions = 0u32;
    loop {
        let area = SearchArea::Radius {
            center: center.clone(),
            radius_m,
        };
        tracker.record_call();
        let found = services
            .pois
            .find_pois(&area, poi_type, filters)
            .await
            .map_err(|err| upstream_error("POI search", &err))?;

        let mut pois: Vec<Poi> = found
            .into_iter()
            .filter_map(|mut poi| {
                let distance = center.distance_to(&poi.location);
                (distance <= radius_m).then(|| {
                    poi.distance_m = Some(distance);
                    poi
                })
            })
            .collect();

        if !pois.is_empty() || expansions >= max_expansions {
            sort_by_distance(&mut pois);
            return Ok(RadiusSearch { pois, radius_m });
        }

        let next = radius_m * 2.0;
        tracker.warn(format!(
            "no {poi_type} within {radius_m:.0} m, expanding search radius to {next:.0} m"
        ));
        radius_m = next;
        expansions += 1;
    }
}

/// Fills `durations_minutes` from `origin` for every requested mode. One
/// matrix call per mode, issued concurrently; a failed mode becomes a
/// warning and leaves the other modes intact.
pub(crate) async fn attach_durations(
    services: &Services,
    tracker: &mut ExecutionTracker,
    origin: &Location,
    pois: &mut [Poi],
    modes: &[TransportMode],
) {
    if pois.is_empty() || modes.is_empty() {
        return;
    }
    let destinations: Vec<Location> = pois.iter().map(|p| p.location.clone()).collect();
    let sources = std::slice::from_ref(origin);

    tracker.record_calls(modes.len());
    let lookups = modes
        .iter()
        .map(|mode| services.router.matrix(sources, &destinations, *mode));
    let results = join_all(lookups).await;

    for (mode, result) in modes.iter().zip(results) {
        match result {
            Ok(matrix) => {
                for (idx, poi) in pois.iter_mut().enumerate() {
                    if let Some(seconds) = matrix.duration_s(0, idx) {
                        poi.durations_minutes.insert(*mode, seconds / 60.0);
                    }
                }
            }
            Err(err) => tracker.warn(format!("{mode} travel times unavailable: {err}")),
        }
    }
}
