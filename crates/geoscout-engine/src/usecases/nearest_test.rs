use std::sync::atomic::Ordering;

use geoscout_core::ErrorCode;

use super::*;
use crate::testing::{origin, poi_at, FakePois, Fakes};

fn params() -> NearestParams {
    NearestParams::new(origin(), PoiType::Cafe, TransportMode::Walking)
}

#[tokio::test]
async fn expands_the_radius_until_something_is_found() {
    let here = origin();
    let fakes = Fakes::new(vec![
        poi_at("far", PoiType::Cafe, &here, 0.0, 2_500.0),
        poi_at("mid", PoiType::Cafe, &here, 1_500.0, 0.0),
    ]);

    let output = nearest(&fakes.services(), params()).await.unwrap();

    let found = output.data.nearest.expect("a cafe within 2 km");
    assert_eq!(found.id, "mid");
    assert!(output.data.alternatives.is_empty());
    assert!((output.data.search_radius_m - 2_000.0).abs() < f64::EPSILON);
    assert_eq!(
        output.metadata.warnings,
        vec!["no cafe within 1000 m, expanding search radius to 2000 m"]
    );
    // two searches and one matrix
    assert_eq!(output.metadata.api_calls_count, 3);
    assert!(found.durations_minutes.contains_key(&TransportMode::Walking));
}

#[tokio::test]
async fn alternatives_are_ranked_and_capped() {
    let here = origin();
    let pois = (1..=6)
        .map(|i| {
            let metres = f64::from(i) * 100.0;
            poi_at(&format!("cafe-{i}"), PoiType::Cafe, &here, metres, 0.0)
        })
        .rev()
        .collect();
    let fakes = Fakes::new(pois);

    let output = nearest(&fakes.services(), params()).await.unwrap();

    assert_eq!(output.data.nearest.unwrap().id, "cafe-1");
    let alternatives: Vec<_> = output.data.alternatives.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(alternatives, vec!["cafe-2", "cafe-3", "cafe-4", "cafe-5"]);
}

#[tokio::test]
async fn equal_distances_prefer_the_source_order() {
    let here = origin();
    let fakes = Fakes::new(vec![
        poi_at("listed-first", PoiType::Cafe, &here, 300.0, 0.0),
        poi_at("listed-second", PoiType::Cafe, &here, 300.0, 0.0),
    ]);

    let output = nearest(&fakes.services(), params()).await.unwrap();

    assert_eq!(output.data.nearest.unwrap().id, "listed-first");
}

#[tokio::test]
async fn gives_up_after_the_last_expansion() {
    let fakes = Fakes::new(Vec::new());

    let output = nearest(&fakes.services(), params()).await.unwrap();

    assert!(output.data.nearest.is_none());
    assert!(output.is_empty_result());
    assert!((output.data.search_radius_m - 8_000.0).abs() < f64::EPSILON);
    assert_eq!(fakes.pois.call_count(), 4);
    assert_eq!(output.metadata.warnings.len(), 3);
    assert_eq!(output.metadata.api_calls_count, 4);
}

#[tokio::test]
async fn durations_are_optional() {
    let here = origin();
    let fakes = Fakes::new(vec![poi_at("cafe", PoiType::Cafe, &here, 200.0, 0.0)]);
    let mut params = params();
    params.include_duration = false;

    let output = nearest(&fakes.services(), params).await.unwrap();

    assert!(output.data.nearest.unwrap().durations_minutes.is_empty());
    assert_eq!(fakes.router.matrix_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn source_failure_is_reported() {
    let fakes = Fakes::new(Vec::new()).with_poi_source(FakePois::failing());

    let err = nearest(&fakes.services(), params()).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::UpstreamServiceError);
}

#[tokio::test]
async fn non_positive_radius_is_rejected() {
    let fakes = Fakes::new(Vec::new());
    let mut params = params();
    params.initial_radius_m = 0.0;

    let err = nearest(&fakes.services(), params).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(fakes.pois.call_count(), 0);
}

#[tokio::test]
async fn expansion_and_radius_limits_are_checked_before_searching() {
    let fakes = Fakes::new(Vec::new());

    let mut too_many = params();
    too_many.max_expansions = 1_100;
    let err = nearest(&fakes.services(), too_many).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);
    assert!(err.message.contains("max_expansions"));

    let mut too_wide = params();
    too_wide.initial_radius_m = MAX_INITIAL_RADIUS_M * 2.0;
    let err = nearest(&fakes.services(), too_wide).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);

    let mut infinite = params();
    infinite.initial_radius_m = f64::INFINITY;
    let err = nearest(&fakes.services(), infinite).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);

    assert_eq!(fakes.pois.call_count(), 0);
}

#[tokio::test]
async fn widest_allowed_search_stays_finite() {
    let fakes = Fakes::new(Vec::new());
    let mut params = params();
    params.initial_radius_m = MAX_INITIAL_RADIUS_M;
    params.max_expansions = MAX_EXPANSIONS;

    let output = nearest(&fakes.services(), params).await.unwrap();

    assert!(output.data.nearest.is_none());
    assert!(output.data.search_radius_m.is_finite());
    assert_eq!(fakes.pois.call_count(), MAX_EXPANSIONS as usize + 1);
}
