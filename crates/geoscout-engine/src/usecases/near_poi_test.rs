use geoscout_core::ErrorCode;

use super::*;
use crate::testing::{origin, poi_at, FakeRouter, Fakes};

fn world() -> Vec<Poi> {
    let here = origin();
    let park = here.offset(300.0, 0.0);
    vec![
        poi_at("park-far", PoiType::Park, &here, 800.0, 0.0),
        poi_at("park-near", PoiType::Park, &here, 300.0, 0.0),
        poi_at("cafe-300", PoiType::Cafe, &park, 0.0, 300.0),
        poi_at("cafe-100", PoiType::Cafe, &park, 0.0, 100.0),
        poi_at("cafe-2000", PoiType::Cafe, &park, 0.0, 2_000.0),
    ]
}

fn params() -> NearPoiParams {
    NearPoiParams::new(
        origin(),
        PoiType::Cafe,
        PoiType::Park,
        TransportMode::Walking,
        5,
    )
}

fn ids(pois: &[Poi]) -> Vec<&str> {
    pois.iter().map(|p| p.id.as_str()).collect()
}

#[tokio::test]
async fn finds_primary_pois_around_the_nearest_anchor() {
    let fakes = Fakes::new(world());

    let output = near_poi(&fakes.services(), params()).await.unwrap();
    let result = output.data;

    assert_eq!(result.anchor.as_ref().unwrap().id, "park-near");
    assert_eq!(ids(&result.pois), vec!["cafe-100", "cafe-300"]);
    assert_eq!(result.duration_source, Some(DurationSource::Matrix));

    let closest = &result.pois[0];
    let from_anchor = closest.distance_from_anchor_m.unwrap();
    assert!((from_anchor - 100.0).abs() < 1.0, "anchor distance {from_anchor}");
    assert!(closest.distance_m.unwrap() > 300.0);
    assert!(closest.durations_minutes[&TransportMode::Walking] <= 5.0);
    // anchor search, candidate search, matrix
    assert_eq!(output.metadata.api_calls_count, 3);
}

#[tokio::test]
async fn results_are_ordered_by_duration_from_the_anchor() {
    let fakes = Fakes::new(world()).with_router(FakeRouter::scripted(|from, to, _| {
        Some(if from.distance_to(to) < 200.0 { 240.0 } else { 60.0 })
    }));

    let output = near_poi(&fakes.services(), params()).await.unwrap();

    assert_eq!(ids(&output.data.pois), vec!["cafe-300", "cafe-100"]);
}

#[tokio::test]
async fn candidates_over_the_time_limit_are_dropped() {
    let fakes = Fakes::new(world()).with_router(FakeRouter::scripted(|_, _, _| Some(600.0)));

    let output = near_poi(&fakes.services(), params()).await.unwrap();

    assert!(output.data.anchor.is_some());
    assert!(output.data.pois.is_empty());
    assert!(output.is_empty_result());
}

#[tokio::test]
async fn unroutable_candidates_are_dropped() {
    let fakes = Fakes::new(world()).with_router(FakeRouter::scripted(|from, to, _| {
        (from.distance_to(to) < 200.0).then_some(90.0)
    }));

    let output = near_poi(&fakes.services(), params()).await.unwrap();

    assert_eq!(ids(&output.data.pois), vec!["cafe-100"]);
}

#[tokio::test]
async fn matrix_failure_uses_straight_line_estimates() {
    let fakes = Fakes::new(world()).with_router(FakeRouter::default().without_matrix());

    let output = near_poi(&fakes.services(), params()).await.unwrap();

    assert_eq!(output.data.duration_source, Some(DurationSource::Estimated));
    assert_eq!(ids(&output.data.pois), vec!["cafe-100", "cafe-300"]);
    assert_eq!(output.metadata.warnings.len(), 1);
    assert!(output.metadata.warnings[0].contains("straight-line"));
}

#[tokio::test]
async fn anchor_is_never_its_own_neighbour() {
    let fakes = Fakes::new(world());
    let mut params = params();
    params.primary_type = PoiType::Park;
    params.max_time_from_secondary_minutes = 10;

    let output = near_poi(&fakes.services(), params).await.unwrap();

    assert_eq!(output.data.anchor.unwrap().id, "park-near");
    assert_eq!(ids(&output.data.pois), vec!["park-far"]);
}

#[tokio::test]
async fn missing_anchor_expands_then_reports_no_results() {
    let here = origin();
    let fakes = Fakes::new(vec![poi_at("cafe", PoiType::Cafe, &here, 100.0, 0.0)]);

    let output = near_poi(&fakes.services(), params()).await.unwrap();

    assert!(output.data.anchor.is_none());
    assert!(output.data.pois.is_empty());
    assert!(output.is_empty_result());
    assert_eq!(output.metadata.warnings.len(), 3);
    assert_eq!(output.metadata.api_calls_count, 4);
    let advisory = output.metadata.advisory.unwrap();
    assert_eq!(advisory.code, ErrorCode::NoResultsFound);
    assert!(advisory.message.contains("park"));
}

#[tokio::test]
async fn time_limit_is_validated() {
    let fakes = Fakes::new(world());
    let mut params = params();
    params.max_time_from_secondary_minutes = 121;

    let err = near_poi(&fakes.services(), params).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(fakes.pois.call_count(), 0);
}

#[tokio::test]
async fn a_given_anchor_skips_the_anchor_search() {
    let fakes = Fakes::new(world());
    let anchor = world().remove(1);

    let output = near_poi_around(&fakes.services(), params(), anchor)
        .await
        .unwrap();
    let result = output.data;

    assert_eq!(result.anchor.as_ref().unwrap().id, "park-near");
    assert_eq!(ids(&result.pois), vec!["cafe-100", "cafe-300"]);
    assert_eq!(fakes.pois.call_count(), 1);
    assert_eq!(output.metadata.api_calls_count, 2);

    let closest = &result.pois[0];
    assert!((closest.distance_from_anchor_m.unwrap() - 100.0).abs() < 1.0);
    assert!(closest.distance_m.unwrap() > 300.0);
}

#[tokio::test]
async fn a_given_anchor_still_validates_params() {
    let fakes = Fakes::new(world());
    let mut params = params();
    params.max_time_from_secondary_minutes = 0;

    let err = near_poi_around(&fakes.services(), params, world().remove(1))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(fakes.pois.call_count(), 0);
}
