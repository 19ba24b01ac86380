//! Integration tests for `OsrmRouter` using wiremock HTTP mocks.

use geoscout_core::{Location, TransportMode};
use geoscout_services::{
    HttpSettings, OsrmRouter, ResilientCaller, RetryPolicy, Router, ServiceError,
};
use wiremock::matchers::{method, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_router(base_url: &str) -> OsrmRouter {
    OsrmRouter::new(
        HttpSettings::new(base_url),
        ResilientCaller::unthrottled("osrm", RetryPolicy::no_retries()),
    )
    .expect("router construction should not fail")
}

fn start() -> Location {
    Location::new(52.5200, 13.4050).unwrap()
}

fn end() -> Location {
    Location::new(52.5163, 13.3777).unwrap()
}

#[tokio::test]
async fn route_parses_geometry_and_steps() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "code": "Ok",
        "routes": [{
            "distance": 2100.0,
            "duration": 1500.0,
            "geometry": {
                "type": "LineString",
                "coordinates": [[13.4050, 52.5200], [13.3900, 52.5180], [13.3777, 52.5163]]
            },
            "legs": [{
                "steps": [
                    {
                        "distance": 2000.0,
                        "duration": 1450.0,
                        "name": "Unter den Linden",
                        "maneuver": { "type": "depart" }
                    },
                    {
                        "distance": 100.0,
                        "duration": 50.0,
                        "name": "",
                        "maneuver": { "type": "arrive" }
                    }
                ]
            }]
        }]
    });

    Mock::given(method("GET"))
        .and(path_regex(r"^/route/v1/foot/13\.405000,52\.520000;13\.377700,52\.516300$"))
        .and(query_param("overview", "full"))
        .and(query_param("geometries", "geojson"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let route = test_router(&server.uri())
        .route(&[start(), end()], TransportMode::Walking)
        .await
        .expect("should parse route");

    assert!((route.duration_minutes() - 25.0).abs() < 1e-9);
    assert_eq!(route.geometry.as_ref().map(Vec::len), Some(3));
    assert_eq!(route.steps[0].instruction, "depart onto Unter den Linden");
    assert_eq!(route.steps[1].instruction, "arrive");
}

#[tokio::test]
async fn table_uses_index_lists() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/table/v1/bike/"))
        .and(query_param("sources", "0"))
        .and(query_param("destinations", "1;2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "Ok",
            "durations": [[300.0, 420.0]],
            "distances": [[1200.0, 1700.0]]
        })))
        .mount(&server)
        .await;

    let matrix = test_router(&server.uri())
        .matrix(&[start()], &[end(), end().offset(100.0, 0.0)], TransportMode::Cycling)
        .await
        .expect("should parse table");

    assert_eq!(matrix.duration_s(0, 1), Some(420.0));
    assert_eq!(matrix.distance_m(0, 0), Some(1200.0));
}

#[tokio::test]
async fn no_route_code_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "NoRoute",
            "message": "Impossible route between points",
            "routes": []
        })))
        .mount(&server)
        .await;

    let err = test_router(&server.uri())
        .route(&[start(), end()], TransportMode::Driving)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Rejected { .. }));
    assert!(!err.is_retriable());
}

#[tokio::test]
async fn empty_matrix_needs_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let matrix = test_router(&server.uri())
        .matrix(&[start()], &[], TransportMode::Walking)
        .await
        .unwrap();
    assert!(matrix.durations_s.is_empty());
}
