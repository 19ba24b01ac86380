//! Integration tests for `OverpassPoiSource` using wiremock HTTP mocks.

use geoscout_core::{Location, PoiFilters, PoiType, SearchArea};
use geoscout_services::{
    HttpSettings, OverpassPoiSource, PoiSource, ResilientCaller, RetryPolicy, ServiceError,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_source(base_url: &str) -> OverpassPoiSource {
    OverpassPoiSource::new(
        HttpSettings::new(base_url),
        ResilientCaller::unthrottled("overpass", RetryPolicy::no_retries()),
    )
    .expect("source construction should not fail")
}

fn around_london() -> SearchArea {
    SearchArea::Radius {
        center: Location::new(51.5074, -0.1278).unwrap(),
        radius_m: 1_000.0,
    }
}

#[tokio::test]
async fn find_pois_maps_nodes_and_ways() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "version": 0.6,
        "elements": [
            {
                "type": "node",
                "id": 101,
                "lat": 51.5080,
                "lon": -0.1281,
                "tags": { "amenity": "cafe", "name": "Flat White" }
            },
            {
                "type": "way",
                "id": 202,
                "center": { "lat": 51.5090, "lon": -0.1300 },
                "tags": { "amenity": "cafe" }
            },
            {
                "type": "node",
                "id": 303,
                "tags": { "amenity": "cafe", "name": "No Coordinates" }
            }
        ]
    });

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .and(body_string_contains("amenity"))
        .and(body_string_contains("cafe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let source = test_source(&server.uri());
    let pois = source
        .find_pois(&around_london(), PoiType::Cafe, &PoiFilters::default())
        .await
        .expect("should parse overpass response");

    assert_eq!(pois.len(), 2);
    assert_eq!(pois[0].id, "node/101");
    assert_eq!(pois[0].name, "Flat White");
    assert_eq!(pois[0].source_rank, 0);
    assert_eq!(pois[1].id, "way/202");
    assert_eq!(pois[1].name, "Unnamed cafe");
    assert_eq!(pois[1].source_rank, 1);
    assert_eq!(pois[1].tags.get("amenity").map(String::as_str), Some("cafe"));
}

#[tokio::test]
async fn limit_caps_returned_pois() {
    let server = MockServer::start().await;

    let elements: Vec<_> = (0..5)
        .map(|i| {
            serde_json::json!({
                "type": "node",
                "id": i,
                "lat": 51.5 + f64::from(i) * 0.001,
                "lon": -0.12,
                "tags": { "amenity": "pharmacy" }
            })
        })
        .collect();

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "elements": elements })),
        )
        .mount(&server)
        .await;

    let filters = PoiFilters {
        cuisine: None,
        limit: Some(3),
    };
    let pois = test_source(&server.uri())
        .find_pois(&around_london(), PoiType::Pharmacy, &filters)
        .await
        .unwrap();
    assert_eq!(pois.len(), 3);
}

#[tokio::test]
async fn gateway_timeout_is_a_retriable_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(504).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = test_source(&server.uri())
        .find_pois(&around_london(), PoiType::Park, &PoiFilters::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Status { status: 504, .. }));
    assert!(err.is_retriable());
}

#[tokio::test]
async fn malformed_body_is_a_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = test_source(&server.uri())
        .find_pois(&around_london(), PoiType::Park, &PoiFilters::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Deserialize { .. }));
    assert!(!err.is_retriable());
}
