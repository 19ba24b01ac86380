//! OpenRouteService adapter: isochrones, directions and matrices.
//!
//! All three endpoints take `[lng, lat]` coordinate pairs and authenticate
//! with the API key in the `Authorization` header. Public transport has no
//! ORS profile and is reported as [`ServiceError::Unsupported`].

use async_trait::async_trait;
use geoscout_core::{
    Isochrone, IsochronePolygon, Location, RouteStep, RouteSummary, TransportMode, TravelMatrix,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ServiceError;
use crate::geojson::{self, Geometry};
use crate::http::{check_status, read_json, transport_error, HttpSettings};
use crate::ports::{IsochroneProvider, Router};
use crate::resilient::ResilientCaller;

const SERVICE: &str = "openrouteservice";

/// ORS routing profile for a transport mode.
///
/// # Errors
///
/// Returns [`ServiceError::Unsupported`] for public transport.
pub fn profile(transport: TransportMode) -> Result<&'static str, ServiceError> {
    match transport {
        TransportMode::Walking => Ok("foot-walking"),
        TransportMode::Cycling => Ok("cycling-regular"),
        TransportMode::Driving => Ok("driving-car"),
        TransportMode::PublicTransport => Err(ServiceError::Unsupported {
            service: SERVICE,
            what: "public transport routing".to_owned(),
        }),
    }
}

fn pair(location: &Location) -> [f64; 2] {
    [location.lng(), location.lat()]
}

#[derive(Debug, Deserialize)]
struct FeatureCollection<P> {
    #[serde(default = "Vec::new")]
    features: Vec<Feature<P>>,
}

#[derive(Debug, Deserialize)]
struct Feature<P> {
    properties: P,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct IsochroneProperties {
    value: f64,
}

#[derive(Debug, Default, Deserialize)]
struct DirectionsProperties {
    #[serde(default)]
    summary: DirectionsSummary,
    #[serde(default)]
    segments: Vec<DirectionsSegment>,
}

// ORS omits zero-valued summary fields.
#[derive(Debug, Default, Deserialize)]
struct DirectionsSummary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct DirectionsSegment {
    #[serde(default)]
    steps: Vec<DirectionsStep>,
}

#[derive(Debug, Deserialize)]
struct DirectionsStep {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    instruction: String,
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    #[serde(default)]
    durations: Vec<Vec<Option<f64>>>,
    #[serde(default)]
    distances: Vec<Vec<Option<f64>>>,
}

/// OpenRouteService client implementing both [`IsochroneProvider`] and [`Router`].
#[derive(Debug, Clone)]
pub struct OpenRouteServiceClient {
    client: Client,
    settings: HttpSettings,
    api_key: String,
    caller: ResilientCaller,
}

impl OpenRouteServiceClient {
    /// # Errors
    ///
    /// Returns [`ServiceError::NotConfigured`] for a blank API key, or
    /// [`ServiceError::Http`] if the HTTP client cannot be built.
    pub fn new(
        settings: HttpSettings,
        api_key: impl Into<String>,
        caller: ResilientCaller,
    ) -> Result<Self, ServiceError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ServiceError::NotConfigured {
                service: SERVICE,
                reason: "API key is empty".to_owned(),
            });
        }
        let client = settings.build_client(SERVICE)?;
        Ok(Self {
            client,
            settings,
            api_key,
            caller,
        })
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        context: &str,
        body: &Value,
    ) -> Result<T, ServiceError> {
        let url = self.settings.endpoint(path);
        self.caller
            .call(|| {
                let request = self
                    .client
                    .post(&url)
                    .header(reqwest::header::AUTHORIZATION, &self.api_key)
                    .json(body);
                async move {
                    let response = request.send().await.map_err(transport_error(SERVICE))?;
                    let response = check_status(SERVICE, response).await?;
                    read_json(SERVICE, context, response).await
                }
            })
            .await
    }
}

#[async_trait]
impl IsochroneProvider for OpenRouteServiceClient {
    async fn isochrones(
        &self,
        origin: &Location,
        ranges_seconds: &[u32],
        transport: TransportMode,
    ) -> Result<Isochrone, ServiceError> {
        let profile = profile(transport)?;
        if ranges_seconds.is_empty() {
            return Err(ServiceError::Rejected {
                service: SERVICE,
                message: "at least one isochrone range is required".to_owned(),
            });
        }
        let body = json!({
            "locations": [pair(origin)],
            "range": ranges_seconds,
            "range_type": "time",
        });
        let collection: FeatureCollection<IsochroneProperties> = self
            .post_json(
                &format!("v2/isochrones/{profile}"),
                "ors isochrones",
                &body,
            )
            .await?;

        let mut polygons = Vec::new();
        for feature in collection.features {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let time_seconds = feature.properties.value.max(0.0).round() as u32;
            for (exterior, holes) in geojson::polygons(&feature.geometry) {
                polygons.push(IsochronePolygon {
                    time_seconds,
                    exterior,
                    holes,
                });
            }
        }
        polygons.sort_by_key(|p| p.time_seconds);

        Ok(Isochrone {
            origin: origin.clone(),
            transport,
            polygons,
        })
    }
}

#[async_trait]
impl Router for OpenRouteServiceClient {
    async fn route(
        &self,
        waypoints: &[Location],
        transport: TransportMode,
    ) -> Result<RouteSummary, ServiceError> {
        let profile = profile(transport)?;
        if waypoints.len() < 2 {
            return Err(ServiceError::Rejected {
                service: SERVICE,
                message: "a route needs at least two waypoints".to_owned(),
            });
        }
        let coordinates: Vec<[f64; 2]> = waypoints.iter().map(pair).collect();
        let body = json!({ "coordinates": coordinates, "instructions": true });
        let collection: FeatureCollection<DirectionsProperties> = self
            .post_json(
                &format!("v2/directions/{profile}/geojson"),
                "ors directions",
                &body,
            )
            .await?;

        let feature = collection
            .features
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Rejected {
                service: SERVICE,
                message: "no route found".to_owned(),
            })?;

        let geometry = match &feature.geometry {
            Geometry::LineString { coordinates } => Some(geojson::to_ring(coordinates)),
            _ => None,
        };
        let steps = feature
            .properties
            .segments
            .into_iter()
            .flat_map(|segment| segment.steps)
            .map(|step| RouteStep {
                instruction: step.instruction,
                distance_m: step.distance,
                duration_s: step.duration,
            })
            .collect();

        Ok(RouteSummary {
            distance_m: feature.properties.summary.distance,
            duration_s: feature.properties.summary.duration,
            geometry,
            steps,
        })
    }

    async fn matrix(
        &self,
        sources: &[Location],
        destinations: &[Location],
        transport: TransportMode,
    ) -> Result<TravelMatrix, ServiceError> {
        let profile = profile(transport)?;
        if sources.is_empty() || destinations.is_empty() {
            return Ok(TravelMatrix::default());
        }
        let locations: Vec<[f64; 2]> = sources.iter().chain(destinations).map(pair).collect();
        let source_idx: Vec<usize> = (0..sources.len()).collect();
        let destination_idx: Vec<usize> = (sources.len()..locations.len()).collect();
        let body = json!({
            "locations": locations,
            "sources": source_idx,
            "destinations": destination_idx,
            "metrics": ["duration", "distance"],
        });
        let matrix: MatrixResponse = self
            .post_json(&format!("v2/matrix/{profile}"), "ors matrix", &body)
            .await?;
        Ok(TravelMatrix {
            durations_s: matrix.durations,
            distances_m: matrix.distances,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_cover_road_modes() {
        assert_eq!(profile(TransportMode::Walking).unwrap(), "foot-walking");
        assert_eq!(profile(TransportMode::Cycling).unwrap(), "cycling-regular");
        assert_eq!(profile(TransportMode::Driving).unwrap(), "driving-car");
        assert!(matches!(
            profile(TransportMode::PublicTransport),
            Err(ServiceError::Unsupported { .. })
        ));
    }

    #[test]
    fn blank_api_key_is_rejected() {
        let err = OpenRouteServiceClient::new(
            HttpSettings::new("http://localhost"),
            "  ",
            ResilientCaller::unthrottled(SERVICE, crate::RetryPolicy::no_retries()),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotConfigured { .. }));
    }

    #[test]
    fn directions_summary_tolerates_missing_fields() {
        let props: DirectionsProperties =
            serde_json::from_value(json!({ "summary": {}, "segments": [] })).unwrap();
        assert!(props.summary.distance.abs() < f64::EPSILON);
        assert!(props.segments.is_empty());
    }
}
