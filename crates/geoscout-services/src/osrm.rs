//! OSRM adapter for routes and duration tables.

use async_trait::async_trait;
use geoscout_core::{Location, RouteStep, RouteSummary, TransportMode, TravelMatrix};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ServiceError;
use crate::geojson::{self, Geometry};
use crate::http::{check_status, read_json, transport_error, HttpSettings};
use crate::ports::Router;
use crate::resilient::ResilientCaller;

const SERVICE: &str = "osrm";

/// OSRM profile segment for a transport mode.
///
/// # Errors
///
/// Returns [`ServiceError::Unsupported`] for public transport.
pub fn profile(transport: TransportMode) -> Result<&'static str, ServiceError> {
    match transport {
        TransportMode::Walking => Ok("foot"),
        TransportMode::Cycling => Ok("bike"),
        TransportMode::Driving => Ok("driving"),
        TransportMode::PublicTransport => Err(ServiceError::Unsupported {
            service: SERVICE,
            what: "public transport routing".to_owned(),
        }),
    }
}

fn coordinate_path<'a>(locations: impl IntoIterator<Item = &'a Location>) -> String {
    locations
        .into_iter()
        .map(geojson::lng_lat)
        .collect::<Vec<_>>()
        .join(";")
}

fn index_list(range: std::ops::Range<usize>) -> String {
    range.map(|i| i.to_string()).collect::<Vec<_>>().join(";")
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: Option<Geometry>,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    distance: f64,
    duration: f64,
    #[serde(default)]
    name: String,
    maneuver: Maneuver,
}

#[derive(Debug, Deserialize)]
struct Maneuver {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    modifier: Option<String>,
}

impl OsrmStep {
    /// e.g. "turn left onto Baker Street", "arrive".
    fn instruction(&self) -> String {
        let mut text = self.maneuver.kind.clone();
        if let Some(modifier) = &self.maneuver.modifier {
            text.push(' ');
            text.push_str(modifier);
        }
        if !self.name.is_empty() {
            text.push_str(" onto ");
            text.push_str(&self.name);
        }
        text
    }
}

#[derive(Debug, Deserialize)]
struct TableResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    durations: Vec<Vec<Option<f64>>>,
    #[serde(default)]
    distances: Vec<Vec<Option<f64>>>,
}

fn ensure_ok(code: &str, message: Option<&str>) -> Result<(), ServiceError> {
    if code == "Ok" {
        return Ok(());
    }
    Err(ServiceError::Rejected {
        service: SERVICE,
        message: match message {
            Some(m) => format!("{code}: {m}"),
            None => code.to_owned(),
        },
    })
}

/// OSRM-backed [`Router`].
#[derive(Debug, Clone)]
pub struct OsrmRouter {
    client: Client,
    settings: HttpSettings,
    caller: ResilientCaller,
}

impl OsrmRouter {
    /// # Errors
    ///
    /// Returns [`ServiceError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: HttpSettings, caller: ResilientCaller) -> Result<Self, ServiceError> {
        let client = settings.build_client(SERVICE)?;
        Ok(Self {
            client,
            settings,
            caller,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        context: &str,
    ) -> Result<T, ServiceError> {
        let url = self.settings.endpoint(path);
        self.caller
            .call(|| {
                let request = self.client.get(&url).query(query);
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
impl Router for OsrmRouter {
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
        let path = format!("route/v1/{profile}/{}", coordinate_path(waypoints));
        let query = [
            ("overview", "full".to_owned()),
            ("geometries", "geojson".to_owned()),
            ("steps", "true".to_owned()),
        ];
        let response: RouteResponse = self.get_json(&path, &query, "osrm route").await?;
        ensure_ok(&response.code, response.message.as_deref())?;

        let route = response
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Rejected {
                service: SERVICE,
                message: "no route found".to_owned(),
            })?;
        let geometry = match &route.geometry {
            Some(Geometry::LineString { coordinates }) => Some(geojson::to_ring(coordinates)),
            _ => None,
        };
        let steps = route
            .legs
            .iter()
            .flat_map(|leg| leg.steps.iter())
            .map(|step| RouteStep {
                instruction: step.instruction(),
                distance_m: step.distance,
                duration_s: step.duration,
            })
            .collect();

        Ok(RouteSummary {
            distance_m: route.distance,
            duration_s: route.duration,
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
        let total = sources.len() + destinations.len();
        let path = format!(
            "table/v1/{profile}/{}",
            coordinate_path(sources.iter().chain(destinations))
        );
        let query = [
            ("sources", index_list(0..sources.len())),
            ("destinations", index_list(sources.len()..total)),
            ("annotations", "duration,distance".to_owned()),
        ];
        let response: TableResponse = self.get_json(&path, &query, "osrm table").await?;
        ensure_ok(&response.code, response.message.as_deref())?;
        Ok(TravelMatrix {
            durations_s: response.durations,
            distances_m: response.distances,
        })
    }
}
