//! POI search through the Overpass API.
//!
//! Queries are written in Overpass QL and cover both nodes and ways; ways are
//! returned with `out center` so every element has a single coordinate.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use async_trait::async_trait;
use geoscout_core::{Location, Poi, PoiFilters, PoiType, SearchArea};
use reqwest::Client;
use serde::Deserialize;

use crate::error::ServiceError;
use crate::http::{check_status, read_json, transport_error, HttpSettings};
use crate::ports::PoiSource;
use crate::resilient::ResilientCaller;

const SERVICE: &str = "overpass";
const DEFAULT_RESULT_CAP: usize = 100;
const QUERY_TIMEOUT_SECS: u32 = 25;

/// OSM tag key and value selecting each POI type.
#[must_use]
pub fn osm_tag(poi_type: PoiType) -> (&'static str, &'static str) {
    match poi_type {
        PoiType::Restaurant => ("amenity", "restaurant"),
        PoiType::Cafe => ("amenity", "cafe"),
        PoiType::Bar => ("amenity", "bar"),
        PoiType::Pub => ("amenity", "pub"),
        PoiType::FastFood => ("amenity", "fast_food"),
        PoiType::Bakery => ("shop", "bakery"),
        PoiType::Park => ("leisure", "park"),
        PoiType::Playground => ("leisure", "playground"),
        PoiType::Pharmacy => ("amenity", "pharmacy"),
        PoiType::Hospital => ("amenity", "hospital"),
        PoiType::Supermarket => ("shop", "supermarket"),
        PoiType::GasStation => ("amenity", "fuel"),
        PoiType::ChargingStation => ("amenity", "charging_station"),
        PoiType::Parking => ("amenity", "parking"),
        PoiType::Atm => ("amenity", "atm"),
        PoiType::Bank => ("amenity", "bank"),
        PoiType::Hotel => ("tourism", "hotel"),
        PoiType::Museum => ("tourism", "museum"),
        PoiType::Library => ("amenity", "library"),
        PoiType::Gym => ("leisure", "fitness_centre"),
        PoiType::Cinema => ("amenity", "cinema"),
        PoiType::School => ("amenity", "school"),
        PoiType::TrainStation => ("railway", "station"),
    }
}

/// Keeps only characters that are safe inside a quoted QL regex.
fn sanitize_cuisine(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect()
}

/// Builds the Overpass QL query for `poi_type` inside `area`.
#[must_use]
pub fn build_query(area: &SearchArea, poi_type: PoiType, filters: &PoiFilters) -> String {
    let (key, value) = osm_tag(poi_type);
    let mut selector = format!("[\"{key}\"=\"{value}\"]");
    if let Some(cuisine) = filters.cuisine.as_deref().map(sanitize_cuisine) {
        if !cuisine.is_empty() {
            let _ = write!(selector, "[\"cuisine\"~\"{cuisine}\",i]");
        }
    }

    let spatial = match area {
        SearchArea::BoundingBox(bbox) => format!(
            "({:.6},{:.6},{:.6},{:.6})",
            bbox.south, bbox.west, bbox.north, bbox.east
        ),
        SearchArea::Radius { center, radius_m } => format!(
            "(around:{:.0},{:.6},{:.6})",
            radius_m.max(1.0),
            center.lat(),
            center.lng()
        ),
    };

    let cap = filters.limit.unwrap_or(DEFAULT_RESULT_CAP).max(1);
    format!(
        "[out:json][timeout:{QUERY_TIMEOUT_SECS}];\n(\n  node{selector}{spatial};\n  way{selector}{spatial};\n);\nout center {cap};"
    )
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

impl OverpassElement {
    fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => Some((lat, lon)),
            (_, _, Some(center)) => Some((center.lat, center.lon)),
            _ => None,
        }
    }

    fn into_poi(self, poi_type: PoiType, rank: usize) -> Option<Poi> {
        let (lat, lng) = self.coordinates()?;
        let location = Location::new(lat, lng).ok()?;
        let name = self
            .tags
            .get("name")
            .cloned()
            .unwrap_or_else(|| format!("Unnamed {}", poi_type.as_str().replace('_', " ")));
        let mut poi = Poi::new(format!("{}/{}", self.kind, self.id), name, poi_type, location)
            .with_rank(rank);
        poi.tags = self.tags;
        Some(poi)
    }
}

/// Overpass-backed POI source.
#[derive(Debug, Clone)]
pub struct OverpassPoiSource {
    client: Client,
    settings: HttpSettings,
    caller: ResilientCaller,
}

impl OverpassPoiSource {
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
}

#[async_trait]
impl PoiSource for OverpassPoiSource {
    async fn find_pois(
        &self,
        area: &SearchArea,
        poi_type: PoiType,
        filters: &PoiFilters,
    ) -> Result<Vec<Poi>, ServiceError> {
        let query = build_query(area, poi_type, filters);
        let url = self.settings.endpoint("api/interpreter");
        tracing::debug!(poi_type = poi_type.as_str(), "querying overpass");

        let response: OverpassResponse = self
            .caller
            .call(|| {
                let request = self.client.post(&url).form(&[("data", query.as_str())]);
                async move {
                    let response = request.send().await.map_err(transport_error(SERVICE))?;
                    let response = check_status(SERVICE, response).await?;
                    read_json(SERVICE, "overpass interpreter", response).await
                }
            })
            .await?;

        let pois: Vec<Poi> = response
            .elements
            .into_iter()
            .filter_map(|element| element.into_poi(poi_type, 0))
            // ranks count only usable elements
            .enumerate()
            .map(|(rank, poi)| poi.with_rank(rank))
            .collect();

        Ok(match filters.limit {
            Some(limit) => pois.into_iter().take(limit).collect(),
            None => pois,
        })
    }
}
