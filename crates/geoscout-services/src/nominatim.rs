//! Geocoding against a Nominatim `/search` endpoint.

use async_trait::async_trait;
use geoscout_core::Location;
use reqwest::Client;
use serde::Deserialize;

use crate::error::ServiceError;
use crate::http::{check_status, read_json, transport_error, HttpSettings};
use crate::ports::Geocoder;
use crate::resilient::ResilientCaller;

const SERVICE: &str = "nominatim";
const DEFAULT_LIMIT: u8 = 5;

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Nominatim geocoder. The public instance allows one request per second,
/// which the caller's limiter is expected to enforce.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    settings: HttpSettings,
    caller: ResilientCaller,
    limit: u8,
}

impl NominatimGeocoder {
    /// # Errors
    ///
    /// Returns [`ServiceError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: HttpSettings, caller: ResilientCaller) -> Result<Self, ServiceError> {
        let client = settings.build_client(SERVICE)?;
        Ok(Self {
            client,
            settings,
            caller,
            limit: DEFAULT_LIMIT,
        })
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u8) -> Self {
        self.limit = limit.max(1);
        self
    }
}

fn to_location(place: NominatimPlace) -> Option<Location> {
    let lat = place.lat.trim().parse::<f64>().ok()?;
    let lng = place.lon.trim().parse::<f64>().ok()?;
    let location = Location::new(lat, lng).ok()?;
    Some(match place.display_name {
        Some(name) if !name.is_empty() => location.with_label(name),
        _ => location,
    })
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<Vec<Location>, ServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ServiceError::Rejected {
                service: SERVICE,
                message: "empty geocoding query".to_owned(),
            });
        }

        let url = self.settings.endpoint("search");
        let limit = self.limit.to_string();
        let places: Vec<NominatimPlace> = self
            .caller
            .call(|| {
                let request = self.client.get(&url).query(&[
                    ("q", query),
                    ("format", "jsonv2"),
                    ("limit", limit.as_str()),
                ]);
                async move {
                    let response = request.send().await.map_err(transport_error(SERVICE))?;
                    let response = check_status(SERVICE, response).await?;
                    read_json(SERVICE, "nominatim search", response).await
                }
            })
            .await?;

        let total = places.len();
        let locations: Vec<Location> = places.into_iter().filter_map(to_location).collect();
        if locations.len() < total {
            tracing::debug!(
                query,
                dropped = total - locations.len(),
                "skipped nominatim results with unusable coordinates"
            );
        }
        Ok(locations)
    }
}
