//! Points of interest and the spatial queries used to fetch them.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GeoError;
use crate::location::{BoundingBox, Location};
use crate::transport::TransportMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoiType {
    Restaurant,
    Cafe,
    Bar,
    Pub,
    FastFood,
    Bakery,
    Park,
    Playground,
    Pharmacy,
    Hospital,
    Supermarket,
    GasStation,
    ChargingStation,
    Parking,
    Atm,
    Bank,
    Hotel,
    Museum,
    Library,
    Gym,
    Cinema,
    School,
    TrainStation,
}

/// Phrases recognised for each type, longest first within a type so that
/// "coffee shop" wins over "coffee". Matching is done on lowercase text.
const VOCABULARY: &[(PoiType, &[&str])] = &[
    (PoiType::Restaurant, &["restaurants", "restaurant", "places to eat", "diners", "diner", "eatery", "eateries"]),
    (PoiType::Cafe, &["coffee shops", "coffee shop", "cafes", "cafe", "cafés", "café", "coffee"]),
    (PoiType::Bar, &["cocktail bars", "bars", "bar"]),
    (PoiType::Pub, &["pubs", "pub"]),
    (PoiType::FastFood, &["fast food", "fast-food", "takeaways", "takeaway"]),
    (PoiType::Bakery, &["bakeries", "bakery"]),
    (PoiType::Park, &["parks", "park", "green spaces", "green space", "gardens"]),
    (PoiType::Playground, &["playgrounds", "playground"]),
    (PoiType::Pharmacy, &["pharmacies", "pharmacy", "chemists", "chemist", "drugstores", "drugstore"]),
    (PoiType::Hospital, &["hospitals", "hospital", "emergency room"]),
    (PoiType::Supermarket, &["supermarkets", "supermarket", "grocery stores", "grocery store", "groceries"]),
    (PoiType::GasStation, &["gas stations", "gas station", "petrol stations", "petrol station", "fuel stations", "fuel station", "gas_station"]),
    (PoiType::ChargingStation, &["charging stations", "charging station", "ev chargers", "ev charger", "chargers"]),
    (PoiType::Parking, &["car parks", "car park", "parking lots", "parking lot", "parking"]),
    (PoiType::Atm, &["cash machines", "cash machine", "atms", "atm"]),
    (PoiType::Bank, &["banks", "bank"]),
    (PoiType::Hotel, &["hotels", "hotel", "places to stay"]),
    (PoiType::Museum, &["museums", "museum", "galleries", "gallery"]),
    (PoiType::Library, &["libraries", "library"]),
    (PoiType::Gym, &["fitness centres", "fitness centre", "gyms", "gym"]),
    (PoiType::Cinema, &["movie theaters", "movie theater", "cinemas", "cinema"]),
    (PoiType::School, &["schools", "school"]),
    (PoiType::TrainStation, &["train stations", "train station", "railway stations", "railway station", "stations"]),
];

impl PoiType {
    pub const ALL: [PoiType; 23] = [
        PoiType::Restaurant,
        PoiType::Cafe,
        PoiType::Bar,
        PoiType::Pub,
        PoiType::FastFood,
        PoiType::Bakery,
        PoiType::Park,
        PoiType::Playground,
        PoiType::Pharmacy,
        PoiType::Hospital,
        PoiType::Supermarket,
        PoiType::GasStation,
        PoiType::ChargingStation,
        PoiType::Parking,
        PoiType::Atm,
        PoiType::Bank,
        PoiType::Hotel,
        PoiType::Museum,
        PoiType::Library,
        PoiType::Gym,
        PoiType::Cinema,
        PoiType::School,
        PoiType::TrainStation,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PoiType::Restaurant => "restaurant",
            PoiType::Cafe => "cafe",
            PoiType::Bar => "bar",
            PoiType::Pub => "pub",
            PoiType::FastFood => "fast_food",
            PoiType::Bakery => "bakery",
            PoiType::Park => "park",
            PoiType::Playground => "playground",
            PoiType::Pharmacy => "pharmacy",
            PoiType::Hospital => "hospital",
            PoiType::Supermarket => "supermarket",
            PoiType::GasStation => "gas_station",
            PoiType::ChargingStation => "charging_station",
            PoiType::Parking => "parking",
            PoiType::Atm => "atm",
            PoiType::Bank => "bank",
            PoiType::Hotel => "hotel",
            PoiType::Museum => "museum",
            PoiType::Library => "library",
            PoiType::Gym => "gym",
            PoiType::Cinema => "cinema",
            PoiType::School => "school",
            PoiType::TrainStation => "train_station",
        }
    }

    /// Types where a cuisine filter is meaningful.
    #[must_use]
    pub fn is_restaurant_like(self) -> bool {
        matches!(
            self,
            PoiType::Restaurant
                | PoiType::Cafe
                | PoiType::FastFood
                | PoiType::Bar
                | PoiType::Pub
                | PoiType::Bakery
        )
    }

    /// Every POI phrase occurring in `lower_text`, as `(byte range, type)`
    /// pairs ordered by position. Overlapping shorter phrases are dropped.
    #[must_use]
    pub fn mentions(lower_text: &str) -> Vec<(Range<usize>, PoiType)> {
        let mut candidates: Vec<(usize, usize, PoiType)> = Vec::new();
        for (poi_type, phrases) in VOCABULARY {
            for phrase in *phrases {
                for (start, _) in lower_text.match_indices(phrase) {
                    let end = start + phrase.len();
                    if is_word_boundary(lower_text, start, end) {
                        candidates.push((start, end, *poi_type));
                    }
                }
            }
        }
        // Longest phrase wins: "car park" is parking, not a park.
        candidates.sort_by(|a, b| (b.1 - b.0).cmp(&(a.1 - a.0)).then(a.0.cmp(&b.0)));
        let mut spans: Vec<(usize, usize, PoiType)> = Vec::new();
        for (start, end, poi_type) in candidates {
            if !spans.iter().any(|(s, e, _)| start < *e && *s < end) {
                spans.push((start, end, poi_type));
            }
        }
        spans.sort_by_key(|(start, _, _)| *start);
        spans
            .into_iter()
            .map(|(start, end, t)| (start..end, t))
            .collect()
    }
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

impl fmt::Display for PoiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoiType {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase().replace('_', " ");
        VOCABULARY
            .iter()
            .find(|(poi_type, phrases)| {
                poi_type.as_str().replace('_', " ") == needle || phrases.contains(&needle.as_str())
            })
            .map(|(poi_type, _)| *poi_type)
            .ok_or_else(|| GeoError::UnknownPoiType(s.to_string()))
    }
}

/// A place returned by a POI source, plus derived fields filled in while a
/// use case runs. The derived fields are a search-time view, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    /// Stable identifier from the source, e.g. `node/123456`.
    pub id: String,
    pub name: String,
    pub poi_type: PoiType,
    pub location: Location,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// Position in the source response; breaks distance ties.
    #[serde(default)]
    pub source_rank: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub durations_minutes: BTreeMap<TransportMode, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detour_minutes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_from_anchor_m: Option<f64>,
}

impl Poi {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        poi_type: PoiType,
        location: Location,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            poi_type,
            location,
            tags: BTreeMap::new(),
            source_rank: 0,
            distance_m: None,
            durations_minutes: BTreeMap::new(),
            detour_minutes: None,
            distance_from_anchor_m: None,
        }
    }

    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_rank(mut self, rank: usize) -> Self {
        self.source_rank = rank;
        self
    }
}

/// Where a POI source should look.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchArea {
    BoundingBox(BoundingBox),
    Radius { center: Location, radius_m: f64 },
}

impl SearchArea {
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            SearchArea::BoundingBox(bbox) => *bbox,
            SearchArea::Radius { center, radius_m } => BoundingBox::around(center, *radius_m),
        }
    }
}

/// Extra constraints passed through to the POI source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoiFilters {
    /// Cuisine tag, only honoured for restaurant-like types.
    pub cuisine: Option<String>,
    /// Upper bound on returned elements; `None` lets the source decide.
    pub limit: Option<usize>,
}
