//! Coordinates, great-circle distance and bounding boxes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GeoError;

/// Mean Earth radius in metres (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Metres per degree of latitude, close enough for box sizing.
pub const METRES_PER_LAT_DEGREE: f64 = 111_320.0;

/// A validated WGS84 coordinate with an optional display label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLocation")]
pub struct Location {
    lat: f64,
    lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

#[derive(Deserialize)]
struct RawLocation {
    lat: f64,
    lng: f64,
    #[serde(default)]
    label: Option<String>,
}

impl TryFrom<RawLocation> for Location {
    type Error = GeoError;

    fn try_from(raw: RawLocation) -> Result<Self, Self::Error> {
        let location = Location::new(raw.lat, raw.lng)?;
        Ok(match raw.label {
            Some(label) => location.with_label(label),
            None => location,
        })
    }
}

impl Location {
    /// Creates a location, rejecting out-of-range or non-finite coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidLatitude`] or [`GeoError::InvalidLongitude`].
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::InvalidLatitude(lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::InvalidLongitude(lng));
        }
        Ok(Self {
            lat,
            lng,
            label: None,
        })
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[must_use]
    pub fn lng(&self) -> f64 {
        self.lng
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Great-circle distance to `other` in metres.
    #[must_use]
    pub fn distance_to(&self, other: &Location) -> f64 {
        haversine_m(self, other)
    }

    /// Moves `north_m` metres north and `east_m` metres east, clamping the
    /// result into valid coordinate ranges.
    #[must_use]
    pub fn offset(&self, north_m: f64, east_m: f64) -> Location {
        let lat = (self.lat + north_m / METRES_PER_LAT_DEGREE).clamp(-90.0, 90.0);
        let lng_scale = METRES_PER_LAT_DEGREE * self.lat.to_radians().cos().max(1e-6);
        let lng = (self.lng + east_m / lng_scale).clamp(-180.0, 180.0);
        Location {
            lat,
            lng,
            label: None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{label} ({:.5},{:.5})", self.lat, self.lng),
            None => write!(f, "{:.5},{:.5}", self.lat, self.lng),
        }
    }
}

/// Parses `"lat,lng"` (whitespace tolerant).
impl FromStr for Location {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| GeoError::InvalidCoordinatePair(s.to_string()))?;
        let lat = lat
            .trim()
            .parse::<f64>()
            .map_err(|_| GeoError::InvalidCoordinatePair(s.to_string()))?;
        let lng = lng
            .trim()
            .parse::<f64>()
            .map_err(|_| GeoError::InvalidCoordinatePair(s.to_string()))?;
        Location::new(lat, lng)
    }
}

/// Haversine distance between two locations in metres.
#[must_use]
pub fn haversine_m(a: &Location, b: &Location) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Axis-aligned lat/lng box, used as the spatial filter sent to POI sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Box that encloses a circle of `radius_m` around `center`.
    #[must_use]
    pub fn around(center: &Location, radius_m: f64) -> Self {
        let sw = center.offset(-radius_m, -radius_m);
        let ne = center.offset(radius_m, radius_m);
        Self {
            south: sw.lat,
            west: sw.lng,
            north: ne.lat,
            east: ne.lng,
        }
    }

    /// Smallest box enclosing every location; `None` for an empty iterator.
    pub fn enclosing<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Location>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self {
            south: first.lat,
            west: first.lng,
            north: first.lat,
            east: first.lng,
        };
        for p in iter {
            bbox.south = bbox.south.min(p.lat);
            bbox.north = bbox.north.max(p.lat);
            bbox.west = bbox.west.min(p.lng);
            bbox.east = bbox.east.max(p.lng);
        }
        Some(bbox)
    }

    /// Grows the box by `margin_m` metres on every side.
    #[must_use]
    pub fn expanded_by(&self, margin_m: f64) -> Self {
        let mid_lat = (self.south + self.north) / 2.0;
        let d_lat = margin_m / METRES_PER_LAT_DEGREE;
        let d_lng = margin_m / (METRES_PER_LAT_DEGREE * mid_lat.to_radians().cos().max(1e-6));
        Self {
            south: (self.south - d_lat).max(-90.0),
            west: (self.west - d_lng).max(-180.0),
            north: (self.north + d_lat).min(90.0),
            east: (self.east + d_lng).min(180.0),
        }
    }

    #[must_use]
    pub fn contains(&self, point: &Location) -> bool {
        (self.south..=self.north).contains(&point.lat)
            && (self.west..=self.east).contains(&point.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(lat: f64, lng: f64) -> Location {
        Location::new(lat, lng).unwrap()
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert_eq!(Location::new(91.0, 0.0), Err(GeoError::InvalidLatitude(91.0)));
        assert_eq!(
            Location::new(0.0, -180.5),
            Err(GeoError::InvalidLongitude(-180.5))
        );
        assert!(Location::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn haversine_london_to_paris() {
        let london = loc(51.5074, -0.1278);
        let paris = loc(48.8566, 2.3522);
        let d = haversine_m(&london, &paris);
        assert!((d - 343_500.0).abs() < 1_500.0, "got {d}");
    }

    #[test]
    fn offset_moves_roughly_the_requested_distance() {
        let origin = loc(51.5074, -0.1278);
        let moved = origin.offset(0.0, 400.0);
        let d = origin.distance_to(&moved);
        assert!((d - 400.0).abs() < 2.0, "got {d}");
    }

    #[test]
    fn parses_coordinate_pairs() {
        let parsed: Location = " 51.5, -0.12 ".parse().unwrap();
        assert!((parsed.lat() - 51.5).abs() < f64::EPSILON);
        assert!(matches!(
            "brighton".parse::<Location>(),
            Err(GeoError::InvalidCoordinatePair(_))
        ));
    }

    #[test]
    fn deserialize_validates_ranges() {
        let bad = serde_json::from_str::<Location>(r#"{"lat": 100.0, "lng": 0.0}"#);
        assert!(bad.is_err());
        let good: Location =
            serde_json::from_str(r#"{"lat": 10.0, "lng": 20.0, "label": "x"}"#).unwrap();
        assert_eq!(good.label(), Some("x"));
    }

    #[test]
    fn bbox_around_contains_center_and_edge() {
        let center = loc(40.0, -74.0);
        let bbox = BoundingBox::around(&center, 1_000.0);
        assert!(bbox.contains(&center));
        assert!(bbox.contains(&center.offset(990.0, 0.0)));
        assert!(!bbox.contains(&center.offset(1_200.0, 0.0)));
    }

    #[test]
    fn enclosing_box_spans_all_points() {
        let pts = [loc(1.0, 2.0), loc(-1.0, 5.0), loc(0.5, -3.0)];
        let bbox = BoundingBox::enclosing(&pts).unwrap();
        assert!((bbox.south + 1.0).abs() < f64::EPSILON);
        assert!((bbox.north - 1.0).abs() < f64::EPSILON);
        assert!((bbox.west + 3.0).abs() < f64::EPSILON);
        assert!((bbox.east - 5.0).abs() < f64::EPSILON);
        assert!(BoundingBox::enclosing(std::iter::empty::<&Location>()).is_none());
    }
}
