//! Minimal GeoJSON geometry shapes shared by the routing adapters.

use geoscout_core::Location;
use serde::Deserialize;

/// `[lng, lat]` or `[lng, lat, elevation]`.
pub(crate) type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum Geometry {
    LineString { coordinates: Vec<Position> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    #[serde(other)]
    Other,
}

pub(crate) fn to_location(position: &[f64]) -> Option<Location> {
    match position {
        [lng, lat, ..] => Location::new(*lat, *lng).ok(),
        _ => None,
    }
}

pub(crate) fn to_ring(positions: &[Position]) -> Vec<Location> {
    positions.iter().filter_map(|p| to_location(p)).collect()
}

/// Exterior ring plus holes for every polygon in `geometry`.
pub(crate) fn polygons(geometry: &Geometry) -> Vec<(Vec<Location>, Vec<Vec<Location>>)> {
    let split = |rings: &Vec<Vec<Position>>| {
        let mut iter = rings.iter().map(|r| to_ring(r));
        iter.next().map(|exterior| (exterior, iter.collect()))
    };
    match geometry {
        Geometry::Polygon { coordinates } => split(coordinates).into_iter().collect(),
        Geometry::MultiPolygon { coordinates } => coordinates.iter().filter_map(split).collect(),
        Geometry::LineString { .. } | Geometry::Other => Vec::new(),
    }
}

/// `lng,lat` formatted for URL path segments.
pub(crate) fn lng_lat(location: &Location) -> String {
    format!("{:.6},{:.6}", location.lng(), location.lat())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_lng_first() {
        let loc = to_location(&[2.35, 48.85, 35.0]).unwrap();
        assert!((loc.lat() - 48.85).abs() < 1e-12);
        assert!((loc.lng() - 2.35).abs() < 1e-12);
        assert!(to_location(&[1.0]).is_none());
        assert!(to_location(&[0.0, 95.0]).is_none());
    }

    #[test]
    fn multipolygon_yields_each_part() {
        let geometry: Geometry = serde_json::from_value(serde_json::json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                [
                    [[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]],
                    [[5.2, 5.2], [5.4, 5.2], [5.4, 5.4], [5.2, 5.2]]
                ]
            ]
        }))
        .unwrap();
        let parts = polygons(&geometry);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].1.is_empty());
        assert_eq!(parts[1].1.len(), 1);
    }

    #[test]
    fn formats_path_coordinates() {
        let loc = Location::new(51.5, -0.125).unwrap();
        assert_eq!(lng_lat(&loc), "-0.125000,51.500000");
    }
}
