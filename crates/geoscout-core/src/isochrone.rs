use serde::{Deserialize, Serialize};

use crate::geometry::point_in_polygon;
use crate::location::{BoundingBox, Location};
use crate::transport::TransportMode;

/// One reachable-area polygon for a single time value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsochronePolygon {
    pub time_seconds: u32,
    pub exterior: Vec<Location>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Vec<Location>>,
}

/// Reachable-area boundaries around an origin for one transport mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Isochrone {
    pub origin: Location,
    pub transport: TransportMode,
    pub polygons: Vec<IsochronePolygon>,
}

impl Isochrone {
    /// Whether `point` lies inside any polygon whose time value does not
    /// exceed `max_seconds`.
    #[must_use]
    pub fn contains_within(&self, point: &Location, max_seconds: u32) -> bool {
        self.polygons
            .iter()
            .filter(|p| p.time_seconds <= max_seconds)
            .any(|p| point_in_polygon(point, &p.exterior, &p.holes))
    }

    /// Whether `point` lies inside any polygon.
    #[must_use]
    pub fn contains(&self, point: &Location) -> bool {
        self.contains_within(point, u32::MAX)
    }

    /// Box enclosing every exterior ring; `None` when there are no vertices.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::enclosing(self.polygons.iter().flat_map(|p| p.exterior.iter()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polygons.iter().all(|p| p.exterior.len() < 3)
    }
}
