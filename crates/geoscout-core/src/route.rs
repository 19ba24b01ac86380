use serde::{Deserialize, Serialize};

use crate::location::Location;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub instruction: String,
    pub distance_m: f64,
    pub duration_s: f64,
}

/// Output of a single routing call. Read-only once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub distance_m: f64,
    pub duration_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Vec<Location>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<RouteStep>,
}

impl RouteSummary {
    #[must_use]
    pub fn duration_minutes(&self) -> f64 {
        self.duration_s / 60.0
    }
}

/// Pairwise travel costs, indexed `[source][destination]`.
///
/// Entries are `None` when the engine could not route that pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TravelMatrix {
    pub durations_s: Vec<Vec<Option<f64>>>,
    #[serde(default)]
    pub distances_m: Vec<Vec<Option<f64>>>,
}

impl TravelMatrix {
    #[must_use]
    pub fn duration_s(&self, source: usize, destination: usize) -> Option<f64> {
        self.durations_s
            .get(source)
            .and_then(|row| row.get(destination))
            .copied()
            .flatten()
    }

    #[must_use]
    pub fn distance_m(&self, source: usize, destination: usize) -> Option<f64> {
        self.distances_m
            .get(source)
            .and_then(|row| row.get(destination))
            .copied()
            .flatten()
    }
}
