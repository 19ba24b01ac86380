use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GeoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Walking,
    Cycling,
    Driving,
    PublicTransport,
}

impl TransportMode {
    pub const ALL: [TransportMode; 4] = [
        TransportMode::Walking,
        TransportMode::Cycling,
        TransportMode::Driving,
        TransportMode::PublicTransport,
    ];

    /// Reference speed in metres per second, used for radius estimates when
    /// no routing engine answer is available.
    #[must_use]
    pub fn reference_speed_mps(self) -> f64 {
        match self {
            TransportMode::Walking => 1.4,
            TransportMode::Cycling => 4.2,
            TransportMode::Driving => 13.9,
            TransportMode::PublicTransport => 8.3,
        }
    }

    /// Distance reachable in `minutes` at the reference speed.
    #[must_use]
    pub fn reachable_radius_m(self, minutes: f64) -> f64 {
        self.reference_speed_mps() * minutes * 60.0
    }

    /// Straight-line travel time estimate in minutes.
    #[must_use]
    pub fn estimate_minutes(self, distance_m: f64) -> f64 {
        distance_m / self.reference_speed_mps() / 60.0
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TransportMode::Walking => "walking",
            TransportMode::Cycling => "cycling",
            TransportMode::Driving => "driving",
            TransportMode::PublicTransport => "public_transport",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "walking" | "walk" | "foot" | "on_foot" | "pedestrian" => Ok(TransportMode::Walking),
            "cycling" | "cycle" | "bike" | "bicycle" | "biking" => Ok(TransportMode::Cycling),
            "driving" | "drive" | "car" | "driving_car" => Ok(TransportMode::Driving),
            "public_transport" | "transit" | "public" | "bus" | "train" | "metro" | "tube" => {
                Ok(TransportMode::PublicTransport)
            }
            _ => Err(GeoError::UnknownTransport(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_synonyms() {
        assert_eq!("Walk".parse::<TransportMode>().unwrap(), TransportMode::Walking);
        assert_eq!("bike".parse::<TransportMode>().unwrap(), TransportMode::Cycling);
        assert_eq!(
            "public transport".parse::<TransportMode>().unwrap(),
            TransportMode::PublicTransport
        );
        assert!(matches!(
            "hovercraft".parse::<TransportMode>(),
            Err(GeoError::UnknownTransport(_))
        ));
    }

    #[test]
    fn reachable_radius_uses_reference_speed() {
        let r = TransportMode::Walking.reachable_radius_m(15.0);
        assert!((r - 1_260.0).abs() < 1e-6);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&TransportMode::PublicTransport).unwrap();
        assert_eq!(json, "\"public_transport\"");
    }
}
