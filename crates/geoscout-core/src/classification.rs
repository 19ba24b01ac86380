//! Structured output of query classification and the context it consumes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::location::Location;
use crate::poi::PoiType;
use crate::transport::TransportMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    MultiStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentKind {
    #[serde(rename = "find-within-time")]
    WithinTime,
    #[serde(rename = "find-nearest")]
    Nearest,
    #[serde(rename = "find-near-poi")]
    NearPoi,
    #[serde(rename = "find-enroute")]
    Enroute,
    #[serde(rename = "unknown")]
    Unknown,
}

impl IntentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            IntentKind::WithinTime => "find-within-time",
            IntentKind::Nearest => "find-nearest",
            IntentKind::NearPoi => "find-near-poi",
            IntentKind::Enroute => "find-enroute",
            IntentKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A place named in a query: either already resolved to coordinates or
/// free text that still needs geocoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PlaceRef {
    Coordinates(Location),
    Text(String),
}

impl PlaceRef {
    #[must_use]
    pub fn needs_geocoding(&self) -> bool {
        matches!(self, PlaceRef::Text(_))
    }
}

/// Extracted slots, one variant per intent, each carrying only the fields
/// that intent uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent")]
pub enum QueryEntities {
    #[serde(rename = "find-within-time")]
    WithinTime {
        poi_type: PoiType,
        time_minutes: u32,
        transport: TransportMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cuisine: Option<String>,
        /// Search origin when it is not the user's own location.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin: Option<PlaceRef>,
    },
    #[serde(rename = "find-nearest")]
    Nearest {
        poi_type: PoiType,
        transport: TransportMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin: Option<PlaceRef>,
    },
    #[serde(rename = "find-near-poi")]
    NearPoi {
        primary_type: PoiType,
        secondary_type: PoiType,
        transport: TransportMode,
        max_time_from_secondary_minutes: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cuisine: Option<String>,
    },
    #[serde(rename = "find-enroute")]
    Enroute {
        poi_type: PoiType,
        destination: PlaceRef,
        transport: TransportMode,
        max_total_time_minutes: u32,
        max_detour_minutes: u32,
    },
    #[serde(rename = "unknown")]
    Unknown {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        poi_type: Option<PoiType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transport: Option<TransportMode>,
    },
}

impl QueryEntities {
    #[must_use]
    pub fn intent(&self) -> IntentKind {
        match self {
            QueryEntities::WithinTime { .. } => IntentKind::WithinTime,
            QueryEntities::Nearest { .. } => IntentKind::Nearest,
            QueryEntities::NearPoi { .. } => IntentKind::NearPoi,
            QueryEntities::Enroute { .. } => IntentKind::Enroute,
            QueryEntities::Unknown { .. } => IntentKind::Unknown,
        }
    }

    /// The main POI type the user is looking for, if any.
    #[must_use]
    pub fn poi_type(&self) -> Option<PoiType> {
        match self {
            QueryEntities::WithinTime { poi_type, .. }
            | QueryEntities::Nearest { poi_type, .. }
            | QueryEntities::Enroute { poi_type, .. } => Some(*poi_type),
            QueryEntities::NearPoi { primary_type, .. } => Some(*primary_type),
            QueryEntities::Unknown { poi_type, .. } => *poi_type,
        }
    }

    #[must_use]
    pub fn transport(&self) -> Option<TransportMode> {
        match self {
            QueryEntities::WithinTime { transport, .. }
            | QueryEntities::Nearest { transport, .. }
            | QueryEntities::NearPoi { transport, .. }
            | QueryEntities::Enroute { transport, .. } => Some(*transport),
            QueryEntities::Unknown { transport, .. } => *transport,
        }
    }
}

/// Result of classifying one query. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedQuery {
    pub entities: QueryEntities,
    pub complexity: Complexity,
    confidence: f64,
    /// Whether conversation history was needed to fill the entities.
    pub requires_context: bool,
    pub reasoning: String,
}

impl ClassifiedQuery {
    /// Builds a classification; `confidence` is clamped into `[0, 1]` and a
    /// NaN confidence becomes `0`.
    pub fn new(
        entities: QueryEntities,
        complexity: Complexity,
        confidence: f64,
        requires_context: bool,
        reasoning: impl Into<String>,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            entities,
            complexity,
            confidence,
            requires_context,
            reasoning: reasoning.into(),
        }
    }

    #[must_use]
    pub fn intent(&self) -> IntentKind {
        self.entities.intent()
    }

    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    #[must_use]
    pub fn is_low_confidence(&self, threshold: f64) -> bool {
        self.confidence < threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: ConversationRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ConversationRole::User,
            content: content.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ConversationRole::Assistant,
            content: content.into(),
            timestamp: Some(Utc::now()),
        }
    }
}

/// Read-only preferences from the memory store. Only biases defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub favorite_transport_modes: Vec<TransportMode>,
    #[serde(default)]
    pub favorite_poi_types: Vec<PoiType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    #[serde(default)]
    pub last_classification: Option<ClassifiedQuery>,
    #[serde(default)]
    pub preferences: Option<UserPreferences>,
}

impl QueryContext {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.last_classification.is_none() && self.preferences.is_none()
    }
}
