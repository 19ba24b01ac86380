//! Turns a classification into an execution path.

use geoscout_core::{ClassifiedQuery, Complexity, PlaceRef, PoiType, QueryEntities, TransportMode};
use serde::{Deserialize, Serialize};

/// Which location a step searches from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOrigin {
    /// The requesting user's location.
    User,
    /// The location produced by the previous step.
    Anchor,
}

/// One data-dependent step of a multi-step plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PlanStep {
    /// Resolve free text to the anchor location.
    Geocode { query: String },
    /// Find the nearest POI; its location becomes the anchor.
    Nearest {
        poi_type: PoiType,
        transport: TransportMode,
        from: StepOrigin,
    },
    WithinTime {
        poi_type: PoiType,
        time_minutes: u32,
        transport: TransportMode,
        cuisine: Option<String>,
        from: StepOrigin,
    },
    /// POIs close to the anchor POI found by the previous step.
    NearPoi {
        primary_type: PoiType,
        secondary_type: PoiType,
        transport: TransportMode,
        max_time_from_secondary_minutes: u32,
        cuisine: Option<String>,
    },
    /// Stopovers from the user to the anchor.
    EnrouteToAnchor {
        poi_type: PoiType,
        transport: TransportMode,
        max_total_time_minutes: u32,
        max_detour_minutes: u32,
    },
}

impl PlanStep {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PlanStep::Geocode { .. } => "geocode",
            PlanStep::Nearest { .. } => "nearest",
            PlanStep::WithinTime { .. } => "within_time",
            PlanStep::NearPoi { .. } => "near_poi",
            PlanStep::EnrouteToAnchor { .. } => "enroute",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionPath {
    /// One use case with the classified entities as-is.
    Single(QueryEntities),
    /// Steps run in order; each may consume the previous step's anchor.
    MultiStep(Vec<PlanStep>),
}

/// Chooses how to execute a classification.
///
/// Only data dependencies produce multi-step plans: a free-text place that
/// must be geocoded first, or a near-POI query anchored on "the nearest"
/// secondary POI.
#[must_use]
pub fn plan_for(query: &ClassifiedQuery) -> ExecutionPath {
    match &query.entities {
        QueryEntities::WithinTime {
            poi_type,
            time_minutes,
            transport,
            cuisine,
            origin: Some(PlaceRef::Text(place)),
        } => ExecutionPath::MultiStep(vec![
            PlanStep::Geocode {
                query: place.clone(),
            },
            PlanStep::WithinTime {
                poi_type: *poi_type,
                time_minutes: *time_minutes,
                transport: *transport,
                cuisine: cuisine.clone(),
                from: StepOrigin::Anchor,
            },
        ]),
        QueryEntities::Nearest {
            poi_type,
            transport,
            origin: Some(PlaceRef::Text(place)),
        } => ExecutionPath::MultiStep(vec![
            PlanStep::Geocode {
                query: place.clone(),
            },
            PlanStep::Nearest {
                poi_type: *poi_type,
                transport: *transport,
                from: StepOrigin::Anchor,
            },
        ]),
        QueryEntities::NearPoi {
            primary_type,
            secondary_type,
            transport,
            max_time_from_secondary_minutes,
            cuisine,
        } if query.complexity == Complexity::MultiStep => ExecutionPath::MultiStep(vec![
            PlanStep::Nearest {
                poi_type: *secondary_type,
                transport: *transport,
                from: StepOrigin::User,
            },
            PlanStep::NearPoi {
                primary_type: *primary_type,
                secondary_type: *secondary_type,
                transport: *transport,
                max_time_from_secondary_minutes: *max_time_from_secondary_minutes,
                cuisine: cuisine.clone(),
            },
        ]),
        QueryEntities::Enroute {
            poi_type,
            destination: PlaceRef::Text(place),
            transport,
            max_total_time_minutes,
            max_detour_minutes,
        } => ExecutionPath::MultiStep(vec![
            PlanStep::Geocode {
                query: place.clone(),
            },
            PlanStep::EnrouteToAnchor {
                poi_type: *poi_type,
                transport: *transport,
                max_total_time_minutes: *max_total_time_minutes,
                max_detour_minutes: *max_detour_minutes,
            },
        ]),
        entities => ExecutionPath::Single(entities.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoscout_core::Location;

    fn query(entities: QueryEntities, complexity: Complexity) -> ClassifiedQuery {
        ClassifiedQuery::new(entities, complexity, 0.8, false, "test")
    }

    #[test]
    fn plain_queries_run_a_single_use_case() {
        let entities = QueryEntities::WithinTime {
            poi_type: PoiType::Cafe,
            time_minutes: 10,
            transport: TransportMode::Walking,
            cuisine: None,
            origin: None,
        };
        let path = plan_for(&query(entities.clone(), Complexity::Simple));
        assert_eq!(path, ExecutionPath::Single(entities));
    }

    #[test]
    fn coordinate_places_need_no_geocoding() {
        let destination = PlaceRef::Coordinates(Location::new(51.5, -0.1).unwrap());
        let entities = QueryEntities::Enroute {
            poi_type: PoiType::GasStation,
            destination,
            transport: TransportMode::Driving,
            max_total_time_minutes: 60,
            max_detour_minutes: 5,
        };
        assert!(matches!(
            plan_for(&query(entities, Complexity::Simple)),
            ExecutionPath::Single(_)
        ));
    }

    #[test]
    fn anchored_near_poi_becomes_nearest_then_near_poi() {
        let entities = QueryEntities::NearPoi {
            primary_type: PoiType::Cafe,
            secondary_type: PoiType::Park,
            transport: TransportMode::Walking,
            max_time_from_secondary_minutes: 10,
            cuisine: None,
        };
        let ExecutionPath::MultiStep(steps) = plan_for(&query(entities, Complexity::MultiStep))
        else {
            panic!("expected a multi-step plan");
        };
        assert_eq!(
            steps,
            vec![
                PlanStep::Nearest {
                    poi_type: PoiType::Park,
                    transport: TransportMode::Walking,
                    from: StepOrigin::User,
                },
                PlanStep::NearPoi {
                    primary_type: PoiType::Cafe,
                    secondary_type: PoiType::Park,
                    transport: TransportMode::Walking,
                    max_time_from_secondary_minutes: 10,
                    cuisine: None,
                },
            ]
        );
    }

    #[test]
    fn free_text_places_are_geocoded_first() {
        let entities = QueryEntities::Nearest {
            poi_type: PoiType::Atm,
            transport: TransportMode::Walking,
            origin: Some(PlaceRef::Text("Soho Square".to_owned())),
        };
        let ExecutionPath::MultiStep(steps) = plan_for(&query(entities, Complexity::MultiStep))
        else {
            panic!("expected a multi-step plan");
        };
        let names: Vec<_> = steps.iter().map(PlanStep::name).collect();
        assert_eq!(names, vec!["geocode", "nearest"]);
        assert_eq!(
            steps[0],
            PlanStep::Geocode {
                query: "Soho Square".to_owned()
            }
        );
    }
}
