//! Request entry point: classify, plan, execute, and normalise the outcome.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use geoscout_core::{
    Advisory, AppConfig, ClassifiedQuery, ConversationTurn, ExecutionMetadata, IntentKind,
    Location, PlaceRef, Poi, QueryContext, QueryEntities, UseCaseError, UseCaseOutput,
    UseCaseResult, UserPreferences,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classifier::QueryClassifier;
use crate::plan::{plan_for, ExecutionPath, PlanStep, StepOrigin};
use crate::services::Services;
use crate::tracker::{upstream_error, ExecutionTracker};
use crate::usecases::enroute::{enroute, EnrouteParams, EnrouteResult};
use crate::usecases::near_poi::{near_poi, near_poi_around, NearPoiParams, NearPoiResult};
use crate::usecases::nearest::{nearest, NearestParams, NearestResult, DEFAULT_MAX_ALTERNATIVES};
use crate::usecases::within_time::{within_time, WithinTimeParams, WithinTimeResult};
use crate::usecases::{DEFAULT_MAX_RESULTS, MAX_RESULTS_RANGE};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestrateRequest {
    pub query: String,
    pub user_id: String,
    #[serde(default)]
    pub user_location: Option<Location>,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
    /// Whether stored preferences may bias classification defaults.
    #[serde(default)]
    pub memory_enabled: bool,
    #[serde(default)]
    pub preferences: Option<UserPreferences>,
    #[serde(default)]
    pub last_classification: Option<ClassifiedQuery>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentUsed {
    /// Rejected before classification.
    None,
    Clarification,
    SingleStep,
    MultiStep,
}

/// Payload of a successful orchestration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryOutcome {
    WithinTime(WithinTimeResult),
    Nearest(NearestResult),
    NearPoi(NearPoiResult),
    Enroute(EnrouteResult),
    Clarification { question: String },
    /// A plan stopped because a step produced no anchor.
    Unresolved { step: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrchestrationResult {
    Success {
        data: QueryOutcome,
        metadata: ExecutionMetadata,
    },
    Error {
        error: UseCaseError,
    },
}

impl OrchestrationResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, OrchestrationResult::Success { .. })
    }
}

impl From<UseCaseResult<QueryOutcome>> for OrchestrationResult {
    fn from(result: UseCaseResult<QueryOutcome>) -> Self {
        match result {
            Ok(output) => OrchestrationResult::Success {
                data: output.data,
                metadata: output.metadata,
            },
            Err(error) => OrchestrationResult::Error { error },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationResponse {
    pub request_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassifiedQuery>,
    pub agent_used: AgentUsed,
    pub result: OrchestrationResult,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrchestratorSettings {
    /// Classifications below this confidence get a clarification question.
    pub low_confidence_threshold: f64,
    pub max_results: usize,
    pub max_alternatives: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            low_confidence_threshold: 0.5,
            max_results: DEFAULT_MAX_RESULTS,
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
        }
    }
}

impl OrchestratorSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            low_confidence_threshold: config.low_confidence_threshold,
            max_results: config
                .max_results
                .clamp(*MAX_RESULTS_RANGE.start(), *MAX_RESULTS_RANGE.end()),
            ..Self::default()
        }
    }
}

pub struct Orchestrator {
    services: Services,
    classifier: Arc<dyn QueryClassifier>,
    settings: OrchestratorSettings,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        services: Services,
        classifier: Arc<dyn QueryClassifier>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            services,
            classifier,
            settings,
        }
    }

    /// Handles one free-text request end to end.
    ///
    /// Never fails: validation problems, adapter errors and ambiguous
    /// queries are all reported through [`OrchestrationResponse::result`].
    pub async fn orchestrate(&self, request: OrchestrateRequest) -> OrchestrationResponse {
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        tracing::info!(%request_id, user_id = %request.user_id, "query received");

        let respond = |classification: Option<ClassifiedQuery>,
                       agent_used: AgentUsed,
                       result: OrchestrationResult| {
            let execution_time_ms =
                u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            match &result {
                OrchestrationResult::Success { metadata, .. } => tracing::info!(
                    %request_id,
                    agent = ?agent_used,
                    api_calls = metadata.api_calls_count,
                    execution_time_ms,
                    "query completed"
                ),
                OrchestrationResult::Error { error } => tracing::warn!(
                    %request_id,
                    agent = ?agent_used,
                    code = %error.code,
                    error = %error.message,
                    execution_time_ms,
                    "query failed"
                ),
            }
            OrchestrationResponse {
                request_id,
                classification,
                agent_used,
                result,
                execution_time_ms,
            }
        };

        if request.query.trim().is_empty() {
            let error = UseCaseError::validation("query must not be empty");
            return respond(None, AgentUsed::None, OrchestrationResult::Error { error });
        }
        if request.user_id.trim().is_empty() {
            let error = UseCaseError::validation("user_id must not be empty");
            return respond(None, AgentUsed::None, OrchestrationResult::Error { error });
        }

        let context = QueryContext {
            history: request.conversation_history,
            last_classification: request.last_classification,
            preferences: request.preferences.filter(|_| request.memory_enabled),
        };
        let classification = match self.classifier.classify(&request.query, &context).await {
            Ok(classification) => classification,
            Err(error) => {
                return respond(None, AgentUsed::None, OrchestrationResult::Error { error });
            }
        };
        tracing::info!(
            %request_id,
            intent = %classification.intent(),
            confidence = classification.confidence(),
            complexity = ?classification.complexity,
            "query classified"
        );

        let threshold = self.settings.low_confidence_threshold;
        if classification.intent() == IntentKind::Unknown
            || classification.is_low_confidence(threshold)
        {
            let result = clarify(&classification, threshold);
            return respond(Some(classification), AgentUsed::Clarification, result);
        }

        let location = request.user_location;
        let (agent_used, result) = match plan_for(&classification) {
            ExecutionPath::Single(entities) => (
                AgentUsed::SingleStep,
                self.run_single(entities, location).await,
            ),
            ExecutionPath::MultiStep(steps) => {
                (AgentUsed::MultiStep, self.run_plan(steps, location).await)
            }
        };
        respond(Some(classification), agent_used, result.into())
    }

    async fn run_single(
        &self,
        entities: QueryEntities,
        user_location: Option<Location>,
    ) -> UseCaseResult<QueryOutcome> {
        match entities {
            QueryEntities::WithinTime {
                poi_type,
                time_minutes,
                transport,
                cuisine,
                origin,
            } => {
                let location = start_location(origin, user_location)?;
                let mut params = WithinTimeParams::new(location, poi_type, time_minutes, transport);
                params.cuisine = cuisine;
                params.max_results = self.settings.max_results;
                Ok(within_time(&self.services, params)
                    .await?
                    .map(QueryOutcome::WithinTime))
            }
            QueryEntities::Nearest {
                poi_type,
                transport,
                origin,
            } => {
                let location = start_location(origin, user_location)?;
                let mut params = NearestParams::new(location, poi_type, transport);
                params.max_alternatives = self.settings.max_alternatives;
                Ok(nearest(&self.services, params)
                    .await?
                    .map(QueryOutcome::Nearest))
            }
            QueryEntities::NearPoi {
                primary_type,
                secondary_type,
                transport,
                max_time_from_secondary_minutes,
                cuisine,
            } => {
                let location = user_location.ok_or_else(missing_location)?;
                let mut params = NearPoiParams::new(
                    location,
                    primary_type,
                    secondary_type,
                    transport,
                    max_time_from_secondary_minutes,
                );
                params.cuisine = cuisine;
                params.max_results = self.settings.max_results;
                Ok(near_poi(&self.services, params)
                    .await?
                    .map(QueryOutcome::NearPoi))
            }
            QueryEntities::Enroute {
                poi_type,
                destination,
                transport,
                max_total_time_minutes,
                max_detour_minutes,
            } => {
                let location = user_location.ok_or_else(missing_location)?;
                let mut params = EnrouteParams::new(
                    location,
                    destination,
                    poi_type,
                    transport,
                    max_total_time_minutes,
                    max_detour_minutes,
                );
                params.max_results = self.settings.max_results;
                Ok(enroute(&self.services, params)
                    .await?
                    .map(QueryOutcome::Enroute))
            }
            QueryEntities::Unknown { .. } => Err(UseCaseError::validation(
                "cannot execute a query with unknown intent",
            )),
        }
    }

    /// Runs steps in order. Every step but the last must yield an anchor
    /// location for its successor; steps that find POIs also pass the
    /// anchor POI itself.
    #[allow(clippy::too_many_lines)]
    async fn run_plan(
        &self,
        steps: Vec<PlanStep>,
        user_location: Option<Location>,
    ) -> UseCaseResult<QueryOutcome> {
        let mut tracker = ExecutionTracker::start();
        let mut anchor: Option<Location> = None;
        let mut anchor_poi: Option<Poi> = None;
        let mut finished: Option<(QueryOutcome, Option<Advisory>)> = None;
        let last = steps.len().saturating_sub(1);

        for (idx, step) in steps.into_iter().enumerate() {
            let is_last = idx == last;
            let name = step.name();
            tracing::debug!(step = name, index = idx, "running plan step");

            let (outcome, advisory, next_anchor) = match step {
                PlanStep::Geocode { query } => {
                    tracker.record_call();
                    let found = self
                        .services
                        .geocoder
                        .geocode(&query)
                        .await
                        .map_err(|err| upstream_error("geocoding", &err))?;
                    let location = found.into_iter().next().ok_or_else(|| {
                        UseCaseError::validation(format!("\"{query}\" could not be located"))
                    })?;
                    (None, None, Some((location, None)))
                }
                PlanStep::Nearest {
                    poi_type,
                    transport,
                    from,
                } => {
                    let location = step_location(from, anchor.as_ref(), user_location.as_ref())?;
                    let mut params = NearestParams::new(location, poi_type, transport);
                    params.max_alternatives = self.settings.max_alternatives;
                    let output = nearest(&self.services, params).await?;
                    tracker.absorb(&output.metadata);
                    let next = output.data.nearest.as_ref().map(hand_over);
                    (
                        Some(QueryOutcome::Nearest(output.data)),
                        output.metadata.advisory,
                        next,
                    )
                }
                PlanStep::WithinTime {
                    poi_type,
                    time_minutes,
                    transport,
                    cuisine,
                    from,
                } => {
                    let location = step_location(from, anchor.as_ref(), user_location.as_ref())?;
                    let mut params =
                        WithinTimeParams::new(location, poi_type, time_minutes, transport);
                    params.cuisine = cuisine;
                    params.max_results = self.settings.max_results;
                    let output = within_time(&self.services, params).await?;
                    tracker.absorb(&output.metadata);
                    let next = output.data.pois.first().map(hand_over);
                    (
                        Some(QueryOutcome::WithinTime(output.data)),
                        output.metadata.advisory,
                        next,
                    )
                }
                PlanStep::NearPoi {
                    primary_type,
                    secondary_type,
                    transport,
                    max_time_from_secondary_minutes,
                    cuisine,
                } => {
                    let location = user_location.clone().ok_or_else(missing_location)?;
                    let anchor = anchor_poi
                        .clone()
                        .ok_or_else(|| UseCaseError::validation("plan step has no anchor POI"))?;
                    let mut params = NearPoiParams::new(
                        location,
                        primary_type,
                        secondary_type,
                        transport,
                        max_time_from_secondary_minutes,
                    );
                    params.cuisine = cuisine;
                    params.max_results = self.settings.max_results;
                    let output = near_poi_around(&self.services, params, anchor).await?;
                    tracker.absorb(&output.metadata);
                    let next = output.data.pois.first().map(hand_over);
                    (
                        Some(QueryOutcome::NearPoi(output.data)),
                        output.metadata.advisory,
                        next,
                    )
                }
                PlanStep::EnrouteToAnchor {
                    poi_type,
                    transport,
                    max_total_time_minutes,
                    max_detour_minutes,
                } => {
                    let location = user_location.clone().ok_or_else(missing_location)?;
                    let destination =
                        step_location(StepOrigin::Anchor, anchor.as_ref(), None)?;
                    let mut params = EnrouteParams::new(
                        location,
                        PlaceRef::Coordinates(destination),
                        poi_type,
                        transport,
                        max_total_time_minutes,
                        max_detour_minutes,
                    );
                    params.max_results = self.settings.max_results;
                    let output = enroute(&self.services, params).await?;
                    tracker.absorb(&output.metadata);
                    let next = output.data.pois.first().map(hand_over);
                    (
                        Some(QueryOutcome::Enroute(output.data)),
                        output.metadata.advisory,
                        next,
                    )
                }
            };

            if is_last {
                finished = outcome.map(|outcome| (outcome, advisory));
                break;
            }
            match next_anchor {
                Some((location, poi)) => {
                    anchor = Some(location);
                    anchor_poi = poi;
                }
                None => {
                    let reason = advisory.map_or_else(
                        || format!("{name} step produced no location to continue from"),
                        |a| a.message,
                    );
                    tracing::info!(step = name, %reason, "plan stopped early");
                    let advisory = Advisory::no_results(reason.clone());
                    return Ok(UseCaseOutput {
                        data: QueryOutcome::Unresolved {
                            step: name.to_owned(),
                            reason,
                        },
                        metadata: tracker.metadata(Some(advisory)),
                    });
                }
            }
        }

        let (data, advisory) = finished
            .ok_or_else(|| UseCaseError::validation("plan ended without a search step"))?;
        Ok(UseCaseOutput {
            data,
            metadata: tracker.metadata(advisory),
        })
    }
}

fn hand_over(poi: &Poi) -> (Location, Option<Poi>) {
    (poi.location.clone(), Some(poi.clone()))
}

fn missing_location() -> UseCaseError {
    UseCaseError::validation("user_location is required for this query")
}

/// Coordinates named in the query win over the user's own location.
fn start_location(
    origin: Option<PlaceRef>,
    user_location: Option<Location>,
) -> Result<Location, UseCaseError> {
    match origin {
        Some(PlaceRef::Coordinates(location)) => Ok(location),
        Some(PlaceRef::Text(text)) => Err(UseCaseError::validation(format!(
            "origin \"{text}\" must be geocoded before searching"
        ))),
        None => user_location.ok_or_else(missing_location),
    }
}

fn step_location(
    from: StepOrigin,
    anchor: Option<&Location>,
    user_location: Option<&Location>,
) -> Result<Location, UseCaseError> {
    match from {
        StepOrigin::User => user_location.cloned().ok_or_else(missing_location),
        StepOrigin::Anchor => anchor
            .cloned()
            .ok_or_else(|| UseCaseError::validation("plan step has no anchor location")),
    }
}

fn clarify(classification: &ClassifiedQuery, threshold: f64) -> OrchestrationResult {
    let question = match classification.entities.poi_type() {
        Some(poi_type) => format!(
            "Are you looking for the nearest {poi_type}, \
             or for every {poi_type} within a certain travel time?"
        ),
        None => "What kind of place are you looking for, and how far are you willing to travel?"
            .to_owned(),
    };
    let advisory = Advisory::low_confidence(format!(
        "classification confidence {:.2} is below {threshold:.2}",
        classification.confidence()
    ));
    OrchestrationResult::Success {
        data: QueryOutcome::Clarification { question },
        metadata: ExecutionMetadata {
            advisory: Some(advisory),
            ..ExecutionMetadata::default()
        },
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
