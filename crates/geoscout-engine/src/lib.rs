//! Query classification, orchestration and the four spatial use cases.
//!
//! The entry points are [`Orchestrator::orchestrate`] for free-text queries,
//! [`QueryClassifier::classify`] on its own, and the use cases
//! ([`within_time`], [`nearest`], [`near_poi`], [`enroute`]) for callers that
//! already hold structured parameters. Every external call goes through the
//! adapter traits bundled in [`Services`].

pub mod classifier;
pub mod orchestrator;
pub mod plan;
pub mod services;
pub mod usecases;

mod tracker;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{QueryClassifier, RuleBasedClassifier};
pub use orchestrator::{
    AgentUsed, OrchestrateRequest, OrchestrationResponse, OrchestrationResult, Orchestrator,
    OrchestratorSettings, QueryOutcome,
};
pub use plan::{plan_for, ExecutionPath, PlanStep, StepOrigin};
pub use services::Services;
pub use usecases::enroute::{enroute, EnrouteParams, EnrouteResult};
pub use usecases::near_poi::{
    near_poi, near_poi_around, DurationSource, NearPoiParams, NearPoiResult,
};
pub use usecases::nearest::{nearest, NearestParams, NearestResult};
pub use usecases::within_time::{within_time, Containment, WithinTimeParams, WithinTimeResult};
