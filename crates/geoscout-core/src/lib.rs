//! Domain model shared by every geoscout crate.
//!
//! Holds the value types that flow between the classifier, the orchestrator,
//! the use-case engine and the external service adapters, plus the geometry
//! helpers the use cases need and the environment-driven [`AppConfig`].

pub mod app_config;
pub mod classification;
pub mod config;
pub mod error;
pub mod geometry;
pub mod isochrone;
pub mod location;
pub mod poi;
pub mod result;
pub mod route;
pub mod transport;

pub use app_config::{AppConfig, Environment};
pub use classification::{
    ClassifiedQuery, Complexity, ConversationRole, ConversationTurn, IntentKind, PlaceRef,
    QueryContext, QueryEntities, UserPreferences,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, GeoError};
pub use isochrone::{Isochrone, IsochronePolygon};
pub use location::{haversine_m, BoundingBox, Location};
pub use poi::{Poi, PoiFilters, PoiType, SearchArea};
pub use result::{
    Advisory, ErrorCode, ExecutionMetadata, UseCaseError, UseCaseOutput, UseCaseResult,
};
pub use route::{RouteStep, RouteSummary, TravelMatrix};
pub use transport::TransportMode;
