//! External service access for geoscout.
//!
//! Every adapter call goes through a [`ResilientCaller`]: rate-limit admission
//! first, then retry with exponential back-off on transient failures. The
//! adapter traits in [`ports`] are what the use-case engine depends on; the
//! HTTP implementations (Nominatim, Overpass, OpenRouteService, OSRM) are
//! interchangeable behind them.

pub mod error;
pub mod nominatim;
pub mod openroute;
pub mod osrm;
pub mod overpass;
pub mod ports;
pub mod rate_limit;
pub mod resilient;
pub mod retry;
pub mod unconfigured;

mod geojson;
mod http;

pub use error::ServiceError;
pub use http::HttpSettings;
pub use nominatim::NominatimGeocoder;
pub use openroute::OpenRouteServiceClient;
pub use osrm::OsrmRouter;
pub use overpass::OverpassPoiSource;
pub use ports::{Geocoder, IsochroneProvider, PoiSource, Router};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use resilient::ResilientCaller;
pub use retry::{with_retry, with_retry_if, RetryAttempt, RetryPolicy};
pub use unconfigured::UnavailableIsochrones;
