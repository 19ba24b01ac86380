use thiserror::Error;

/// Input validation failures for the domain value types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),

    #[error("unsupported transport mode \"{0}\"")]
    UnknownTransport(String),

    #[error("unsupported POI type \"{0}\"")]
    UnknownPoiType(String),

    #[error("invalid coordinate pair \"{0}\" (expected \"lat,lng\")")]
    InvalidCoordinatePair(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
