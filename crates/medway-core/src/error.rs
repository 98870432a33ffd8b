use thiserror::Error;

/// Top-level error type for the Medway system.
///
/// One variant per subsystem, plus `From` bridges for the library errors
/// that cross crate boundaries so the `?` operator works throughout.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MedwayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Classification error: {0}")]
    Classifier(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("Location error: {0}")]
    Location(String),

    #[error("Location permission denied")]
    LocationPermissionDenied,

    #[error("Positioning not supported on this platform")]
    PositioningUnsupported,

    #[error("Geocoding error: {0}")]
    Geocode(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("File error: {0}")]
    Files(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for MedwayError {
    fn from(err: toml::de::Error) -> Self {
        MedwayError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for MedwayError {
    fn from(err: toml::ser::Error) -> Self {
        MedwayError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MedwayError {
    fn from(err: serde_json::Error) -> Self {
        MedwayError::Serialization(err.to_string())
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MedwayError>;
