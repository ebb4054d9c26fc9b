//! Common error types for UrbanSpot

use thiserror::Error;

/// Common result type for UrbanSpot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the UrbanSpot crates
#[derive(Error, Debug)]
pub enum Error {
    /// Local state database error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure before a response was received
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Backend record is missing required data (e.g. no identifier)
    #[error("Data quality error: {0}")]
    DataQuality(String),

    /// Operation requires an authenticated user
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Upload requested without an image
    #[error("No image selected")]
    MissingImage,

    /// Rating score outside 1..=10
    #[error("Invalid rating score {0} (must be between 1 and 10)")]
    InvalidScore(i64),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// True for errors raised before any request is issued
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::NotAuthenticated
                | Error::MissingImage
                | Error::InvalidScore(_)
                | Error::InvalidInput(_)
        )
    }

    /// HTTP status for backend errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
