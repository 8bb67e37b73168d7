use apod_api::ApodApiError;
use apod_cache::CacheError;
use thiserror::Error;

/// All the ways things can go wrong in the explorer
#[derive(Error, Debug)]
pub enum Error {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("No entry found for {0}")]
    NotFound(String),

    #[error("Rate limit exceeded. Try again later or configure your own API key")]
    RateLimitExceeded,

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Invalid date format: {0}. Use YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Date out of range: {0}")]
    DateOutOfRange(String),

    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },

    #[error("Cache operation failed: {0}")]
    CacheError(String),

    #[error("Storage operation failed: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<ApodApiError> for Error {
    fn from(err: ApodApiError) -> Self {
        match err {
            ApodApiError::NotFound(what) => Error::NotFound(what),
            ApodApiError::RateLimitExceeded => Error::RateLimitExceeded,
            ApodApiError::AuthRequired(msg) => Error::AuthError(msg),
            other => Error::ApiError(other.to_string()),
        }
    }
}

impl From<CacheError> for Error {
    fn from(err: CacheError) -> Self {
        Error::CacheError(err.to_string())
    }
}
