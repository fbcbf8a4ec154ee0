//! Unified error types for AppConfig Core.

use appconfig_types::{ConfigError, StoreError};
use serde::Serialize;
use thiserror::Error;

/// Main error type for core operations that are not store calls.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Configuration or argument error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// HTTP client could not be built.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// DNS resolution failed during replica discovery.
    #[error("DNS error: {0}")]
    Dns(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for core operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<hickory_resolver::ResolveError> for AppError {
    fn from(e: hickory_resolver::ResolveError) -> Self {
        AppError::Dns(e.to_string())
    }
}
