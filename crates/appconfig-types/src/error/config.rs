//! Configuration-related errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while building endpoints, options or clients.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ConfigError {
    /// Config file not found at expected path
    #[error("Config not found: {path}")]
    NotFound {
        /// Filesystem path where config was expected
        path: String,
    },

    /// Config file or connection string parse error
    #[error("Config parse error: {message}")]
    ParseError {
        /// Description of the parse failure
        message: String,
    },

    /// Config validation error (invalid values)
    #[error("Config validation error for {field}: {message}")]
    ValidationError {
        /// Name of the field that failed validation
        field: String,
        /// Description of the validation failure
        message: String,
    },

    /// A required argument was empty or malformed
    #[error("Invalid argument {name}: {message}")]
    InvalidArgument {
        /// Name of the offending argument
        name: String,
        /// Description of the violation
        message: String,
    },

    /// No credential is known for an endpoint
    #[error("No credential configured for {host}")]
    MissingCredential {
        /// Host of the endpoint that needs a credential
        host: String,
    },
}

impl ConfigError {
    /// Create a parse error from a serde_json error.
    pub fn from_json_error(e: &serde_json::Error) -> Self {
        Self::ParseError { message: e.to_string() }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(name: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument { name: name.to_string(), message: message.into() }
    }

    /// Flatten validator output into the first offending field.
    pub fn from_validation(errors: &validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map_or_else(|| "unknown".to_string(), |k| k.to_string());
        Self::ValidationError { field, message: errors.to_string() }
    }
}
