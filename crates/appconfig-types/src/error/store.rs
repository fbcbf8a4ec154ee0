//! Store-operation errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Last failure observed for one endpoint during a failover pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointFailure {
    pub endpoint: String,
    pub message: String,
}

/// Errors that can occur while talking to a configuration store endpoint.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum StoreError {
    /// Endpoint answered with a non-success HTTP status
    #[error("Endpoint {endpoint} returned {status}: {message}")]
    Status { endpoint: String, status: u16, message: String },

    /// Connection-level failure (DNS, TLS, reset)
    #[error("Transport error for {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    /// Request timed out
    #[error("Request to {endpoint} timed out")]
    Timeout { endpoint: String },

    /// Authentication rejected or could not be produced
    #[error("Authentication failed for {endpoint}: {message}")]
    AuthenticationFailed { endpoint: String, message: String },

    /// Response body could not be decoded
    #[error("Invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    /// Sync token did not match `id=value;sn=N`
    #[error("Invalid sync token: {message}")]
    InvalidSyncToken { message: String },

    /// Every endpoint was backed off or failed
    #[error("No available endpoint ({} failed){}", .failures.len(), last_failure_suffix(.failures))]
    NoAvailableEndpoint { failures: Vec<EndpointFailure> },

    /// Caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,
}

fn last_failure_suffix(failures: &[EndpointFailure]) -> String {
    failures
        .last()
        .map(|f| format!(", last: {} ({})", f.message, f.endpoint))
        .unwrap_or_default()
}

impl StoreError {
    /// Check if this error should move the caller on to the next endpoint
    /// and put the current one into backoff.
    pub fn is_failover_candidate(&self) -> bool {
        match self {
            Self::Status { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            },
            Self::Transport { .. } | Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Endpoint the error is attributed to, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Status { endpoint, .. }
            | Self::Transport { endpoint, .. }
            | Self::Timeout { endpoint }
            | Self::AuthenticationFailed { endpoint, .. }
            | Self::InvalidResponse { endpoint, .. } => Some(endpoint),
            _ => None,
        }
    }
}
