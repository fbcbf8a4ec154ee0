//! Typed error definitions for AppConfig Failover.
//!
//! This module provides a structured error hierarchy with specific error types
//! for different domains. All errors are designed to be:
//!
//! - **Serializable** for diagnostics via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for failover decisions via enum variants

mod config;
mod store;

pub use config::ConfigError;
pub use store::{EndpointFailure, StoreError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type that wraps all domain-specific errors.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "domain", content = "error")]
pub enum TypedError {
    /// Wraps a configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Wraps a store operation error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Standard Result type using TypedError.
pub type Result<T> = std::result::Result<T, TypedError>;
