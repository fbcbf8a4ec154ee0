//! # AppConfig Types
//!
//! Core types, models, and error definitions for AppConfig Failover.
//!
//! - **`error`** - Typed error hierarchy for configuration and store operations
//! - **`models`** - Domain models (Endpoint, ConnectionString, settings, options)
//!
//! ## Architecture Role
//!
//! `appconfig-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!        appconfig-types (this crate)
//!                 │
//!                 ▼
//!          appconfig-core
//! ```

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{ConfigError, EndpointFailure, Result, StoreError, TypedError};

// Re-export core model types
pub use models::{
    ClientConfig, ConfigurationSetting, ConnectionString, Endpoint, FailoverOptions,
    RefreshOptions, SettingSelector, SettingsPage,
};
