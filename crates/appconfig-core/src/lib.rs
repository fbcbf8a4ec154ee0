//! # AppConfig Core
//!
//! Failover-aware client management for a configuration store that is
//! replicated across regions.
//!
//! ## Layout
//!
//! ```text
//! appconfig-core/src/
//! ├── client/      # HTTP transport, HMAC auth, sync tokens
//! ├── discovery/   # DNS SRV replica lookup
//! ├── failover/    # trust validation, backoff, client manager, executor
//! ├── refresh/     # debounced background refresh
//! ├── config.rs    # config file + environment loading
//! └── telemetry.rs # failover counters and gauges
//! ```
//!
//! Callers build a [`ConfigurationClientManager`], then run each store
//! operation through [`execute_with_failover`], which walks the available
//! endpoints in order and records their health.

#![allow(
    clippy::redundant_else,
    reason = "Explicit else blocks improve readability in complex control flow"
)]
#![allow(clippy::needless_continue, reason = "Explicit continue improves loop readability")]
#![allow(
    clippy::derive_partial_eq_without_eq,
    reason = "Some types intentionally don't implement Eq"
)]
// Test-only lints: allow panic!, float comparisons, etc. in test code
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::float_cmp,
        clippy::needless_collect,
        clippy::assertions_on_result_states
    )
)]

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod failover;
pub mod refresh;
pub mod telemetry;

// Re-export commonly used types
pub use client::{ClientFactory, ConfigurationClient, HttpClientFactory, HttpConfigurationClient};
pub use config::{build_client_manager, load_config, StoreSource};
pub use discovery::{ReplicaResolver, SrvReplicaResolver, StaticReplicaResolver};
pub use error::{AppError, AppResult};
pub use failover::{execute_with_failover, ClientWrapper, ConfigurationClientManager};
pub use refresh::{RefreshGate, RefreshTrigger, Refresher, SettingsSnapshot, SnapshotRefresher};
