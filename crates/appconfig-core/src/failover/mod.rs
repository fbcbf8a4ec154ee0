//! Failover-aware client management
//!
//! - Trust validation for discovered replica hosts
//! - Per-endpoint exponential backoff
//! - Availability-ordered enumeration (static first, then discovered)
//! - Sync-token routing by endpoint host
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ConfigurationClientManager                                  │
//! │  ├── static_clients: Vec<Arc<ClientWrapper>>  (config order) │
//! │  ├── auto_failover_clients: ArcSwap<Vec<..>>  (discovery)    │
//! │  ├── validator: TrustedDomainValidator                       │
//! │  └── sync_tokens: DashMap<host, token>                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod backoff;
mod executor;
mod manager;
pub mod trust;
mod wrapper;


pub use backoff::{BackoffPolicy, BackoffState};
pub use executor::execute_with_failover;
pub use manager::{AvailableClients, ConfigurationClientManager};
pub use trust::{TrustedDomainValidator, TRUSTED_DOMAIN_ROOTS};
pub use wrapper::ClientWrapper;
