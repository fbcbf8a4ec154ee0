//! Core domain models for AppConfig Failover.

mod config;
mod connection_string;
mod endpoint;
mod setting;

// Re-export all models
pub use config::{ClientConfig, FailoverOptions, RefreshOptions};
pub use connection_string::ConnectionString;
pub use endpoint::Endpoint;
pub use setting::{ConfigurationSetting, SettingSelector, SettingsPage};
