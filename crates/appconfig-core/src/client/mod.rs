//! Transport capabilities - one client handle per store endpoint.

mod auth;
mod http;
pub mod sync_token;

pub use auth::Credential;
pub use http::{build_http_client, HttpClientFactory, HttpConfigurationClient};
pub use sync_token::{SyncToken, SyncTokenStore};

use appconfig_types::{ConfigError, ConfigurationSetting, Endpoint, SettingSelector, StoreError};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Store operations bound to exactly one endpoint.
#[async_trait]
pub trait ConfigurationClient: Send + Sync + fmt::Debug {
    /// Fetch one key. `Ok(None)` when the key does not exist.
    async fn get_setting(
        &self,
        key: &str,
        label: Option<&str>,
    ) -> Result<Option<ConfigurationSetting>, StoreError>;

    /// List every setting matching the selector, following pagination.
    async fn list_settings(
        &self,
        selector: &SettingSelector,
    ) -> Result<Vec<ConfigurationSetting>, StoreError>;

    /// Make later requests observe at least this consistency checkpoint.
    fn update_sync_token(&self, token: &str) -> Result<(), StoreError>;
}

/// Builds client handles for static and discovered endpoints.
pub trait ClientFactory: Send + Sync {
    /// `origin` is the configured endpoint the new one was derived from
    /// (itself for static endpoints); credentials are looked up by origin.
    fn create_client(
        &self,
        endpoint: &Endpoint,
        origin: &Endpoint,
    ) -> Result<Arc<dyn ConfigurationClient>, ConfigError>;
}
