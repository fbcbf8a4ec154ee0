use appconfig_types::{
    ConfigError, ConfigurationSetting, ConnectionString, Endpoint, SettingSelector, SettingsPage,
    StoreError,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, Response, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::auth::Credential;
use super::sync_token::SyncTokenStore;
use super::{ClientFactory, ConfigurationClient};

const API_VERSION: &str = "1.0";
const SYNC_TOKEN_HEADER: &str = "sync-token";
const KV_ACCEPT: &str = "application/vnd.microsoft.appconfig.kv+json, application/problem+json";
const KVSET_ACCEPT: &str =
    "application/vnd.microsoft.appconfig.kvset+json, application/problem+json";
/// Null-label filter value understood by the service.
const NULL_LABEL: &str = "\0";
const MAX_ERROR_BODY: usize = 512;

/// Build the shared HTTP client used by every endpoint handle.
pub fn build_http_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(Duration::from_secs(timeout_secs.max(5))).tcp_nodelay(true).build()
}

/// HTTP transport for one store endpoint.
#[derive(Debug)]
pub struct HttpConfigurationClient {
    http: Client,
    endpoint: Endpoint,
    credential: Arc<Credential>,
    sync_tokens: SyncTokenStore,
}

impl HttpConfigurationClient {
    pub fn new(http: Client, endpoint: Endpoint, credential: Arc<Credential>) -> Self {
        Self { http, endpoint, credential, sync_tokens: SyncTokenStore::new() }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn sync_tokens(&self) -> &SyncTokenStore {
        &self.sync_tokens
    }

    fn kv_url(&self, key: Option<&str>) -> Result<Url, StoreError> {
        let mut url = self.endpoint.url().clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| StoreError::Transport {
                endpoint: self.endpoint.to_string(),
                message: "endpoint cannot be a base URL".to_string(),
            })?;
            segments.pop_if_empty().push("kv");
            if let Some(key) = key {
                segments.push(key);
            }
        }
        url.set_query(None);
        Ok(url)
    }

    async fn send(&self, url: &Url, accept: &'static str) -> Result<Response, StoreError> {
        let mut headers = self.credential.sign("GET", url, b"", Utc::now())?;
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        if let Some(tokens) = self.sync_tokens.header_value() {
            if let Ok(value) = HeaderValue::from_str(&tokens) {
                headers.insert(SYNC_TOKEN_HEADER, value);
            }
        }

        let response =
            self.http.get(url.clone()).headers(headers).send().await.map_err(|e| {
                if e.is_timeout() {
                    StoreError::Timeout { endpoint: self.endpoint.to_string() }
                } else {
                    StoreError::Transport {
                        endpoint: self.endpoint.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        if let Some(raw) = response.headers().get(SYNC_TOKEN_HEADER).and_then(|v| v.to_str().ok())
        {
            if let Err(e) = self.sync_tokens.merge(raw) {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Ignoring malformed sync token from service");
            }
        }

        Ok(response)
    }

    async fn status_error(&self, response: Response) -> StoreError {
        let status = response.status();
        let mut message = response.text().await.unwrap_or_default();
        if message.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !message.is_char_boundary(cut) {
                cut -= 1;
            }
            message.truncate(cut);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            StoreError::AuthenticationFailed { endpoint: self.endpoint.to_string(), message }
        } else {
            StoreError::Status { endpoint: self.endpoint.to_string(), status: status.as_u16(), message }
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, StoreError> {
        response.json::<T>().await.map_err(|e| StoreError::InvalidResponse {
            endpoint: self.endpoint.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ConfigurationClient for HttpConfigurationClient {
    async fn get_setting(
        &self,
        key: &str,
        label: Option<&str>,
    ) -> Result<Option<ConfigurationSetting>, StoreError> {
        let mut url = self.kv_url(Some(key))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(label) = label {
                query.append_pair("label", label);
            }
            query.append_pair("api-version", API_VERSION);
        }

        let response = self.send(&url, KV_ACCEPT).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => self.decode(response).await.map(Some),
            _ => Err(self.status_error(response).await),
        }
    }

    async fn list_settings(
        &self,
        selector: &SettingSelector,
    ) -> Result<Vec<ConfigurationSetting>, StoreError> {
        let mut url = self.kv_url(None)?;
        url.query_pairs_mut()
            .append_pair("key", &selector.key_filter)
            .append_pair("label", selector.label_filter.as_deref().unwrap_or(NULL_LABEL))
            .append_pair("api-version", API_VERSION);

        let mut settings = Vec::new();
        let mut next = Some(url);
        while let Some(page_url) = next.take() {
            let response = self.send(&page_url, KVSET_ACCEPT).await?;
            if !response.status().is_success() {
                return Err(self.status_error(response).await);
            }
            let page: SettingsPage = self.decode(response).await?;
            settings.extend(page.items);

            if let Some(link) = page.next_link {
                next = Some(self.endpoint.url().join(&link).map_err(|e| {
                    StoreError::InvalidResponse {
                        endpoint: self.endpoint.to_string(),
                        message: format!("bad next link: {e}"),
                    }
                })?);
            }
        }

        tracing::debug!(endpoint = %self.endpoint, count = settings.len(), "Listed settings");
        Ok(settings)
    }

    fn update_sync_token(&self, token: &str) -> Result<(), StoreError> {
        self.sync_tokens.merge(token)
    }
}

/// Creates [`HttpConfigurationClient`]s, resolving credentials by origin host.
///
/// Discovered replicas share the credential of the origin they were
/// discovered from.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    http: Client,
    credentials: HashMap<String, Arc<Credential>>,
    fallback: Option<Arc<Credential>>,
}

impl HttpClientFactory {
    pub fn from_connection_strings(http: Client, connection_strings: &[ConnectionString]) -> Self {
        let credentials = connection_strings
            .iter()
            .map(|cs| (cs.endpoint.host().to_string(), Arc::new(Credential::from(cs))))
            .collect();
        Self { http, credentials, fallback: None }
    }

    /// One bearer token for every endpoint.
    pub fn with_bearer_token(http: Client, token: impl Into<String>) -> Self {
        Self {
            http,
            credentials: HashMap::new(),
            fallback: Some(Arc::new(Credential::Bearer(token.into()))),
        }
    }
}

impl ClientFactory for HttpClientFactory {
    fn create_client(
        &self,
        endpoint: &Endpoint,
        origin: &Endpoint,
    ) -> Result<Arc<dyn ConfigurationClient>, ConfigError> {
        let credential = self
            .credentials
            .get(origin.host())
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| ConfigError::MissingCredential { host: origin.host().to_string() })?;

        Ok(Arc::new(HttpConfigurationClient::new(self.http.clone(), endpoint.clone(), credential)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kv_url_encodes_key() {
        let client = HttpConfigurationClient::new(
            Client::new(),
            Endpoint::parse("https://contoso.azconfig.io").unwrap(),
            Arc::new(Credential::Bearer("t".to_string())),
        );
        let url = client.kv_url(Some("app/color settings")).unwrap();
        assert_eq!(url.as_str(), "https://contoso.azconfig.io/kv/app%2Fcolor%20settings");
        assert_eq!(client.kv_url(None).unwrap().as_str(), "https://contoso.azconfig.io/kv");
    }

    #[test]
    fn test_factory_uses_origin_credential() {
        let cs = ConnectionString::parse("Endpoint=https://contoso.azconfig.io;Id=x;Secret=YQ==")
            .unwrap();
        let factory = HttpClientFactory::from_connection_strings(Client::new(), &[cs]);
        let origin = Endpoint::parse("https://contoso.azconfig.io").unwrap();
        let replica = Endpoint::parse("https://contoso-westus.azconfig.io").unwrap();

        assert!(factory.create_client(&replica, &origin).is_ok());
        assert!(matches!(
            factory.create_client(&replica, &replica),
            Err(ConfigError::MissingCredential { .. })
        ));
    }
}
