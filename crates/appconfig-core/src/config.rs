//! Client configuration loading and manager assembly.

use appconfig_types::{ClientConfig, ConfigError, ConnectionString, Endpoint};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::client::{build_http_client, ClientFactory, HttpClientFactory};
use crate::discovery::SrvReplicaResolver;
use crate::error::AppResult;
use crate::failover::ConfigurationClientManager;
use crate::telemetry;

/// Overrides the configured endpoints with a single endpoint.
pub const APPCONFIG_ENDPOINT: &str = "APPCONFIG_ENDPOINT";
/// Overrides the configured endpoints with a single connection string.
pub const APPCONFIG_CONNECTION_STRING: &str = "APPCONFIG_CONNECTION_STRING";

const HTTP_TIMEOUT_SECS: u64 = 30;

/// Load and validate a JSON client config.
pub fn load_config(path: &Path) -> AppResult<ClientConfig> {
    if !path.exists() {
        return Err(ConfigError::NotFound { path: path.display().to_string() }.into());
    }

    let content = fs::read_to_string(path)?;
    let config: ClientConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::from_json_error(&e))?;
    config.check()?;

    tracing::info!(
        path = %path.display(),
        endpoints = config.endpoints.len(),
        connection_strings = config.connection_strings.len(),
        "Client config loaded"
    );
    Ok(config)
}

/// Where the static endpoints come from, in priority order.
#[derive(Debug, Clone)]
pub enum StoreSource {
    Endpoints(Vec<Endpoint>),
    ConnectionStrings(Vec<ConnectionString>),
}

impl StoreSource {
    pub fn endpoints(&self) -> Vec<Endpoint> {
        match self {
            Self::Endpoints(endpoints) => endpoints.clone(),
            Self::ConnectionStrings(strings) => {
                strings.iter().map(|cs| cs.endpoint.clone()).collect()
            },
        }
    }
}

/// Resolve the static endpoints, letting the environment override the file.
pub fn resolve_sources(config: &ClientConfig) -> Result<StoreSource, ConfigError> {
    resolve_sources_with(config, |name| std::env::var(name).ok())
}

pub fn resolve_sources_with(
    config: &ClientConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<StoreSource, ConfigError> {
    if let Some(raw) = env(APPCONFIG_CONNECTION_STRING) {
        match ConnectionString::parse(raw.trim()) {
            Ok(cs) => {
                tracing::info!(endpoint = %cs.endpoint, "Using connection string from environment");
                return Ok(StoreSource::ConnectionStrings(vec![cs]));
            },
            Err(e) => {
                tracing::warn!(error = %e, "APPCONFIG_CONNECTION_STRING is invalid, using config file");
            },
        }
    }

    if let Some(raw) = env(APPCONFIG_ENDPOINT) {
        let raw = raw.trim();
        if raw.is_empty() {
            tracing::warn!("APPCONFIG_ENDPOINT is empty, using config file");
        } else {
            match Endpoint::parse(raw) {
                Ok(endpoint) => {
                    tracing::info!(endpoint = %endpoint, "Using endpoint from environment");
                    return Ok(StoreSource::Endpoints(vec![endpoint]));
                },
                Err(e) => {
                    tracing::warn!(error = %e, "APPCONFIG_ENDPOINT is invalid, using config file");
                },
            }
        }
    }

    if !config.connection_strings.is_empty() {
        let strings = config
            .connection_strings
            .iter()
            .map(|raw| ConnectionString::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(StoreSource::ConnectionStrings(strings));
    }

    if config.endpoints.is_empty() {
        return Err(ConfigError::invalid_argument(
            "endpoints",
            "at least one endpoint or connection string is required",
        ));
    }
    let endpoints =
        config.endpoints.iter().map(|raw| Endpoint::parse(raw)).collect::<Result<Vec<_>, _>>()?;
    Ok(StoreSource::Endpoints(endpoints))
}

/// Assemble a manager for `config`.
///
/// Connection strings carry their own access keys; plain endpoints need a
/// bearer token. SRV discovery is attached when enabled.
pub fn build_client_manager(
    config: &ClientConfig,
    bearer_token: Option<String>,
) -> AppResult<Arc<ConfigurationClientManager>> {
    let source = resolve_sources(config)?;
    build_client_manager_for(config, source, bearer_token)
}

pub fn build_client_manager_for(
    config: &ClientConfig,
    source: StoreSource,
    bearer_token: Option<String>,
) -> AppResult<Arc<ConfigurationClientManager>> {
    telemetry::describe_metrics();
    let http = build_http_client(HTTP_TIMEOUT_SECS)?;

    let endpoints = source.endpoints();
    let factory: Arc<dyn ClientFactory> = match (&source, bearer_token) {
        (StoreSource::ConnectionStrings(strings), _) => {
            Arc::new(HttpClientFactory::from_connection_strings(http, strings))
        },
        (StoreSource::Endpoints(_), Some(token)) => {
            Arc::new(HttpClientFactory::with_bearer_token(http, token))
        },
        (StoreSource::Endpoints(endpoints), None) => {
            let host = endpoints.first().map(|e| e.host().to_string()).unwrap_or_default();
            return Err(ConfigError::MissingCredential { host }.into());
        },
    };

    let mut manager = ConfigurationClientManager::new(endpoints, factory, config.failover.clone())?;
    if config.failover.replica_discovery_enabled {
        match SrvReplicaResolver::from_system_conf() {
            Ok(resolver) => manager = manager.with_replica_resolver(Arc::new(resolver)),
            Err(e) => tracing::warn!(error = %e, "DNS resolver unavailable, replica discovery disabled"),
        }
    }

    Ok(Arc::new(manager))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |name| map.get(name).cloned()
    }

    fn file_config() -> ClientConfig {
        ClientConfig {
            endpoints: vec![
                "https://contoso.azconfig.io".to_string(),
                "https://contoso-east.azconfig.io".to_string(),
            ],
            ..ClientConfig::default()
        }
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_load_config_parses_and_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"endpoints": ["https://contoso.azconfig.io"], "failover": {{"max_replicas": 3}}}}"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.failover.max_replicas, 3);
    }

    #[test]
    fn test_load_config_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_load_config_rejects_unbounded_intervals() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"endpoints": ["https://contoso.azconfig.io"], "failover": {{"max_backoff_secs": 18446744073709551615}}}}"#
        )
        .unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_sources_from_file_keep_order() {
        let source = resolve_sources_with(&file_config(), env_from(&[])).unwrap();
        let hosts: Vec<_> = source.endpoints().iter().map(|e| e.host().to_string()).collect();
        assert_eq!(hosts, vec!["contoso.azconfig.io", "contoso-east.azconfig.io"]);
    }

    #[test]
    fn test_env_endpoint_overrides_file() {
        let env = env_from(&[(APPCONFIG_ENDPOINT, " https://fabrikam.azconfig.io ")]);
        let source = resolve_sources_with(&file_config(), env).unwrap();
        assert!(matches!(&source, StoreSource::Endpoints(e) if e.len() == 1));
        assert_eq!(source.endpoints()[0].host(), "fabrikam.azconfig.io");
    }

    #[test]
    fn test_invalid_env_falls_back_to_file() {
        let env = env_from(&[(APPCONFIG_ENDPOINT, "not a url"), (APPCONFIG_CONNECTION_STRING, "")]);
        let source = resolve_sources_with(&file_config(), env).unwrap();
        assert_eq!(source.endpoints().len(), 2);
    }

    #[test]
    fn test_env_connection_string_wins() {
        let env = env_from(&[
            (APPCONFIG_ENDPOINT, "https://fabrikam.azconfig.io"),
            (APPCONFIG_CONNECTION_STRING, "Endpoint=https://cs.azconfig.io;Id=abc;Secret=c2VjcmV0"),
        ]);
        let source = resolve_sources_with(&file_config(), env).unwrap();
        assert!(matches!(source, StoreSource::ConnectionStrings(_)));
        assert_eq!(source.endpoints()[0].host(), "cs.azconfig.io");
    }

    #[test]
    fn test_empty_config_rejected() {
        let err = resolve_sources_with(&ClientConfig::default(), env_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArgument { .. }));
    }

    #[test]
    fn test_endpoints_without_token_need_credential() {
        let config = ClientConfig {
            failover: appconfig_types::FailoverOptions {
                replica_discovery_enabled: false,
                ..Default::default()
            },
            ..file_config()
        };
        let source = resolve_sources_with(&config, env_from(&[])).unwrap();
        let err = build_client_manager_for(&config, source.clone(), None).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::MissingCredential { .. })));

        let manager =
            build_client_manager_for(&config, source, Some("token".to_string())).unwrap();
        assert_eq!(manager.static_clients().len(), 2);
        assert_eq!(manager.trusted_suffix(), Some("azconfig.io"));
    }
}
