//! Store endpoint model.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::ConfigError;

/// One regional network address of the configuration store.
///
/// Always an absolute `http`/`https` URL with a host. The host is kept
/// lower-cased so comparisons ignore case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    url: Url,
    host: String,
}

impl Endpoint {
    /// Parse an endpoint URL such as `https://contoso.azconfig.io`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::invalid_argument("endpoint", "must not be empty"));
        }

        let url = Url::parse(trimmed)
            .map_err(|e| ConfigError::invalid_argument("endpoint", e.to_string()))?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::invalid_argument(
                "endpoint",
                format!("unsupported scheme {}", url.scheme()),
            ));
        }

        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.to_ascii_lowercase(),
            _ => return Err(ConfigError::invalid_argument("endpoint", "missing host")),
        };

        Ok(Self { url, host })
    }

    /// Build an `https` endpoint for a bare host name (discovered replicas).
    pub fn from_host(host: &str) -> Result<Self, ConfigError> {
        let host = host.trim().trim_end_matches('.');
        if host.is_empty() {
            return Err(ConfigError::invalid_argument("host", "must not be empty"));
        }
        Self::parse(&format!("https://{host}"))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Lower-cased host name.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Case-insensitive host comparison ignoring scheme, port and path.
    pub fn host_matches(&self, other: &Endpoint) -> bool {
        self.host == other.host
    }

    /// Endpoint with no trailing slash, used as a base for request paths.
    pub fn base(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base())
    }
}

impl TryFrom<String> for Endpoint {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Endpoint> for String {
    fn from(value: Endpoint) -> Self {
        value.base().to_string()
    }
}

impl std::str::FromStr for Endpoint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_host_is_lowercased() {
        let ep = Endpoint::parse("https://Contoso.AZConfig.io").unwrap();
        assert_eq!(ep.host(), "contoso.azconfig.io");
        assert_eq!(ep.to_string(), "https://contoso.azconfig.io");
    }

    #[test]
    fn test_host_matches_ignores_scheme_port_and_path() {
        let a = Endpoint::parse("https://contoso.azconfig.io").unwrap();
        let b = Endpoint::parse("http://CONTOSO.azconfig.io:8080/kv").unwrap();
        let c = Endpoint::parse("https://fabrikam.azconfig.io").unwrap();
        assert!(a.host_matches(&b));
        assert!(!a.host_matches(&c));
    }

    #[test]
    fn test_rejects_empty_and_hostless() {
        assert!(matches!(Endpoint::parse("   "), Err(ConfigError::InvalidArgument { .. })));
        assert!(Endpoint::parse("ftp://contoso.azconfig.io").is_err());
        assert!(Endpoint::parse("not a url").is_err());
        assert!(Endpoint::from_host("").is_err());
    }

    #[test]
    fn test_from_host_strips_dns_root() {
        let ep = Endpoint::from_host("contoso-eus.azconfig.io.").unwrap();
        assert_eq!(ep.host(), "contoso-eus.azconfig.io");
        assert_eq!(ep.url().scheme(), "https");
    }

    #[test]
    fn test_serde_as_string() {
        let ep = Endpoint::parse("https://contoso.azconfig.io").unwrap();
        let json = serde_json::to_string(&ep).unwrap();
        assert_eq!(json, "\"https://contoso.azconfig.io\"");
        let back: Endpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ep);
    }
}
