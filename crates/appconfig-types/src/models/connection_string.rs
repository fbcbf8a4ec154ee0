//! Access-key connection strings (`Endpoint=..;Id=..;Secret=..`).

use base64::Engine;
use std::fmt;

use super::Endpoint;
use crate::error::ConfigError;

/// Parsed store connection string.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub endpoint: Endpoint,
    pub id: String,
    secret: Vec<u8>,
}

impl ConnectionString {
    /// Parse `Endpoint=https://x.azconfig.io;Id=abc;Secret=base64`.
    ///
    /// Keys are case-insensitive and all three are required.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut endpoint = None;
        let mut id = None;
        let mut secret = None;

        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let Some((key, value)) = segment.split_once('=') else {
                return Err(ConfigError::ParseError {
                    message: format!("connection string segment without '=': {segment}"),
                });
            };
            match key.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value.trim()),
                "id" => id = Some(value.trim()),
                "secret" => secret = Some(value.trim()),
                _ => {},
            }
        }

        let endpoint = Endpoint::parse(endpoint.ok_or_else(|| missing("Endpoint"))?)?;
        let id = id.filter(|s| !s.is_empty()).ok_or_else(|| missing("Id"))?.to_string();
        let secret = base64::engine::general_purpose::STANDARD
            .decode(secret.ok_or_else(|| missing("Secret"))?)
            .map_err(|e| ConfigError::ParseError {
                message: format!("connection string Secret is not base64: {e}"),
            })?;

        Ok(Self { endpoint, id, secret })
    }

    /// Decoded HMAC key.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

fn missing(key: &str) -> ConfigError {
    ConfigError::ParseError { message: format!("connection string is missing {key}") }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("endpoint", &self.endpoint)
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl std::str::FromStr for ConnectionString {
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
    fn test_parse_valid() {
        let cs = ConnectionString::parse(
            "Endpoint=https://contoso.azconfig.io;Id=abc-l0-s0:xyz;Secret=c2VjcmV0",
        )
        .unwrap();
        assert_eq!(cs.endpoint.host(), "contoso.azconfig.io");
        assert_eq!(cs.id, "abc-l0-s0:xyz");
        assert_eq!(cs.secret(), b"secret");
    }

    #[test]
    fn test_keys_case_insensitive() {
        let cs =
            ConnectionString::parse("endpoint=https://a.azconfig.io;ID=x;SECRET=YQ==").unwrap();
        assert_eq!(cs.id, "x");
    }

    #[test]
    fn test_missing_parts() {
        assert!(ConnectionString::parse("Endpoint=https://a.azconfig.io;Id=x").is_err());
        assert!(ConnectionString::parse("Id=x;Secret=YQ==").is_err());
        assert!(ConnectionString::parse("Endpoint=https://a.azconfig.io;Secret=YQ==").is_err());
        assert!(ConnectionString::parse("Endpoint=https://a.azconfig.io;Id=x;Secret=***").is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let cs = ConnectionString::parse("Endpoint=https://a.azconfig.io;Id=x;Secret=YQ==").unwrap();
        let dbg = format!("{cs:?}");
        assert!(dbg.contains("redacted"));
        assert!(!dbg.contains("YQ=="));
    }
}
