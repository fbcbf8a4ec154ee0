//! Request authentication: HMAC-SHA256 access keys or bearer tokens.

use appconfig_types::{ConnectionString, StoreError};
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const SIGNED_HEADERS: &str = "x-ms-date;host;x-ms-content-sha256";

/// Credential attached to every request of a client.
#[derive(Clone)]
pub enum Credential {
    /// Access key from a connection string
    AccessKey { id: String, secret: Vec<u8> },
    /// Pre-acquired bearer token
    Bearer(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessKey { id, .. } => f.debug_struct("AccessKey").field("id", id).finish(),
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
        }
    }
}

impl From<&ConnectionString> for Credential {
    fn from(cs: &ConnectionString) -> Self {
        Self::AccessKey { id: cs.id.clone(), secret: cs.secret().to_vec() }
    }
}

impl Credential {
    /// Build the authentication headers for one request.
    pub(crate) fn sign(
        &self,
        method: &str,
        url: &Url,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();
        match self {
            Self::Bearer(token) => {
                headers.insert(AUTHORIZATION, header_value(url, &format!("Bearer {token}"))?);
            },
            Self::AccessKey { id, secret } => {
                let date = now.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
                let content_hash = base64::engine::general_purpose::STANDARD
                    .encode(Sha256::digest(body));
                let string_to_sign = format!(
                    "{}\n{}\n{};{};{}",
                    method.to_ascii_uppercase(),
                    path_and_query(url),
                    date,
                    host_header(url),
                    content_hash
                );

                let mut mac = HmacSha256::new_from_slice(secret).map_err(|e| {
                    StoreError::AuthenticationFailed {
                        endpoint: url.origin().ascii_serialization(),
                        message: e.to_string(),
                    }
                })?;
                mac.update(string_to_sign.as_bytes());
                let signature =
                    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

                headers.insert(HeaderName::from_static("x-ms-date"), header_value(url, &date)?);
                headers.insert(
                    HeaderName::from_static("x-ms-content-sha256"),
                    header_value(url, &content_hash)?,
                );
                headers.insert(
                    AUTHORIZATION,
                    header_value(
                        url,
                        &format!(
                            "HMAC-SHA256 Credential={id}&SignedHeaders={SIGNED_HEADERS}&Signature={signature}"
                        ),
                    )?,
                );
            },
        }
        Ok(headers)
    }
}

fn header_value(url: &Url, value: &str) -> Result<HeaderValue, StoreError> {
    HeaderValue::from_str(value).map_err(|e| StoreError::AuthenticationFailed {
        endpoint: url.origin().ascii_serialization(),
        message: e.to_string(),
    })
}

fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    }
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_hmac_headers_present() {
        let cred = Credential::AccessKey { id: "key-id".to_string(), secret: b"secret".to_vec() };
        let url = Url::parse("https://contoso.azconfig.io/kv/app?label=prod&api-version=1.0")
            .unwrap();
        let headers = cred.sign("get", &url, b"", fixed_now()).unwrap();

        assert_eq!(headers.get("x-ms-date").unwrap(), "Wed, 01 May 2024 10:00:00 GMT");
        // sha256 of the empty body
        assert_eq!(
            headers.get("x-ms-content-sha256").unwrap(),
            "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
        let auth = headers.get(AUTHORIZATION).unwrap().to_str().unwrap();
        assert!(auth.starts_with("HMAC-SHA256 Credential=key-id&SignedHeaders="));
        assert!(auth.contains("&Signature="));
    }

    #[test]
    fn test_signature_is_deterministic_and_url_bound() {
        let cred = Credential::AccessKey { id: "k".to_string(), secret: b"s".to_vec() };
        let a = Url::parse("https://contoso.azconfig.io/kv/a").unwrap();
        let b = Url::parse("https://contoso.azconfig.io/kv/b").unwrap();

        let sig = |url: &Url| {
            cred.sign("GET", url, b"", fixed_now())
                .unwrap()
                .get(AUTHORIZATION)
                .unwrap()
                .to_str()
                .unwrap()
                .to_string()
        };
        assert_eq!(sig(&a), sig(&a));
        assert_ne!(sig(&a), sig(&b));
    }

    #[test]
    fn test_bearer() {
        let cred = Credential::Bearer("tok".to_string());
        let url = Url::parse("https://contoso.azconfig.io/kv").unwrap();
        let headers = cred.sign("GET", &url, b"", fixed_now()).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
        assert!(headers.get("x-ms-date").is_none());
        assert_eq!(format!("{cred:?}"), "Bearer(<redacted>)");
    }

    #[test]
    fn test_host_header_keeps_explicit_port() {
        let url = Url::parse("http://127.0.0.1:8080/kv").unwrap();
        assert_eq!(host_header(&url), "127.0.0.1:8080");
        assert_eq!(path_and_query(&url), "/kv");
    }
}
