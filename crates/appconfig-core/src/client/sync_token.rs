//! Sync-token bookkeeping for read-your-writes across replicas.
//!
//! Wire format of the `Sync-Token` header: `id=value;sn=N`, several tokens
//! separated by commas. Requests echo the tokens back as `id=value`.

use appconfig_types::StoreError;
use parking_lot::Mutex;
use std::collections::HashMap;

/// One parsed consistency checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncToken {
    pub id: String,
    pub value: String,
    pub sequence: i64,
}

impl SyncToken {
    /// Parse a single `id=value;sn=N` token.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let raw = raw.trim();
        let (id_value, sn) = raw
            .split_once(';')
            .ok_or_else(|| invalid(format!("missing sequence number in '{raw}'")))?;

        let (id, value) =
            id_value.split_once('=').ok_or_else(|| invalid(format!("missing '=' in '{raw}'")))?;
        if id.trim().is_empty() {
            return Err(invalid("empty token id".to_string()));
        }

        let sequence = sn
            .trim()
            .strip_prefix("sn=")
            .and_then(|n| n.parse::<i64>().ok())
            .ok_or_else(|| invalid(format!("bad sequence number in '{raw}'")))?;

        Ok(Self { id: id.trim().to_string(), value: value.trim().to_string(), sequence })
    }

    /// Parse a comma-separated list of tokens.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, StoreError> {
        raw.split(',').filter(|s| !s.trim().is_empty()).map(Self::parse).collect()
    }
}

fn invalid(message: String) -> StoreError {
    StoreError::InvalidSyncToken { message }
}

/// Latest token per id, keeping the highest sequence number seen.
#[derive(Debug, Default)]
pub struct SyncTokenStore {
    tokens: Mutex<HashMap<String, SyncToken>>,
}

impl SyncTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a header value into the store. Nothing is applied when any
    /// token in the list is malformed.
    pub fn merge(&self, raw: &str) -> Result<(), StoreError> {
        let parsed = SyncToken::parse_list(raw)?;
        let mut tokens = self.tokens.lock();
        for token in parsed {
            match tokens.get(&token.id) {
                Some(existing) if existing.sequence >= token.sequence => {},
                _ => {
                    tokens.insert(token.id.clone(), token);
                },
            }
        }
        Ok(())
    }

    /// Request header value, `None` when no token has been observed.
    pub fn header_value(&self) -> Option<String> {
        let tokens = self.tokens.lock();
        if tokens.is_empty() {
            return None;
        }
        let mut parts: Vec<String> =
            tokens.values().map(|t| format!("{}={}", t.id, t.value)).collect();
        parts.sort();
        Some(parts.join(","))
    }

    pub fn get(&self, id: &str) -> Option<SyncToken> {
        self.tokens.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.lock().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_with_padded_value() {
        let token = SyncToken::parse("jtqGc1I4=MDoyOA==;sn=28").unwrap();
        assert_eq!(token.id, "jtqGc1I4");
        assert_eq!(token.value, "MDoyOA==");
        assert_eq!(token.sequence, 28);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(SyncToken::parse("no-sequence").is_err());
        assert!(SyncToken::parse("id=value;seq=1").is_err());
        assert!(SyncToken::parse("=value;sn=1").is_err());
        assert!(SyncToken::parse("id=value;sn=abc").is_err());
    }

    #[test]
    fn test_merge_keeps_highest_sequence() {
        let store = SyncTokenStore::new();
        store.merge("a=v2;sn=2").unwrap();
        store.merge("a=v1;sn=1").unwrap();
        assert_eq!(store.get("a").unwrap().value, "v2");

        store.merge("a=v3;sn=3,b=w1;sn=1").unwrap();
        assert_eq!(store.get("a").unwrap().value, "v3");
        assert_eq!(store.header_value().as_deref(), Some("a=v3,b=w1"));
    }

    #[test]
    fn test_malformed_list_applies_nothing() {
        let store = SyncTokenStore::new();
        assert!(store.merge("a=v1;sn=1,broken").is_err());
        assert!(store.is_empty());
        assert!(store.header_value().is_none());
    }
}
