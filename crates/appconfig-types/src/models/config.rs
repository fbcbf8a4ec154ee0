//! Client, failover and refresh configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use super::SettingSelector;
use crate::error::ConfigError;

// ============================================================================
// Failover
// ============================================================================

/// Failover, backoff and replica discovery tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct FailoverOptions {
    /// Discover replica endpoints through DNS
    #[serde(default = "default_true")]
    pub replica_discovery_enabled: bool,
    /// Backoff after the first failure, in seconds (at most one day)
    #[validate(range(min = 1, max = 86_400))]
    #[serde(default = "default_min_backoff")]
    pub min_backoff_secs: u64,
    /// Ceiling for the exponential backoff, in seconds (at most one day)
    #[validate(range(min = 1, max = 86_400))]
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
    /// Relative jitter applied from the second failure onwards
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,
    /// How long a discovered replica list stays fresh, in seconds (at most a week)
    #[validate(range(min = 1, max = 604_800))]
    #[serde(default = "default_discovery_refresh")]
    pub discovery_refresh_interval_secs: u64,
    /// Minimum spacing between discovery attempts, in seconds (at most a day)
    #[validate(range(min = 1, max = 86_400))]
    #[serde(default = "default_discovery_retry")]
    pub discovery_retry_interval_secs: u64,
    /// Maximum number of replicas taken from one discovery pass
    #[validate(range(max = 64))]
    #[serde(default = "default_max_replicas")]
    pub max_replicas: usize,
}

fn default_true() -> bool {
    true
}

fn default_min_backoff() -> u64 {
    30
}

fn default_max_backoff() -> u64 {
    600
}

fn default_jitter_ratio() -> f64 {
    0.25
}

fn default_discovery_refresh() -> u64 {
    3600
}

fn default_discovery_retry() -> u64 {
    30
}

fn default_max_replicas() -> usize {
    20
}

impl Default for FailoverOptions {
    fn default() -> Self {
        Self {
            replica_discovery_enabled: default_true(),
            min_backoff_secs: default_min_backoff(),
            max_backoff_secs: default_max_backoff(),
            jitter_ratio: default_jitter_ratio(),
            discovery_refresh_interval_secs: default_discovery_refresh(),
            discovery_retry_interval_secs: default_discovery_retry(),
            max_replicas: default_max_replicas(),
        }
    }
}

impl FailoverOptions {
    pub fn min_backoff(&self) -> Duration {
        Duration::from_secs(self.min_backoff_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    pub fn discovery_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.discovery_refresh_interval_secs)
    }

    pub fn discovery_retry_interval(&self) -> Duration {
        Duration::from_secs(self.discovery_retry_interval_secs)
    }

    /// Field validation plus the cross-field `min <= max` rule.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| ConfigError::from_validation(&e))?;
        if self.min_backoff_secs > self.max_backoff_secs {
            return Err(ConfigError::ValidationError {
                field: "min_backoff_secs".to_string(),
                message: format!(
                    "min backoff {}s exceeds max backoff {}s",
                    self.min_backoff_secs, self.max_backoff_secs
                ),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Refresh
// ============================================================================

/// Background refresh debounce settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct RefreshOptions {
    /// Minimum spacing between two background refresh triggers, in seconds (at most a day)
    #[validate(range(min = 1, max = 86_400))]
    #[serde(default = "default_refresh_interval")]
    pub min_interval_secs: u64,
}

fn default_refresh_interval() -> u64 {
    30
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self { min_interval_secs: default_refresh_interval() }
    }
}

impl RefreshOptions {
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }
}

// ============================================================================
// Client
// ============================================================================

/// Top-level client configuration as loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, Validate)]
pub struct ClientConfig {
    /// Endpoints in priority order (token-based authentication)
    #[serde(default)]
    pub endpoints: Vec<String>,
    /// Connection strings in priority order (access-key authentication)
    #[serde(default)]
    pub connection_strings: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub failover: FailoverOptions,
    #[serde(default)]
    #[validate(nested)]
    pub refresh: RefreshOptions,
    /// Settings to load and keep refreshed
    #[serde(default)]
    pub selectors: Vec<SettingSelector>,
}

impl ClientConfig {
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| ConfigError::from_validation(&e))?;
        self.failover.check()?;
        if !self.endpoints.is_empty() && !self.connection_strings.is_empty() {
            return Err(ConfigError::ValidationError {
                field: "endpoints".to_string(),
                message: "use either endpoints or connection_strings, not both".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = FailoverOptions::default();
        assert!(opts.replica_discovery_enabled);
        assert_eq!(opts.min_backoff(), Duration::from_secs(30));
        assert_eq!(opts.max_backoff(), Duration::from_secs(600));
        assert!(opts.check().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg: ClientConfig =
            serde_json::from_str(r#"{"endpoints": ["https://a.azconfig.io"], "failover": {"min_backoff_secs": 5}}"#)
                .unwrap();
        assert_eq!(cfg.failover.min_backoff_secs, 5);
        assert_eq!(cfg.failover.max_backoff_secs, 600);
        assert_eq!(cfg.refresh.min_interval_secs, 30);
        assert!(cfg.check().is_ok());
    }

    #[test]
    fn test_min_above_max_rejected() {
        let opts = FailoverOptions { min_backoff_secs: 900, ..FailoverOptions::default() };
        assert!(matches!(opts.check(), Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_unbounded_intervals_rejected() {
        let backoff = FailoverOptions {
            min_backoff_secs: u64::MAX,
            max_backoff_secs: u64::MAX,
            ..FailoverOptions::default()
        };
        assert!(matches!(backoff.check(), Err(ConfigError::ValidationError { .. })));

        let discovery =
            FailoverOptions { discovery_retry_interval_secs: 86_401, ..FailoverOptions::default() };
        assert!(discovery.check().is_err());

        let cfg = ClientConfig {
            refresh: RefreshOptions { min_interval_secs: u64::MAX / 1000 },
            ..ClientConfig::default()
        };
        assert!(cfg.check().is_err());

        let day = FailoverOptions {
            min_backoff_secs: 86_400,
            max_backoff_secs: 86_400,
            ..FailoverOptions::default()
        };
        assert!(day.check().is_ok());
    }

    #[test]
    fn test_jitter_out_of_range_rejected() {
        let opts = FailoverOptions { jitter_ratio: 1.5, ..FailoverOptions::default() };
        assert!(opts.check().is_err());
    }

    #[test]
    fn test_endpoints_and_connection_strings_exclusive() {
        let cfg = ClientConfig {
            endpoints: vec!["https://a.azconfig.io".to_string()],
            connection_strings: vec!["Endpoint=https://a.azconfig.io;Id=x;Secret=YQ==".to_string()],
            ..ClientConfig::default()
        };
        assert!(cfg.check().is_err());
    }
}
