//! Key-value records as returned by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single key-value record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConfigurationSetting {
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// One page of a key-value listing.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsPage {
    #[serde(default)]
    pub items: Vec<ConfigurationSetting>,
    #[serde(rename = "@nextLink", default)]
    pub next_link: Option<String>,
}

/// Key/label filter for listing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SettingSelector {
    /// Key filter, `*` suffix wildcards allowed
    #[serde(default = "default_key_filter")]
    pub key_filter: String,
    /// Label filter; `None` selects the null label
    #[serde(default)]
    pub label_filter: Option<String>,
}

fn default_key_filter() -> String {
    "*".to_string()
}

impl Default for SettingSelector {
    fn default() -> Self {
        Self { key_filter: default_key_filter(), label_filter: None }
    }
}

impl SettingSelector {
    pub fn new(key_filter: impl Into<String>, label_filter: Option<String>) -> Self {
        Self { key_filter: key_filter.into(), label_filter }
    }
}
