use appconfig_types::{ConfigurationSetting, SettingSelector, StoreError};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::Refresher;
use crate::failover::{execute_with_failover, ConfigurationClientManager};

/// Immutable view of the loaded settings, keyed by (key, label).
#[derive(Debug, Clone, Default)]
pub struct SettingsSnapshot {
    settings: HashMap<(String, Option<String>), ConfigurationSetting>,
    loaded_at: Option<DateTime<Utc>>,
}

impl SettingsSnapshot {
    pub fn get(&self, key: &str, label: Option<&str>) -> Option<&ConfigurationSetting> {
        self.settings.get(&(key.to_string(), label.map(str::to_string)))
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigurationSetting> {
        self.settings.values()
    }
}

/// Reloads a set of selectors through the failover manager and swaps the
/// result in atomically. Later selectors win on duplicate (key, label).
pub struct SnapshotRefresher {
    name: String,
    manager: Arc<ConfigurationClientManager>,
    selectors: Vec<SettingSelector>,
    snapshot: ArcSwap<SettingsSnapshot>,
    cancel: CancellationToken,
}

impl SnapshotRefresher {
    pub fn new(
        name: impl Into<String>,
        manager: Arc<ConfigurationClientManager>,
        selectors: Vec<SettingSelector>,
    ) -> Self {
        let selectors = if selectors.is_empty() { vec![SettingSelector::default()] } else { selectors };
        Self {
            name: name.into(),
            manager,
            selectors,
            snapshot: ArcSwap::from_pointee(SettingsSnapshot::default()),
            cancel: CancellationToken::new(),
        }
    }

    /// Latest loaded settings.
    pub fn snapshot(&self) -> Arc<SettingsSnapshot> {
        self.snapshot.load_full()
    }

    /// Stops in-flight and future refreshes.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl Refresher for SnapshotRefresher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn refresh(&self) -> Result<(), StoreError> {
        let mut settings = HashMap::new();

        for selector in &self.selectors {
            let items = execute_with_failover(&self.manager, &self.cancel, |client| {
                let selector = selector.clone();
                async move { client.list_settings(&selector).await }
            })
            .await?;

            for item in items {
                settings.insert((item.key.clone(), item.label.clone()), item);
            }
        }

        let count = settings.len();
        let previous = self.snapshot.swap(Arc::new(SettingsSnapshot {
            settings,
            loaded_at: Some(Utc::now()),
        }));
        if previous.len() != count {
            tracing::info!(refresher = %self.name, settings = count, "Settings snapshot reloaded");
        }
        Ok(())
    }
}
