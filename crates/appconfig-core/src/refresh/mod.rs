//! Background refresh triggering.
//!
//! Request paths call [`RefreshTrigger::trigger`]; at most one call per
//! interval wins the [`RefreshGate`] and spawns every registered refresher
//! on its own detached task. The caller never waits for the outcome.

mod gate;
mod snapshot;

pub use gate::RefreshGate;
pub use snapshot::{SettingsSnapshot, SnapshotRefresher};

use appconfig_types::{RefreshOptions, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// One independently configured data source that can reload itself.
#[async_trait]
pub trait Refresher: Send + Sync {
    fn name(&self) -> &str;

    async fn refresh(&self) -> Result<(), StoreError>;
}

/// Fans a debounced trigger out to every registered refresher.
pub struct RefreshTrigger {
    gate: Arc<RefreshGate>,
    refreshers: Vec<Arc<dyn Refresher>>,
}

impl RefreshTrigger {
    pub fn new(gate: Arc<RefreshGate>) -> Self {
        Self { gate, refreshers: Vec::new() }
    }

    pub fn from_options(options: &RefreshOptions) -> Self {
        Self::new(Arc::new(RefreshGate::new(options.min_interval())))
    }

    pub fn register(&mut self, refresher: Arc<dyn Refresher>) {
        self.refreshers.push(refresher);
    }

    pub fn gate(&self) -> &Arc<RefreshGate> {
        &self.gate
    }

    /// Spawn a refresh of every source if this call wins the gate.
    pub fn trigger(&self) -> bool {
        self.trigger_at(Utc::now())
    }

    pub fn trigger_at(&self, now: DateTime<Utc>) -> bool {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("No tokio runtime, refresh trigger skipped");
            return false;
        };
        if !self.gate.try_enter(now) {
            return false;
        }

        for refresher in &self.refreshers {
            handle.spawn(run_refresh(Arc::clone(refresher)));
        }
        debug!(count = self.refreshers.len(), "Background refresh triggered");
        true
    }
}

/// Body of a detached refresh task; owns nothing but the refresher.
async fn run_refresh(refresher: Arc<dyn Refresher>) {
    match refresher.refresh().await {
        Ok(()) => debug!(refresher = refresher.name(), "Refresh completed"),
        Err(e) => warn!(refresher = refresher.name(), error = %e, "Background refresh failed"),
    }
}
