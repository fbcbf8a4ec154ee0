use appconfig_types::Endpoint;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::backoff::{BackoffPolicy, BackoffState};
use crate::client::ConfigurationClient;

/// One endpoint, its client handle and its backoff state.
pub struct ClientWrapper {
    endpoint: Endpoint,
    client: Arc<dyn ConfigurationClient>,
    backoff: Mutex<BackoffState>,
}

impl ClientWrapper {
    pub fn new(endpoint: Endpoint, client: Arc<dyn ConfigurationClient>) -> Self {
        Self { endpoint, client, backoff: Mutex::new(BackoffState::new(Instant::now())) }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn client(&self) -> &Arc<dyn ConfigurationClient> {
        &self.client
    }

    /// Whether `client` is this wrapper's handle (pointer identity).
    pub fn owns(&self, client: &Arc<dyn ConfigurationClient>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.client), Arc::as_ptr(client))
    }

    /// Consistent copy of the backoff fields.
    pub fn backoff(&self) -> BackoffState {
        *self.backoff.lock()
    }

    pub fn is_available_at(&self, now: Instant) -> bool {
        self.backoff.lock().is_available(now)
    }

    pub(crate) fn record_success(&self, now: Instant) {
        self.backoff.lock().record_success(now);
    }

    pub(crate) fn record_failure(&self, now: Instant, policy: &BackoffPolicy) -> (u32, Duration) {
        let mut backoff = self.backoff.lock();
        let applied = backoff.record_failure(now, policy);
        (backoff.failed_attempts(), applied)
    }
}

impl fmt::Debug for ClientWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backoff = self.backoff();
        f.debug_struct("ClientWrapper")
            .field("endpoint", &self.endpoint.host())
            .field("failed_attempts", &backoff.failed_attempts())
            .finish_non_exhaustive()
    }
}
