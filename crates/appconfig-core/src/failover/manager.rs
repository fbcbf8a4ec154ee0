//! Availability-ordered client selection across static and discovered endpoints.

use appconfig_types::{ConfigError, Endpoint, FailoverOptions, StoreError};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backoff::BackoffPolicy;
use super::trust::TrustedDomainValidator;
use super::wrapper::ClientWrapper;
use crate::client::sync_token::SyncToken;
use crate::client::{ClientFactory, ConfigurationClient};
use crate::discovery::ReplicaResolver;
use crate::error::AppResult;
use crate::refresh::RefreshGate;
use crate::telemetry;

/// Owns every client wrapper and answers "which endpoint next?".
///
/// Static wrappers keep their configured order forever. Discovered
/// wrappers live in an immutable snapshot that discovery replaces
/// wholesale, so enumeration never observes a half-built list.
pub struct ConfigurationClientManager {
    origin: Option<Endpoint>,
    static_clients: Vec<Arc<ClientWrapper>>,
    auto_failover_clients: ArcSwap<Vec<Arc<ClientWrapper>>>,
    validator: TrustedDomainValidator,
    policy: BackoffPolicy,
    options: FailoverOptions,
    /// Last sync token applied per lower-cased host
    sync_tokens: DashMap<String, String>,
    factory: Option<Arc<dyn ClientFactory>>,
    resolver: Option<Arc<dyn ReplicaResolver>>,
    discovery_gate: RefreshGate,
    /// Unix millis after which the discovered list is considered stale
    discovery_due_ms: AtomicI64,
}

impl ConfigurationClientManager {
    /// Build wrappers for `endpoints` (priority order) through `factory`.
    pub fn new(
        endpoints: Vec<Endpoint>,
        factory: Arc<dyn ClientFactory>,
        options: FailoverOptions,
    ) -> Result<Self, ConfigError> {
        let clients = endpoints
            .into_iter()
            .map(|endpoint| {
                let client = factory.create_client(&endpoint, &endpoint)?;
                Ok((endpoint, client))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let mut manager = Self::from_clients(clients, options)?;
        manager.factory = Some(factory);
        Ok(manager)
    }

    /// Build from pre-bound endpoint/client pairs.
    pub fn from_clients(
        clients: Vec<(Endpoint, Arc<dyn ConfigurationClient>)>,
        options: FailoverOptions,
    ) -> Result<Self, ConfigError> {
        options.check()?;

        let origin = clients.first().map(|(endpoint, _)| endpoint.clone());
        let validator = origin
            .as_ref()
            .map_or_else(TrustedDomainValidator::reject_all, |o| {
                TrustedDomainValidator::for_origin(o.host())
            });

        if let Some(origin) = &origin {
            if options.replica_discovery_enabled && validator.trusted_suffix().is_none() {
                debug!(endpoint = %origin, "Origin is outside trusted domains, replicas will be ignored");
            }
        }

        let static_clients = clients
            .into_iter()
            .map(|(endpoint, client)| Arc::new(ClientWrapper::new(endpoint, client)))
            .collect();

        Ok(Self {
            origin,
            static_clients,
            auto_failover_clients: ArcSwap::from_pointee(Vec::new()),
            validator,
            policy: BackoffPolicy::from_options(&options),
            discovery_gate: RefreshGate::new(options.discovery_retry_interval()),
            options,
            sync_tokens: DashMap::new(),
            factory: None,
            resolver: None,
            discovery_due_ms: AtomicI64::new(i64::MIN),
        })
    }

    /// Factory used to build clients for discovered replicas.
    pub fn with_client_factory(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Discovery collaborator; only consulted when discovery is enabled.
    pub fn with_replica_resolver(mut self, resolver: Arc<dyn ReplicaResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn options(&self) -> &FailoverOptions {
        &self.options
    }

    /// Trusted root derived from the origin, `None` when discovery cannot be trusted.
    pub fn trusted_suffix(&self) -> Option<&'static str> {
        self.validator.trusted_suffix()
    }

    pub fn static_clients(&self) -> &[Arc<ClientWrapper>] {
        &self.static_clients
    }

    /// Current snapshot of the discovered wrappers.
    pub fn auto_failover_clients(&self) -> Arc<Vec<Arc<ClientWrapper>>> {
        self.auto_failover_clients.load_full()
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Lazily yield available wrappers: static ones first, then discovered
    /// ones, each in stable order. Backed-off wrappers are skipped and an
    /// empty sequence is a valid answer.
    pub fn available_clients(&self, cancel: &CancellationToken) -> AvailableClients<'_> {
        AvailableClients::new(self, None, cancel.clone())
    }

    /// [`available_clients`](Self::available_clients) evaluated at a fixed instant.
    pub fn available_clients_at(
        &self,
        now: Instant,
        cancel: &CancellationToken,
    ) -> AvailableClients<'_> {
        AvailableClients::new(self, Some(now), cancel.clone())
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// Record the outcome of an operation on `client`. Unknown handles
    /// (e.g. retired by discovery) are ignored.
    pub fn update_client_status(&self, client: &Arc<dyn ConfigurationClient>, successful: bool) {
        self.update_client_status_at(client, successful, Instant::now());
    }

    pub fn update_client_status_at(
        &self,
        client: &Arc<dyn ConfigurationClient>,
        successful: bool,
        now: Instant,
    ) {
        let Some(wrapper) = self.find_wrapper(|w| w.owns(client)) else {
            debug!("Status update for unknown client ignored");
            return;
        };

        if successful {
            wrapper.record_success(now);
        } else {
            let (attempts, backoff) = wrapper.record_failure(now, &self.policy);
            telemetry::record_endpoint_backoff(wrapper.endpoint().host());
            warn!(
                endpoint = %wrapper.endpoint(),
                failed_attempts = attempts,
                backoff_secs = backoff.as_secs(),
                "Endpoint marked unavailable"
            );
        }
    }

    /// Reverse lookup from a handle to its endpoint.
    pub fn endpoint_for_client(&self, client: &Arc<dyn ConfigurationClient>) -> Option<Endpoint> {
        self.find_wrapper(|w| w.owns(client)).map(|w| w.endpoint().clone())
    }

    // ========================================================================
    // Sync tokens
    // ========================================================================

    /// Apply `token` to the client whose host matches `endpoint`.
    ///
    /// Returns `Ok(false)` without touching any client when no wrapper
    /// matches. Other endpoints are not updated.
    pub fn update_sync_token(&self, endpoint: &Endpoint, token: &str) -> Result<bool, StoreError> {
        let Some(wrapper) = self.find_wrapper(|w| w.endpoint().host_matches(endpoint)) else {
            return Ok(false);
        };

        wrapper.client().update_sync_token(token)?;
        self.sync_tokens.insert(wrapper.endpoint().host().to_string(), token.to_string());
        debug!(endpoint = %wrapper.endpoint(), "Sync token applied");
        Ok(true)
    }

    /// Apply `token` to every current wrapper. Returns how many were updated.
    pub fn broadcast_sync_token(&self, token: &str) -> Result<usize, StoreError> {
        SyncToken::parse_list(token)?;

        let auto = self.auto_failover_clients.load();
        let mut updated = 0;
        for wrapper in self.static_clients.iter().chain(auto.iter()) {
            match wrapper.client().update_sync_token(token) {
                Ok(()) => {
                    self.sync_tokens.insert(wrapper.endpoint().host().to_string(), token.to_string());
                    updated += 1;
                },
                Err(e) => {
                    warn!(endpoint = %wrapper.endpoint(), error = %e, "Sync token broadcast failed");
                },
            }
        }
        Ok(updated)
    }

    /// Last token applied for the endpoint's host.
    pub fn sync_token_for(&self, endpoint: &Endpoint) -> Option<String> {
        self.sync_tokens.get(endpoint.host()).map(|t| t.value().clone())
    }

    // ========================================================================
    // Replica discovery
    // ========================================================================

    /// Replace the discovered wrappers from a list of candidate hosts.
    ///
    /// Untrusted hosts, hosts already configured statically and duplicates
    /// are dropped silently and do not count against `max_replicas`.
    /// Wrappers for hosts that were already known are reused so their
    /// backoff state survives. Returns the new list length.
    pub fn apply_discovered_replicas(&self, candidates: &[String]) -> usize {
        let Some(origin) = &self.origin else {
            return 0;
        };

        let current = self.auto_failover_clients.load_full();
        let mut seen: HashSet<String> =
            self.static_clients.iter().map(|w| w.endpoint().host().to_string()).collect();
        let mut next = Vec::new();

        for candidate in candidates {
            if next.len() >= self.options.max_replicas {
                break;
            }
            if !self.validator.is_trusted(candidate) {
                debug!(candidate = %candidate, "Dropping untrusted replica");
                continue;
            }
            let endpoint = match Endpoint::from_host(candidate) {
                Ok(endpoint) => endpoint,
                Err(e) => {
                    debug!(candidate = %candidate, error = %e, "Dropping malformed replica");
                    continue;
                },
            };
            if !seen.insert(endpoint.host().to_string()) {
                continue;
            }

            if let Some(existing) = current.iter().find(|w| w.endpoint().host_matches(&endpoint)) {
                next.push(Arc::clone(existing));
                continue;
            }

            if let Some(wrapper) = self.build_replica(&endpoint, origin) {
                next.push(wrapper);
            }
        }

        let count = next.len();
        self.auto_failover_clients.store(Arc::new(next));
        telemetry::update_discovered_replicas_gauge(origin.host(), count);
        info!(origin = %origin, replicas = count, "Auto-failover endpoints updated");
        count
    }

    /// Resolve replicas for the origin now and swap them in.
    pub async fn refresh_auto_failover_clients(&self) -> AppResult<usize> {
        let (Some(origin), Some(resolver)) = (&self.origin, &self.resolver) else {
            return Ok(self.auto_failover_clients.load().len());
        };
        if !self.options.replica_discovery_enabled || self.validator.trusted_suffix().is_none() {
            return Ok(self.auto_failover_clients.load().len());
        }

        let candidates = resolver.resolve_replicas(origin.host(), self.options.max_replicas).await?;

        let refresh_ms =
            i64::try_from(self.options.discovery_refresh_interval().as_millis()).unwrap_or(i64::MAX);
        self.discovery_due_ms
            .store(Utc::now().timestamp_millis().saturating_add(refresh_ms), Ordering::Release);
        Ok(self.apply_discovered_replicas(&candidates))
    }

    /// Start a detached discovery pass when the replica list is stale.
    ///
    /// Never waits for DNS. Attempts are spaced by the discovery retry
    /// interval even when they fail. Returns whether a pass was spawned.
    pub fn schedule_replica_discovery(self: &Arc<Self>) -> bool {
        self.schedule_replica_discovery_at(Utc::now())
    }

    pub fn schedule_replica_discovery_at(self: &Arc<Self>, now: DateTime<Utc>) -> bool {
        if !self.options.replica_discovery_enabled
            || self.resolver.is_none()
            || self.validator.trusted_suffix().is_none()
        {
            return false;
        }

        if now.timestamp_millis() < self.discovery_due_ms.load(Ordering::Acquire) {
            return false;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return false;
        };
        if !self.discovery_gate.try_enter(now) {
            return false;
        }

        let manager = Arc::clone(self);
        handle.spawn(async move {
            if let Err(e) = manager.refresh_auto_failover_clients().await {
                warn!(error = %e, "Replica discovery failed");
            }
        });
        true
    }

    fn build_replica(&self, endpoint: &Endpoint, origin: &Endpoint) -> Option<Arc<ClientWrapper>> {
        let Some(factory) = &self.factory else {
            debug!(endpoint = %endpoint, "No client factory, replica skipped");
            return None;
        };

        let client = match factory.create_client(endpoint, origin) {
            Ok(client) => client,
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Failed to create replica client");
                return None;
            },
        };

        if let Some(token) = self.sync_tokens.get(endpoint.host()) {
            if let Err(e) = client.update_sync_token(token.value()) {
                debug!(endpoint = %endpoint, error = %e, "Known sync token not applied to replica");
            }
        }

        Some(Arc::new(ClientWrapper::new(endpoint.clone(), client)))
    }

    fn find_wrapper(
        &self,
        pred: impl Fn(&Arc<ClientWrapper>) -> bool,
    ) -> Option<Arc<ClientWrapper>> {
        if let Some(w) = self.static_clients.iter().find(|w| pred(*w)) {
            return Some(Arc::clone(w));
        }
        self.auto_failover_clients.load().iter().find(|w| pred(*w)).cloned()
    }
}

impl fmt::Debug for ConfigurationClientManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationClientManager")
            .field("origin", &self.origin.as_ref().map(Endpoint::host))
            .field("static_clients", &self.static_clients)
            .field("auto_failover_clients", &self.auto_failover_clients.load().len())
            .field("trusted_suffix", &self.validator.trusted_suffix())
            .finish_non_exhaustive()
    }
}

/// Lazy, single-pass enumeration returned by
/// [`ConfigurationClientManager::available_clients`].
pub struct AvailableClients<'a> {
    static_clients: std::slice::Iter<'a, Arc<ClientWrapper>>,
    auto_failover_clients: Arc<Vec<Arc<ClientWrapper>>>,
    auto_index: usize,
    now: Option<Instant>,
    cancel: CancellationToken,
    done: bool,
}

impl<'a> AvailableClients<'a> {
    fn new(
        manager: &'a ConfigurationClientManager,
        now: Option<Instant>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            static_clients: manager.static_clients.iter(),
            auto_failover_clients: manager.auto_failover_clients.load_full(),
            auto_index: 0,
            now,
            cancel,
            done: false,
        }
    }

    fn now(&self) -> Instant {
        self.now.unwrap_or_else(Instant::now)
    }
}

impl Iterator for AvailableClients<'_> {
    type Item = Arc<ClientWrapper>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.cancel.is_cancelled() {
                self.done = true;
                return None;
            }

            let wrapper = if let Some(w) = self.static_clients.next() {
                Arc::clone(w)
            } else if let Some(w) = self.auto_failover_clients.get(self.auto_index) {
                self.auto_index += 1;
                Arc::clone(w)
            } else {
                self.done = true;
                return None;
            };

            if wrapper.is_available_at(self.now()) {
                return Some(wrapper);
            }
            debug!(endpoint = %wrapper.endpoint(), "Skipping backed-off endpoint");
        }
    }
}

impl std::iter::FusedIterator for AvailableClients<'_> {}
