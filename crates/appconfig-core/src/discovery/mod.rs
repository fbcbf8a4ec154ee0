//! Replica discovery collaborators.

mod srv;

pub use srv::SrvReplicaResolver;

use async_trait::async_trait;

use crate::error::AppResult;

/// Resolves candidate replica hosts for an origin host.
///
/// Results are untrusted; the manager validates every candidate.
#[async_trait]
pub trait ReplicaResolver: Send + Sync {
    async fn resolve_replicas(&self, origin_host: &str, max_replicas: usize)
        -> AppResult<Vec<String>>;
}

/// Fixed replica list, for deployments that pin replicas in config.
#[derive(Debug, Clone, Default)]
pub struct StaticReplicaResolver {
    replicas: Vec<String>,
}

impl StaticReplicaResolver {
    pub fn new(replicas: Vec<String>) -> Self {
        Self { replicas }
    }
}

#[async_trait]
impl ReplicaResolver for StaticReplicaResolver {
    async fn resolve_replicas(
        &self,
        _origin_host: &str,
        max_replicas: usize,
    ) -> AppResult<Vec<String>> {
        Ok(self.replicas.iter().take(max_replicas).cloned().collect())
    }
}
