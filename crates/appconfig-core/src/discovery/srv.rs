//! DNS SRV based replica discovery.
//!
//! `_origin._tcp.{host}` names the origin store; its replicas are published
//! as `_alt0._tcp.{origin}`, `_alt1._tcp.{origin}`, ... until a name has no
//! records.

use async_trait::async_trait;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::Resolver;
use std::sync::Arc;
use tracing::debug;

use super::ReplicaResolver;
use crate::error::AppResult;

const ORIGIN_PREFIX: &str = "_origin._tcp";
const ALT_PREFIX: &str = "_alt";
const TCP_LABEL: &str = "_tcp";

pub struct SrvReplicaResolver {
    resolver: Arc<Resolver<TokioConnectionProvider>>,
}

impl SrvReplicaResolver {
    /// Resolver configured from the host's system settings.
    pub fn from_system_conf() -> AppResult<Self> {
        let resolver = Resolver::builder_tokio()?.build();
        Ok(Self { resolver: Arc::new(resolver) })
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        let resolver =
            Resolver::builder_with_config(config, TokioConnectionProvider::default()).build();
        Self { resolver: Arc::new(resolver) }
    }

    /// SRV targets for `name` by priority, empty on NXDOMAIN or any error.
    async fn targets(&self, name: &str) -> Vec<String> {
        match self.resolver.srv_lookup(name).await {
            Ok(lookup) => {
                let mut records: Vec<_> = lookup
                    .iter()
                    .map(|srv| {
                        (srv.priority(), srv.weight(), srv.target().to_utf8())
                    })
                    .collect();
                records.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
                records
                    .into_iter()
                    .map(|(_, _, target)| target.trim_end_matches('.').to_string())
                    .filter(|target| !target.is_empty())
                    .collect()
            },
            Err(e) => {
                debug!(name = %name, error = %e, "SRV lookup returned no records");
                Vec::new()
            },
        }
    }
}

#[async_trait]
impl ReplicaResolver for SrvReplicaResolver {
    async fn resolve_replicas(
        &self,
        origin_host: &str,
        max_replicas: usize,
    ) -> AppResult<Vec<String>> {
        let Some(origin) =
            self.targets(&format!("{ORIGIN_PREFIX}.{origin_host}")).await.into_iter().next()
        else {
            debug!(origin = %origin_host, "No origin SRV record, no replicas");
            return Ok(Vec::new());
        };

        let mut replicas = Vec::new();
        let mut index = 0usize;
        while replicas.len() < max_replicas {
            let targets = self.targets(&format!("{ALT_PREFIX}{index}.{TCP_LABEL}.{origin}")).await;
            if targets.is_empty() {
                break;
            }
            replicas.extend(targets);
            index += 1;
        }
        replicas.truncate(max_replicas);

        debug!(origin = %origin, count = replicas.len(), "Resolved replica candidates");
        Ok(replicas)
    }
}
