//! Run one store operation against the available endpoints in order.

use appconfig_types::{EndpointFailure, StoreError};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::manager::ConfigurationClientManager;
use crate::client::ConfigurationClient;
use crate::telemetry;

/// Try `op` on each available client until one succeeds.
///
/// Failover-candidate errors (throttling, 5xx, transport) put the endpoint
/// into backoff and move on; any other error is returned as-is without
/// penalizing the endpoint. Running out of endpoints yields
/// [`StoreError::NoAvailableEndpoint`] with the last failure per endpoint.
pub async fn execute_with_failover<T, F, Fut>(
    manager: &Arc<ConfigurationClientManager>,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, StoreError>
where
    F: FnMut(Arc<dyn ConfigurationClient>) -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    manager.schedule_replica_discovery();

    let mut failures: Vec<EndpointFailure> = Vec::new();

    for (idx, wrapper) in manager.available_clients(cancel).enumerate() {
        let client = Arc::clone(wrapper.client());

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(StoreError::Cancelled),
            r = op(Arc::clone(&client)) => r,
        };

        match result {
            Ok(value) => {
                manager.update_client_status(&client, true);
                if idx > 0 {
                    telemetry::record_failover_success(wrapper.endpoint().host());
                    tracing::info!(
                        endpoint = %wrapper.endpoint(),
                        attempt = idx + 1,
                        "Failover succeeded"
                    );
                } else {
                    tracing::debug!(endpoint = %wrapper.endpoint(), "Request succeeded");
                }
                return Ok(value);
            },
            Err(e) if e.is_failover_candidate() => {
                manager.update_client_status(&client, false);
                tracing::warn!(endpoint = %wrapper.endpoint(), error = %e, "Endpoint failed, trying next");
                failures.push(EndpointFailure {
                    endpoint: wrapper.endpoint().to_string(),
                    message: e.to_string(),
                });
            },
            Err(e) => return Err(e),
        }
    }

    if cancel.is_cancelled() {
        return Err(StoreError::Cancelled);
    }
    telemetry::record_endpoints_exhausted();
    Err(StoreError::NoAvailableEndpoint { failures })
}
