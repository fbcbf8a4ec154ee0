//! Failover metrics.
//!
//! - `appconfig_endpoint_backoffs_total{endpoint}` - Counter of endpoints put into backoff
//! - `appconfig_failover_successes_total{endpoint}` - Counter of requests served by a non-primary endpoint
//! - `appconfig_endpoints_exhausted_total` - Counter of operations that ran out of endpoints
//! - `appconfig_discovered_replicas{origin}` - Gauge of trusted replicas from the last discovery pass
//!
//! No recorder is installed here; the host application chooses the exporter.

use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(
        "appconfig_endpoint_backoffs_total",
        "Number of times an endpoint was put into backoff"
    );
    describe_counter!(
        "appconfig_failover_successes_total",
        "Requests that succeeded on an endpoint other than the first available one"
    );
    describe_counter!(
        "appconfig_endpoints_exhausted_total",
        "Operations that failed because no endpoint was available"
    );
    describe_gauge!(
        "appconfig_discovered_replicas",
        "Trusted replicas admitted by the last discovery pass"
    );
}

pub fn record_endpoint_backoff(host: &str) {
    let labels = [("endpoint", host.to_string())];
    counter!("appconfig_endpoint_backoffs_total", &labels).increment(1);
}

pub fn record_failover_success(host: &str) {
    let labels = [("endpoint", host.to_string())];
    counter!("appconfig_failover_successes_total", &labels).increment(1);
}

pub fn record_endpoints_exhausted() {
    counter!("appconfig_endpoints_exhausted_total").increment(1);
}

pub fn update_discovered_replicas_gauge(origin: &str, count: usize) {
    let labels = [("origin", origin.to_string())];
    gauge!("appconfig_discovered_replicas", &labels).set(count as f64);
}
