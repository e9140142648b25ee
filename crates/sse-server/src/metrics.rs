//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

pub use sse_hub::metrics::{
    BROADCASTS_TOTAL, CONNECTIONS_ACTIVE, CONNECTIONS_REGISTERED_TOTAL, DELIVERIES_TOTAL,
    EVICTIONS_TOTAL,
};

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at server startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

/// Build a handle without installing it globally. Nothing is recorded into
/// it; used where a server is constructed without a process-wide recorder.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

/// Event streams opened over HTTP (counter).
pub const STREAMS_OPENED_TOTAL: &str = "sse_streams_opened_total";
/// Keepalive comments written (counter).
pub const KEEPALIVES_SENT_TOTAL: &str = "sse_keepalives_sent_total";
/// HTTP publish requests accepted (counter).
pub const PUBLISH_REQUESTS_TOTAL: &str = "sse_publish_requests_total";
