//! Prometheus metrics recorder and `/metrics` endpoint handler.

use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::AppState;

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

/// `GET /metrics` — render Prometheus text format.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.render()
}

// Metric name constants to avoid typos across crates.

/// Sessions registered total (counter).
pub const SESSIONS_REGISTERED_TOTAL: &str = "sessions_registered_total";
/// Sessions unregistered total (counter).
pub const SESSIONS_UNREGISTERED_TOTAL: &str = "sessions_unregistered_total";
/// Locally-owned sessions (gauge).
pub const SESSIONS_ACTIVE: &str = "sessions_active";
/// Local deliveries total (counter).
pub const MESSAGES_DELIVERED_TOTAL: &str = "messages_delivered_total";
/// Local delivery failures total (counter).
pub const DELIVERY_FAILURES_TOTAL: &str = "delivery_failures_total";
/// Heartbeat sweep evictions total (counter).
pub const HEARTBEAT_EVICTIONS_TOTAL: &str = "heartbeat_evictions_total";
/// Fanout envelopes published total (counter).
pub const BUS_PUBLISHES_TOTAL: &str = "bus_publishes_total";
/// Fanout publish failures total (counter).
pub const BUS_PUBLISH_FAILURES_TOTAL: &str = "bus_publish_failures_total";
/// Fanout envelopes consumed from peers total (counter).
pub const BUS_ENVELOPES_CONSUMED_TOTAL: &str = "bus_envelopes_consumed_total";
/// Own envelopes discarded total (counter).
pub const BUS_SELF_ECHOES_TOTAL: &str = "bus_self_echoes_total";
/// Malformed bus payloads dropped total (counter).
pub const BUS_DECODE_ERRORS_TOTAL: &str = "bus_decode_errors_total";
/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
