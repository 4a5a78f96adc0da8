//! # relay-server
//!
//! The thin outer surface of a Relay node. Everything with semantics lives
//! in `relay-coordinator`; this crate only moves bytes in and out of it:
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `connection` | [`connection::WsConnection`] — the `ConnectionHandle` over a bounded outbound queue |
//! | `ws` | WebSocket upgrade, per-socket read/write tasks |
//! | `admin` | Admin HTTP routes — direct calls into coordinator operations |
//! | `metrics` | Prometheus recorder + metric name constants |
//!
//! ## Data flow
//!
//! `ws` upgrade → `Coordinator::register` → read loop feeds heartbeats →
//! disconnect → `Coordinator::unregister`. The fanout-bus subscription and
//! the heartbeat sweep run as background tasks started from `main`.

#![deny(unsafe_code)]

pub mod admin;
pub mod connection;
pub mod metrics;
pub mod ws;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use relay_bus::FanoutBus;
use relay_coordinator::Coordinator;
use relay_coordinator::heartbeat::epoch_ms;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared state for every route handler.
#[derive(Clone)]
pub struct AppState {
    /// The per-process coordinator.
    pub coordinator: Arc<Coordinator>,
    /// Handle for rendering `/metrics`.
    pub metrics: PrometheusHandle,
}

/// Assemble the full router: WebSocket endpoint, admin surface, metrics.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/admin/online/count", get(admin::online_count))
        .route("/admin/online/users", get(admin::online_users))
        .route("/admin/sessions/count", get(admin::local_session_count))
        .route("/admin/send/session/{id}", post(admin::send_to_session))
        .route("/admin/send/user/{id}", post(admin::send_to_user))
        .route("/admin/send/users", post(admin::send_to_users))
        .route("/admin/broadcast", post(admin::broadcast))
        .route("/admin/kick/session/{id}", post(admin::kick_session))
        .route("/admin/kick/user/{id}", post(admin::kick_user))
        .route("/admin/sweep", post(admin::trigger_sweep))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind this node's bus consumer and pump envelopes into the router.
///
/// The explicit subscribe happens here, once, at startup. The pump stops
/// when the bus closes the stream.
pub async fn spawn_bus_pump(coordinator: Arc<Coordinator>, bus: Arc<dyn FanoutBus>) {
    match bus.subscribe().await {
        Ok(mut rx) => {
            let _pump = tokio::spawn(async move {
                while let Some(envelope) = rx.recv().await {
                    coordinator.on_remote_envelope(envelope).await;
                }
                info!("fanout pump stopped");
            });
        }
        Err(e) => {
            // Cross-node fanout is degraded; same-node delivery still works.
            error!(error = %e, "fanout subscribe failed, running without bus consumer");
        }
    }
}

/// Run the heartbeat sweep on a fixed cadence until shutdown mode.
pub fn spawn_sweep_task(coordinator: Arc<Coordinator>, interval: Duration) {
    let _task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            let _ = ticker.tick().await;
            if coordinator.is_draining() {
                break;
            }
            let _ = coordinator.sweep(epoch_ms()).await;
        }
    });
}
