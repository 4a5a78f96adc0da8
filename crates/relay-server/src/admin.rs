//! Admin HTTP surface.
//!
//! Every handler is a direct call into a coordinator operation — no new
//! semantics live here. Counts read from the presence store and may be
//! transiently stale; that is the documented contract for admin callers.

use std::collections::BTreeSet;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use relay_core::errors::CoordinatorError;
use relay_core::ids::{SessionId, UserId};
use relay_core::transport::CloseReason;
use relay_coordinator::heartbeat::epoch_ms;
use serde::Deserialize;
use serde_json::json;

use crate::AppState;

/// Body for single-target sends.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBody {
    /// Opaque payload, forwarded verbatim.
    pub payload: String,
}

/// Body for multi-user sends.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MulticastBody {
    /// Target user ids.
    pub users: BTreeSet<String>,
    /// Opaque payload, forwarded verbatim.
    pub payload: String,
}

fn reject(err: &CoordinatorError) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() }))).into_response()
}

fn accepted() -> Response {
    Json(json!({ "ok": true })).into_response()
}

/// `GET /admin/online/count`
pub async fn online_count(State(state): State<AppState>) -> Response {
    let count = state.coordinator.online_user_count().await;
    Json(json!({
        "onlineUsers": count,
        "asOf": chrono::Utc::now().to_rfc3339(),
    }))
    .into_response()
}

/// `GET /admin/online/users`
pub async fn online_users(State(state): State<AppState>) -> Response {
    let users = state.coordinator.online_users().await;
    Json(json!({
        "users": users,
        "asOf": chrono::Utc::now().to_rfc3339(),
    }))
    .into_response()
}

/// `GET /admin/sessions/count` — sessions physically owned by this node.
pub async fn local_session_count(State(state): State<AppState>) -> Response {
    Json(json!({
        "nodeId": state.coordinator.node_id(),
        "localSessions": state.coordinator.sessions().count(),
    }))
    .into_response()
}

/// `POST /admin/send/session/{id}` — succeeds even when the target is gone.
pub async fn send_to_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SendBody>,
) -> Response {
    match state
        .coordinator
        .to_session(&SessionId::from(id.as_str()), &body.payload)
        .await
    {
        Ok(()) => accepted(),
        Err(e) => reject(&e),
    }
}

/// `POST /admin/send/user/{id}`
pub async fn send_to_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SendBody>,
) -> Response {
    match state
        .coordinator
        .to_user(&UserId::from(id.as_str()), &body.payload)
        .await
    {
        Ok(()) => accepted(),
        Err(e) => reject(&e),
    }
}

/// `POST /admin/send/users` — local delivery plus cross-node fanout.
pub async fn send_to_users(
    State(state): State<AppState>,
    Json(body): Json<MulticastBody>,
) -> Response {
    let users: BTreeSet<UserId> = body
        .users
        .iter()
        .map(|u| UserId::from(u.as_str()))
        .collect();
    match state.coordinator.to_users(&users, &body.payload).await {
        Ok(()) => accepted(),
        Err(e) => reject(&e),
    }
}

/// `POST /admin/broadcast`
pub async fn broadcast(State(state): State<AppState>, Json(body): Json<SendBody>) -> Response {
    state.coordinator.broadcast_all(&body.payload).await;
    accepted()
}

/// `POST /admin/kick/session/{id}` — idempotent.
pub async fn kick_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state
        .coordinator
        .close_session(&SessionId::from(id.as_str()), CloseReason::Kicked)
        .await;
    accepted()
}

/// `POST /admin/kick/user/{id}` — idempotent.
pub async fn kick_user(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state
        .coordinator
        .close_user(&UserId::from(id.as_str()), CloseReason::Kicked)
        .await;
    accepted()
}

/// `POST /admin/sweep` — on-demand heartbeat sweep of this node's partition.
pub async fn trigger_sweep(State(state): State<AppState>) -> Response {
    let closed = state.coordinator.sweep(epoch_ms()).await;
    Json(json!({ "closed": closed })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use relay_bus::{FanoutBus, LoopbackBus};
    use relay_coordinator::Coordinator;
    use relay_core::ids::NodeId;
    use relay_presence::{MemoryPresenceStore, PresenceStore};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn make_app() -> (Router, Arc<Coordinator>) {
        let coordinator = Arc::new(Coordinator::new(
            NodeId::from("n1"),
            Duration::from_secs(30),
            Arc::new(MemoryPresenceStore::new()) as Arc<dyn PresenceStore>,
            Arc::new(LoopbackBus::new()) as Arc<dyn FanoutBus>,
        ));
        let state = AppState {
            coordinator: Arc::clone(&coordinator),
            metrics: PrometheusBuilder::new().build_recorder().handle(),
        };
        (build_router(state), coordinator)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn online_count_starts_at_zero() {
        let (router, _) = make_app();
        let response = router
            .oneshot(Request::get("/admin/online/count").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["onlineUsers"], 0);
        assert!(json["asOf"].is_string());
    }

    #[tokio::test]
    async fn session_count_names_the_node() {
        let (router, _) = make_app();
        let response = router
            .oneshot(
                Request::get("/admin/sessions/count")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["nodeId"], "n1");
        assert_eq!(json["localSessions"], 0);
    }

    #[tokio::test]
    async fn send_to_absent_session_is_ok() {
        // "Target gone" is an expected race, not an admin error.
        let (router, _) = make_app();
        let response = router
            .oneshot(post_json(
                "/admin/send/session/gone",
                serde_json::json!({"payload": "x"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn multicast_with_empty_member_is_rejected() {
        let (router, _) = make_app();
        let response = router
            .oneshot(post_json(
                "/admin/send/users",
                serde_json::json!({"users": ["alice", ""], "payload": "x"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("invalid target"));
    }

    #[tokio::test]
    async fn multicast_empty_set_is_a_noop_ok() {
        let (router, _) = make_app();
        let response = router
            .oneshot(post_json(
                "/admin/send/users",
                serde_json::json!({"users": [], "payload": "x"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn broadcast_and_kick_are_always_ok() {
        let (router, _) = make_app();
        let response = router
            .clone()
            .oneshot(post_json("/admin/broadcast", serde_json::json!({"payload": "hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .clone()
            .oneshot(post_json("/admin/kick/user/nobody", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(post_json("/admin/kick/session/nothing", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn sweep_reports_zero_on_an_idle_node() {
        let (router, _) = make_app();
        let response = router
            .oneshot(post_json("/admin/sweep", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["closed"], 0);
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_prometheus_text() {
        let (router, _) = make_app();
        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
