//! Target resolution and message fan-out.
//!
//! Every send has two phases. The local phase walks the session table and
//! writes to sockets this node owns — it never blocks on the network and
//! always completes first. The remote phase, only for multi-user and
//! broadcast targets, publishes one envelope to the fanout bus so peer
//! nodes deliver to *their* sockets; the originating node cannot know which
//! target users live elsewhere, so the publish is unconditional.
//!
//! Absent targets are silent no-ops — "target gone" is an expected race,
//! not a fault. A failed socket write closes that one session and the
//! fan-out continues.

use std::collections::BTreeSet;

use metrics::counter;
use relay_core::envelope::BroadcastEnvelope;
use relay_core::errors::CoordinatorError;
use relay_core::ids::{SessionId, UserId};
use relay_core::transport::CloseReason;
use tracing::{debug, warn};

use crate::coordinator::Coordinator;

impl Coordinator {
    /// Send to one session, if this node still owns it.
    pub async fn to_session(
        &self,
        session: &SessionId,
        payload: &str,
    ) -> Result<(), CoordinatorError> {
        if session.is_empty() {
            return Err(CoordinatorError::InvalidTarget("empty session id"));
        }
        let _ = self.deliver_local(session, payload).await;
        Ok(())
    }

    /// Send to every local session of one user.
    pub async fn to_user(&self, user: &UserId, payload: &str) -> Result<(), CoordinatorError> {
        if user.is_empty() {
            return Err(CoordinatorError::InvalidTarget("empty user id"));
        }
        self.fanout_user_local(user, payload).await;
        Ok(())
    }

    /// Send to a set of users, wherever their sessions live.
    ///
    /// Local sessions are served directly; the envelope is then published
    /// so peer nodes serve theirs. An empty set is a no-op — nothing is
    /// delivered and nothing is published.
    pub async fn to_users(
        &self,
        users: &BTreeSet<UserId>,
        payload: &str,
    ) -> Result<(), CoordinatorError> {
        if users.is_empty() {
            return Ok(());
        }
        if users.iter().any(UserId::is_empty) {
            return Err(CoordinatorError::InvalidTarget("empty user id in set"));
        }

        for user in users {
            self.fanout_user_local(user, payload).await;
        }

        let envelope =
            BroadcastEnvelope::to_users(self.node_id.clone(), payload, users.clone());
        self.publish_best_effort(&envelope).await;
        Ok(())
    }

    /// Send to every session in the cluster.
    pub async fn broadcast_all(&self, payload: &str) {
        self.fanout_all_local(payload).await;
        let envelope = BroadcastEnvelope::to_everyone(self.node_id.clone(), payload);
        self.publish_best_effort(&envelope).await;
    }

    /// Consume one envelope from the fanout bus.
    ///
    /// Called once per publish on every node, the sender included: an
    /// envelope tagged with our own node id is discarded. Remote envelopes
    /// are delivered to local sessions only — never re-published, so
    /// exactly one hop of fanout ever happens.
    pub async fn on_remote_envelope(&self, envelope: BroadcastEnvelope) {
        if envelope.from_node == self.node_id {
            counter!("bus_self_echoes_total").increment(1);
            debug!("discarding own envelope");
            return;
        }
        counter!("bus_envelopes_consumed_total").increment(1);

        if envelope.is_broadcast() {
            self.fanout_all_local(&envelope.payload).await;
        } else {
            for user in &envelope.target_users {
                self.fanout_user_local(user, &envelope.payload).await;
            }
        }
    }

    /// Close one session. Idempotent — closing an already-closed or unknown
    /// session does nothing.
    pub async fn close_session(&self, session: &SessionId, reason: CloseReason) {
        if let Some(handle) = self.sessions.get(session) {
            handle.close(reason);
        }
        let _ = self.unregister(session).await;
    }

    /// Close every local session of one user. Idempotent.
    pub async fn close_user(&self, user: &UserId, reason: CloseReason) {
        for session in self.sessions.sessions_of(user) {
            self.close_session(&session, reason).await;
        }
    }

    /// Write to one local session. Returns whether the payload reached the
    /// outbound queue. A write failure closes that session only.
    async fn deliver_local(&self, session: &SessionId, payload: &str) -> bool {
        let Some(handle) = self.sessions.get(session) else {
            debug!(session_id = %session, "delivery target gone");
            return false;
        };
        match handle.send(payload) {
            Ok(()) => {
                counter!("messages_delivered_total").increment(1);
                true
            }
            Err(e) => {
                counter!("delivery_failures_total").increment(1);
                warn!(session_id = %session, error = %e, "send failed, closing session");
                self.close_session(session, CloseReason::ServerError).await;
                false
            }
        }
    }

    async fn fanout_user_local(&self, user: &UserId, payload: &str) {
        for session in self.sessions.sessions_of(user) {
            let _ = self.deliver_local(&session, payload).await;
        }
    }

    async fn fanout_all_local(&self, payload: &str) {
        for session in self.sessions.all_sessions() {
            let _ = self.deliver_local(&session, payload).await;
        }
    }

    async fn publish_best_effort(&self, envelope: &BroadcastEnvelope) {
        if let Err(e) = self.bus.publish(envelope).await {
            counter!("bus_publish_failures_total").increment(1);
            warn!(error = %e, "fanout publish failed, local delivery unaffected");
        }
    }
}
