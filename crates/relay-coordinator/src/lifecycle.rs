//! Session lifecycle: registration, removal, graceful-shutdown mode.
//!
//! During drain the process is closing sockets it owns anyway; writing
//! "offline" to the distributed store per session would be redundant I/O
//! racing the heartbeat timeout, and a delayed offline write from a dying
//! node must not clobber a reconnect's online write on another node. So
//! `enter_shutdown` is a one-way switch after which no lifecycle operation
//! mutates the presence store.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use metrics::{counter, gauge};
use relay_core::errors::CoordinatorError;
use relay_core::ids::{SessionId, UserId};
use relay_core::transport::ConnectionHandle;
use tracing::{debug, info, warn};

use crate::coordinator::Coordinator;
use crate::heartbeat::epoch_ms;

impl Coordinator {
    /// Register a freshly-upgraded socket for `user`.
    ///
    /// The session id is the transport-assigned one carried by the handle.
    /// The local table is updated first and unconditionally; the
    /// cluster-visible marks are best-effort and skipped entirely while
    /// draining.
    pub async fn register(
        &self,
        user: UserId,
        handle: Arc<dyn ConnectionHandle>,
    ) -> Result<SessionId, CoordinatorError> {
        if user.is_empty() {
            return Err(CoordinatorError::InvalidTarget("empty user id"));
        }
        let session = handle.id().clone();
        if session.is_empty() {
            return Err(CoordinatorError::InvalidTarget("empty session id"));
        }

        self.sessions.put(session.clone(), user.clone(), handle);
        counter!("sessions_registered_total").increment(1);
        gauge!("sessions_active").set(self.sessions.count() as f64);

        if !self.is_draining() {
            if let Err(e) = self
                .presence
                .mark_online(&user, &session, &self.node_id)
                .await
            {
                warn!(session_id = %session, error = %e, "mark_online failed, presence will lag");
            }
            if let Err(e) = self
                .presence
                .touch_heartbeat(&self.node_id, &session, epoch_ms())
                .await
            {
                warn!(session_id = %session, error = %e, "initial heartbeat touch failed");
            }
        }

        info!(session_id = %session, user_id = %user, "session registered");
        Ok(session)
    }

    /// Remove a session from the local table.
    ///
    /// Outside shutdown mode this also clears the session's cluster-visible
    /// presence (best-effort); the store drops the user from the online set
    /// with the last session. Returns the owning user, or `None` if the
    /// session was already gone (an expected race, not a fault).
    pub async fn unregister(&self, session: &SessionId) -> Option<UserId> {
        let user = self.sessions.remove(session)?;
        counter!("sessions_unregistered_total").increment(1);
        gauge!("sessions_active").set(self.sessions.count() as f64);

        if self.is_draining() {
            debug!(session_id = %session, "draining, skipping presence cleanup");
        } else if let Err(e) = self.presence.mark_offline(session).await {
            warn!(session_id = %session, error = %e, "mark_offline failed, heartbeat sweep will reap");
        }

        info!(session_id = %session, user_id = %user, "session unregistered");
        Some(user)
    }

    /// Enter shutdown mode. One-way: from here on, no lifecycle or
    /// heartbeat operation writes to the presence store.
    pub fn enter_shutdown(&self) {
        if !self.draining.swap(true, Ordering::SeqCst) {
            info!(node_id = %self.node_id, "entering shutdown mode, presence mutations suspended");
        }
    }

    /// Whether shutdown mode is active.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }
}
