//! Heartbeat acknowledgement and timeout eviction.
//!
//! Session liveness is derived from the heartbeat timestamp, never stored
//! as a separate state: a session is active while its last-seen age is
//! under the timeout, expired at or past it, and closed once the sweep
//! reaches it. A node only ever sweeps its own heartbeat partition — the
//! owning node is the only one that can close the socket anyway.

use std::time::{SystemTime, UNIX_EPOCH};

use metrics::counter;
use relay_core::ids::SessionId;
use relay_core::transport::CloseReason;
use tracing::{debug, info, warn};

use crate::coordinator::Coordinator;

/// Application-level heartbeat acknowledgement frame.
pub const HEARTBEAT_ACK: &str = r#"{"type":"heartbeatAck"}"#;

/// Wall-clock milliseconds since the UNIX epoch.
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl Coordinator {
    /// Handle a heartbeat frame from a live session.
    ///
    /// Refreshes the cluster-visible timestamp (skipped while draining —
    /// no distributed mutation during drain) and replies with
    /// [`HEARTBEAT_ACK`]. A failed ack write means the socket is broken:
    /// the session is closed immediately with a server-error reason.
    /// While draining the ack is still sent — the socket stays live until
    /// the drain closes it, and acking costs no distributed I/O.
    pub async fn on_heartbeat(&self, session: &SessionId) {
        if self.is_draining() {
            debug!(session_id = %session, "draining, skipping heartbeat touch");
        } else if let Err(e) = self
            .presence
            .touch_heartbeat(&self.node_id, session, epoch_ms())
            .await
        {
            warn!(session_id = %session, error = %e, "heartbeat touch failed");
        }

        let Some(handle) = self.sessions.get(session) else {
            return;
        };
        if !handle.is_open() {
            return;
        }
        if let Err(e) = handle.send(HEARTBEAT_ACK) {
            warn!(session_id = %session, error = %e, "heartbeat ack failed, closing session");
            self.close_session(session, CloseReason::ServerError).await;
        }
    }

    /// Evict every owned session whose heartbeat age reaches the timeout.
    ///
    /// Reads only this node's heartbeat partition. Returns the number of
    /// sessions closed. Cadence is the caller's business — a timer task,
    /// an admin trigger, or a test calling it directly.
    pub async fn sweep(&self, now_ms: u64) -> usize {
        let cutoff = now_ms.saturating_sub(self.heartbeat_timeout.as_millis() as u64);
        let expired = match self.presence.expired_sessions(&self.node_id, cutoff).await {
            Ok(expired) => expired,
            Err(e) => {
                warn!(error = %e, "sweep skipped, presence store unavailable");
                return 0;
            }
        };

        let mut closed = 0usize;
        for session in expired {
            if self.sessions.get(&session).is_some() {
                self.close_session(&session, CloseReason::NotReliable).await;
                closed += 1;
            } else if !self.is_draining() {
                // Heartbeat entry with no local socket: leftover from an
                // unclean close. Clear it so it stops showing up.
                if let Err(e) = self.presence.mark_offline(&session).await {
                    warn!(session_id = %session, error = %e, "stale heartbeat cleanup failed");
                }
            }
        }

        counter!("heartbeat_evictions_total").increment(closed as u64);
        if closed > 0 {
            info!(closed, "heartbeat sweep evicted sessions");
        }
        closed
    }
}
