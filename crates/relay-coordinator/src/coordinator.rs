//! The per-process coordinator.
//!
//! One [`Coordinator`] is constructed per process and passed by handle to
//! everything that needs it — transport callbacks, admin routes, the sweep
//! task. Never a global: node identity and both cluster backends are
//! injected through the constructor.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use relay_bus::FanoutBus;
use relay_core::ids::{NodeId, UserId};
use relay_presence::PresenceStore;
use tracing::warn;

use crate::session_table::SessionTable;

/// Cluster-wide connection coordinator for one node.
pub struct Coordinator {
    pub(crate) node_id: NodeId,
    pub(crate) heartbeat_timeout: Duration,
    pub(crate) sessions: SessionTable,
    pub(crate) presence: Arc<dyn PresenceStore>,
    pub(crate) bus: Arc<dyn FanoutBus>,
    pub(crate) draining: AtomicBool,
}

impl Coordinator {
    /// Build a coordinator for `node_id`.
    ///
    /// `heartbeat_timeout` is the age at which a silent session is
    /// considered dead ([`Coordinator::sweep`]).
    pub fn new(
        node_id: NodeId,
        heartbeat_timeout: Duration,
        presence: Arc<dyn PresenceStore>,
        bus: Arc<dyn FanoutBus>,
    ) -> Self {
        Self {
            node_id,
            heartbeat_timeout,
            sessions: SessionTable::new(),
            presence,
            bus,
            draining: AtomicBool::new(false),
        }
    }

    /// This node's identity.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// The local session table.
    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    /// Cluster-wide online user count, best-effort: a store failure logs
    /// and reads as zero (admin callers accept transiently stale results).
    pub async fn online_user_count(&self) -> u64 {
        match self.presence.online_user_count().await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "presence store unavailable for online count");
                0
            }
        }
    }

    /// Cluster-wide online user set, best-effort (empty on store failure).
    pub async fn online_users(&self) -> Vec<UserId> {
        match self.presence.online_users().await {
            Ok(mut users) => {
                users.sort();
                users
            }
            Err(e) => {
                warn!(error = %e, "presence store unavailable for online users");
                Vec::new()
            }
        }
    }
}
