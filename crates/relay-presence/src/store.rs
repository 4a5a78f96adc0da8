//! The presence store client trait.

use async_trait::async_trait;
use relay_core::ids::{NodeId, SessionId, UserId};

use crate::error::PresenceError;

/// Client for the cluster-visible presence indices.
///
/// All operations are idempotent or tolerant of duplication; no
/// transactional semantics are assumed. Timestamps are epoch milliseconds
/// supplied by the caller (single writer per session — the owning node —
/// so last-write-wins refresh is conflict-free).
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Record `session` as a live session of `user` owned by `node`.
    async fn mark_online(
        &self,
        user: &UserId,
        session: &SessionId,
        node: &NodeId,
    ) -> Result<(), PresenceError>;

    /// Remove `session` from every index. Returns the owning user id if the
    /// session was known. Removing the user's last session also removes the
    /// user from the online set.
    async fn mark_offline(&self, session: &SessionId) -> Result<Option<UserId>, PresenceError>;

    /// Refresh the last-seen timestamp for `session` in `node`'s heartbeat
    /// partition.
    async fn touch_heartbeat(
        &self,
        node: &NodeId,
        session: &SessionId,
        now_ms: u64,
    ) -> Result<(), PresenceError>;

    /// Sessions in `node`'s heartbeat partition whose last-seen timestamp is
    /// at or before `cutoff_ms`.
    async fn expired_sessions(
        &self,
        node: &NodeId,
        cutoff_ms: u64,
    ) -> Result<Vec<SessionId>, PresenceError>;

    /// Number of users with at least one live session, cluster-wide.
    async fn online_user_count(&self) -> Result<u64, PresenceError>;

    /// The cluster-wide online-user set.
    async fn online_users(&self) -> Result<Vec<UserId>, PresenceError>;

    /// Sessions the store believes `node` owns.
    async fn sessions_of_node(&self, node: &NodeId) -> Result<Vec<SessionId>, PresenceError>;
}
