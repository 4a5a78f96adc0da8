//! The fixed presence key naming scheme.
//!
//! Every cluster-visible index lives under one configurable prefix
//! (`presence` by default):
//!
//! | Key | Type | Content |
//! |-----|------|---------|
//! | `{p}:users` | set | user ids with at least one live session |
//! | `{p}:session:user` | hash | session id → owning user id |
//! | `{p}:session:node` | hash | session id → owning node id |
//! | `{p}:user:{userId}:sessions` | set | that user's live session ids |
//! | `{p}:node:{nodeId}:sessions` | set | sessions owned by that node |
//! | `{p}:heartbeat:{nodeId}` | sorted set | member = session id, score = last-seen epoch ms |
//!
//! The per-user session set exists so "was that the user's last session?"
//! is a set-cardinality check rather than a scan.

use relay_core::ids::{NodeId, UserId};

/// Key builder bound to one prefix.
#[derive(Clone, Debug)]
pub struct PresenceKeys {
    prefix: String,
}

impl PresenceKeys {
    /// Create a key builder with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The cluster-wide online-user set.
    pub fn users(&self) -> String {
        format!("{}:users", self.prefix)
    }

    /// Hash mapping session id → user id.
    pub fn session_user(&self) -> String {
        format!("{}:session:user", self.prefix)
    }

    /// Hash mapping session id → node id.
    pub fn session_node(&self) -> String {
        format!("{}:session:node", self.prefix)
    }

    /// Set of one user's live session ids.
    pub fn user_sessions(&self, user: &UserId) -> String {
        format!("{}:user:{}:sessions", self.prefix, user)
    }

    /// Set of sessions owned by one node.
    pub fn node_sessions(&self, node: &NodeId) -> String {
        format!("{}:node:{}:sessions", self.prefix, node)
    }

    /// One node's heartbeat sorted set.
    pub fn heartbeat(&self, node: &NodeId) -> String {
        format!("{}:heartbeat:{}", self.prefix, node)
    }
}

impl Default for PresenceKeys {
    fn default() -> Self {
        Self::new("presence")
    }
}
