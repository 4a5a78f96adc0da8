//! The wire entity carried on the fanout bus.
//!
//! Every node publishes to one shared channel and every node (including the
//! publisher) consumes every envelope. The `from_node` tag lets a consumer
//! discard its own publishes; exactly one hop of fanout is ever performed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::{NodeId, UserId};

/// A broadcast or multi-user send replicated to every node on the bus.
///
/// `target_users` empty means "everyone". The payload is opaque to the
/// coordinator — business meaning lives entirely with the endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastEnvelope {
    /// Node that published this envelope.
    pub from_node: NodeId,
    /// Opaque payload, delivered verbatim to each recipient socket.
    pub payload: String,
    /// Target users; empty set targets every connected session.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub target_users: BTreeSet<UserId>,
}

impl BroadcastEnvelope {
    /// Envelope addressed to every session in the cluster.
    pub fn to_everyone(from_node: NodeId, payload: impl Into<String>) -> Self {
        Self {
            from_node,
            payload: payload.into(),
            target_users: BTreeSet::new(),
        }
    }

    /// Envelope addressed to a set of users.
    pub fn to_users(
        from_node: NodeId,
        payload: impl Into<String>,
        target_users: BTreeSet<UserId>,
    ) -> Self {
        Self {
            from_node,
            payload: payload.into(),
            target_users,
        }
    }

    /// True when the envelope targets every session rather than named users.
    pub fn is_broadcast(&self) -> bool {
        self.target_users.is_empty()
    }
}
