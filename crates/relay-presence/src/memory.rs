//! In-process presence store.
//!
//! Same semantics as the Redis store, backed by concurrent maps. Used by
//! single-node deployments (no Redis configured) and by tests — the
//! mutation counter lets tests assert that shutdown mode produces zero
//! store writes.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use relay_core::ids::{NodeId, SessionId, UserId};

use crate::error::PresenceError;
use crate::store::PresenceStore;

/// DashMap-backed presence store.
#[derive(Default)]
pub struct MemoryPresenceStore {
    /// user → that user's live sessions. A user with an empty set is
    /// removed from the map entirely (the map's key set IS the online set).
    user_sessions: DashMap<UserId, HashSet<SessionId>>,
    session_user: DashMap<SessionId, UserId>,
    session_node: DashMap<SessionId, NodeId>,
    node_sessions: DashMap<NodeId, HashSet<SessionId>>,
    /// node → (session → last-seen epoch ms). BTreeMap keeps expiry scans
    /// deterministic.
    heartbeats: DashMap<NodeId, BTreeMap<SessionId, u64>>,
    mutations: AtomicUsize,
}

impl MemoryPresenceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutating calls (`mark_online`, `mark_offline`,
    /// `touch_heartbeat`) made so far.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PresenceStore for MemoryPresenceStore {
    async fn mark_online(
        &self,
        user: &UserId,
        session: &SessionId,
        node: &NodeId,
    ) -> Result<(), PresenceError> {
        let _ = self.mutations.fetch_add(1, Ordering::Relaxed);
        let _ = self
            .user_sessions
            .entry(user.clone())
            .or_default()
            .insert(session.clone());
        let _ = self.session_user.insert(session.clone(), user.clone());
        let _ = self.session_node.insert(session.clone(), node.clone());
        let _ = self
            .node_sessions
            .entry(node.clone())
            .or_default()
            .insert(session.clone());
        Ok(())
    }

    async fn mark_offline(&self, session: &SessionId) -> Result<Option<UserId>, PresenceError> {
        let _ = self.mutations.fetch_add(1, Ordering::Relaxed);
        let user = self.session_user.remove(session).map(|(_, user)| user);
        let node = self.session_node.remove(session).map(|(_, node)| node);

        if let Some(node) = &node {
            if let Some(mut sessions) = self.node_sessions.get_mut(node) {
                let _ = sessions.remove(session);
            }
            if let Some(mut beats) = self.heartbeats.get_mut(node) {
                let _ = beats.remove(session);
            }
        }
        if let Some(user) = &user {
            // Drop the user entry when its last session disappears.
            let emptied = match self.user_sessions.get_mut(user) {
                Some(mut sessions) => {
                    let _ = sessions.remove(session);
                    sessions.is_empty()
                }
                None => false,
            };
            if emptied {
                let _ = self.user_sessions.remove(user);
            }
        }
        Ok(user)
    }

    async fn touch_heartbeat(
        &self,
        node: &NodeId,
        session: &SessionId,
        now_ms: u64,
    ) -> Result<(), PresenceError> {
        let _ = self.mutations.fetch_add(1, Ordering::Relaxed);
        let _ = self
            .heartbeats
            .entry(node.clone())
            .or_default()
            .insert(session.clone(), now_ms);
        Ok(())
    }

    async fn expired_sessions(
        &self,
        node: &NodeId,
        cutoff_ms: u64,
    ) -> Result<Vec<SessionId>, PresenceError> {
        let Some(beats) = self.heartbeats.get(node) else {
            return Ok(Vec::new());
        };
        Ok(beats
            .iter()
            .filter(|(_, last_seen)| **last_seen <= cutoff_ms)
            .map(|(session, _)| session.clone())
            .collect())
    }

    async fn online_user_count(&self) -> Result<u64, PresenceError> {
        Ok(self.user_sessions.len() as u64)
    }

    async fn online_users(&self) -> Result<Vec<UserId>, PresenceError> {
        Ok(self
            .user_sessions
            .iter()
            .map(|entry| entry.key().clone())
            .collect())
    }

    async fn sessions_of_node(&self, node: &NodeId) -> Result<Vec<SessionId>, PresenceError> {
        Ok(self
            .node_sessions
            .get(node)
            .map(|sessions| sessions.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (UserId, SessionId, NodeId) {
        (
            UserId::from("alice"),
            SessionId::from("s1"),
            NodeId::from("n1"),
        )
    }

    #[tokio::test]
    async fn mark_online_populates_every_index() {
        let store = MemoryPresenceStore::new();
        let (user, session, node) = ids();
        store.mark_online(&user, &session, &node).await.unwrap();

        assert_eq!(store.online_user_count().await.unwrap(), 1);
        assert_eq!(store.online_users().await.unwrap(), vec![user]);
        assert_eq!(store.sessions_of_node(&node).await.unwrap(), vec![session]);
    }

    #[tokio::test]
    async fn mark_offline_returns_owning_user() {
        let store = MemoryPresenceStore::new();
        let (user, session, node) = ids();
        store.mark_online(&user, &session, &node).await.unwrap();

        let owner = store.mark_offline(&session).await.unwrap();
        assert_eq!(owner, Some(user));
        assert_eq!(store.online_user_count().await.unwrap(), 0);
        assert!(store.sessions_of_node(&node).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_offline_unknown_session_is_a_noop() {
        let store = MemoryPresenceStore::new();
        let owner = store.mark_offline(&SessionId::from("ghost")).await.unwrap();
        assert_eq!(owner, None);
    }

    #[tokio::test]
    async fn user_stays_online_until_last_session_leaves() {
        let store = MemoryPresenceStore::new();
        let user = UserId::from("alice");
        let node = NodeId::from("n1");
        let s1 = SessionId::from("s1");
        let s2 = SessionId::from("s2");
        store.mark_online(&user, &s1, &node).await.unwrap();
        store.mark_online(&user, &s2, &node).await.unwrap();

        let _ = store.mark_offline(&s1).await.unwrap();
        assert_eq!(store.online_user_count().await.unwrap(), 1);

        let _ = store.mark_offline(&s2).await.unwrap();
        assert_eq!(store.online_user_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn expired_sessions_selects_by_cutoff() {
        let store = MemoryPresenceStore::new();
        let node = NodeId::from("n1");
        store
            .touch_heartbeat(&node, &SessionId::from("old"), 1_000)
            .await
            .unwrap();
        store
            .touch_heartbeat(&node, &SessionId::from("fresh"), 9_000)
            .await
            .unwrap();

        let expired = store.expired_sessions(&node, 5_000).await.unwrap();
        assert_eq!(expired, vec![SessionId::from("old")]);
    }

    #[tokio::test]
    async fn heartbeat_refresh_is_last_write_wins() {
        let store = MemoryPresenceStore::new();
        let node = NodeId::from("n1");
        let session = SessionId::from("s1");
        store.touch_heartbeat(&node, &session, 1_000).await.unwrap();
        store.touch_heartbeat(&node, &session, 9_000).await.unwrap();

        assert!(store.expired_sessions(&node, 5_000).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_sessions_for_unknown_node_is_empty() {
        let store = MemoryPresenceStore::new();
        let expired = store
            .expired_sessions(&NodeId::from("ghost"), u64::MAX)
            .await
            .unwrap();
        assert!(expired.is_empty());
    }

    #[tokio::test]
    async fn mutation_counter_tracks_writes_only() {
        let store = MemoryPresenceStore::new();
        let (user, session, node) = ids();
        store.mark_online(&user, &session, &node).await.unwrap();
        store.touch_heartbeat(&node, &session, 1).await.unwrap();
        let _ = store.mark_offline(&session).await.unwrap();
        assert_eq!(store.mutation_count(), 3);

        let _ = store.online_users().await.unwrap();
        let _ = store.online_user_count().await.unwrap();
        assert_eq!(store.mutation_count(), 3);
    }
}
