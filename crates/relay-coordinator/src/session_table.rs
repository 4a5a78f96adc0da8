//! The local session table.
//!
//! Tracks every socket this process physically owns: session id → live
//! handle, plus a user index for fan-out. All operations are concurrent-safe
//! without an external mutex and none of them touch the network — this table
//! must stay correct and fast even when the presence store is down.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use relay_core::ids::{SessionId, UserId};
use relay_core::transport::ConnectionHandle;

/// Concurrent map of locally-owned sessions.
#[derive(Default)]
pub struct SessionTable {
    handles: DashMap<SessionId, Arc<dyn ConnectionHandle>>,
    owner: DashMap<SessionId, UserId>,
    by_user: DashMap<UserId, HashSet<SessionId>>,
}

impl SessionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session. Re-inserting an existing id replaces its handle
    /// (the transport layer guarantees socket uniqueness, so this only
    /// happens if a stale entry lingered past its close).
    pub fn put(&self, session: SessionId, user: UserId, handle: Arc<dyn ConnectionHandle>) {
        let _ = self.handles.insert(session.clone(), handle);
        if let Some(previous) = self.owner.insert(session.clone(), user.clone()) {
            if previous != user {
                // Stale owner index from a replaced entry.
                if let Some(mut sessions) = self.by_user.get_mut(&previous) {
                    let _ = sessions.remove(&session);
                }
                let _ = self.by_user.remove_if(&previous, |_, s| s.is_empty());
            }
        }
        let _ = self
            .by_user
            .entry(user)
            .or_default()
            .insert(session);
    }

    /// Look up the live handle for a session.
    pub fn get(&self, session: &SessionId) -> Option<Arc<dyn ConnectionHandle>> {
        self.handles.get(session).map(|entry| Arc::clone(&entry))
    }

    /// Remove a session, returning its owning user if it was present.
    pub fn remove(&self, session: &SessionId) -> Option<UserId> {
        let _ = self.handles.remove(session);
        let (_, user) = self.owner.remove(session)?;
        if let Some(mut sessions) = self.by_user.get_mut(&user) {
            let _ = sessions.remove(session);
        }
        let _ = self.by_user.remove_if(&user, |_, sessions| sessions.is_empty());
        Some(user)
    }

    /// This user's locally-owned sessions, sorted for deterministic
    /// per-call fan-out order.
    pub fn sessions_of(&self, user: &UserId) -> Vec<SessionId> {
        let mut sessions: Vec<SessionId> = self
            .by_user
            .get(user)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        sessions.sort();
        sessions
    }

    /// Snapshot of every locally-owned session id, sorted.
    pub fn all_sessions(&self) -> Vec<SessionId> {
        let mut sessions: Vec<SessionId> =
            self.handles.iter().map(|entry| entry.key().clone()).collect();
        sessions.sort();
        sessions
    }

    /// Number of locally-owned sessions.
    pub fn count(&self) -> usize {
        self.handles.len()
    }

    /// Number of locally-owned sessions for one user.
    pub fn count_of(&self, user: &UserId) -> usize {
        self.by_user.get(user).map_or(0, |set| set.len())
    }
}
