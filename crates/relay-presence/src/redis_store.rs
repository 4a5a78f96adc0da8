//! Redis-backed presence store.
//!
//! Uses a [`ConnectionManager`] so transient connection loss reconnects
//! under the hood; a command that fails while disconnected surfaces as
//! [`PresenceError::Unavailable`] and the caller carries on with local
//! state. Multi-key updates go through pipelines — no transactions, since
//! every index write here is idempotent.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use relay_core::ids::{NodeId, SessionId, UserId};
use tracing::debug;

use crate::error::PresenceError;
use crate::keys::PresenceKeys;
use crate::store::PresenceStore;

/// Presence store client over Redis sets / hashes / sorted sets.
#[derive(Clone)]
pub struct RedisPresenceStore {
    conn: ConnectionManager,
    keys: PresenceKeys,
}

impl RedisPresenceStore {
    /// Connect to `url` and bind the key scheme.
    pub async fn connect(url: &str, keys: PresenceKeys) -> Result<Self, PresenceError> {
        let client = Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        debug!("connected presence store");
        Ok(Self { conn, keys })
    }
}

#[async_trait]
impl PresenceStore for RedisPresenceStore {
    async fn mark_online(
        &self,
        user: &UserId,
        session: &SessionId,
        node: &NodeId,
    ) -> Result<(), PresenceError> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .hset(self.keys.session_user(), session.as_str(), user.as_str())
            .ignore()
            .hset(self.keys.session_node(), session.as_str(), node.as_str())
            .ignore()
            .sadd(self.keys.user_sessions(user), session.as_str())
            .ignore()
            .sadd(self.keys.node_sessions(node), session.as_str())
            .ignore()
            .sadd(self.keys.users(), user.as_str())
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn mark_offline(&self, session: &SessionId) -> Result<Option<UserId>, PresenceError> {
        let mut conn = self.conn.clone();
        let user: Option<String> = conn.hget(self.keys.session_user(), session.as_str()).await?;
        let node: Option<String> = conn.hget(self.keys.session_node(), session.as_str()).await?;

        let mut pipe = redis::pipe();
        let _ = pipe
            .hdel(self.keys.session_user(), session.as_str())
            .ignore()
            .hdel(self.keys.session_node(), session.as_str())
            .ignore();
        if let Some(node) = node.as_deref() {
            let node = NodeId::from(node);
            let _ = pipe
                .srem(self.keys.node_sessions(&node), session.as_str())
                .ignore()
                .zrem(self.keys.heartbeat(&node), session.as_str())
                .ignore();
        }
        if let Some(user) = user.as_deref() {
            let _ = pipe
                .srem(self.keys.user_sessions(&UserId::from(user)), session.as_str())
                .ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;

        let Some(user) = user.map(UserId::from) else {
            return Ok(None);
        };

        // Last session gone → the user leaves the online set.
        let remaining: u64 = conn.scard(self.keys.user_sessions(&user)).await?;
        if remaining == 0 {
            let _: () = conn.srem(self.keys.users(), user.as_str()).await?;
        }
        Ok(Some(user))
    }

    async fn touch_heartbeat(
        &self,
        node: &NodeId,
        session: &SessionId,
        now_ms: u64,
    ) -> Result<(), PresenceError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .zadd(self.keys.heartbeat(node), session.as_str(), now_ms)
            .await?;
        Ok(())
    }

    async fn expired_sessions(
        &self,
        node: &NodeId,
        cutoff_ms: u64,
    ) -> Result<Vec<SessionId>, PresenceError> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .zrangebyscore(self.keys.heartbeat(node), "-inf", cutoff_ms)
            .await?;
        Ok(ids.into_iter().map(SessionId::from).collect())
    }

    async fn online_user_count(&self) -> Result<u64, PresenceError> {
        let mut conn = self.conn.clone();
        Ok(conn.scard(self.keys.users()).await?)
    }

    async fn online_users(&self) -> Result<Vec<UserId>, PresenceError> {
        let mut conn = self.conn.clone();
        let users: Vec<String> = conn.smembers(self.keys.users()).await?;
        Ok(users.into_iter().map(UserId::from).collect())
    }

    async fn sessions_of_node(&self, node: &NodeId) -> Result<Vec<SessionId>, PresenceError> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.smembers(self.keys.node_sessions(node)).await?;
        Ok(ids.into_iter().map(SessionId::from).collect())
    }
}
