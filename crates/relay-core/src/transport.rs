//! Transport capability seam.
//!
//! The coordinator never negotiates transport details. It sees each live
//! socket through [`ConnectionHandle`]: send bytes, close with a reason,
//! query openness. The write side is exclusively owned by the node holding
//! the handle — no other node may touch it, which is why every cross-node
//! path goes through the fanout bus instead.
//!
//! Closed or vanished targets are ordinary values here ([`Result`] /
//! [`Option`] at the call sites), never exception-shaped control flow.

use crate::ids::SessionId;

/// Why a session was closed. Carried to the client as a close frame reason
/// where the transport supports it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The server failed while writing to the socket.
    ServerError,
    /// Heartbeats stopped arriving within the timeout window.
    NotReliable,
    /// An administrative kick.
    Kicked,
    /// The owning node is draining for shutdown.
    Restarting,
}

impl CloseReason {
    /// Stable string form used in close frames and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ServerError => "server error",
            Self::NotReliable => "session not reliable",
            Self::Kicked => "kicked",
            Self::Restarting => "server restarting",
        }
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error writing to a live socket.
///
/// A failed send closes that one session and nothing else — multi-target
/// operations continue delivering to their remaining recipients.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer is gone or the socket errored mid-write.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The outbound queue is full; the client is not draining.
    #[error("outbound queue full")]
    QueueFull,

    /// The handle was already closed.
    #[error("connection closed")]
    Closed,
}

/// Capability handle for one live socket, provided by the transport layer.
///
/// Implementations must be cheap to call from many tasks concurrently:
/// `send` may not block on network I/O (queue and return), and `close`
/// must be idempotent.
pub trait ConnectionHandle: Send + Sync {
    /// The transport-assigned session id this handle belongs to.
    fn id(&self) -> &SessionId;

    /// Queue `payload` for delivery to the client.
    fn send(&self, payload: &str) -> Result<(), TransportError>;

    /// Close the socket. Safe to call more than once.
    fn close(&self, reason: CloseReason);

    /// Whether the socket is still open.
    fn is_open(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_reason_strings_are_stable() {
        assert_eq!(CloseReason::ServerError.as_str(), "server error");
        assert_eq!(CloseReason::NotReliable.as_str(), "session not reliable");
        assert_eq!(CloseReason::Kicked.as_str(), "kicked");
        assert_eq!(CloseReason::Restarting.as_str(), "server restarting");
    }

    #[test]
    fn transport_error_display() {
        let e = TransportError::SendFailed("broken pipe".into());
        assert_eq!(e.to_string(), "send failed: broken pipe");
        assert_eq!(TransportError::QueueFull.to_string(), "outbound queue full");
    }
}
