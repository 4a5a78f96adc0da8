//! The `ConnectionHandle` implementation over a live WebSocket.
//!
//! Sends go through a bounded queue drained by the socket's write task, so
//! `send` never blocks — a full queue means the client is not draining and
//! counts as a send failure, which closes that session upstream.

use std::sync::atomic::{AtomicBool, Ordering};

use relay_core::ids::SessionId;
use relay_core::transport::{CloseReason, ConnectionHandle, TransportError};
use tokio::sync::mpsc;

/// Outbound queue depth per socket.
pub const OUTBOUND_BUFFER: usize = 256;

/// What the write task pulls off the queue.
#[derive(Debug)]
pub enum Outbound {
    /// A text frame to forward verbatim.
    Frame(String),
    /// Close the socket with this reason, then stop writing.
    Close(CloseReason),
}

/// Handle for one WebSocket, shared between the coordinator and the
/// socket's read/write tasks.
pub struct WsConnection {
    id: SessionId,
    outbound: mpsc::Sender<Outbound>,
    open: AtomicBool,
}

impl WsConnection {
    /// Wrap the write-task queue for a freshly upgraded socket.
    pub fn new(id: SessionId, outbound: mpsc::Sender<Outbound>) -> Self {
        Self {
            id,
            outbound,
            open: AtomicBool::new(true),
        }
    }

    /// Mark the handle closed without queueing a close frame — used by the
    /// read task when the peer already went away.
    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl ConnectionHandle for WsConnection {
    fn id(&self) -> &SessionId {
        &self.id
    }

    fn send(&self, payload: &str) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        match self.outbound.try_send(Outbound::Frame(payload.to_string())) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(TransportError::QueueFull),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_closed();
                Err(TransportError::Closed)
            }
        }
    }

    fn close(&self, reason: CloseReason) {
        if self.open.swap(false, Ordering::SeqCst) {
            // Best-effort: if the queue is gone the socket is already down.
            let _ = self.outbound.try_send(Outbound::Close(reason));
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
