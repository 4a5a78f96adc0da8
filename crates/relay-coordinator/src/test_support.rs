//! Shared test doubles for the coordinator's unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use relay_bus::{FanoutBus, LoopbackBus};
use relay_core::ids::{NodeId, SessionId};
use relay_core::transport::{CloseReason, ConnectionHandle, TransportError};
use relay_presence::{MemoryPresenceStore, PresenceStore};

use crate::coordinator::Coordinator;

/// Recording connection double. Captures sends and close reasons; can be
/// switched into a failing mode to exercise partial-failure paths.
pub(crate) struct MockConnection {
    id: SessionId,
    open: AtomicBool,
    fail_sends: AtomicBool,
    sent: Mutex<Vec<String>>,
    close_reasons: Mutex<Vec<CloseReason>>,
}

impl MockConnection {
    pub(crate) fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: SessionId::from(id),
            open: AtomicBool::new(true),
            fail_sends: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            close_reasons: Mutex::new(Vec::new()),
        })
    }

    /// A connection whose every send fails.
    pub(crate) fn failing(id: &str) -> Arc<Self> {
        let conn = Self::new(id);
        conn.fail_sends.store(true, Ordering::SeqCst);
        conn
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn close_reasons(&self) -> Vec<CloseReason> {
        self.close_reasons.lock().unwrap().clone()
    }
}

impl ConnectionHandle for MockConnection {
    fn id(&self) -> &SessionId {
        &self.id
    }

    fn send(&self, payload: &str) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed("mock failure".into()));
        }
        self.sent.lock().unwrap().push(payload.to_string());
        Ok(())
    }

    fn close(&self, reason: CloseReason) {
        self.open.store(false, Ordering::SeqCst);
        self.close_reasons.lock().unwrap().push(reason);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// A coordinator wired to in-process backends, plus handles to both so
/// tests can observe cluster-visible effects.
pub(crate) fn make_coordinator(
    node: &str,
) -> (Arc<Coordinator>, Arc<MemoryPresenceStore>, LoopbackBus) {
    make_coordinator_with_timeout(node, Duration::from_secs(60))
}

pub(crate) fn make_coordinator_with_timeout(
    node: &str,
    heartbeat_timeout: Duration,
) -> (Arc<Coordinator>, Arc<MemoryPresenceStore>, LoopbackBus) {
    let presence = Arc::new(MemoryPresenceStore::new());
    let bus = LoopbackBus::new();
    let coordinator = Arc::new(Coordinator::new(
        NodeId::from(node),
        heartbeat_timeout,
        Arc::clone(&presence) as Arc<dyn PresenceStore>,
        Arc::new(bus.clone()) as Arc<dyn FanoutBus>,
    ));
    (coordinator, presence, bus)
}
