//! Two-node cluster behavior over a shared bus and presence store.
//!
//! Each test builds two coordinators ("n1", "n2") wired to one in-process
//! fanout bus and one shared presence store — the same topology a real
//! fleet has, minus the sockets.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use relay_bus::{FanoutBus, LoopbackBus};
use relay_coordinator::Coordinator;
use relay_core::ids::{NodeId, SessionId, UserId};
use relay_core::transport::{CloseReason, ConnectionHandle, TransportError};
use relay_presence::{MemoryPresenceStore, PresenceStore};

const TIMEOUT: Duration = Duration::from_secs(30);

struct RecordingConnection {
    id: SessionId,
    open: AtomicBool,
    sent: Mutex<Vec<String>>,
}

impl RecordingConnection {
    fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: SessionId::from(id),
            open: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

impl ConnectionHandle for RecordingConnection {
    fn id(&self) -> &SessionId {
        &self.id
    }
    fn send(&self, payload: &str) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(payload.to_string());
        Ok(())
    }
    fn close(&self, _reason: CloseReason) {
        self.open.store(false, Ordering::SeqCst);
    }
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Build a coordinator on `bus` + `presence` and pump its bus subscription
/// into `on_remote_envelope`, exactly as the server does at startup.
async fn start_node(
    node: &str,
    bus: &LoopbackBus,
    presence: &Arc<MemoryPresenceStore>,
) -> Arc<Coordinator> {
    let coordinator = Arc::new(Coordinator::new(
        NodeId::from(node),
        TIMEOUT,
        Arc::clone(presence) as Arc<dyn PresenceStore>,
        Arc::new(bus.clone()) as Arc<dyn FanoutBus>,
    ));
    let mut rx = bus.subscribe().await.unwrap();
    let consumer = Arc::clone(&coordinator);
    let _pump = tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            consumer.on_remote_envelope(envelope).await;
        }
    });
    coordinator
}

/// Poll `condition` until it holds or ~2s elapse.
async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

#[tokio::test]
async fn registration_appears_in_cluster_presence() {
    let bus = LoopbackBus::new();
    let presence = Arc::new(MemoryPresenceStore::new());
    let n1 = start_node("n1", &bus, &presence).await;

    let _ = n1
        .register(UserId::from("alice"), RecordingConnection::new("s1"))
        .await
        .unwrap();

    assert_eq!(n1.online_users().await, vec![UserId::from("alice")]);
    assert_eq!(n1.online_user_count().await, 1);
}

#[tokio::test]
async fn silent_session_is_swept_and_user_goes_offline() {
    let bus = LoopbackBus::new();
    let presence = Arc::new(MemoryPresenceStore::new());
    let n1 = start_node("n1", &bus, &presence).await;

    let conn = RecordingConnection::new("s1");
    let session = n1
        .register(UserId::from("alice"), conn.clone())
        .await
        .unwrap();

    // No heartbeat for twice the timeout.
    let now = relay_coordinator::heartbeat::epoch_ms() + 2 * TIMEOUT.as_millis() as u64;
    let closed = n1.sweep(now).await;

    assert_eq!(closed, 1);
    assert!(!conn.is_open());
    assert!(n1.sessions().get(&session).is_none());
    assert!(n1.online_users().await.is_empty());
}

#[tokio::test]
async fn broadcast_reaches_peer_sessions_exactly_once() {
    let bus = LoopbackBus::new();
    let presence = Arc::new(MemoryPresenceStore::new());
    let n1 = start_node("n1", &bus, &presence).await;
    let n2 = start_node("n2", &bus, &presence).await;

    let s1 = RecordingConnection::new("s1");
    let s2 = RecordingConnection::new("s2");
    let s3 = RecordingConnection::new("s3");
    let _ = n1.register(UserId::from("alice"), s1.clone()).await.unwrap();
    let _ = n1.register(UserId::from("bob"), s2.clone()).await.unwrap();
    let _ = n2.register(UserId::from("carol"), s3.clone()).await.unwrap();

    n1.broadcast_all("hi").await;

    // Direct local delivery on n1, one envelope hop to n2.
    wait_for(|| s3.sent() == vec!["hi".to_string()]).await;
    assert_eq!(s1.sent(), vec!["hi".to_string()]);
    assert_eq!(s2.sent(), vec!["hi".to_string()]);

    // Settle, then confirm n1 never re-delivered from its own envelope.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(s1.sent(), vec!["hi".to_string()]);
    assert_eq!(s2.sent(), vec!["hi".to_string()]);
    assert_eq!(s3.sent(), vec!["hi".to_string()]);
}

#[tokio::test]
async fn multicast_crosses_nodes_for_remote_users_only() {
    let bus = LoopbackBus::new();
    let presence = Arc::new(MemoryPresenceStore::new());
    let n1 = start_node("n1", &bus, &presence).await;
    let n2 = start_node("n2", &bus, &presence).await;

    let local = RecordingConnection::new("s1");
    let remote = RecordingConnection::new("s2");
    let bystander = RecordingConnection::new("s3");
    let _ = n1.register(UserId::from("alice"), local.clone()).await.unwrap();
    let _ = n2.register(UserId::from("bob"), remote.clone()).await.unwrap();
    let _ = n2.register(UserId::from("mallory"), bystander.clone()).await.unwrap();

    let targets: BTreeSet<UserId> = [UserId::from("alice"), UserId::from("bob")]
        .into_iter()
        .collect();
    n1.to_users(&targets, "update").await.unwrap();

    wait_for(|| remote.sent() == vec!["update".to_string()]).await;
    assert_eq!(local.sent(), vec!["update".to_string()]);

    // Non-target user on the peer node stays silent.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(bystander.sent().is_empty());
    assert_eq!(local.sent(), vec!["update".to_string()]);
}

#[tokio::test]
async fn each_node_owns_a_disjoint_session_partition() {
    let bus = LoopbackBus::new();
    let presence = Arc::new(MemoryPresenceStore::new());
    let n1 = start_node("n1", &bus, &presence).await;
    let n2 = start_node("n2", &bus, &presence).await;

    let session = n1
        .register(UserId::from("alice"), RecordingConnection::new("s1"))
        .await
        .unwrap();

    assert!(n1.sessions().get(&session).is_some());
    assert!(n2.sessions().get(&session).is_none());
}

#[tokio::test]
async fn sweep_never_touches_a_peer_partition() {
    let bus = LoopbackBus::new();
    let presence = Arc::new(MemoryPresenceStore::new());
    let n1 = start_node("n1", &bus, &presence).await;
    let n2 = start_node("n2", &bus, &presence).await;

    let conn = RecordingConnection::new("s1");
    let _ = n1.register(UserId::from("alice"), conn.clone()).await.unwrap();

    // Far future: everything in any partition is expired.
    let far_future = relay_coordinator::heartbeat::epoch_ms() + 10 * TIMEOUT.as_millis() as u64;

    // n2 sweeps its own (empty) partition — n1's session must survive.
    assert_eq!(n2.sweep(far_future).await, 0);
    assert!(conn.is_open());
    assert_eq!(n1.sessions().count(), 1);

    // The owner sweeps it out.
    assert_eq!(n1.sweep(far_future).await, 1);
    assert!(!conn.is_open());
}

#[tokio::test]
async fn draining_node_leaves_peer_presence_intact() {
    let bus = LoopbackBus::new();
    let presence = Arc::new(MemoryPresenceStore::new());
    let n1 = start_node("n1", &bus, &presence).await;
    let n2 = start_node("n2", &bus, &presence).await;

    // alice is connected to both nodes (reconnect-during-drain shape).
    let old = RecordingConnection::new("s-old");
    let new = RecordingConnection::new("s-new");
    let s_old = n1.register(UserId::from("alice"), old).await.unwrap();
    let _ = n2.register(UserId::from("alice"), new).await.unwrap();

    n1.enter_shutdown();
    let _ = n1.unregister(&s_old).await;

    // The drain must not clobber the newer registration on n2.
    assert_eq!(n1.online_users().await, vec![UserId::from("alice")]);
}
