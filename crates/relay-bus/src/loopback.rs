//! In-process fanout bus.
//!
//! Backed by a single `tokio::sync::broadcast` channel. Matches the Redis
//! bus's observable behavior — in particular a publisher receives its own
//! envelopes back, so the router's self-echo suppression is exercised even
//! in single-node runs and tests. Cloning the bus shares the channel:
//! clones publish to and subscribe from the same stream, which is how
//! tests model several nodes on one bus.

use async_trait::async_trait;
use relay_core::envelope::BroadcastEnvelope;
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

use crate::bus::FanoutBus;
use crate::error::BusError;

/// Capacity of the underlying broadcast channel. Receivers that fall this
/// far behind skip messages (acceptable: fanout is best-effort).
const LOOPBACK_CAPACITY: usize = 4096;

/// In-process fanout bus.
#[derive(Clone)]
pub struct LoopbackBus {
    sender: broadcast::Sender<BroadcastEnvelope>,
}

impl LoopbackBus {
    /// Create a bus with no subscribers yet.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(LOOPBACK_CAPACITY);
        Self { sender }
    }
}

impl Default for LoopbackBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FanoutBus for LoopbackBus {
    async fn publish(&self, envelope: &BroadcastEnvelope) -> Result<(), BusError> {
        // send() errs only when there are no receivers — that's fine.
        let _ = self.sender.send(envelope.clone());
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<BroadcastEnvelope>, BusError> {
        let mut source = self.sender.subscribe();
        let (tx, rx) = mpsc::channel(LOOPBACK_CAPACITY);
        let _task = tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(envelope) => {
                        if tx.send(envelope).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "loopback subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(rx)
    }
}
