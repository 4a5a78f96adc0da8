//! The fanout bus client trait.

use async_trait::async_trait;
use relay_core::envelope::BroadcastEnvelope;
use tokio::sync::mpsc;

use crate::error::BusError;

/// Client for the shared fanout channel.
///
/// `subscribe` is an explicit startup call: it binds this node's consumer
/// and returns the stream of envelopes published by every node (the
/// publisher's own envelopes included). The caller pumps the receiver into
/// the router's remote-envelope handler; dropping the receiver detaches the
/// consumer.
#[async_trait]
pub trait FanoutBus: Send + Sync {
    /// Publish `envelope` to every node on the bus.
    async fn publish(&self, envelope: &BroadcastEnvelope) -> Result<(), BusError>;

    /// Bind this node's consumer and return the envelope stream.
    async fn subscribe(&self) -> Result<mpsc::Receiver<BroadcastEnvelope>, BusError>;
}
