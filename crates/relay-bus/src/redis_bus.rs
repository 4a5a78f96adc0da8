//! Redis pub/sub fanout bus.
//!
//! Envelopes travel as JSON on one shared channel. The subscriber task
//! decodes each message and forwards it over a bounded queue; malformed
//! payloads are counted and dropped — one bad publisher must not wedge the
//! consumer.

use async_trait::async_trait;
use futures::StreamExt;
use metrics::counter;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use relay_core::envelope::BroadcastEnvelope;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::bus::FanoutBus;
use crate::error::BusError;

/// Queue depth between the pub/sub socket and the router.
const SUBSCRIBE_BUFFER: usize = 4096;

/// Fanout bus client over Redis pub/sub.
pub struct RedisFanoutBus {
    client: Client,
    conn: ConnectionManager,
    channel: String,
}

impl RedisFanoutBus {
    /// Connect to `url` and bind the shared `channel`.
    pub async fn connect(url: &str, channel: impl Into<String>) -> Result<Self, BusError> {
        let client = Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        let channel = channel.into();
        debug!(channel = %channel, "connected fanout bus");
        Ok(Self {
            client,
            conn,
            channel,
        })
    }
}

#[async_trait]
impl FanoutBus for RedisFanoutBus {
    async fn publish(&self, envelope: &BroadcastEnvelope) -> Result<(), BusError> {
        let json = serde_json::to_string(envelope)?;
        let mut conn = self.conn.clone();
        let _: () = conn.publish(&self.channel, json).await?;
        counter!("bus_publishes_total").increment(1);
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<BroadcastEnvelope>, BusError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(&self.channel).await?;

        let (tx, rx) = mpsc::channel(SUBSCRIBE_BUFFER);
        let channel = self.channel.clone();
        let _task = tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        counter!("bus_decode_errors_total").increment(1);
                        warn!(error = %e, "dropping non-text bus message");
                        continue;
                    }
                };
                let envelope: BroadcastEnvelope = match serde_json::from_str(&payload) {
                    Ok(env) => env,
                    Err(e) => {
                        counter!("bus_decode_errors_total").increment(1);
                        warn!(error = %e, "dropping malformed bus envelope");
                        continue;
                    }
                };
                if tx.send(envelope).await.is_err() {
                    // Receiver dropped — the node is shutting down.
                    break;
                }
            }
            debug!(channel = %channel, "fanout subscriber stopped");
        });
        Ok(rx)
    }
}
