//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` to match the JSON wire
//! format. Each type implements [`Default`] with production default values.
//! `#[serde(default)]` allows partial JSON — missing fields get their default
//! value during deserialization.

use relay_core::ids::NodeId;
use serde::{Deserialize, Serialize};

/// Root settings type for a Relay node.
///
/// Loaded from `~/.relay/settings.json` with defaults applied for missing
/// fields. `RELAY_*` environment variables override specific values.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// Settings schema version.
    pub version: String,
    /// Node identity.
    pub node: NodeSettings,
    /// Heartbeat eviction tuning.
    pub heartbeat: HeartbeatSettings,
    /// Presence store backend.
    pub presence: PresenceSettings,
    /// Fanout bus backend.
    pub bus: BusSettings,
    /// Server network settings.
    pub server: ServerSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            node: NodeSettings::default(),
            heartbeat: HeartbeatSettings::default(),
            presence: PresenceSettings::default(),
            bus: BusSettings::default(),
            server: ServerSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl RelaySettings {
    /// Correct out-of-range values instead of rejecting them.
    ///
    /// Called automatically during loading so users get working behavior
    /// plus a warning, not a refusal to start.
    pub fn normalize(&mut self) {
        if self.heartbeat.timeout_secs == 0 {
            tracing::warn!("heartbeat.timeoutSecs of 0 would evict every session, using 1");
            self.heartbeat.timeout_secs = 1;
        }
        if self.heartbeat.sweep_interval_secs == 0 {
            tracing::warn!("heartbeat.sweepIntervalSecs of 0 would spin, using 1");
            self.heartbeat.sweep_interval_secs = 1;
        }
    }
}

/// Node identity settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeSettings {
    /// Stable node id. When unset a fresh UUID is generated at startup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl NodeSettings {
    /// Resolve the node id: the configured value, or a freshly generated
    /// UUID. Call once at startup and thread the result through
    /// constructors — a second call with no configured id yields a
    /// different identity.
    pub fn resolve_id(&self) -> NodeId {
        match &self.id {
            Some(id) if !id.is_empty() => NodeId::from(id.as_str()),
            _ => NodeId::new(uuid::Uuid::now_v7().to_string()),
        }
    }
}

/// Heartbeat eviction tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeartbeatSettings {
    /// Sessions whose last heartbeat is older than this are evicted.
    pub timeout_secs: u64,
    /// Cadence of the background sweep task.
    pub sweep_interval_secs: u64,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            sweep_interval_secs: 20,
        }
    }
}

/// Presence store backend settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PresenceSettings {
    /// Redis URL. When unset the node runs with the in-memory store
    /// (single-node deployments, tests).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Prefix for every presence key.
    pub key_prefix: String,
}

impl Default for PresenceSettings {
    fn default() -> Self {
        Self {
            url: None,
            key_prefix: "presence".to_string(),
        }
    }
}

/// Fanout bus backend settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusSettings {
    /// Shared pub/sub channel every node publishes to and consumes from.
    pub channel: String,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            channel: "relay:fanout".to_string(),
        }
    }
}

/// Server network settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address for the WebSocket + admin listener.
    pub bind: String,
    /// Listener port.
    pub ws_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            ws_port: 9310,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
