//! Settings loading: defaults ← JSON file ← environment.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::errors::Result;
use crate::types::RelaySettings;

/// Default settings file location: `~/.relay/settings.json`.
///
/// Falls back to the relative path when `HOME` is unset (containers).
pub fn settings_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".relay").join("settings.json"),
        None => PathBuf::from(".relay/settings.json"),
    }
}

/// Deep-merge `overlay` into `base`. Objects merge recursively, everything
/// else is replaced by the overlay value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => deep_merge(base_val, overlay_val),
                    None => overlay_val,
                };
                let _ = base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Load settings from a specific file path, merge over defaults, apply env
/// overrides, and normalize. A missing file is not an error — defaults plus
/// env overrides are returned.
pub fn load_settings_from_path(path: &Path) -> Result<RelaySettings> {
    let defaults = serde_json::to_value(RelaySettings::default())?;

    let merged = if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        let file_value: Value = serde_json::from_str(&raw)?;
        deep_merge(defaults, file_value)
    } else {
        defaults
    };

    let mut settings: RelaySettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.normalize();
    Ok(settings)
}

/// Apply `RELAY_*` environment variable overrides (highest priority layer).
///
/// Unparseable numeric values are logged and ignored rather than rejected.
fn apply_env_overrides(settings: &mut RelaySettings) {
    if let Ok(id) = std::env::var("RELAY_NODE_ID") {
        if !id.is_empty() {
            settings.node.id = Some(id);
        }
    }
    if let Some(secs) = env_u64("RELAY_HEARTBEAT_TIMEOUT_SECS") {
        settings.heartbeat.timeout_secs = secs;
    }
    if let Some(secs) = env_u64("RELAY_SWEEP_INTERVAL_SECS") {
        settings.heartbeat.sweep_interval_secs = secs;
    }
    if let Ok(url) = std::env::var("RELAY_PRESENCE_URL") {
        if !url.is_empty() {
            settings.presence.url = Some(url);
        }
    }
    if let Ok(prefix) = std::env::var("RELAY_PRESENCE_KEY_PREFIX") {
        if !prefix.is_empty() {
            settings.presence.key_prefix = prefix;
        }
    }
    if let Ok(channel) = std::env::var("RELAY_BUS_CHANNEL") {
        if !channel.is_empty() {
            settings.bus.channel = channel;
        }
    }
    if let Ok(bind) = std::env::var("RELAY_BIND") {
        if !bind.is_empty() {
            settings.server.bind = bind;
        }
    }
    if let Some(port) = env_u64("RELAY_WS_PORT") {
        settings.server.ws_port = port as u16;
    }
    if let Ok(level) = std::env::var("RELAY_LOG_LEVEL") {
        if !level.is_empty() {
            settings.logging.level = level;
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring unparseable env override");
            None
        }
    }
}

impl RelaySettings {
    /// Load settings from the default path ([`settings_path`]).
    ///
    /// Never fails: load errors log a warning and compiled defaults are
    /// used instead.
    pub fn load() -> Self {
        let path = settings_path();
        match load_settings_from_path(&path) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, ?path, "failed to load settings, using defaults");
                let mut s = Self::default();
                s.normalize();
                s
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn deep_merge_nested_objects() {
        let base = serde_json::json!({"a": {"x": 1, "y": 2}, "b": 3});
        let overlay = serde_json::json!({"a": {"y": 20}, "c": 4});
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["a"]["x"], 1);
        assert_eq!(merged["a"]["y"], 20);
        assert_eq!(merged["b"], 3);
        assert_eq!(merged["c"], 4);
    }

    #[test]
    fn deep_merge_overlay_replaces_scalars() {
        let merged = deep_merge(serde_json::json!(1), serde_json::json!({"a": 1}));
        assert_eq!(merged, serde_json::json!({"a": 1}));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings =
            load_settings_from_path(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.server.ws_port, RelaySettings::default().server.ws_port);
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"node": {{"id": "n-test"}}, "heartbeat": {{"timeoutSecs": 5}}}}"#
        )
        .unwrap();

        let settings = load_settings_from_path(file.path()).unwrap();
        assert_eq!(settings.node.id.as_deref(), Some("n-test"));
        assert_eq!(settings.heartbeat.timeout_secs, 5);
        // Untouched sections keep their defaults.
        assert_eq!(settings.bus.channel, "relay:fanout");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(load_settings_from_path(file.path()).is_err());
    }

    #[test]
    fn zero_timeout_in_file_is_normalized() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"heartbeat": {{"timeoutSecs": 0}}}}"#).unwrap();
        let settings = load_settings_from_path(file.path()).unwrap();
        assert_eq!(settings.heartbeat.timeout_secs, 1);
    }
}
