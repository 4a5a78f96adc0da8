//! # relay-settings
//!
//! Configuration management with layered sources for Relay.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`RelaySettings::default()`]
//! 2. **JSON file** — `~/.relay/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `RELAY_*` overrides (highest priority)
//!
//! Loading never fails the process: a missing file is normal, a malformed
//! one logs a warning and falls back to defaults. The loaded value is
//! returned to the caller and threaded through constructors — node identity
//! in particular is an explicit parameter everywhere, never an ambient
//! lookup.
//!
//! # Usage
//!
//! ```no_run
//! use relay_settings::RelaySettings;
//!
//! let settings = RelaySettings::load();
//! println!("WebSocket port: {}", settings.server.ws_port);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings_from_path, settings_path};
pub use types::*;
