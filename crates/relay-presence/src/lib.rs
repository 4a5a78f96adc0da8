//! # relay-presence
//!
//! Cluster-visible presence metadata for Relay nodes.
//!
//! The presence store answers "which users are online, and which node owns
//! which session" with eventual consistency. It is never used for direct
//! delivery — the local session table stays authoritative for that — so
//! every operation here is best-effort: callers log failures and carry on.
//!
//! - **[`PresenceStore`]**: the client trait (object-safe, async)
//! - **[`RedisPresenceStore`]**: production implementation over Redis
//!   sets / hashes / sorted sets
//! - **[`MemoryPresenceStore`]**: in-process implementation for single-node
//!   deployments and tests
//! - **[`PresenceKeys`]**: the fixed key naming scheme

#![deny(unsafe_code)]

pub mod error;
pub mod keys;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use error::PresenceError;
pub use keys::PresenceKeys;
pub use memory::MemoryPresenceStore;
pub use redis_store::RedisPresenceStore;
pub use store::PresenceStore;
