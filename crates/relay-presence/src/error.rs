//! Presence store errors.
//!
//! A presence failure is never fatal to the caller: the local session table
//! remains correct and same-node delivery keeps working regardless of store
//! availability. Callers catch, log, and continue.

/// Errors from the presence store backend.
#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    /// The backing store could not be reached or the command failed.
    #[error("presence store unavailable: {0}")]
    Unavailable(#[from] redis::RedisError),
}
