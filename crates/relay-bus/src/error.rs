//! Fanout bus errors.
//!
//! Bus failures never undo anything: by the time a publish fails, local
//! delivery has already happened. Callers log and continue.

/// Errors from the fanout bus backend.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The bus could not be reached or the command failed.
    #[error("fanout bus unavailable: {0}")]
    Unavailable(#[from] redis::RedisError),

    /// Envelope could not be serialized for the wire.
    #[error("envelope encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}
