//! Coordinator-facing error taxonomy.
//!
//! Most failure classes never cross the public API: an absent target is a
//! silent no-op, presence-store and bus failures are logged and contained
//! inside their components. The one synchronous rejection the coordinator
//! makes is a malformed argument.

/// Errors surfaced by the coordinator's public operations.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// A required argument was empty or malformed.
    #[error("invalid target: {0}")]
    InvalidTarget(&'static str),
}
