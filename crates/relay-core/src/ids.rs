//! Branded ID newtypes.
//!
//! All three identifiers are opaque strings on the wire, but the type system
//! keeps them from being swapped at call sites: a session id can never be
//! passed where a user id is expected. None of them are generated here —
//! session ids come from the transport layer, user ids from the
//! authentication step, node ids from configuration.

use serde::{Deserialize, Serialize};

macro_rules! branded_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw string value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// View as `&str`.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True if the underlying string is empty.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

branded_id! {
    /// Identifies one live socket. Assigned by the transport layer on
    /// upgrade, unique across the cluster for the socket's lifetime.
    SessionId
}

branded_id! {
    /// Identifies an authenticated user. Supplied by the authentication
    /// step; one user may hold many sessions (devices, tabs).
    UserId
}

branded_id! {
    /// Identifies one process in the fleet. Chosen once per process
    /// lifetime and used to tag outgoing fanout envelopes.
    NodeId
}
