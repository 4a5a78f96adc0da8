//! # relay-core
//!
//! Foundation types, errors, branded IDs, and transport traits for Relay.
//!
//! This crate provides the shared vocabulary that all other Relay crates
//! depend on:
//!
//! - **Branded IDs**: [`ids::SessionId`], [`ids::UserId`], [`ids::NodeId`] as newtypes
//! - **Transport seam**: [`transport::ConnectionHandle`] capability trait,
//!   [`transport::CloseReason`], [`transport::TransportError`]
//! - **Wire entity**: [`envelope::BroadcastEnvelope`] carried on the fanout bus
//! - **Errors**: [`errors::CoordinatorError`] — the only error surfaced by the
//!   coordinator's public API
//! - **Logging**: [`logging::init_tracing`] bootstrap for binaries and tests
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other relay crates.

#![deny(unsafe_code)]

pub mod envelope;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod transport;
