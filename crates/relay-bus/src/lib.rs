//! # relay-bus
//!
//! The fanout bus replicates multi-user and broadcast sends to every node
//! in the fleet. One shared channel; every node publishes to it and
//! consumes every publish, including its own — self-echo suppression is the
//! router's job, not the bus's.
//!
//! - **[`FanoutBus`]**: the client trait — `publish` plus an explicit
//!   `subscribe` call made once at startup
//! - **[`RedisFanoutBus`]**: production implementation over Redis pub/sub
//! - **[`LoopbackBus`]**: in-process implementation for single-node runs
//!   and tests (faithfully redelivers to the publisher)

#![deny(unsafe_code)]

pub mod bus;
pub mod error;
pub mod loopback;
pub mod redis_bus;

pub use bus::FanoutBus;
pub use error::BusError;
pub use loopback::LoopbackBus;
pub use redis_bus::RedisFanoutBus;
