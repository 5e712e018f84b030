//! Core WebSocket infrastructure.
//!
//! This module owns the single duplex transport: handshake, heartbeat, bounded reconnection,
//! and delivery of parsed frames to a router in arrival order. What the frames mean is left to
//! the [`crate::realtime`] layer.
//!
//! # Architecture
//!
//! - [`ConnectionManager`]: WebSocket connection handler with heartbeat and reconnection
//! - [`Handshake`]: endpoint plus the bearer token attached to every upgrade request
//! - [`MessageParser`]: Trait for parsing incoming WebSocket messages
//! - [`MessageRouter`]: Trait receiving parsed messages, wired after the first handshake

pub mod config;
pub mod connection;
pub mod error;
pub mod handshake;
pub mod traits;

pub use connection::{ConnectionManager, ConnectionState};
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use handshake::Handshake;
pub use traits::*;
