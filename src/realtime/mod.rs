//! Real-time update distribution for the charging dashboard.
//!
//! A [`Client`] owns one WebSocket transport to the dashboard backend and one handler registry.
//! Inbound events are decoded into typed payloads and fanned out, in arrival order, to the
//! handlers registered under the event's name. Outbound traffic is fire-and-forget: channel
//! joins, location updates and arbitrary events are sent while connected and dropped with a
//! warning otherwise.
//!
//! # Inbound events
//!
//! | Name | Payload |
//! |------|---------|
//! | `chargerStatus` | [`ChargerStatusUpdate`] |
//! | `transactionUpdate` | [`TransactionUpdate`] |
//! | `meterValues` | [`MeterValues`] |
//! | `faultAlert` | [`FaultAlert`] |
//! | `commandResult` | [`CommandResult`] |
//! | `systemMessage` | [`SystemMessage`] |
//! | `booking:update` | [`BookingUpdate`] |
//! | `station:update` | [`StationUpdate`] |
//! | `session:update` | [`SessionUpdate`] |
//! | `notification:new` | [`Notification`] |
//!
//! Channel memberships are not replayed after an automatic reconnection; callers re-join
//! channels themselves when they need to.

pub mod client;
pub mod dispatcher;
pub mod registry;
pub mod subscription;
pub mod types;

pub use client::Client;
pub use dispatcher::{Dispatcher, FrameParser};
pub use registry::{EventRegistry, HandlerId, Unsubscribe};
pub use subscription::ChannelSubscriptions;
pub use types::*;
