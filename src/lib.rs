#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod auth;
pub mod error;
pub mod realtime;
pub(crate) mod serde_helpers;
pub mod types;
pub mod ws;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Environment variable holding the dashboard's WebSocket base URL
pub const ENDPOINT_VAR: &str = "EVCHARGE_WS_URL";

/// Endpoint used by [`realtime::Client::from_env`] when [`ENDPOINT_VAR`] is unset
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:3001";
