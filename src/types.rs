//! Re-exported types from external crates for convenience.
//!
//! These types appear in event payloads and are re-exported here so users don't need to add
//! these dependencies to their `Cargo.toml`.

/// Date and time types for payload timestamps.
pub use chrono::{DateTime, Utc};
/// Arbitrary precision decimal type for energy, power and cost figures.
pub use rust_decimal::Decimal;
/// Macro for creating [`Decimal`] literals at compile time.
///
/// # Example
/// ```
/// use evcharge_realtime::types::dec;
/// let energy_kwh = dec!(12.5);
/// ```
pub use rust_decimal_macros::dec;
/// Connection ids are UUID v4 values generated per handshake.
pub use uuid::Uuid;
