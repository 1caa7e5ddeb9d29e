//! QUIC-based chat relay with room-scoped broadcast
//!
//! This library provides a chat relay where clients authenticate against a
//! durable credential store, join named rooms, and exchange messages and
//! typing-activity signals scoped to their current room.

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;
pub mod transport;

pub use client::{RelayClient, RelayClientConfig};
pub use error::{RelayError, Result};
pub use server::{RelayConfig, RelayServer};

use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp in milliseconds since UNIX epoch
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
