//! Room-scoped TCP chat service
//!
//! This library provides the session/room multiplexing engine of a chat
//! service and its line-oriented wire protocol. The server accepts stream
//! connections, binds each to a (username, room) pair, and routes broadcast
//! and private messages across rooms it owns on a single engine loop. The
//! client maintains one connection and classifies received frames into
//! typed events for a presentation layer.
//!
//! Each module covers one responsibility:
//!
//! - [`protocol`] encodes and classifies the wire frames shared by both
//!   sides.
//! - [`server`] owns rooms, sessions, and the multiplexing loop.
//! - [`client`] owns the outbound connection and the event classifier.
//! - [`error`] is the error type raised across the crate.

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::{ChatClient, ClientConfig};
pub use error::{ChatError, Result};
pub use server::{ChatServer, ServerConfig};

use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp in milliseconds since UNIX epoch
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
