//! Server side of the chat service
//!
//! This module provides:
//! - The engine loop that accepts connections and multiplexes all session
//!   traffic on one task
//! - The room registry (membership, message history)
//! - The session table (connection ↔ username/room bindings)

pub mod engine;
pub mod rooms;
pub mod sessions;

pub use engine::{ChatServer, ServerConfig};
pub use rooms::{Member, Room, RoomRegistry};
pub use sessions::{Session, SessionId, SessionTable};
