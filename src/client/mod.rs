//! Client side of the chat service
//!
//! This module provides:
//! - The connection manager and its socket/command control loop
//! - The event classifier that turns received frames into typed events
//!
//! The presentation layer sits on the far side of two channels: it feeds
//! [`Command`]s in and consumes an ordered stream of [`ChatEvent`]s.

pub mod connection;
pub mod events;

pub use connection::{ChatClient, ClientConfig, Command};
pub use events::{ChatEvent, ChatEventKind, Classifier, Color};
