//! Classification of received frames into presentation-facing events

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::current_timestamp;
use crate::protocol::frame::{strip_newline, ServerFrame};

/// What a chat event is, from the local user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatEventKind {
    /// A message this client sent to its room
    Sent,
    /// A room message from another member
    Received,
    /// A private message this client sent
    PrivateSent,
    /// A private message delivered to this client
    PrivateReceived,
    /// Presence, membership lists, errors, and anything unclassified
    System,
}

/// One entry in the presentation layer's ordered event log.
///
/// The timestamp is client-local milliseconds since the UNIX epoch,
/// assigned at receipt or send time; it is never part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub kind: ChatEventKind,
    /// Display text, trailing newline stripped
    pub text: String,
    /// Sender for received traffic; the target for `PrivateSent`
    pub sender: Option<String>,
    pub timestamp: u64,
}

impl ChatEvent {
    /// A system event with no sender attribution.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            kind: ChatEventKind::System,
            text: text.into(),
            sender: None,
            timestamp: current_timestamp(),
        }
    }

    /// The local event appended when a chat frame is sent.
    pub fn sent(text: impl Into<String>) -> Self {
        Self {
            kind: ChatEventKind::Sent,
            text: text.into(),
            sender: None,
            timestamp: current_timestamp(),
        }
    }

    /// The local event appended when a private message is sent. There is no
    /// round-trip confirmation; this is appended at send time.
    pub fn private_sent(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: ChatEventKind::PrivateSent,
            text: text.into(),
            sender: Some(target.into()),
            timestamp: current_timestamp(),
        }
    }
}

/// Classifies raw received frames for one session.
#[derive(Debug, Clone)]
pub struct Classifier {
    username: String,
}

impl Classifier {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// Map one received frame to an event, mirroring the server's loose
    /// substring framing. A chat frame whose sender equals the local
    /// username classifies as `Sent`: the self-echo path, which keeps the
    /// local send the single rendered copy even if the server ever echoes.
    ///
    /// Returns `None` for a malformed private frame, which is dropped
    /// without a trace.
    pub fn classify(&self, raw: &str) -> Option<ChatEvent> {
        let event = match ServerFrame::classify(raw)? {
            ServerFrame::Private { sender, text } => ChatEvent {
                kind: ChatEventKind::PrivateReceived,
                text: strip_newline(text).to_string(),
                sender: Some(sender.to_string()),
                timestamp: current_timestamp(),
            },
            ServerFrame::Presence(whole) => ChatEvent::system(strip_newline(whole)),
            ServerFrame::MemberList(whole) => ChatEvent::system(strip_newline(whole)),
            ServerFrame::Chat { sender, text } => {
                let text = strip_newline(text.strip_prefix(' ').unwrap_or(text));
                let kind = if sender == self.username {
                    ChatEventKind::Sent
                } else {
                    ChatEventKind::Received
                };
                ChatEvent {
                    kind,
                    text: text.to_string(),
                    sender: Some(sender.to_string()),
                    timestamp: current_timestamp(),
                }
            }
            ServerFrame::Other(whole) => ChatEvent::system(strip_newline(whole)),
        };
        Some(event)
    }
}

/// Display colors for sender attribution, in palette order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Cyan,
    Yellow,
    Magenta,
    Blue,
}

const PALETTE: [Color; 4] = [Color::Cyan, Color::Yellow, Color::Magenta, Color::Blue];

impl Color {
    /// Deterministic palette slot for a sender name. The hasher is keyed
    /// identically on every call, so the mapping is stable for the whole
    /// session.
    pub fn for_name(name: &str) -> Color {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        PALETTE[(hasher.finish() as usize) % PALETTE.len()]
    }
}
