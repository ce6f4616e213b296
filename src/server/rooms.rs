//! Room registry for the chat server
//!
//! This module owns server-side room state: name-keyed rooms, join-ordered
//! membership, and append-only message history. The registry is plain
//! synchronous state owned exclusively by the engine loop, so membership
//! mutation and broadcast are atomic with respect to each other and no
//! operation can observe a torn member list.

use std::collections::HashMap;

use bytes::Bytes;

use crate::protocol::frame;
use crate::server::sessions::SessionId;

/// A member of a room. The username is copied in at join time so the
/// membership snapshot does not need the session table.
#[derive(Debug, Clone)]
pub struct Member {
    /// Session handle of the member's connection
    pub session: SessionId,
    /// Username bound at connection-init time
    pub username: String,
}

/// A chat room: join-ordered members plus append-only frame history.
///
/// A room exists in the registry if and only if it has at least one member
/// (or is mid-creation for its first joiner); the registry drops it, history
/// included, when the last member leaves.
#[derive(Debug, Default)]
pub struct Room {
    members: Vec<Member>,
    history: Vec<Bytes>,
}

impl Room {
    /// Current members in join order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Member count.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Every frame broadcast to this room so far, in append order.
    pub fn history(&self) -> &[Bytes] {
        &self.history
    }
}

/// Registry of all live rooms, keyed by case-sensitive room name.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the existing room or create an empty one; idempotent.
    pub fn ensure(&mut self, name: &str) -> &mut Room {
        self.rooms.entry(name.to_string()).or_default()
    }

    /// Look up a room by name.
    pub fn get(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    /// Whether a room with this name currently exists.
    pub fn contains(&self, name: &str) -> bool {
        self.rooms.contains_key(name)
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Append a session to the room's membership, creating the room on its
    /// first join.
    pub fn join(&mut self, name: &str, session: SessionId, username: &str) {
        self.ensure(name).members.push(Member {
            session,
            username: username.to_string(),
        });
    }

    /// Remove a session from the room's membership. The room and its
    /// history are dropped when the last member leaves; returns `true` in
    /// that case.
    pub fn leave(&mut self, name: &str, session: SessionId) -> bool {
        let Some(room) = self.rooms.get_mut(name) else {
            return false;
        };
        room.members.retain(|m| m.session != session);
        if room.members.is_empty() {
            self.rooms.remove(name);
            true
        } else {
            false
        }
    }

    /// Append `frame` to the room's history and return the sessions it
    /// should be delivered to, skipping `exclude`. The caller performs the
    /// sends; a missing room yields no recipients and no history entry.
    pub fn broadcast(
        &mut self,
        name: &str,
        frame: Bytes,
        exclude: Option<SessionId>,
    ) -> Vec<SessionId> {
        let Some(room) = self.rooms.get_mut(name) else {
            return Vec::new();
        };
        room.history.push(frame);
        room.members
            .iter()
            .map(|m| m.session)
            .filter(|s| Some(*s) != exclude)
            .collect()
    }

    /// Membership snapshot frame for a room: usernames comma-joined in join
    /// order. A missing or empty room snapshots to an empty name list.
    pub fn member_list(&self, name: &str) -> Bytes {
        let names: Vec<String> = self
            .rooms
            .get(name)
            .map(|room| room.members.iter().map(|m| m.username.clone()).collect())
            .unwrap_or_default();
        frame::encode_member_list(name, &names)
    }
}
