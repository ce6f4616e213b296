//! Session table: the binding between live connections and (username, room)

use std::collections::BTreeMap;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Handle identifying one live connection. Allocated from a monotonic
/// counter and never reused for the lifetime of the process.
pub type SessionId = u64;

/// A bound session.
#[derive(Debug)]
pub struct Session {
    /// Username, first-write-wins at connection-init time
    pub username: String,
    /// Name of the room this session is bound to
    pub room: String,
    outbox: mpsc::UnboundedSender<Bytes>,
}

impl Session {
    /// Queue one frame for delivery. The outbox is drained in FIFO order by
    /// the connection's writer task; a failed send means the writer is gone
    /// and the reader side will surface the disconnect, so it is ignored.
    pub fn send(&self, frame: Bytes) {
        let _ = self.outbox.send(frame);
    }
}

/// Table of bound sessions in connect order.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: BTreeMap<SessionId, Session>,
    next_id: SessionId,
}

impl SessionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and return its freshly allocated handle.
    pub fn insert(
        &mut self,
        username: String,
        room: String,
        outbox: mpsc::UnboundedSender<Bytes>,
    ) -> SessionId {
        let id = self.next_id;
        self.next_id += 1;
        self.sessions.insert(
            id,
            Session {
                username,
                room,
                outbox,
            },
        );
        id
    }

    /// Remove a session, releasing its handle. Dropping the returned
    /// session closes its outbox, which ends the writer task.
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    /// Look up a session by handle.
    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Look up a session by username across the whole table, in connect
    /// order. The lookup is deliberately not room-scoped; on a username
    /// collision the earliest-connected session wins.
    pub fn find_by_username(&self, username: &str) -> Option<(SessionId, &Session)> {
        self.sessions
            .iter()
            .find(|(_, s)| s.username == username)
            .map(|(id, s)| (*id, s))
    }

    /// Number of bound sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
