//! Line-oriented wire protocol shared by client and server
//!
//! Frames ride directly on stream boundaries: there is no length prefix and
//! no delimiter-based reassembly, so one receive call is assumed to carry
//! exactly one logical frame. A frame split across two transport reads is
//! not put back together; this is a known boundary condition of the
//! protocol, kept rather than fixed.
//!
//! Wire formats:
//! ```text
//! connection-init   <username>:<room>                      (no trailing delimiter)
//! chat              <username>: <text>\n
//! private (c -> s)  [PM]<sender>:<target>:<text>\n
//! private (s -> c)  [PM]<sender>:<text>
//! presence          <username> joined room <room>!\n
//!                   <username> left room <room>!\n
//! membership list   Members in room <room>: <a>, <b>, ...\n
//! routing miss      User <target> not found.\n
//! ```
//!
//! Receivers recognize frames by prefix and substring, not by a structured
//! tag, so classification order matters: a chat message whose text contains
//! " joined " is indistinguishable from a presence frame. The classifiers
//! below preserve that precedence exactly.

use bytes::Bytes;

/// Literal prefix marking a private-message frame.
pub const PM_PREFIX: &str = "[PM]";

/// Substring marking a membership-list frame.
pub const MEMBER_LIST_MARKER: &str = "Members in room";

/// Size of the buffer used for one receive call, on both sides. Doubles as
/// the de facto maximum frame size.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Encode the connection-init frame sent once after connecting.
pub fn encode_init(username: &str, room: &str) -> Bytes {
    Bytes::from(format!("{}:{}", username, room))
}

/// Encode a chat frame.
pub fn encode_chat(username: &str, text: &str) -> Bytes {
    Bytes::from(format!("{}: {}\n", username, text))
}

/// Encode a client-to-server private-message frame.
pub fn encode_private_send(sender: &str, target: &str, text: &str) -> Bytes {
    Bytes::from(format!("{}{}:{}:{}\n", PM_PREFIX, sender, target, text))
}

/// Encode the server-to-recipient private-message frame. `text` is taken
/// verbatim from the client frame and already carries its trailing newline.
pub fn encode_private_deliver(sender: &str, text: &str) -> Bytes {
    Bytes::from(format!("{}{}:{}", PM_PREFIX, sender, text))
}

/// Encode a join presence frame.
pub fn encode_joined(username: &str, room: &str) -> Bytes {
    Bytes::from(format!("{} joined room {}!\n", username, room))
}

/// Encode a leave presence frame.
pub fn encode_left(username: &str, room: &str) -> Bytes {
    Bytes::from(format!("{} left room {}!\n", username, room))
}

/// Encode a membership-list frame, usernames comma-joined in join order.
pub fn encode_member_list(room: &str, names: &[String]) -> Bytes {
    Bytes::from(format!("{} {}: {}\n", MEMBER_LIST_MARKER, room, names.join(", ")))
}

/// Encode the error frame returned to a sender whose private-message
/// target is not connected.
pub fn encode_user_not_found(target: &str) -> Bytes {
    Bytes::from(format!("User {} not found.\n", target))
}

/// Parse a connection-init frame into `(username, room)`.
///
/// The split is on the FIRST `:`, so a username containing `:` silently
/// donates its tail to the room name. Returns `None` when the delimiter is
/// missing entirely; the server drops such connections without a session.
pub fn parse_init(frame: &[u8]) -> Option<(String, String)> {
    let text = String::from_utf8_lossy(frame);
    let (username, room) = text.split_once(':')?;
    Some((username.to_string(), room.to_string()))
}

/// Strip one trailing newline for display.
pub fn strip_newline(text: &str) -> &str {
    text.strip_suffix('\n').unwrap_or(text)
}

/// One frame received by the server from a bound session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame<'a> {
    /// `[PM]sender:target:text` — `text` keeps its trailing newline.
    Private {
        sender: &'a str,
        target: &'a str,
        text: &'a str,
    },
    /// Anything without the private-message prefix; broadcast verbatim.
    Chat(&'a str),
}

impl<'a> ClientFrame<'a> {
    /// Classify one received frame. Returns `None` for a `[PM]` frame whose
    /// target or text field is missing; such frames are dropped silently.
    pub fn classify(raw: &'a str) -> Option<Self> {
        match raw.strip_prefix(PM_PREFIX) {
            Some(rest) => {
                let (sender, rest) = rest.split_once(':')?;
                let (target, text) = rest.split_once(':')?;
                Some(ClientFrame::Private { sender, target, text })
            }
            None => Some(ClientFrame::Chat(raw)),
        }
    }
}

/// One frame received by the client from the server.
///
/// Classification precedence, first match wins: private prefix, presence
/// substrings, membership-list substring, colon split, fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame<'a> {
    /// `[PM]sender:text`.
    Private { sender: &'a str, text: &'a str },
    /// Join/leave notification, carried whole.
    Presence(&'a str),
    /// Membership snapshot, carried whole; contains `:` but must not be
    /// reclassified as chat.
    MemberList(&'a str),
    /// `sender: text`.
    Chat { sender: &'a str, text: &'a str },
    /// Anything that matched no rule above.
    Other(&'a str),
}

impl<'a> ServerFrame<'a> {
    /// Classify one received frame. Returns `None` only for a `[PM]` frame
    /// with no colon after the prefix, which is dropped without a trace.
    pub fn classify(raw: &'a str) -> Option<Self> {
        if let Some(rest) = raw.strip_prefix(PM_PREFIX) {
            let (sender, text) = rest.split_once(':')?;
            return Some(ServerFrame::Private { sender, text });
        }
        if raw.contains(" joined ") || raw.contains(" left ") {
            return Some(ServerFrame::Presence(raw));
        }
        if raw.contains(MEMBER_LIST_MARKER) {
            return Some(ServerFrame::MemberList(raw));
        }
        if let Some((sender, text)) = raw.split_once(':') {
            return Some(ServerFrame::Chat { sender, text });
        }
        Some(ServerFrame::Other(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_formats() {
        assert_eq!(&encode_init("alice", "lobby")[..], b"alice:lobby");
        assert_eq!(&encode_chat("alice", "hello")[..], b"alice: hello\n");
        assert_eq!(
            &encode_private_send("alice", "bob", "psst")[..],
            b"[PM]alice:bob:psst\n"
        );
        assert_eq!(
            &encode_private_deliver("alice", "psst\n")[..],
            b"[PM]alice:psst\n"
        );
        assert_eq!(
            &encode_joined("alice", "lobby")[..],
            b"alice joined room lobby!\n"
        );
        assert_eq!(&encode_left("alice", "lobby")[..], b"alice left room lobby!\n");
        assert_eq!(
            &encode_member_list("lobby", &["alice".to_string(), "bob".to_string()])[..],
            b"Members in room lobby: alice, bob\n"
        );
        assert_eq!(
            &encode_user_not_found("bob")[..],
            b"User bob not found.\n"
        );
    }

    #[test]
    fn test_member_list_empty_room() {
        assert_eq!(&encode_member_list("lobby", &[])[..], b"Members in room lobby: \n");
    }

    #[test]
    fn test_parse_init() {
        assert_eq!(
            parse_init(b"alice:lobby"),
            Some(("alice".to_string(), "lobby".to_string()))
        );
        assert_eq!(parse_init(b"no delimiter here"), None);
    }

    #[test]
    fn test_parse_init_colon_in_username_missplits() {
        // The first colon wins; "a:b" joining "lobby" lands in room "b:lobby".
        assert_eq!(
            parse_init(b"a:b:lobby"),
            Some(("a".to_string(), "b:lobby".to_string()))
        );
    }

    #[test]
    fn test_client_frame_chat() {
        assert_eq!(
            ClientFrame::classify("alice: hello\n"),
            Some(ClientFrame::Chat("alice: hello\n"))
        );
    }

    #[test]
    fn test_client_frame_private() {
        assert_eq!(
            ClientFrame::classify("[PM]alice:bob:psst\n"),
            Some(ClientFrame::Private {
                sender: "alice",
                target: "bob",
                text: "psst\n"
            })
        );
    }

    #[test]
    fn test_client_frame_malformed_private_dropped() {
        assert_eq!(ClientFrame::classify("[PM]alice"), None);
        assert_eq!(ClientFrame::classify("[PM]alice:bob"), None);
    }

    #[test]
    fn test_server_frame_private_wins_over_everything() {
        assert_eq!(
            ServerFrame::classify("[PM]alice:hi\n"),
            Some(ServerFrame::Private {
                sender: "alice",
                text: "hi\n"
            })
        );
        assert_eq!(ServerFrame::classify("[PM]garbage"), None);
    }

    #[test]
    fn test_server_frame_presence() {
        assert_eq!(
            ServerFrame::classify("bob joined room lobby!\n"),
            Some(ServerFrame::Presence("bob joined room lobby!\n"))
        );
        assert_eq!(
            ServerFrame::classify("bob left room lobby!\n"),
            Some(ServerFrame::Presence("bob left room lobby!\n"))
        );
    }

    #[test]
    fn test_server_frame_presence_ambiguity_is_inherited() {
        // A chat frame whose text happens to contain " joined " matches the
        // presence rule first. The ambiguity is part of the protocol.
        assert_eq!(
            ServerFrame::classify("bob: i just joined a gym\n"),
            Some(ServerFrame::Presence("bob: i just joined a gym\n"))
        );
    }

    #[test]
    fn test_server_frame_member_list_not_chat() {
        // Contains ':' but the membership rule fires first.
        assert_eq!(
            ServerFrame::classify("Members in room lobby: alice, bob\n"),
            Some(ServerFrame::MemberList("Members in room lobby: alice, bob\n"))
        );
    }

    #[test]
    fn test_server_frame_chat_split() {
        assert_eq!(
            ServerFrame::classify("alice: hello\n"),
            Some(ServerFrame::Chat {
                sender: "alice",
                text: " hello\n"
            })
        );
    }

    #[test]
    fn test_server_frame_fallback() {
        assert_eq!(
            ServerFrame::classify("User bob not found.\n"),
            Some(ServerFrame::Other("User bob not found.\n"))
        );
    }

    #[test]
    fn test_chat_roundtrip() {
        let encoded = encode_chat("alice", "hello");
        let raw = std::str::from_utf8(&encoded).unwrap();
        match ServerFrame::classify(raw) {
            Some(ServerFrame::Chat { sender, text }) => {
                assert_eq!(sender, "alice");
                assert_eq!(strip_newline(text).trim_start_matches(' '), "hello");
            }
            other => panic!("expected chat frame, got {:?}", other),
        }
    }

    #[test]
    fn test_strip_newline() {
        assert_eq!(strip_newline("hello\n"), "hello");
        assert_eq!(strip_newline("hello"), "hello");
        assert_eq!(strip_newline("hello\n\n"), "hello\n");
    }
}
