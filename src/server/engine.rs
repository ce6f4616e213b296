//! Chat server: accept loop, session plumbing, and the engine that owns
//! all room and session state
//!
//! One engine loop multiplexes the listening socket, the per-session event
//! channel, and a shutdown future. The loop is the sole owner of the
//! [`RoomRegistry`] and [`SessionTable`]; per-session reader and writer
//! tasks touch only their own socket half and channels, so every mutation
//! of shared chat state is serialized by construction, without locks.

use std::future::Future;
use std::net::SocketAddr;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{ChatError, Result};
use crate::protocol::frame::{self, ClientFrame, READ_BUFFER_SIZE};
use crate::server::rooms::RoomRegistry;
use crate::server::sessions::{SessionId, SessionTable};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,
    /// Maximum concurrent sessions; connections beyond this are dropped at
    /// accept time
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9000".parse().unwrap(),
            max_connections: 1024,
        }
    }
}

/// Events flowing from per-session reader tasks to the engine loop.
#[derive(Debug)]
enum SessionEvent {
    /// One receive call's worth of bytes, assumed to be one logical frame.
    Frame { id: SessionId, data: Bytes },
    /// Read error or zero-byte read; the peer is gone.
    Closed { id: SessionId },
}

/// Room-scoped chat server.
pub struct ChatServer {
    config: ServerConfig,
    listener: TcpListener,
}

impl ChatServer {
    /// Bind the listening socket. A bind failure here is fatal to the
    /// process; everything after this point is connection-scoped.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await.map_err(|e| {
            ChatError::network(format!("failed to bind {}: {}", config.bind_addr, e))
        })?;
        Ok(Self { config, listener })
    }

    /// The address actually bound (useful when binding port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the engine loop until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let ChatServer { config, listener } = self;
        let mut engine = Engine::new();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        tokio::pin!(shutdown);

        info!("server listening on {}", listener.local_addr()?);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("server shutting down");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        handle_accept(&config, &mut engine, stream, peer, &event_tx).await;
                    }
                    Err(err) => warn!("failed to accept connection: {}", err),
                },
                event = event_rx.recv() => match event {
                    Some(SessionEvent::Frame { id, data }) => engine.handle_frame(id, &data),
                    Some(SessionEvent::Closed { id }) => engine.handle_closed(id),
                    // Unreachable while event_tx is held above.
                    None => break,
                },
            }
        }

        Ok(())
    }

    /// Run until ctrl-c is received.
    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("failed to install ctrl-c handler: {}", err);
            }
        })
        .await
    }
}

/// Accept path: one inline read of the connection-init frame. A read
/// failure, immediate EOF, or a frame without the `:` delimiter drops the
/// connection silently with no session created.
async fn handle_accept(
    config: &ServerConfig,
    engine: &mut Engine,
    mut stream: TcpStream,
    peer: SocketAddr,
    event_tx: &mpsc::UnboundedSender<SessionEvent>,
) {
    if engine.sessions.len() >= config.max_connections {
        warn!("connection limit reached, dropping connection from {}", peer);
        return;
    }

    let mut buf = [0u8; READ_BUFFER_SIZE];
    let read = match stream.read(&mut buf).await {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };

    let Some((username, room)) = frame::parse_init(&buf[..read]) else {
        debug!("malformed connection init from {}, dropping", peer);
        return;
    };

    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
    let (read_half, write_half) = stream.into_split();

    let id = engine.register(username, room, outbox_tx, peer);
    spawn_writer(id, write_half, outbox_rx);
    spawn_reader(id, read_half, event_tx.clone());
}

/// Reader task: one `read` per readiness wakeup; each nonempty buffer is
/// forwarded to the engine as one frame. Zero-byte reads and read errors
/// both mean the peer is gone.
fn spawn_reader(id: SessionId, mut read_half: OwnedReadHalf, events: mpsc::UnboundedSender<SessionEvent>) {
    tokio::spawn(async move {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            match read_half.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let data = Bytes::copy_from_slice(&buf[..n]);
                    if events.send(SessionEvent::Frame { id, data }).is_err() {
                        return;
                    }
                }
            }
        }
        let _ = events.send(SessionEvent::Closed { id });
    });
}

/// Writer task: drains the session outbox in FIFO order. A write failure
/// ends the task; the reader observes the broken connection separately.
fn spawn_writer(id: SessionId, mut write_half: OwnedWriteHalf, mut outbox: mpsc::UnboundedReceiver<Bytes>) {
    tokio::spawn(async move {
        while let Some(data) = outbox.recv().await {
            if let Err(err) = write_half.write_all(&data).await {
                debug!("failed to deliver frame to session {}: {}", id, err);
                break;
            }
        }
    });
}

/// The engine owns all mutable chat state. It lives inside the server loop,
/// so every mutation runs to completion before the next readiness wait.
struct Engine {
    registry: RoomRegistry,
    sessions: SessionTable,
}

impl Engine {
    fn new() -> Self {
        Self {
            registry: RoomRegistry::new(),
            sessions: SessionTable::new(),
        }
    }

    /// Bind a new session: replay the room history, send the membership
    /// snapshot (taken before the newcomer lands in the list), register the
    /// membership, then announce the join to the other members. Replay and
    /// snapshot reach the newcomer before any live broadcast because its
    /// outbox is FIFO.
    fn register(
        &mut self,
        username: String,
        room: String,
        outbox: mpsc::UnboundedSender<Bytes>,
        peer: SocketAddr,
    ) -> SessionId {
        let id = self.sessions.insert(username.clone(), room.clone(), outbox);
        info!("{} connected to room {} from {}", username, room, peer);

        let replay: Vec<Bytes> = self.registry.ensure(&room).history().to_vec();
        let snapshot = self.registry.member_list(&room);
        if let Some(session) = self.sessions.get(id) {
            for data in replay {
                session.send(data);
            }
            session.send(snapshot);
        }

        self.registry.join(&room, id, &username);
        self.broadcast_room(&room, frame::encode_joined(&username, &room), Some(id));

        id
    }

    /// Dispatch one frame from a bound session: private messages route by
    /// global username lookup, everything else is a chat frame broadcast
    /// verbatim to the sender's room.
    fn handle_frame(&mut self, id: SessionId, data: &[u8]) {
        let Some(session) = self.sessions.get(id) else {
            return;
        };
        let username = session.username.clone();
        let room = session.room.clone();

        let text = String::from_utf8_lossy(data);
        match ClientFrame::classify(&text) {
            Some(ClientFrame::Private { sender, target, text }) => {
                self.route_private(id, &room, sender, target, text);
            }
            Some(ClientFrame::Chat(_)) => {
                debug!("[{}] {}: chat frame, {} bytes", room, username, data.len());
                self.broadcast_room(&room, Bytes::copy_from_slice(data), Some(id));
            }
            // Malformed private frame, dropped.
            None => {}
        }
    }

    /// Route a private message. The rewritten frame goes to both target and
    /// sender on a hit; on a miss only the sender hears about it.
    fn route_private(&self, from: SessionId, room: &str, sender: &str, target: &str, text: &str) {
        match self.sessions.find_by_username(target) {
            Some((_, target_session)) => {
                debug!("[{}] PM from {} to {}", room, sender, target);
                let delivery = frame::encode_private_deliver(sender, text);
                target_session.send(delivery.clone());
                if let Some(session) = self.sessions.get(from) {
                    session.send(delivery);
                }
            }
            None => {
                debug!("[{}] PM from {} to unknown user {}", room, sender, target);
                if let Some(session) = self.sessions.get(from) {
                    session.send(frame::encode_user_not_found(target));
                }
            }
        }
    }

    /// Tear down a closed session: leave the room, announce the departure
    /// to the remaining members, and drop the room if it emptied. Dropping
    /// the session closes its outbox, which ends the writer task.
    fn handle_closed(&mut self, id: SessionId) {
        let Some(session) = self.sessions.remove(id) else {
            return;
        };
        let username = session.username.clone();
        let room = session.room.clone();
        drop(session);
        info!("{} disconnected from room {}", username, room);

        let emptied = self.registry.leave(&room, id);
        if emptied {
            debug!("room {} emptied, dropping it", room);
        } else {
            self.broadcast_room(&room, frame::encode_left(&username, &room), None);
        }
    }

    /// Append a frame to the room history and fan it out to the members,
    /// minus `exclude`. Broadcast clones the frame handle, not the payload.
    fn broadcast_room(&mut self, room: &str, data: Bytes, exclude: Option<SessionId>) {
        for recipient in self.registry.broadcast(room, data.clone(), exclude) {
            if let Some(session) = self.sessions.get(recipient) {
                session.send(data.clone());
            }
        }
    }
}
