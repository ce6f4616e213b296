//! Client connection manager
//!
//! Owns the single outbound connection for its whole life: one connect, one
//! send of the connection-init frame, then a control loop that multiplexes
//! socket readiness with commands from the presentation layer. There is no
//! reconnect; server disconnect is a terminal state surfaced as a `System`
//! event in the same stream as chat.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::client::events::{ChatEvent, Classifier};
use crate::error::{ChatError, Result};
use crate::protocol::frame::{self, READ_BUFFER_SIZE};

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address to connect to
    pub server_addr: SocketAddr,
    /// Username to bind; first-write-wins on the server, never revalidated
    pub username: String,
    /// Room to join
    pub room: String,
}

/// Commands the presentation layer can issue to the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send a chat frame to the room
    Chat(String),
    /// Send a private message to a named user
    Private { target: String, text: String },
    /// Terminate the loop; the server observes the close as EOF
    Quit,
}

/// Handle on one connected chat session.
pub struct ChatClient {
    config: ClientConfig,
    stream: TcpStream,
}

impl ChatClient {
    /// Connect to the server and send the connection-init frame. The
    /// connection is used exactly once; a failure here is fatal to the
    /// session.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let mut stream = TcpStream::connect(config.server_addr).await.map_err(|e| {
            ChatError::connection(format!("failed to connect to {}: {}", config.server_addr, e))
        })?;

        stream
            .write_all(&frame::encode_init(&config.username, &config.room))
            .await
            .map_err(|e| ChatError::network(format!("failed to send connection init: {}", e)))?;

        info!(
            "connected to {} as {} in room {}",
            config.server_addr, config.username, config.room
        );

        Ok(Self { config, stream })
    }

    /// Username this session is bound to.
    pub fn username(&self) -> &str {
        &self.config.username
    }

    /// Room this session joined.
    pub fn room(&self) -> &str {
        &self.config.room
    }

    /// Control loop: one non-blocking read per socket readiness, one
    /// command at a time from the presentation layer, until quit or server
    /// disconnect. Classified events and local send echoes flow out over
    /// `events` in order.
    pub async fn run(
        self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        events: mpsc::UnboundedSender<ChatEvent>,
    ) -> Result<()> {
        let ChatClient { config, stream } = self;
        let classifier = Classifier::new(config.username.clone());
        let (mut reader, mut writer) = stream.into_split();
        let mut buf = [0u8; READ_BUFFER_SIZE];

        loop {
            tokio::select! {
                read = reader.read(&mut buf) => match read {
                    Ok(0) | Err(_) => {
                        let _ = events.send(ChatEvent::system("Disconnected from server."));
                        break;
                    }
                    Ok(n) => {
                        // One receive call is one logical frame, same
                        // assumption as the server side.
                        let raw = String::from_utf8_lossy(&buf[..n]);
                        if let Some(event) = classifier.classify(&raw) {
                            if events.send(event).is_err() {
                                break;
                            }
                        }
                    }
                },
                command = commands.recv() => match command {
                    Some(Command::Chat(text)) => {
                        let data = frame::encode_chat(&config.username, &text);
                        if let Err(err) = writer.write_all(&data).await {
                            let _ = events.send(ChatEvent::system(format!(
                                "Failed to send message: {}",
                                err
                            )));
                            break;
                        }
                        let _ = events.send(ChatEvent::sent(text));
                    }
                    Some(Command::Private { target, text }) => {
                        let data = frame::encode_private_send(&config.username, &target, &text);
                        if let Err(err) = writer.write_all(&data).await {
                            let _ = events.send(ChatEvent::system(format!(
                                "Failed to send message: {}",
                                err
                            )));
                            break;
                        }
                        let _ = events.send(ChatEvent::private_sent(target, text));
                    }
                    Some(Command::Quit) | None => {
                        debug!("client loop terminating");
                        break;
                    }
                },
            }
        }

        Ok(())
    }
}
