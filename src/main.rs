//! Parley - room-scoped TCP chat
//!
//! Usage:
//!   cargo run -- server                                  # Run the server
//!   cargo run -- server --port 9000                      # Run on a specific port
//!   cargo run -- client --username alice --room lobby    # Join a room

use std::env;
use std::net::SocketAddr;

use anyhow::Result;
use parley::client::{ChatClient, ChatEvent, ChatEventKind, ClientConfig, Color, Command};
use parley::server::{ChatServer, ServerConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    match args[1].as_str() {
        "server" => run_server(&args).await?,
        "client" => run_client(&args).await?,
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_usage();
        }
    }

    Ok(())
}

fn print_usage() {
    println!("Parley - Room-Scoped TCP Chat");
    println!();
    println!("USAGE:");
    println!("    parley server [OPTIONS]");
    println!("    parley client --username <NAME> --room <ROOM> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    server              Start the chat server");
    println!("    client              Connect to a server and join a room");
    println!("    help                Show this help message");
    println!();
    println!("SERVER OPTIONS:");
    println!("    --port <PORT>       Port to listen on (default: 9000)");
    println!("    --max-conn <NUM>    Maximum connections (default: 1024)");
    println!();
    println!("CLIENT OPTIONS:");
    println!("    --username <NAME>   Username to chat as (required)");
    println!("    --room <ROOM>       Room to join (required)");
    println!("    --server <ADDR>     Server address (default: 127.0.0.1:9000)");
    println!();
    println!("CLIENT INPUT:");
    println!("    <text>              Send a chat message to the room");
    println!("    @<user> <text>      Send a private message");
    println!("    exit                Leave the chat");
    println!();
    println!("EXAMPLES:");
    println!("    parley server --port 9000");
    println!("    parley client --username alice --room lobby");
    println!("    RUST_LOG=debug parley server");
}

/// Wrap a sender name in the ANSI escape for its palette color.
fn tint(name: &str) -> String {
    let code = match Color::for_name(name) {
        Color::Cyan => "\x1b[36m",
        Color::Yellow => "\x1b[33m",
        Color::Magenta => "\x1b[35m",
        Color::Blue => "\x1b[34m",
    };
    format!("{}{}\x1b[0m", code, name)
}

fn flag_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

async fn run_server(args: &[String]) -> Result<()> {
    let port: u16 = flag_value(args, "--port")
        .and_then(|v| v.parse().ok())
        .unwrap_or(9000);
    let max_connections: usize = flag_value(args, "--max-conn")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1024);

    let config = ServerConfig {
        bind_addr: format!("0.0.0.0:{}", port).parse()?,
        max_connections,
    };

    let server = ChatServer::bind(config).await?;
    server.run_until_ctrl_c().await?;
    Ok(())
}

async fn run_client(args: &[String]) -> Result<()> {
    let Some(username) = flag_value(args, "--username") else {
        anyhow::bail!("--username is required");
    };
    let Some(room) = flag_value(args, "--room") else {
        anyhow::bail!("--room is required");
    };
    if username.is_empty() {
        anyhow::bail!("username cannot be empty");
    }

    let server_addr: SocketAddr = flag_value(args, "--server")
        .unwrap_or_else(|| "127.0.0.1:9000".to_string())
        .parse()?;

    let client = ChatClient::connect(ClientConfig {
        server_addr,
        username,
        room,
    })
    .await?;

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ChatEvent>();

    // Stdin lines become commands: `exit` quits, a leading `@target ` marks
    // a private message, everything else is room chat. Line editing beyond
    // what the terminal provides is out of scope here.
    let input_task = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim_end().to_string();
            if line.is_empty() {
                continue;
            }
            let command = if line == "exit" {
                Command::Quit
            } else if let Some(rest) = line.strip_prefix('@') {
                match rest.split_once(' ') {
                    Some((target, text)) if !text.is_empty() => Command::Private {
                        target: target.to_string(),
                        text: text.to_string(),
                    },
                    _ => continue,
                }
            } else {
                Command::Chat(line)
            };
            let quit = command == Command::Quit;
            if command_tx.send(command).is_err() || quit {
                break;
            }
        }
    });

    // Events become stdout lines, in log order, with sender names tinted by
    // their stable palette color.
    let render_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let line = match event.kind {
                ChatEventKind::Sent => format!("You: {}", event.text),
                ChatEventKind::Received => {
                    let sender = event.sender.as_deref().unwrap_or("");
                    format!("{}: {}", tint(sender), event.text)
                }
                ChatEventKind::PrivateSent => format!(
                    "(PM to {}): {}",
                    event.sender.as_deref().unwrap_or(""),
                    event.text
                ),
                ChatEventKind::PrivateReceived => {
                    let sender = event.sender.as_deref().unwrap_or("");
                    format!("(PM from {}): {}", tint(sender), event.text)
                }
                ChatEventKind::System => event.text,
            };
            println!("{}", line);
        }
    });

    if let Err(err) = client.run(command_rx, event_tx).await {
        warn!("client exited with error: {}", err);
    }

    input_task.abort();
    let _ = render_task.await;

    Ok(())
}
