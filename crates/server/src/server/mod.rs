//! Lobby server implementation.

use crate::config::Config;
use crate::lobby::{ConnectionId, Lobby, LobbyEvent, TracingLog, Transport};
use crate::maps::ConfigMapCatalog;
use futures_util::{SinkExt, StreamExt};
use protocol::packets::ClientPacket;
use protocol::{BinaryWriter, Color};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{RwLock, broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Sender name and color of server chat lines.
const SERVER_NAME: &str = "SERVER";
const SERVER_COLOR: Color = Color::new(255, 0, 0);
const PLAYER_COLOR: Color = Color::new(255, 255, 255);

/// A message for every joined connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyBroadcast {
    /// Serialized session.
    LobbyInfo(String),
    /// The match has started.
    StartGame,
    /// Player chat.
    Chat { name: String, message: String },
}

/// A message targeted at a specific connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetedMessage {
    /// Target connection.
    pub conn: ConnectionId,
    /// The message type.
    pub message: TargetedMessageType,
}

/// Types of targeted messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetedMessageType {
    /// Server chat line.
    Notice(String),
    /// Fatal error; a disconnect follows.
    ServerError(String),
    /// Close the connection.
    Disconnect,
}

/// [`Transport`] that fans lobby output out to the connection tasks.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    lobby_tx: broadcast::Sender<LobbyBroadcast>,
    targeted_tx: broadcast::Sender<TargetedMessage>,
}

impl ChannelTransport {
    pub fn new(
        lobby_tx: broadcast::Sender<LobbyBroadcast>,
        targeted_tx: broadcast::Sender<TargetedMessage>,
    ) -> Self {
        Self { lobby_tx, targeted_tx }
    }

    fn broadcast(&self, message: LobbyBroadcast) {
        // No receivers just means nobody is connected.
        let _ = self.lobby_tx.send(message);
    }

    fn target(&self, conn: ConnectionId, message: TargetedMessageType) {
        let _ = self.targeted_tx.send(TargetedMessage { conn, message });
    }
}

impl Transport for ChannelTransport {
    fn send_notice(&mut self, conn: ConnectionId, message: &str) {
        self.target(conn, TargetedMessageType::Notice(message.to_string()));
    }

    fn send_server_error(&mut self, conn: ConnectionId, message: &str) {
        self.target(conn, TargetedMessageType::ServerError(message.to_string()));
    }

    fn disconnect(&mut self, conn: ConnectionId) {
        self.target(conn, TargetedMessageType::Disconnect);
    }

    fn broadcast_lobby_info(&mut self, info: &str) {
        self.broadcast(LobbyBroadcast::LobbyInfo(info.to_string()));
    }

    fn broadcast_start_game(&mut self) {
        self.broadcast(LobbyBroadcast::StartGame);
    }

    fn broadcast_chat(&mut self, name: &str, message: &str) {
        self.broadcast(LobbyBroadcast::Chat {
            name: name.to_string(),
            message: message.to_string(),
        });
    }
}

/// Connection tracking state (shared across connection handlers).
struct ConnectionState {
    /// Number of connections per IP address.
    ip_connections: HashMap<IpAddr, usize>,
    /// Total number of connections.
    total_connections: usize,
}

impl ConnectionState {
    fn new() -> Self {
        Self {
            ip_connections: HashMap::new(),
            total_connections: 0,
        }
    }

    /// Try to add a connection, returns true if allowed.
    fn try_add_connection(&mut self, ip: IpAddr, max_total: usize, max_per_ip: usize) -> bool {
        if self.total_connections >= max_total {
            return false;
        }
        let current = self.ip_connections.get(&ip).copied().unwrap_or(0);
        if current >= max_per_ip {
            return false;
        }

        *self.ip_connections.entry(ip).or_insert(0) += 1;
        self.total_connections += 1;
        true
    }

    /// Remove a connection.
    fn remove_connection(&mut self, ip: IpAddr) {
        if let Some(count) = self.ip_connections.get_mut(&ip) {
            if *count > 0 {
                *count -= 1;
                self.total_connections = self.total_connections.saturating_sub(1);
            }
            if *count == 0 {
                self.ip_connections.remove(&ip);
            }
        }
    }
}

/// Run the lobby server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("{} listening on ws://{}", config.server.name, addr);

    let conn_state = Arc::new(RwLock::new(ConnectionState::new()));

    let (lobby_tx, _lobby_rx) = broadcast::channel::<LobbyBroadcast>(100);
    let (targeted_tx, _targeted_rx) = broadcast::channel::<TargetedMessage>(100);
    let (events_tx, events_rx) = mpsc::unbounded_channel::<LobbyEvent>();

    let lobby = Lobby::new(
        &config.lobby,
        Box::new(ConfigMapCatalog::new(&config.maps)),
        Box::new(ChannelTransport::new(lobby_tx.clone(), targeted_tx.clone())),
        Box::new(StdRng::from_os_rng()),
        Box::new(TracingLog),
    )?;
    tokio::spawn(run_lobby(lobby, events_rx));

    let max_connections = config.server.max_connections;
    let ip_limit = config.server.ip_limit;
    let mut next_id = 0u64;

    loop {
        let (stream, addr) = listener.accept().await?;
        let ip = addr.ip();

        {
            let mut state = conn_state.write().await;
            if !state.try_add_connection(ip, max_connections, ip_limit) {
                warn!("Connection rejected (limit reached): {}", addr);
                continue;
            }
        }

        let conn = ConnectionId(next_id);
        next_id += 1;

        let conn_state = Arc::clone(&conn_state);
        let events = events_tx.clone();
        let lobby_rx = lobby_tx.subscribe();
        let targeted_rx = targeted_tx.subscribe();

        tokio::spawn(async move {
            let result = handle_connection(stream, addr, conn, events, lobby_rx, targeted_rx).await;

            // Always remove from connection tracking when done
            {
                let mut state = conn_state.write().await;
                state.remove_connection(addr.ip());
            }

            if let Err(e) = result {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Apply lobby events one at a time until every sender is gone.
async fn run_lobby(mut lobby: Lobby, mut events: mpsc::UnboundedReceiver<LobbyEvent>) {
    while let Some(event) = events.recv().await {
        lobby.handle_event(event);
    }
    info!("Lobby closed");
}

/// Encode a lobby-wide message.
fn encode_broadcast(message: &LobbyBroadcast) -> BinaryWriter {
    match message {
        LobbyBroadcast::LobbyInfo(info) => protocol::packets::build_lobby_info(info),
        LobbyBroadcast::StartGame => protocol::packets::build_start_game(),
        LobbyBroadcast::Chat { name, message } => {
            protocol::packets::build_chat_message(PLAYER_COLOR, name, message, false)
        }
    }
}

/// What a connection does with a message from the targeted channel.
enum Targeted {
    Send(BinaryWriter),
    Ignore,
    Close,
}

/// Route a targeted message for connection `conn`.
///
/// A lagged receiver may have missed its own `Disconnect`, so it closes too;
/// the lobby treats the resulting `Left` as a normal departure.
fn route_targeted(received: Result<TargetedMessage, RecvError>, conn: ConnectionId) -> Targeted {
    let message = match received {
        Ok(msg) if msg.conn == conn => msg.message,
        Ok(_) => return Targeted::Ignore,
        Err(RecvError::Lagged(skipped)) => {
            warn!("Connection {} skipped {} targeted messages, closing", conn, skipped);
            return Targeted::Close;
        }
        Err(RecvError::Closed) => return Targeted::Close,
    };
    match message {
        TargetedMessageType::Notice(text) => Targeted::Send(
            protocol::packets::build_chat_message(SERVER_COLOR, SERVER_NAME, &text, true),
        ),
        TargetedMessageType::ServerError(text) => {
            Targeted::Send(protocol::packets::build_server_error(&text))
        }
        TargetedMessageType::Disconnect => Targeted::Close,
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    conn: ConnectionId,
    events: mpsc::UnboundedSender<LobbyEvent>,
    mut lobby_rx: broadcast::Receiver<LobbyBroadcast>,
    mut targeted_rx: broadcast::Receiver<TargetedMessage>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection {} from {}", conn, addr);

    let (mut write, mut read) = ws_stream.split();
    let mut joined = false;

    loop {
        let outgoing = tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => {
                        let event = match ClientPacket::parse(&data) {
                            Ok(ClientPacket::Join { name }) if !joined => {
                                joined = true;
                                Some(LobbyEvent::Joined { conn, name })
                            }
                            Ok(ClientPacket::Join { .. }) => {
                                debug!("Repeated join from {}", addr);
                                None
                            }
                            Ok(_) if !joined => {
                                debug!("Packet before join from {}", addr);
                                None
                            }
                            Ok(ClientPacket::Chat { message }) => Some(LobbyEvent::Chat { conn, message }),
                            Ok(ClientPacket::Command { text }) => Some(LobbyEvent::Command { conn, text }),
                            Err(e) => {
                                warn!("Packet error from {}: {}", addr, e);
                                None
                            }
                        };
                        if let Some(event) = event {
                            if events.send(event).is_err() {
                                warn!("Lobby is gone, dropping {}", addr);
                                break;
                            }
                        }
                        None
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    None => break,
                    _ => None,
                }
            }
            update = lobby_rx.recv() => {
                match update {
                    Ok(update) if joined => Some(encode_broadcast(&update)),
                    Ok(_) => None,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Connection {} skipped {} lobby updates", addr, skipped);
                        None
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            targeted = targeted_rx.recv() => {
                match route_targeted(targeted, conn) {
                    Targeted::Send(packet) => Some(packet),
                    Targeted::Ignore => None,
                    Targeted::Close => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        };

        if let Some(packet) = outgoing {
            if let Err(e) = write.send(Message::Binary(packet.finish().to_vec().into())).await {
                warn!("Failed to send to {}: {}", addr, e);
                break;
            }
        }
    }

    if joined {
        // The lobby ignores this if it already dropped the connection.
        let _ = events.send(LobbyEvent::Left { conn });
    }

    Ok(())
}
