//! The lobby: sole owner of the session.
//!
//! Every mutation goes through [`Lobby::handle_event`], called from exactly one
//! task. Connection tasks never touch the session; they only queue
//! [`LobbyEvent`]s and relay whatever the lobby hands to its [`Transport`].

mod commands;
mod error;
#[cfg(test)]
pub(crate) mod test_support;

pub use error::CommandError;

use crate::bots::{RandomSource, random_color};
use crate::config::LobbyConfig;
use crate::maps::{MapCatalog, PlayerReference};
use crate::session::{Client, ClientState, GlobalSettings, Session};
use std::fmt;
use tracing::{debug, info, warn};

/// Player index that holds host authority.
pub const HOST_INDEX: u32 = 0;

/// Server-assigned id of a network connection. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Input to the lobby, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyEvent {
    /// A connection finished its handshake.
    Joined { conn: ConnectionId, name: String },
    /// A lobby command.
    Command { conn: ConnectionId, text: String },
    /// A chat line.
    Chat { conn: ConnectionId, message: String },
    /// The connection is gone.
    Left { conn: ConnectionId },
}

/// Outgoing side of the network layer.
pub trait Transport: Send {
    /// Server chat line to one connection.
    fn send_notice(&mut self, conn: ConnectionId, message: &str);
    /// Fatal error to one connection; a disconnect follows.
    fn send_server_error(&mut self, conn: ConnectionId, message: &str);
    /// Close one connection.
    fn disconnect(&mut self, conn: ConnectionId);
    /// Serialized session to every connection.
    fn broadcast_lobby_info(&mut self, info: &str);
    /// Match start to every connection.
    fn broadcast_start_game(&mut self);
    /// Player chat to every connection.
    fn broadcast_chat(&mut self, name: &str, message: &str);
}

/// Lobby events worth keeping: state changes and rejected commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    ClientJoined { index: u32, name: String },
    HostChanged { conn: ConnectionId, name: String },
    ClientLeft { index: u32, name: String },
    JoinRefused { conn: ConnectionId },
    ReadyChanged { index: u32, state: ClientState },
    OrderLatency(i32),
    MapChanged(String),
    BotAdded { index: u32, bot: String, slot: String },
    Kicked { index: u32, name: String },
    GameStarted,
    Rejected { index: u32, error: CommandError },
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEntry::ClientJoined { index, name } => write!(f, "Client {index} ({name}) joined"),
            LogEntry::HostChanged { conn, name } => write!(f, "{name} (connection {conn}) is now the host"),
            LogEntry::ClientLeft { index, name } => write!(f, "Client {index} ({name}) left"),
            LogEntry::JoinRefused { conn } => write!(f, "Refused connection {conn}: game already started"),
            LogEntry::ReadyChanged { index, state } => write!(f, "Player {index} is {state:?}"),
            LogEntry::OrderLatency(lag) => write!(f, "Order lag is now {lag} frames."),
            LogEntry::MapChanged(map) => write!(f, "Map changed to {map}"),
            LogEntry::BotAdded { index, bot, slot } => write!(f, "Bot {index} ({bot}) added to slot {slot}"),
            LogEntry::Kicked { index, name } => write!(f, "Client {index} ({name}) was kicked"),
            LogEntry::GameStarted => write!(f, "Game started"),
            LogEntry::Rejected { index, error } => write!(f, "Rejected command from {index}: {error}"),
        }
    }
}

/// Append-only lobby log.
pub trait LogSink: Send {
    fn write(&mut self, entry: LogEntry);
}

/// Writes lobby log entries through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn write(&mut self, entry: LogEntry) {
        match entry {
            LogEntry::Rejected { .. } | LogEntry::JoinRefused { .. } => warn!(target: "server", "{}", entry),
            _ => info!(target: "server", "{}", entry),
        }
    }
}

/// A live connection and the player index it was given.
#[derive(Debug, Clone, Copy)]
struct Connection {
    id: ConnectionId,
    index: u32,
}

/// Lobby state plus the collaborators it talks to.
pub struct Lobby {
    session: Session,
    /// Live connections in join order.
    connections: Vec<Connection>,
    maps: Box<dyn MapCatalog>,
    transport: Box<dyn Transport>,
    random: Box<dyn RandomSource>,
    log: Box<dyn LogSink>,
}

impl Lobby {
    /// Open a lobby on the configured default map.
    pub fn new(
        config: &LobbyConfig,
        maps: Box<dyn MapCatalog>,
        transport: Box<dyn Transport>,
        random: Box<dyn RandomSource>,
        log: Box<dyn LogSink>,
    ) -> anyhow::Result<Self> {
        let mut session = Session::new(GlobalSettings {
            map: config.default_map.clone(),
            order_latency: config.order_latency,
            lock_teams: config.lock_teams,
            allow_cheats: config.allow_cheats,
        });
        let players = maps
            .players(&config.default_map)
            .ok_or_else(|| anyhow::anyhow!("unknown default map '{}'", config.default_map))?;
        session.load_map(&config.default_map, players);
        info!("Lobby opened on map {} with {} slots", config.default_map, session.slots.len());

        Ok(Self {
            session,
            connections: Vec::new(),
            maps,
            transport,
            random,
            log,
        })
    }

    /// Current session state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Apply one event.
    pub fn handle_event(&mut self, event: LobbyEvent) {
        match event {
            LobbyEvent::Joined { conn, name } => {
                self.join(conn, &name);
            }
            LobbyEvent::Command { conn, text } => {
                if !self.interpret_command(conn, &text) {
                    debug!("Command from {} not handled: {}", conn, text);
                }
            }
            LobbyEvent::Chat { conn, message } => self.chat(conn, &message),
            LobbyEvent::Left { conn } => self.leave(conn),
        }
    }

    /// Admit a connection as a new client. Returns its player index.
    pub fn join(&mut self, conn: ConnectionId, name: &str) -> Option<u32> {
        if self.session.game_started {
            self.transport.send_server_error(conn, "The game has already started");
            self.transport.disconnect(conn);
            self.log.write(LogEntry::JoinRefused { conn });
            return None;
        }
        if self.index_of(conn).is_some() {
            debug!("Connection {} joined twice", conn);
            return None;
        }

        let index = self.session.choose_free_index();
        let mut client = Client::new(index, name, random_color(self.random.as_mut()));
        client.slot = self.session.first_free_slot();
        if let Some(reference) = client.slot.as_deref().and_then(|id| self.reference(id)) {
            client.sync_to_reference(&reference);
        }

        self.session.add_client(client);
        self.connections.push(Connection { id: conn, index });
        self.log.write(LogEntry::ClientJoined { index, name: name.to_string() });
        if index == HOST_INDEX {
            self.log.write(LogEntry::HostChanged { conn, name: name.to_string() });
        }
        self.sync_lobby_info();
        Some(index)
    }

    /// Handle a lost connection. Connections the lobby already dropped are
    /// ignored.
    pub fn leave(&mut self, conn: ConnectionId) {
        let Some(client) = self.forget_connection(conn) else {
            return;
        };
        self.log.write(LogEntry::ClientLeft { index: client.index, name: client.name });
        if !self.session.game_started {
            self.sync_lobby_info();
        }
    }

    /// Relay a chat line; lines starting with `/` are commands.
    pub fn chat(&mut self, conn: ConnectionId, message: &str) {
        if let Some(command) = message.strip_prefix('/') {
            self.handle_event(LobbyEvent::Command { conn, text: command.to_string() });
            return;
        }
        let Some(name) = self
            .index_of(conn)
            .and_then(|index| self.session.client(index))
            .map(|c| c.name.clone())
        else {
            return;
        };
        info!("[Chat] {}: {}", name, message);
        self.transport.broadcast_chat(&name, message);
    }

    /// Player index of a live connection.
    fn index_of(&self, conn: ConnectionId) -> Option<u32> {
        self.connections.iter().find(|c| c.id == conn).map(|c| c.index)
    }

    /// Live connection of a player index.
    fn connection_of(&self, index: u32) -> Option<ConnectionId> {
        self.connections.iter().find(|c| c.index == index).map(|c| c.id)
    }

    fn is_host(&self, conn: ConnectionId) -> bool {
        self.index_of(conn) == Some(HOST_INDEX)
    }

    /// Player indices of all live connections.
    fn connected_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.connections.iter().map(|c| c.index)
    }

    /// Map player reference behind a slot of the active map.
    fn reference(&self, slot_id: &str) -> Option<PlayerReference> {
        self.maps
            .players(&self.session.global.map)?
            .iter()
            .find(|p| p.name == slot_id)
            .cloned()
    }

    /// Remove a connection and its client without telling the transport.
    fn forget_connection(&mut self, conn: ConnectionId) -> Option<Client> {
        let pos = self.connections.iter().position(|c| c.id == conn)?;
        let connection = self.connections.remove(pos);
        self.session.remove_client(connection.index)
    }

    /// Forcibly disconnect a connection and remove its client. Does not
    /// broadcast; the calling command does.
    fn drop_client(&mut self, conn: ConnectionId) -> Option<Client> {
        self.transport.disconnect(conn);
        self.forget_connection(conn)
    }

    /// Send the full session to every connection.
    fn sync_lobby_info(&mut self) {
        match self.session.to_lobby_info() {
            Ok(info) => self.transport.broadcast_lobby_info(&info),
            Err(e) => warn!("Failed to serialize lobby info: {}", e),
        }
    }

    /// Switch maps: reload the slots, reassign occupants, broadcast.
    fn load_map(&mut self, map_id: &str) -> Result<(), CommandError> {
        let players = self
            .maps
            .players(map_id)
            .ok_or_else(|| CommandError::UnknownMap(map_id.to_string()))?;
        self.session.load_map(map_id, players);
        self.log.write(LogEntry::MapChanged(map_id.to_string()));
        self.sync_lobby_info();
        Ok(())
    }
}
