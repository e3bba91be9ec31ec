//! Recording collaborators for lobby tests.

use super::{ConnectionId, Lobby, LogEntry, LogSink, Transport};
use crate::config::LobbyConfig;
use crate::maps::{ConfigMapCatalog, MapDefinition, PlayerReference};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex};

/// Everything a lobby handed to its transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Notice(ConnectionId, String),
    ServerError(ConnectionId, String),
    Disconnect(ConnectionId),
    LobbyInfo(String),
    StartGame,
    Chat(String, String),
}

/// Shared view of what a [`RecordingTransport`] sent.
#[derive(Debug, Clone, Default)]
pub struct Outbox(Arc<Mutex<Vec<Sent>>>);

impl Outbox {
    fn push(&self, sent: Sent) {
        self.0.lock().unwrap().push(sent);
    }

    pub fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn lobby_infos(&self) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|s| matches!(s, Sent::LobbyInfo(_)))
            .count()
    }

    pub fn contains(&self, sent: &Sent) -> bool {
        self.0.lock().unwrap().contains(sent)
    }

    /// Notices sent to one connection.
    pub fn notices_to(&self, conn: ConnectionId) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sent::Notice(to, text) if *to == conn => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

pub struct RecordingTransport {
    outbox: Outbox,
}

impl RecordingTransport {
    pub fn new() -> (Self, Outbox) {
        let outbox = Outbox::default();
        (Self { outbox: outbox.clone() }, outbox)
    }
}

impl Transport for RecordingTransport {
    fn send_notice(&mut self, conn: ConnectionId, message: &str) {
        self.outbox.push(Sent::Notice(conn, message.to_string()));
    }

    fn send_server_error(&mut self, conn: ConnectionId, message: &str) {
        self.outbox.push(Sent::ServerError(conn, message.to_string()));
    }

    fn disconnect(&mut self, conn: ConnectionId) {
        self.outbox.push(Sent::Disconnect(conn));
    }

    fn broadcast_lobby_info(&mut self, info: &str) {
        self.outbox.push(Sent::LobbyInfo(info.to_string()));
    }

    fn broadcast_start_game(&mut self) {
        self.outbox.push(Sent::StartGame);
    }

    fn broadcast_chat(&mut self, name: &str, message: &str) {
        self.outbox.push(Sent::Chat(name.to_string(), message.to_string()));
    }
}

/// Shared view of a [`MemoryLog`].
#[derive(Debug, Clone, Default)]
pub struct LogRecord(Arc<Mutex<Vec<LogEntry>>>);

impl LogRecord {
    pub fn contains(&self, entry: &LogEntry) -> bool {
        self.0.lock().unwrap().contains(entry)
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.0.lock().unwrap().clone()
    }
}

pub struct MemoryLog {
    record: LogRecord,
}

impl MemoryLog {
    pub fn new() -> (Self, LogRecord) {
        let record = LogRecord::default();
        (Self { record: record.clone() }, record)
    }
}

impl LogSink for MemoryLog {
    fn write(&mut self, entry: LogEntry) {
        self.record.0.lock().unwrap().push(entry);
    }
}

pub fn seeded_rng() -> StdRng {
    StdRng::seed_from_u64(0x10bb)
}

/// Maps: `two` = [1, 2], `three` = [1, 2, 3] with team 2 locked on slot 3,
/// `noai` = [1] without bots.
pub fn test_catalog() -> ConfigMapCatalog {
    let map = |id: &str, players: Vec<PlayerReference>| MapDefinition {
        id: id.to_string(),
        title: id.to_string(),
        players,
    };
    ConfigMapCatalog::new(&[
        map("two", vec![PlayerReference::open("1"), PlayerReference::open("2")]),
        map(
            "three",
            vec![
                PlayerReference::open("1"),
                PlayerReference::open("2"),
                PlayerReference {
                    lock_team: true,
                    team: 2,
                    ..PlayerReference::open("3")
                },
            ],
        ),
        map(
            "noai",
            vec![PlayerReference {
                allow_bots: false,
                ..PlayerReference::open("1")
            }],
        ),
    ])
}

/// Connection id of the n-th player joined by a [`Fixture`].
pub fn conn(n: u32) -> ConnectionId {
    ConnectionId(100 + u64::from(n))
}

pub struct Fixture {
    pub lobby: Lobby,
    pub sent: Outbox,
    pub log: LogRecord,
}

impl Fixture {
    /// A lobby on `map` joined by `players` in order, on connections
    /// `conn(0)`, `conn(1)`...
    pub fn new(map: &str, players: &[&str]) -> Self {
        let config = LobbyConfig {
            default_map: map.to_string(),
            ..LobbyConfig::default()
        };
        let (transport, sent) = RecordingTransport::new();
        let (log_sink, log) = MemoryLog::new();
        let mut lobby = Lobby::new(
            &config,
            Box::new(test_catalog()),
            Box::new(transport),
            Box::new(seeded_rng()),
            Box::new(log_sink),
        )
        .unwrap();
        for (n, name) in players.iter().enumerate() {
            lobby.join(conn(n as u32), name).unwrap();
        }
        Self { lobby, sent, log }
    }

    pub fn empty() -> Self {
        Self::new("two", &[])
    }

    pub fn with_players(players: &[&str]) -> Self {
        Self::new("two", players)
    }
}
