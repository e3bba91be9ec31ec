//! RTS lobby server library.

pub mod bots;
pub mod config;
pub mod lobby;
pub mod maps;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use lobby::{CommandError, ConnectionId, Lobby, LobbyEvent, LogEntry, LogSink, Transport};
pub use server::{run, ChannelTransport, LobbyBroadcast, TargetedMessage, TargetedMessageType};
pub use session::Session;
