//! Packet definitions for the lobby protocol.
//!
//! This module contains both client->server and server->client packet types.

mod client;
mod server;

pub use client::*;
pub use server::*;

/// Opcodes for client -> server packets.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientOpcode {
    /// Join the lobby with a display name.
    Join = 0x00,
    /// Chat line (lines starting with `/` are commands).
    Chat = 0x63,
    /// Lobby command text.
    Command = 0x64,
}

/// Opcodes for server -> client packets.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerOpcode {
    /// Chat message.
    ChatMessage = 0x63,
    /// Full serialized lobby state.
    LobbyInfo = 0x70,
    /// The match has started.
    StartGame = 0x71,
    /// Fatal error, sent right before the server drops the connection.
    ServerError = 0x72,
}
