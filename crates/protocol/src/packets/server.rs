//! Server -> Client packet building.

use super::ServerOpcode;
use crate::{BinaryWriter, Color};

/// Build a ChatMessage packet (0x63).
pub fn build_chat_message(color: Color, name: &str, message: &str, is_server: bool) -> BinaryWriter {
    let flags = if is_server { 0x80 } else { 0 };

    let mut w = BinaryWriter::with_capacity(7 + name.len() + message.len());
    w.put_u8(ServerOpcode::ChatMessage as u8);
    w.put_u8(flags);
    w.put_u8(color.r);
    w.put_u8(color.g);
    w.put_u8(color.b);
    w.put_string_utf8(name);
    w.put_string_utf8(message);
    w
}

/// Build a LobbyInfo packet (0x70) carrying the serialized session.
pub fn build_lobby_info(text: &str) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(text.len() + 2);
    w.put_u8(ServerOpcode::LobbyInfo as u8);
    w.put_string_utf8(text);
    w
}

/// Build a StartGame packet (0x71).
pub fn build_start_game() -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(1);
    w.put_u8(ServerOpcode::StartGame as u8);
    w
}

/// Build a ServerError packet (0x72).
pub fn build_server_error(message: &str) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(message.len() + 2);
    w.put_u8(ServerOpcode::ServerError as u8);
    w.put_string_utf8(message);
    w
}
