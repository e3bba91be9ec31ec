//! Client -> Server packet parsing.

use super::ClientOpcode;
use crate::{BinaryReader, ProtocolError};

const JOIN: u8 = ClientOpcode::Join as u8;
const CHAT: u8 = ClientOpcode::Chat as u8;
const COMMAND: u8 = ClientOpcode::Command as u8;

/// Parsed client packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientPacket {
    /// Join (0x00) with display name.
    Join { name: String },
    /// Chat message (0x63).
    Chat { message: String },
    /// Lobby command (0x64), e.g. `slot_bot 2 Easy AI`.
    Command { text: String },
}

impl ClientPacket {
    /// Parse a client packet from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = BinaryReader::new(data.to_vec());
        let opcode = reader.try_get_u8().ok_or(ProtocolError::UnexpectedEof)?;

        match opcode {
            JOIN => {
                let name = reader.get_string_utf8();
                let name = name.trim();
                if name.is_empty() {
                    return Err(ProtocolError::EmptyName);
                }
                Ok(ClientPacket::Join { name: name.to_string() })
            }
            CHAT => {
                if reader.remaining() == 0 {
                    return Err(ProtocolError::UnexpectedEof);
                }
                Ok(ClientPacket::Chat { message: reader.get_string_utf8() })
            }
            COMMAND => {
                if reader.remaining() == 0 {
                    return Err(ProtocolError::UnexpectedEof);
                }
                Ok(ClientPacket::Command { text: reader.get_string_utf8() })
            }
            _ => Err(ProtocolError::InvalidOpcode(opcode)),
        }
    }
}
