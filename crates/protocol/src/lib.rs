//! Shared protocol crate for the RTS lobby server.
//!
//! This crate contains:
//! - Binary reading/writing utilities
//! - Packet definitions and builders
//! - The textual lobby command grammar
//! - Shared types (Color)

mod binary;
pub mod command;
mod error;
pub mod packets;

pub use binary::{BinaryReader, BinaryWriter};
pub use command::Command;
pub use error::ProtocolError;

/// RGB color used for chat lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}
