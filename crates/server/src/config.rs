//! Server configuration.

use crate::maps::MapDefinition;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub lobby: LobbyConfig,
    /// Maps that can be selected with `map <id>`.
    #[serde(default = "crate::maps::default_maps")]
    pub maps: Vec<MapDefinition>,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml_str(&contents)
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default_with_maps();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }

    /// Parse configuration text.
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        if !config.maps.iter().any(|m| m.id == config.lobby.default_map) {
            anyhow::bail!("default map '{}' is not listed under [[maps]]", config.lobby.default_map);
        }
        Ok(config)
    }

    /// Default settings together with the bundled maps.
    pub fn default_with_maps() -> Self {
        Self {
            maps: crate::maps::default_maps(),
            ..Self::default()
        }
    }
}

/// Server networking and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Connections per IP limit.
    #[serde(default = "default_ip_limit")]
    pub ip_limit: usize,
    /// Server name shown to clients.
    #[serde(default = "default_name")]
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_connections: default_max_connections(),
            ip_limit: default_ip_limit(),
            name: default_name(),
        }
    }
}

fn default_port() -> u16 {
    1234
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_max_connections() -> usize {
    16
}
fn default_ip_limit() -> usize {
    4
}
fn default_name() -> String {
    "RTS Lobby".to_string()
}

/// Initial lobby settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LobbyConfig {
    /// Map loaded when the lobby opens.
    #[serde(default = "default_map")]
    pub default_map: String,
    /// Initial order latency in frames.
    #[serde(default = "default_order_latency")]
    pub order_latency: i32,
    #[serde(default)]
    pub lock_teams: bool,
    #[serde(default)]
    pub allow_cheats: bool,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            default_map: default_map(),
            order_latency: default_order_latency(),
            lock_teams: false,
            allow_cheats: false,
        }
    }
}

fn default_map() -> String {
    "island-duel".to_string()
}
fn default_order_latency() -> i32 {
    3
}
