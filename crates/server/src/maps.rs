//! Map catalog.
//!
//! The lobby only needs a map's player references: each playable reference
//! becomes a slot, and the reference's locked attributes are forced onto
//! whoever takes that slot.

use crate::session::ColorRamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A player position defined by a map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlayerReference {
    /// Reference name; becomes the slot id.
    pub name: String,
    #[serde(default = "yes")]
    pub playable: bool,
    #[serde(default = "yes")]
    pub allow_bots: bool,
    #[serde(default)]
    pub lock_race: bool,
    #[serde(default = "default_race")]
    pub race: String,
    #[serde(default)]
    pub lock_color: bool,
    #[serde(default)]
    pub color: ColorRamp,
    #[serde(default)]
    pub lock_spawn: bool,
    #[serde(default)]
    pub spawn: i32,
    #[serde(default)]
    pub lock_team: bool,
    #[serde(default)]
    pub team: i32,
}

fn yes() -> bool {
    true
}

fn default_race() -> String {
    "random".to_string()
}

impl PlayerReference {
    /// A playable reference with nothing locked.
    pub fn open(name: &str) -> Self {
        Self {
            name: name.to_string(),
            playable: true,
            allow_bots: true,
            lock_race: false,
            race: default_race(),
            lock_color: false,
            color: ColorRamp::default(),
            lock_spawn: false,
            spawn: 0,
            lock_team: false,
            team: 0,
        }
    }
}

/// A selectable map.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MapDefinition {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Player references in map order.
    #[serde(default)]
    pub players: Vec<PlayerReference>,
}

/// Source of map player references.
pub trait MapCatalog: Send {
    /// Player references of `map_id` in map order, or `None` for an unknown map.
    fn players(&self, map_id: &str) -> Option<&[PlayerReference]>;
}

/// Catalog backed by the `[[maps]]` configuration entries.
#[derive(Debug, Default)]
pub struct ConfigMapCatalog {
    maps: HashMap<String, MapDefinition>,
}

impl ConfigMapCatalog {
    pub fn new(maps: &[MapDefinition]) -> Self {
        Self {
            maps: maps.iter().map(|m| (m.id.clone(), m.clone())).collect(),
        }
    }
}

impl MapCatalog for ConfigMapCatalog {
    fn players(&self, map_id: &str) -> Option<&[PlayerReference]> {
        self.maps.get(map_id).map(|m| m.players.as_slice())
    }
}

/// Maps shipped in the default configuration.
pub fn default_maps() -> Vec<MapDefinition> {
    let neutral = PlayerReference {
        playable: false,
        allow_bots: false,
        ..PlayerReference::open("Neutral")
    };

    let duel = MapDefinition {
        id: "island-duel".to_string(),
        title: "Island Duel".to_string(),
        players: vec![
            neutral.clone(),
            PlayerReference::open("Multi0"),
            PlayerReference::open("Multi1"),
        ],
    };

    let skirmish = MapDefinition {
        id: "four-corners".to_string(),
        title: "Four Corners".to_string(),
        players: vec![
            neutral,
            PlayerReference::open("Multi0"),
            PlayerReference::open("Multi1"),
            PlayerReference::open("Multi2"),
            PlayerReference {
                lock_spawn: true,
                spawn: 4,
                lock_team: true,
                team: 2,
                ..PlayerReference::open("Multi3")
            },
        ],
    };

    vec![duel, skirmish]
}
