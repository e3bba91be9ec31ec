//! Lobby participant state.

use crate::maps::PlayerReference;
use serde::{Deserialize, Serialize};

/// Readiness of a lobby participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum ClientState {
    #[default]
    NotReady,
    Ready,
}

impl ClientState {
    /// The other state.
    pub fn toggled(self) -> Self {
        match self {
            ClientState::NotReady => ClientState::Ready,
            ClientState::Ready => ClientState::NotReady,
        }
    }
}

/// Cosmetic player color as hue/saturation/luminance plus ramp range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ColorRamp {
    pub hue: u8,
    pub saturation: u8,
    pub luminance: u8,
    pub range: u8,
}

impl ColorRamp {
    pub const fn new(hue: u8, saturation: u8, luminance: u8, range: u8) -> Self {
        Self { hue, saturation, luminance, range }
    }
}

/// A lobby participant: a connected human, or a bot added by the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Client {
    /// Unique index. For humans this is also the connection's player index.
    pub index: u32,
    /// Display name.
    pub name: String,
    /// Bot type; `Some` marks a bot, which has no connection.
    pub bot: Option<String>,
    /// Occupied slot; `None` means observer.
    pub slot: Option<String>,
    pub spawn_point: i32,
    pub team: i32,
    pub color: ColorRamp,
    pub state: ClientState,
    /// Race selection.
    pub country: String,
}

impl Client {
    /// Create a human client that has just joined.
    pub fn new(index: u32, name: impl Into<String>, color: ColorRamp) -> Self {
        Self {
            index,
            name: name.into(),
            bot: None,
            slot: None,
            spawn_point: 0,
            team: 0,
            color,
            state: ClientState::NotReady,
            country: "random".to_string(),
        }
    }

    /// Whether this client is a bot.
    pub fn is_bot(&self) -> bool {
        self.bot.is_some()
    }

    /// Whether this client has no slot.
    pub fn is_observer(&self) -> bool {
        self.slot.is_none()
    }

    pub fn is_ready(&self) -> bool {
        self.state == ClientState::Ready
    }

    /// Force the attributes the map locks for this reference.
    pub fn sync_to_reference(&mut self, reference: &PlayerReference) {
        if reference.lock_color {
            self.color = reference.color;
        }
        if reference.lock_race {
            self.country = reference.race.clone();
        }
        if reference.lock_spawn {
            self.spawn_point = reference.spawn;
        }
        if reference.lock_team {
            self.team = reference.team;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client_is_observer() {
        let client = Client::new(0, "host", ColorRamp::new(1, 2, 60, 10));
        assert!(client.is_observer());
        assert!(!client.is_bot());
        assert!(!client.is_ready());
        assert_eq!(client.country, "random");
    }

    #[test]
    fn test_toggle_state() {
        assert_eq!(ClientState::NotReady.toggled(), ClientState::Ready);
        assert_eq!(ClientState::Ready.toggled().toggled(), ClientState::Ready);
    }

    #[test]
    fn test_sync_only_touches_locked_fields() {
        let mut client = Client::new(3, "p", ColorRamp::new(10, 20, 100, 10));
        client.team = 5;
        client.spawn_point = 2;

        let reference = PlayerReference {
            lock_race: true,
            race: "soviet".to_string(),
            lock_spawn: true,
            spawn: 7,
            color: ColorRamp::new(200, 200, 200, 0),
            team: 1,
            ..PlayerReference::open("Multi0")
        };
        client.sync_to_reference(&reference);

        assert_eq!(client.country, "soviet");
        assert_eq!(client.spawn_point, 7);
        assert_eq!(client.team, 5);
        assert_eq!(client.color, ColorRamp::new(10, 20, 100, 10));
    }
}
