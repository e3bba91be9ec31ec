//! Authoritative lobby state: slots, clients and global match settings.

mod client;

pub use client::{Client, ClientState, ColorRamp};

use crate::maps::PlayerReference;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A map position a participant can occupy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Slot {
    /// Unique id, taken from the player reference name.
    pub id: String,
    pub closed: bool,
    pub allow_bots: bool,
    pub lock_race: bool,
    pub lock_color: bool,
    pub lock_team: bool,
    pub lock_spawn: bool,
}

impl Slot {
    /// Build a slot from a map player reference. Non-playable references
    /// produce no slot.
    pub fn from_reference(reference: &PlayerReference) -> Option<Self> {
        if !reference.playable {
            return None;
        }
        Some(Self {
            id: reference.name.clone(),
            closed: false,
            allow_bots: reference.allow_bots,
            lock_race: reference.lock_race,
            lock_color: reference.lock_color,
            lock_team: reference.lock_team,
            lock_spawn: reference.lock_spawn,
        })
    }
}

/// Settings that apply to the whole match.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GlobalSettings {
    /// Active map id.
    pub map: String,
    /// Order latency in frames.
    pub order_latency: i32,
    pub lock_teams: bool,
    pub allow_cheats: bool,
}

/// The full lobby state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Session {
    pub game_started: bool,
    pub global: GlobalSettings,
    /// Slots in map order.
    pub slots: Vec<Slot>,
    /// Clients in join order.
    pub clients: Vec<Client>,
}

impl Session {
    /// Create an empty session with no slots. Call [`Session::load_map`] to
    /// populate the slots.
    pub fn new(global: GlobalSettings) -> Self {
        Self {
            game_started: false,
            global,
            slots: Vec::new(),
            clients: Vec::new(),
        }
    }

    pub fn client(&self, index: u32) -> Option<&Client> {
        self.clients.iter().find(|c| c.index == index)
    }

    pub fn client_mut(&mut self, index: u32) -> Option<&mut Client> {
        self.clients.iter_mut().find(|c| c.index == index)
    }

    pub fn slot(&self, id: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == id)
    }

    pub fn slot_mut(&mut self, id: &str) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|s| s.id == id)
    }

    /// The client (human or bot) bound to a slot.
    pub fn occupant_of(&self, slot_id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.slot.as_deref() == Some(slot_id))
    }

    /// Lowest index not held by any client, bots included.
    pub fn choose_free_index(&self) -> u32 {
        (0..)
            .find(|&i| self.client(i).is_none())
            .unwrap_or(u32::MAX)
    }

    /// First open, unoccupied slot in map order.
    pub fn first_free_slot(&self) -> Option<String> {
        self.slots
            .iter()
            .find(|s| !s.closed && self.occupant_of(&s.id).is_none())
            .map(|s| s.id.clone())
    }

    /// Append a client.
    pub fn add_client(&mut self, client: Client) {
        self.clients.push(client);
    }

    /// Remove a client, preserving the order of the others.
    pub fn remove_client(&mut self, index: u32) -> Option<Client> {
        let pos = self.clients.iter().position(|c| c.index == index)?;
        Some(self.clients.remove(pos))
    }

    /// Whether the given connected player indices are all ready.
    pub fn all_ready<I: IntoIterator<Item = u32>>(&self, indices: I) -> bool {
        let mut any = false;
        for index in indices {
            any = true;
            if !self.client(index).is_some_and(Client::is_ready) {
                return false;
            }
        }
        any
    }

    /// Switch to `map_id` and rebuild the slots from its player references.
    ///
    /// Occupants of the previous slots are handed the new slots in the order
    /// of the old slots, one forward cursor for everybody. Once the new slots
    /// run out, humans become observers and bots are removed. Everyone who
    /// had a slot gets their spawn point reset and becomes not ready.
    pub fn load_map(&mut self, map_id: &str, players: &[PlayerReference]) {
        let old_slots: Vec<String> = self.slots.iter().map(|s| s.id.clone()).collect();
        // Occupants are resolved up front so that a client moved into a reused
        // slot id is not picked up a second time.
        let occupants: Vec<u32> = old_slots
            .iter()
            .filter_map(|id| self.occupant_of(id).map(|c| c.index))
            .collect();

        self.global.map = map_id.to_string();
        self.slots.clear();
        for reference in players {
            let Some(slot) = Slot::from_reference(reference) else {
                continue;
            };
            if self.slot(&slot.id).is_some() {
                debug!("Map {} repeats player reference {}", map_id, slot.id);
                continue;
            }
            self.slots.push(slot);
        }

        let mut free = self.slots.iter().map(|s| s.id.clone()).collect::<Vec<_>>().into_iter();
        for index in occupants {
            let next = free.next();
            let Some(client) = self.client_mut(index) else {
                continue;
            };
            client.spawn_point = 0;
            client.state = ClientState::NotReady;
            client.slot = next;

            match client.slot.clone() {
                Some(slot_id) => {
                    if let Some(reference) = players.iter().find(|p| p.name == slot_id) {
                        client.sync_to_reference(reference);
                    }
                }
                None if client.is_bot() => {
                    debug!("Bot {} lost its slot on map change", index);
                    self.remove_client(index);
                }
                None => {}
            }
        }
    }

    /// Serialize the whole session as the lobby info payload.
    pub fn to_lobby_info(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GlobalSettings {
        GlobalSettings {
            map: String::new(),
            order_latency: 3,
            lock_teams: false,
            allow_cheats: false,
        }
    }

    fn refs(names: &[&str]) -> Vec<PlayerReference> {
        names.iter().map(|n| PlayerReference::open(n)).collect()
    }

    fn human(index: u32, slot: Option<&str>) -> Client {
        let mut client = Client::new(index, format!("player{index}"), ColorRamp::default());
        client.slot = slot.map(str::to_string);
        client
    }

    fn bot(index: u32, slot: &str) -> Client {
        let mut client = human(index, Some(slot));
        client.bot = Some("Easy AI".to_string());
        client
    }

    fn session_with_slots(names: &[&str]) -> Session {
        let mut session = Session::new(settings());
        session.load_map("old", &refs(names));
        session
    }

    #[test]
    fn test_slots_follow_playable_references() {
        let mut players = refs(&["Neutral", "1", "2"]);
        players[0].playable = false;
        let mut session = Session::new(settings());
        session.load_map("m", &players);

        let ids: Vec<&str> = session.slots.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["1", "2"]);
        assert_eq!(session.global.map, "m");
    }

    #[test]
    fn test_duplicate_references_make_one_slot() {
        let session = session_with_slots(&["1", "1", "2"]);
        assert_eq!(session.slots.len(), 2);
    }

    #[test]
    fn test_occupant_lookup() {
        let mut session = session_with_slots(&["1", "2"]);
        session.add_client(human(0, Some("1")));
        session.add_client(bot(1, "2"));

        assert_eq!(session.occupant_of("1").map(|c| c.index), Some(0));
        assert!(session.occupant_of("2").is_some_and(Client::is_bot));
        assert!(session.occupant_of("3").is_none());
    }

    #[test]
    fn test_choose_free_index_fills_gaps() {
        let mut session = session_with_slots(&["1"]);
        assert_eq!(session.choose_free_index(), 0);
        session.add_client(human(0, None));
        session.add_client(human(1, None));
        session.add_client(human(2, None));
        session.remove_client(1);
        assert_eq!(session.choose_free_index(), 1);
    }

    #[test]
    fn test_first_free_slot_skips_closed_and_occupied() {
        let mut session = session_with_slots(&["1", "2", "3"]);
        session.add_client(human(0, Some("1")));
        session.slot_mut("2").unwrap().closed = true;
        assert_eq!(session.first_free_slot().as_deref(), Some("3"));
    }

    #[test]
    fn test_human_overflow_becomes_observer() {
        let mut session = session_with_slots(&["1", "2", "3"]);
        session.add_client(human(0, Some("1")));
        session.add_client(bot(1, "2"));
        session.add_client(human(2, Some("3")));

        session.load_map("small", &refs(&["1", "2"]));

        assert_eq!(session.client(0).unwrap().slot.as_deref(), Some("1"));
        assert_eq!(session.client(1).unwrap().slot.as_deref(), Some("2"));
        assert!(session.client(2).unwrap().is_observer());
        assert_eq!(session.clients.len(), 3);
    }

    #[test]
    fn test_bot_overflow_is_removed() {
        let mut session = session_with_slots(&["1", "2", "3"]);
        session.add_client(human(0, Some("1")));
        session.add_client(human(1, Some("2")));
        session.add_client(bot(2, "3"));

        session.load_map("small", &refs(&["1", "2"]));

        assert_eq!(session.client(0).unwrap().slot.as_deref(), Some("1"));
        assert_eq!(session.client(1).unwrap().slot.as_deref(), Some("2"));
        assert!(session.client(2).is_none());
    }

    #[test]
    fn test_reassignment_follows_old_slot_order() {
        let mut session = session_with_slots(&["b", "a"]);
        // Join order differs from slot order.
        session.add_client(human(0, Some("a")));
        session.add_client(human(1, Some("b")));

        session.load_map("new", &refs(&["a", "b"]));

        assert_eq!(session.client(1).unwrap().slot.as_deref(), Some("a"));
        assert_eq!(session.client(0).unwrap().slot.as_deref(), Some("b"));
    }

    #[test]
    fn test_reassignment_resets_and_syncs() {
        let mut session = session_with_slots(&["1"]);
        let mut host = human(0, Some("1"));
        host.state = ClientState::Ready;
        host.spawn_point = 3;
        host.team = 2;
        session.add_client(host);
        let watcher = human(1, None);
        session.add_client(watcher.clone());

        let players = vec![PlayerReference {
            lock_team: true,
            team: 4,
            ..PlayerReference::open("x")
        }];
        session.load_map("new", &players);

        let host = session.client(0).unwrap();
        assert_eq!(host.slot.as_deref(), Some("x"));
        assert_eq!(host.spawn_point, 0);
        assert_eq!(host.state, ClientState::NotReady);
        assert_eq!(host.team, 4);
        assert_eq!(session.client(1), Some(&watcher));
    }

    #[test]
    fn test_reload_reopens_closed_slots() {
        let mut session = session_with_slots(&["1", "2"]);
        session.slot_mut("2").unwrap().closed = true;
        session.load_map("again", &refs(&["1", "2"]));
        assert!(session.slots.iter().all(|s| !s.closed));
    }

    #[test]
    fn test_all_ready() {
        let mut session = session_with_slots(&["1", "2"]);
        session.add_client(human(0, Some("1")));
        session.add_client(human(1, Some("2")));
        assert!(!session.all_ready([0, 1]));
        session.client_mut(0).unwrap().state = ClientState::Ready;
        assert!(!session.all_ready([0, 1]));
        session.client_mut(1).unwrap().state = ClientState::Ready;
        assert!(session.all_ready([0, 1]));
        assert!(!session.all_ready([]));
    }

    #[test]
    fn test_lobby_info_contains_clients() {
        let mut session = session_with_slots(&["1"]);
        session.add_client(bot(4, "1"));
        let text = session.to_lobby_info().unwrap();
        assert!(text.contains("order_latency = 3"));
        assert!(text.contains("Easy AI"));
    }
}
