//! Lobby command handlers.

use super::{CommandError, ConnectionId, Lobby, LogEntry};
use crate::bots::build_bot;
use crate::maps::PlayerReference;
use crate::session::Client;
use protocol::Command;
use tracing::debug;

const ALTER_SLOTS: &str = "Only the host can alter slots";
const CHANGE_MAP: &str = "Only the host can change the map";
const SET_OPTION: &str = "Only the host can set that option";
const KICK_PLAYERS: &str = "Only the host can kick players";

impl Lobby {
    /// Run one command line from `conn`. Returns whether the command was
    /// handled; every rejection has already been reported or logged.
    pub fn interpret_command(&mut self, conn: ConnectionId, text: &str) -> bool {
        let Some(index) = self.index_of(conn) else {
            debug!("Command from unknown connection {}: {}", conn, text);
            return false;
        };
        match self.run_command(conn, index, text) {
            Ok(()) => true,
            Err(error) => self.reject(conn, index, error),
        }
    }

    fn run_command(&mut self, conn: ConnectionId, index: u32, text: &str) -> Result<(), CommandError> {
        let command = Command::parse(text);
        if self.session.game_started {
            return Err(CommandError::GameStarted(text.to_string()));
        }
        let ready = self.session.client(index).is_some_and(Client::is_ready);
        if ready && !matches!(command.as_ref().map(Command::verb), Some("ready" | "startgame")) {
            return Err(CommandError::ClientReady);
        }

        let command = command.ok_or_else(|| CommandError::UnknownVerb(Command::split(text).0.to_string()))?;
        self.execute(conn, index, command)
    }

    fn execute(&mut self, conn: ConnectionId, index: u32, command: Command) -> Result<(), CommandError> {
        match command {
            Command::Ready => self.toggle_ready(conn, index),
            Command::StartGame => {
                self.start_game();
                Ok(())
            }
            Command::Lag(arg) => self.set_order_latency(&arg),
            Command::Slot(id) => self.take_slot(index, &id),
            Command::Spectate => {
                if let Some(client) = self.session.client_mut(index) {
                    client.slot = None;
                    client.spawn_point = 0;
                }
                self.sync_lobby_info();
                Ok(())
            }
            Command::SlotClose(id) => self.close_slot(conn, &id),
            Command::SlotOpen(id) => self.open_slot(conn, &id),
            Command::SlotBot(arg) => self.add_bot(conn, &arg),
            Command::Map(id) => {
                self.require_host(conn, CHANGE_MAP)?;
                self.load_map(&id)
            }
            Command::LockTeams(arg) => {
                self.require_host(conn, SET_OPTION)?;
                if let Some(value) = parse_flag(&arg) {
                    self.session.global.lock_teams = value;
                }
                self.sync_lobby_info();
                Ok(())
            }
            Command::AllowCheats(arg) => {
                self.require_host(conn, SET_OPTION)?;
                if let Some(value) = parse_flag(&arg) {
                    self.session.global.allow_cheats = value;
                }
                self.sync_lobby_info();
                Ok(())
            }
            Command::Kick(arg) => self.kick(conn, &arg),
        }
    }

    /// Turn a handler error into the command outcome.
    fn reject(&mut self, conn: ConnectionId, index: u32, error: CommandError) -> bool {
        let handled = error.is_handled();
        if error.notifies_issuer() {
            self.transport.send_notice(conn, &error.to_string());
        }
        if error.is_logged() {
            self.log.write(LogEntry::Rejected { index, error });
        } else {
            debug!("Command from {} rejected: {}", index, error);
        }
        handled
    }

    fn require_host(&self, conn: ConnectionId, message: &'static str) -> Result<(), CommandError> {
        if self.is_host(conn) {
            Ok(())
        } else {
            Err(CommandError::Unauthorized(message))
        }
    }

    fn require_slot(&self, id: &str) -> Result<(), CommandError> {
        match self.session.slot(id) {
            Some(_) => Ok(()),
            None => Err(CommandError::InvalidSlot(id.to_string())),
        }
    }

    fn toggle_ready(&mut self, conn: ConnectionId, index: u32) -> Result<(), CommandError> {
        let client = self
            .session
            .client_mut(index)
            .ok_or_else(|| CommandError::NoSuchClient(index.to_string()))?;
        client.state = client.state.toggled();
        let state = client.state;
        self.log.write(LogEntry::ReadyChanged { index, state });
        self.sync_lobby_info();

        if self.session.all_ready(self.connected_indices()) {
            self.interpret_command(conn, "startgame");
        }
        Ok(())
    }

    fn start_game(&mut self) {
        self.session.game_started = true;
        self.log.write(LogEntry::GameStarted);
        self.transport.broadcast_start_game();
    }

    fn set_order_latency(&mut self, arg: &str) -> Result<(), CommandError> {
        let lag = arg.trim().parse::<i32>().map_err(|_| CommandError::MalformedArgument {
            verb: "lag",
            value: arg.to_string(),
        })?;
        self.session.global.order_latency = lag;
        self.log.write(LogEntry::OrderLatency(lag));
        self.sync_lobby_info();
        Ok(())
    }

    fn take_slot(&mut self, index: u32, id: &str) -> Result<(), CommandError> {
        let slot = self
            .session
            .slot(id)
            .ok_or_else(|| CommandError::InvalidSlot(id.to_string()))?;
        if slot.closed || self.session.occupant_of(id).is_some() {
            return Err(CommandError::SlotUnavailable(id.to_string()));
        }

        let reference = self.reference(id);
        if let Some(client) = self.session.client_mut(index) {
            client.slot = Some(id.to_string());
            if let Some(reference) = &reference {
                client.sync_to_reference(reference);
            }
        }
        self.sync_lobby_info();
        Ok(())
    }

    fn close_slot(&mut self, conn: ConnectionId, id: &str) -> Result<(), CommandError> {
        self.require_slot(id)?;
        self.require_host(conn, ALTER_SLOTS)?;

        let occupant = self.session.occupant_of(id).map(|c| (c.index, c.is_bot()));
        match occupant {
            Some((index, true)) => {
                self.session.remove_client(index);
            }
            Some((index, false)) => match self.connection_of(index) {
                Some(target) => self.evict(target, "Your slot was closed by the host"),
                None => {
                    if let Some(client) = self.session.client_mut(index) {
                        client.slot = None;
                    }
                }
            },
            None => {}
        }

        if let Some(slot) = self.session.slot_mut(id) {
            slot.closed = true;
        }
        self.sync_lobby_info();
        Ok(())
    }

    fn open_slot(&mut self, conn: ConnectionId, id: &str) -> Result<(), CommandError> {
        self.require_slot(id)?;
        self.require_host(conn, ALTER_SLOTS)?;

        if let Some(slot) = self.session.slot_mut(id) {
            slot.closed = false;
        }
        let bot = self.session.occupant_of(id).filter(|c| c.is_bot()).map(|c| c.index);
        if let Some(index) = bot {
            self.session.remove_client(index);
        }
        self.sync_lobby_info();
        Ok(())
    }

    /// `slot_bot <slot> <bot type...>`
    fn add_bot(&mut self, conn: ConnectionId, arg: &str) -> Result<(), CommandError> {
        let (slot_id, bot_type) = arg
            .split_once(' ')
            .filter(|(_, bot_type)| !bot_type.trim().is_empty())
            .ok_or_else(|| CommandError::MalformedArgument {
                verb: "slot_bot",
                value: arg.to_string(),
            })?;
        self.require_slot(slot_id)?;
        self.require_host(conn, ALTER_SLOTS)?;

        if self.session.slot(slot_id).is_some_and(|s| !s.allow_bots) {
            return Err(CommandError::BotsNotAllowed(slot_id.to_string()));
        }
        match self.session.occupant_of(slot_id).map(|c| (c.index, c.is_bot())) {
            Some((_, false)) => return Err(CommandError::SlotTaken(slot_id.to_string())),
            Some((index, true)) => {
                self.session.remove_client(index);
            }
            None => {}
        }

        if let Some(slot) = self.session.slot_mut(slot_id) {
            slot.closed = false;
        }
        let reference = self
            .reference(slot_id)
            .unwrap_or_else(|| PlayerReference::open(slot_id));
        let index = self.session.choose_free_index();
        let bot = build_bot(index, bot_type, &reference, self.random.as_mut());
        self.session.add_client(bot);
        self.log.write(LogEntry::BotAdded {
            index,
            bot: bot_type.to_string(),
            slot: slot_id.to_string(),
        });
        self.sync_lobby_info();
        Ok(())
    }

    fn kick(&mut self, conn: ConnectionId, arg: &str) -> Result<(), CommandError> {
        self.require_host(conn, KICK_PLAYERS)?;
        let target = arg
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(|index| self.connection_of(index))
            .ok_or_else(|| CommandError::NoSuchClient(arg.to_string()))?;
        self.evict(target, "You have been kicked from the server");
        self.sync_lobby_info();
        Ok(())
    }

    /// Send `message` as a server error, then drop the connection.
    fn evict(&mut self, target: ConnectionId, message: &str) {
        self.transport.send_server_error(target, message);
        if let Some(client) = self.drop_client(target) {
            self.log.write(LogEntry::Kicked {
                index: client.index,
                name: client.name,
            });
        }
    }
}

/// Tolerant boolean: anything but `true`/`false` is ignored.
fn parse_flag(arg: &str) -> Option<bool> {
    let arg = arg.trim();
    if arg.eq_ignore_ascii_case("true") {
        Some(true)
    } else if arg.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
