//! Textual lobby commands.
//!
//! A command is `<verb>[ <argument>]`. The verb set is closed: anything not
//! listed here is not a lobby command. Arguments are kept as raw text because
//! each verb parses its own argument, some strictly and some tolerantly.

/// A lobby command with its unparsed argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `ready`: toggle the issuer's readiness.
    Ready,
    /// `startgame`: begin the match.
    StartGame,
    /// `lag <frames>`: set the order latency.
    Lag(String),
    /// `slot <id>`: move the issuer into a slot.
    Slot(String),
    /// `spectate`: leave the issuer's slot.
    Spectate,
    /// `slot_close <id>` (host).
    SlotClose(String),
    /// `slot_open <id>` (host).
    SlotOpen(String),
    /// `slot_bot <id> <bot type...>` (host).
    SlotBot(String),
    /// `map <id>` (host).
    Map(String),
    /// `lockteams <bool>` (host).
    LockTeams(String),
    /// `allowcheats <bool>` (host).
    AllowCheats(String),
    /// `kick <client index>` (host).
    Kick(String),
}

impl Command {
    /// Split a command line into its verb and argument.
    ///
    /// The line is split on single spaces; the first token is the verb and the
    /// remaining tokens are joined back with single spaces.
    pub fn split(text: &str) -> (&str, String) {
        let mut parts = text.split(' ');
        let verb = parts.next().unwrap_or_default();
        let arg = parts.collect::<Vec<_>>().join(" ");
        (verb, arg)
    }

    /// Resolve a command line. Returns `None` for an unknown verb.
    pub fn parse(text: &str) -> Option<Self> {
        let (verb, arg) = Self::split(text);
        let command = match verb {
            "ready" => Command::Ready,
            "startgame" => Command::StartGame,
            "lag" => Command::Lag(arg),
            "slot" => Command::Slot(arg),
            "spectate" => Command::Spectate,
            "slot_close" => Command::SlotClose(arg),
            "slot_open" => Command::SlotOpen(arg),
            "slot_bot" => Command::SlotBot(arg),
            "map" => Command::Map(arg),
            "lockteams" => Command::LockTeams(arg),
            "allowcheats" => Command::AllowCheats(arg),
            "kick" => Command::Kick(arg),
            _ => return None,
        };
        Some(command)
    }

    /// The wire verb of this command.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Ready => "ready",
            Command::StartGame => "startgame",
            Command::Lag(_) => "lag",
            Command::Slot(_) => "slot",
            Command::Spectate => "spectate",
            Command::SlotClose(_) => "slot_close",
            Command::SlotOpen(_) => "slot_open",
            Command::SlotBot(_) => "slot_bot",
            Command::Map(_) => "map",
            Command::LockTeams(_) => "lockteams",
            Command::AllowCheats(_) => "allowcheats",
            Command::Kick(_) => "kick",
        }
    }
}
