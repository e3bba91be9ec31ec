//! Lobby command errors.

use thiserror::Error;

/// Why a lobby command was not applied.
///
/// None of these escape the dispatcher; each one is resolved into the boolean
/// outcome the transport sees, plus an optional notice to the issuer and an
/// optional log entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown server command: {0}")]
    UnknownVerb(String),

    #[error("Invalid {verb} argument: {value}")]
    MalformedArgument { verb: &'static str, value: String },

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    #[error("Unknown map: {0}")]
    UnknownMap(String),

    #[error("No client with index {0}.")]
    NoSuchClient(String),

    #[error("Slot {0} is not available")]
    SlotUnavailable(String),

    #[error("Slot {0} does not allow bots")]
    BotsNotAllowed(String),

    #[error("Can't add bots to slot {0}, it is held by a player")]
    SlotTaken(String),

    #[error("Cannot change state when game started. ({0})")]
    GameStarted(String),

    #[error("Cannot change state when marked as ready.")]
    ClientReady,
}

impl CommandError {
    /// Whether the command still counts as handled. Authority refusals are
    /// handled: the command was understood, the issuer just may not use it.
    pub fn is_handled(&self) -> bool {
        matches!(
            self,
            CommandError::Unauthorized(_) | CommandError::BotsNotAllowed(_) | CommandError::SlotTaken(_)
        )
    }

    /// Whether the issuer is told about the rejection.
    pub fn notifies_issuer(&self) -> bool {
        matches!(
            self,
            CommandError::Unauthorized(_)
                | CommandError::NoSuchClient(_)
                | CommandError::BotsNotAllowed(_)
                | CommandError::SlotTaken(_)
                | CommandError::GameStarted(_)
                | CommandError::ClientReady
        )
    }

    /// Whether the rejection goes to the lobby log.
    pub fn is_logged(&self) -> bool {
        matches!(
            self,
            CommandError::MalformedArgument { .. }
                | CommandError::InvalidSlot(_)
                | CommandError::UnknownMap(_)
                | CommandError::NoSuchClient(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_is_handled_with_notice() {
        let err = CommandError::Unauthorized("Only the host can kick players");
        assert!(err.is_handled());
        assert!(err.notifies_issuer());
        assert!(!err.is_logged());
        assert_eq!(err.to_string(), "Only the host can kick players");
    }

    #[test]
    fn test_unknown_verb_is_silent() {
        let err = CommandError::UnknownVerb("dance".into());
        assert!(!err.is_handled());
        assert!(!err.notifies_issuer());
        assert!(!err.is_logged());
    }

    #[test]
    fn test_malformed_argument_is_logged_only() {
        let err = CommandError::MalformedArgument { verb: "lag", value: "notanumber".into() };
        assert!(!err.is_handled());
        assert!(!err.notifies_issuer());
        assert!(err.is_logged());
        assert_eq!(err.to_string(), "Invalid lag argument: notanumber");
    }

    #[test]
    fn test_state_gates_notify() {
        assert_eq!(
            CommandError::GameStarted("slot 1".into()).to_string(),
            "Cannot change state when game started. (slot 1)"
        );
        assert!(CommandError::ClientReady.notifies_issuer());
        assert!(!CommandError::ClientReady.is_handled());
    }
}
