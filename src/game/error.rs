//! Faults surfaced to the caller of the action dispatcher

/// A message that could not be processed. Handlers that follow the
/// log-and-ignore policy never return these; see `GameServer::handle`.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("{context}: no actor attached to user {user_id}")]
    NoActorAttached {
        context: &'static str,
        user_id: u16,
    },

    #[error("Form {0:#x} doesn't exist")]
    FormNotFound(u32),

    #[error("Form {0:#x} is not an actor")]
    NotAnActor(u32),

    #[error("Bad hoster is attached to caster {caster:#x}, expected {expected:#x}, but found {found:#x}")]
    BadHoster { caster: u32, expected: u32, found: u32 },

    #[error("Missing {kind} record for {id:#x}")]
    MissingRecord { id: u32, kind: &'static str },

    #[error("Unsupported return value type: {0}")]
    UnsupportedReturnValue(String),

    #[error("Attempt to move non-droppable item {base_id:#x} by actor {actor:#x}")]
    ItemNotDroppable { actor: u32, base_id: u32 },

    #[error("No game data loaded")]
    NoGameData,
}
