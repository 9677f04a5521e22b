use crate::protocol::{LobbyId, MemberId, ReadyState};
use thiserror::Error;

/// Failure of a call against the lobby service. Expected and frequent:
/// logged by the caller and never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("lobby {0} does not exist")]
    LobbyNotFound(LobbyId),
    #[error("member {member} is not in lobby {lobby}")]
    NotAMember { lobby: LobbyId, member: MemberId },
    #[error("member {member} does not own lobby {lobby}")]
    NotOwner { lobby: LobbyId, member: MemberId },
    #[error("message {message} not found in lobby {lobby}")]
    MessageNotFound { lobby: LobbyId, message: u32 },
    #[error("index {index} out of range ({len} entries)")]
    IndexOutOfRange { index: u32, len: u32 },
    #[error("user {0} is unknown")]
    UnknownUser(MemberId),
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// A synchronization bug rather than a network condition. Surfaced to the
/// caller instead of being recovered from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("expected exactly 2 lobby members, found {0}")]
    MemberCount(u32),
    #[error("lobby {lobby} went steady while local member state was {found:?}")]
    SteadyBeforeReady {
        lobby: LobbyId,
        found: Option<ReadyState>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchmakingError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),
    #[error("not currently in a lobby")]
    NoCurrentLobby,
    #[error("only the lobby owner may do that")]
    NotOwner,
    #[error("lobby is not ready to start")]
    StartNotEnabled,
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),
}

pub type Result<T, E = MatchmakingError> = std::result::Result<T, E>;
