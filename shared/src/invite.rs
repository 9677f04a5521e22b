use crate::error::{MatchmakingError, Result};
use crate::protocol::LobbyId;

const JOIN_LOBBY: &str = "--JoinLobby=";

/// Launch argument that makes an invited client join `lobby`.
pub fn connection_string(lobby: LobbyId) -> String {
    format!("{}{}", JOIN_LOBBY, lobby)
}

/// Parses a single connection string.
pub fn parse_connection_string(raw: &str) -> Result<LobbyId> {
    raw.trim()
        .strip_prefix(JOIN_LOBBY)
        .and_then(|id| id.parse::<u64>().ok())
        .map(LobbyId)
        .ok_or_else(|| MatchmakingError::InvalidConnectionString(raw.to_string()))
}

/// Finds the lobby to join in a launch argument list, if any.
pub fn find_in_args<I, A>(args: I) -> Option<LobbyId>
where
    I: IntoIterator<Item = A>,
    A: AsRef<str>,
{
    args.into_iter()
        .find_map(|arg| parse_connection_string(arg.as_ref()).ok())
}
