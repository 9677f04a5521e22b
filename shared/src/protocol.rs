use serde::{Deserialize, Serialize};
use std::fmt;

// Lobby data keys shared by every participant
pub const KEY_NAME: &str = "name";
pub const KEY_STATE: &str = "state";

/// Opaque lobby identifier issued by the lobby service.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LobbyId(pub u64);

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque member (user) identifier issued by the lobby service.
///
/// [`MemberId::NONE`] is reserved: a data update carrying it refers to
/// lobby-level data rather than to a member's data.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MemberId(pub u64);

impl MemberId {
    pub const NONE: MemberId = MemberId(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Readiness handshake states, in the only order they may be walked.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ReadyState {
    NotReady,
    Ready,
    Steady,
    Go,
}

impl ReadyState {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadyState::NotReady => "notReady",
            ReadyState::Ready => "ready",
            ReadyState::Steady => "steady",
            ReadyState::Go => "go",
        }
    }

    /// Parses a raw `"state"` value. Unknown and empty values yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "notReady" => Some(ReadyState::NotReady),
            "ready" => Some(ReadyState::Ready),
            "steady" => Some(ReadyState::Steady),
            "go" => Some(ReadyState::Go),
            _ => None,
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LobbyVisibility {
    #[default]
    Public,
    FriendsOnly,
    Private,
    Invisible,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LobbyTopology {
    #[default]
    FcmOwnershipTransition,
    Fcm,
    Star,
    Connectionless,
}

/// Parameters of a create-lobby command.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LobbyParams {
    pub visibility: LobbyVisibility,
    pub max_members: u32,
    pub joinable: bool,
    pub topology: LobbyTopology,
}

// ==== SERVICE RESULT CODES ====

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyEnterResult {
    Success,
    LobbyDoesNotExist,
    LobbyIsFull,
    Error,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyCreateResult {
    Success,
    Error,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Undefined,
    LobbyDoesNotExist,
    ConnectionFailure,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LobbyLeaveReason {
    UserLeft,
    LobbyClosed,
    ConnectionLost,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MemberStateChange {
    Entered,
    Left,
    Disconnected,
    Kicked,
    Banned,
}

// ==== PUSHED EVENTS ====

/// Every notification the lobby service can deliver, command callbacks and
/// unsolicited pushes alike.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    LobbyList {
        count: u32,
        result: Result<(), FailureReason>,
    },
    LobbyDataRetrieved {
        lobby: LobbyId,
        result: Result<(), FailureReason>,
    },
    LobbyEntered {
        lobby: LobbyId,
        result: LobbyEnterResult,
    },
    LobbyCreated {
        lobby: LobbyId,
        result: LobbyCreateResult,
    },
    LobbyDataUpdated {
        lobby: LobbyId,
        member: MemberId,
    },
    LobbyMemberStateChanged {
        lobby: LobbyId,
        member: MemberId,
        change: MemberStateChange,
    },
    LobbyLeft {
        lobby: LobbyId,
        reason: LobbyLeaveReason,
    },
    LobbyMessageReceived {
        lobby: LobbyId,
        sender: MemberId,
        message: u32,
        length: u32,
    },
}

/// Listener category an event is routed by.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    LobbyList,
    LobbyDataRetrieve,
    LobbyEntered,
    LobbyCreated,
    LobbyDataUpdated,
    LobbyMemberState,
    LobbyLeft,
    LobbyMessage,
}

impl ServiceEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ServiceEvent::LobbyList { .. } => EventKind::LobbyList,
            ServiceEvent::LobbyDataRetrieved { .. } => EventKind::LobbyDataRetrieve,
            ServiceEvent::LobbyEntered { .. } => EventKind::LobbyEntered,
            ServiceEvent::LobbyCreated { .. } => EventKind::LobbyCreated,
            ServiceEvent::LobbyDataUpdated { .. } => EventKind::LobbyDataUpdated,
            ServiceEvent::LobbyMemberStateChanged { .. } => EventKind::LobbyMemberState,
            ServiceEvent::LobbyLeft { .. } => EventKind::LobbyLeft,
            ServiceEvent::LobbyMessageReceived { .. } => EventKind::LobbyMessage,
        }
    }

    /// Lobby the event concerns, if any.
    pub fn lobby(&self) -> Option<LobbyId> {
        match self {
            ServiceEvent::LobbyList { .. } => None,
            ServiceEvent::LobbyDataRetrieved { lobby, .. }
            | ServiceEvent::LobbyEntered { lobby, .. }
            | ServiceEvent::LobbyCreated { lobby, .. }
            | ServiceEvent::LobbyDataUpdated { lobby, .. }
            | ServiceEvent::LobbyMemberStateChanged { lobby, .. }
            | ServiceEvent::LobbyLeft { lobby, .. }
            | ServiceEvent::LobbyMessageReceived { lobby, .. } => Some(*lobby),
        }
    }
}
