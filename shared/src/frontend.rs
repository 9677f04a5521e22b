use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;
use crate::directory::LobbySummary;
use crate::protocol::{FailureReason, LobbyId, LobbyLeaveReason, MemberId, MemberStateChange};

/// Why joining a lobby failed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum JoinFailure {
    LobbyMissing,
    LobbyFull,
    Unspecified,
}

impl JoinFailure {
    pub fn describe(self) -> &'static str {
        match self {
            JoinFailure::LobbyMissing => "Lobby does not exist",
            JoinFailure::LobbyFull => "Lobby is full",
            JoinFailure::Unspecified => "Unspecified error",
        }
    }
}

/// How the remote participant went away.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Departure {
    Closed(LobbyLeaveReason),
    Member(MemberStateChange),
}

/// Which side abandoned the match, as seen locally.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MatchEnd {
    HostLeft(Departure),
    GuestLeft(Departure),
}

/// Everything outside the synchronization core that reacts to it: menus,
/// popups, the scene controller.
pub trait Frontend {
    fn lobby_list_ready(&mut self, lobbies: Vec<LobbySummary>);
    fn lobby_list_failed(&mut self, reason: FailureReason);
    fn lobby_entered(&mut self, lobby: LobbyId, owner: bool);
    fn join_failed(&mut self, reason: JoinFailure);
    fn create_failed(&mut self);
    fn start_control(&mut self, enabled: bool);
    fn begin_session(&mut self, lobby: LobbyId);
    fn session_synchronized(&mut self, lobby: LobbyId);
    fn match_ended(&mut self, end: MatchEnd);
    fn lobby_left(&mut self, lobby: LobbyId);

    fn member_entered(&mut self, _lobby: LobbyId, _member: MemberId) {}
    fn chat_message(&mut self, _lobby: LobbyId, _message: &ChatMessage) {}
}

/// One collaborator notification, as recorded by [`SignalLog`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Signal {
    LobbyListReady(Vec<LobbySummary>),
    LobbyListFailed(FailureReason),
    LobbyEntered { lobby: LobbyId, owner: bool },
    JoinFailed(JoinFailure),
    CreateFailed,
    StartControl(bool),
    BeginSession(LobbyId),
    SessionSynchronized(LobbyId),
    MatchEnded(MatchEnd),
    LobbyLeft(LobbyId),
    MemberEntered { lobby: LobbyId, member: MemberId },
    ChatMessage { lobby: LobbyId, message: ChatMessage },
}

/// Frontend that records every signal in order. Used by headless drivers
/// and tests.
#[derive(Debug, Default, Clone)]
pub struct SignalLog {
    pub signals: Vec<Signal>,
}

impl SignalLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&Signal) -> bool) -> usize {
        self.signals.iter().filter(|s| pred(s)).count()
    }

    pub fn last(&self) -> Option<&Signal> {
        self.signals.last()
    }

    pub fn drain(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }
}

impl Frontend for SignalLog {
    fn lobby_list_ready(&mut self, lobbies: Vec<LobbySummary>) {
        self.signals.push(Signal::LobbyListReady(lobbies));
    }
    fn lobby_list_failed(&mut self, reason: FailureReason) {
        self.signals.push(Signal::LobbyListFailed(reason));
    }
    fn lobby_entered(&mut self, lobby: LobbyId, owner: bool) {
        self.signals.push(Signal::LobbyEntered { lobby, owner });
    }
    fn join_failed(&mut self, reason: JoinFailure) {
        self.signals.push(Signal::JoinFailed(reason));
    }
    fn create_failed(&mut self) {
        self.signals.push(Signal::CreateFailed);
    }
    fn start_control(&mut self, enabled: bool) {
        self.signals.push(Signal::StartControl(enabled));
    }
    fn begin_session(&mut self, lobby: LobbyId) {
        self.signals.push(Signal::BeginSession(lobby));
    }
    fn session_synchronized(&mut self, lobby: LobbyId) {
        self.signals.push(Signal::SessionSynchronized(lobby));
    }
    fn match_ended(&mut self, end: MatchEnd) {
        self.signals.push(Signal::MatchEnded(end));
    }
    fn lobby_left(&mut self, lobby: LobbyId) {
        self.signals.push(Signal::LobbyLeft(lobby));
    }
    fn member_entered(&mut self, lobby: LobbyId, member: MemberId) {
        self.signals.push(Signal::MemberEntered { lobby, member });
    }
    fn chat_message(&mut self, lobby: LobbyId, message: &ChatMessage) {
        self.signals.push(Signal::ChatMessage {
            lobby,
            message: message.clone(),
        });
    }
}
