use tracing::{debug, info};

use crate::error::{MatchmakingError, ProtocolViolation, Result};
use crate::frontend::{Departure, Frontend, MatchEnd};
use crate::protocol::{
    LobbyId, LobbyLeaveReason, MemberId, MemberStateChange, ReadyState, KEY_STATE,
};
use crate::service::LobbyService;
use crate::session::LobbySession;

/// Drives the `notReady -> ready -> steady -> go` handshake for the current
/// lobby. Every decision is recomputed from the values currently stored in
/// the lobby record, so duplicate notifications are harmless.
#[derive(Debug, Default, Clone)]
pub struct ReadinessProtocol {
    ready_members: u32,
    start_enabled: bool,
    session_started: bool,
    synchronized: bool,
    match_over: bool,
}

impl ReadinessProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ready_members(&self) -> u32 {
        self.ready_members
    }

    pub fn start_enabled(&self) -> bool {
        self.start_enabled
    }

    pub fn session_started(&self) -> bool {
        self.session_started
    }

    pub fn synchronized(&self) -> bool {
        self.synchronized
    }

    pub fn match_over(&self) -> bool {
        self.match_over
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // ==== LOBBY DATA UPDATES ====

    /// A member's data changed. Only the owner reacts, recomputing the lobby
    /// state from every member's current state.
    pub fn on_member_update<S: LobbyService>(
        &mut self,
        session: &mut LobbySession,
        service: &mut S,
        lobby: LobbyId,
    ) -> Result<()> {
        if !session.is_current(lobby) || !session.is_owner(service.local_id()) {
            return Ok(());
        }
        let lobby_state = ReadyState::parse(&session.lobby_data(service, lobby, KEY_STATE)?)
            .unwrap_or(ReadyState::NotReady);
        if lobby_state > ReadyState::Ready {
            debug!("lobby {} already {}, readiness is settled", lobby, lobby_state);
            return Ok(());
        }

        let members = session.members(service)?;
        let mut ready = 0;
        for &member in &members {
            if ReadyState::parse(&session.member_data(service, member, KEY_STATE)?)
                == Some(ReadyState::Ready)
            {
                ready += 1;
            }
        }
        self.ready_members = ready;

        let target = if members.len() == 2 && ready == 2 {
            ReadyState::Ready
        } else {
            ReadyState::NotReady
        };
        debug!(%lobby, ready, members = members.len(), "readiness evaluated");
        if target != lobby_state {
            info!("📋 Lobby {} is now {}", lobby, target);
            session.set_lobby_data(service, lobby, KEY_STATE, target.as_str())?;
        }
        Ok(())
    }

    /// Lobby-level data changed. Updates the owner's start control and, once
    /// the owner has gone `steady`, moves the local member into the session.
    pub fn on_lobby_update<S: LobbyService, F: Frontend>(
        &mut self,
        session: &mut LobbySession,
        service: &mut S,
        frontend: &mut F,
        lobby: LobbyId,
    ) -> Result<()> {
        if !session.is_current(lobby) {
            return Ok(());
        }
        let local = service.local_id();
        let lobby_state = ReadyState::parse(&session.lobby_data(service, lobby, KEY_STATE)?);

        let enabled = lobby_state == Some(ReadyState::Ready) && session.is_owner(local);
        if enabled != self.start_enabled {
            self.start_enabled = enabled;
            frontend.start_control(enabled);
        }

        if lobby_state != Some(ReadyState::Steady) || self.session_started {
            return Ok(());
        }
        let own = ReadyState::parse(&session.member_data(service, local, KEY_STATE)?);
        if own != Some(ReadyState::Ready) {
            return Err(ProtocolViolation::SteadyBeforeReady { lobby, found: own }.into());
        }
        self.advance_local(session, service, ReadyState::Steady)?;
        self.session_started = true;
        info!("🚀 Lobby {} is steady, starting session", lobby);
        frontend.begin_session(lobby);
        Ok(())
    }

    /// In-session data update: once both members report `go` the owner
    /// publishes `go` and each side reports the session as synchronized.
    pub fn on_session_update<S: LobbyService, F: Frontend>(
        &mut self,
        session: &mut LobbySession,
        service: &mut S,
        frontend: &mut F,
        lobby: LobbyId,
        member: MemberId,
    ) -> Result<()> {
        if member.is_none() || !session.is_current(lobby) || self.synchronized || self.match_over {
            return Ok(());
        }
        // a departure is already on its way as a member-state notice
        if session.member_count(service)? != 2 {
            debug!(%lobby, "roster is no longer a pair, skipping go check");
            return Ok(());
        }
        let local = service.local_id();
        let second = session.second_participant(service)?;
        for participant in [local, second] {
            if ReadyState::parse(&session.member_data(service, participant, KEY_STATE)?)
                != Some(ReadyState::Go)
            {
                return Ok(());
            }
        }
        if session.is_owner(local) {
            session.set_lobby_data(service, lobby, KEY_STATE, ReadyState::Go.as_str())?;
        }
        self.synchronized = true;
        info!("🎮 Lobby {} synchronized, match is live", lobby);
        frontend.session_synchronized(lobby);
        Ok(())
    }

    // ==== ABANDONMENT ====

    /// The local participant was removed from the lobby. Only involuntary
    /// removals end the match; a voluntary leave is plain teardown.
    pub fn on_lobby_left<F: Frontend>(
        &mut self,
        frontend: &mut F,
        local_is_owner: bool,
        reason: LobbyLeaveReason,
    ) {
        if reason == LobbyLeaveReason::UserLeft {
            return;
        }
        let departure = Departure::Closed(reason);
        let end = if local_is_owner {
            MatchEnd::GuestLeft(departure)
        } else {
            MatchEnd::HostLeft(departure)
        };
        self.end_match(frontend, end);
    }

    /// A remote member entered or departed. Before the session starts a
    /// newcomer re-arms the match, so the next departure is signalled again.
    pub fn on_member_state<F: Frontend>(
        &mut self,
        frontend: &mut F,
        lobby: LobbyId,
        member: MemberId,
        member_is_owner: bool,
        change: MemberStateChange,
    ) {
        if change == MemberStateChange::Entered {
            debug!("member {} entered lobby {}", member, lobby);
            if self.match_over && !self.session_started {
                info!("🔁 Lobby {} open again for a new match", lobby);
                self.match_over = false;
                self.ready_members = 0;
            }
            frontend.member_entered(lobby, member);
            return;
        }
        let departure = Departure::Member(change);
        let end = if member_is_owner {
            MatchEnd::HostLeft(departure)
        } else {
            MatchEnd::GuestLeft(departure)
        };
        self.end_match(frontend, end);
    }

    fn end_match<F: Frontend>(&mut self, frontend: &mut F, end: MatchEnd) {
        if self.match_over {
            debug!("match already ended, ignoring {:?}", end);
            return;
        }
        self.match_over = true;
        info!("👋 Match ended: {:?}", end);
        if self.start_enabled {
            self.start_enabled = false;
            frontend.start_control(false);
        }
        frontend.match_ended(end);
    }

    // ==== LOCAL COMMANDS ====

    pub fn set_ready<S: LobbyService>(
        &mut self,
        session: &mut LobbySession,
        service: &mut S,
    ) -> Result<()> {
        self.advance_local(session, service, ReadyState::Ready).map(|_| ())
    }

    /// Owner moves the lobby to `steady`. Allowed only while the start
    /// control is enabled.
    pub fn start_match<S: LobbyService>(
        &mut self,
        session: &mut LobbySession,
        service: &mut S,
    ) -> Result<()> {
        let lobby = session.current_id().ok_or(MatchmakingError::NoCurrentLobby)?;
        if !session.is_owner(service.local_id()) {
            return Err(MatchmakingError::NotOwner);
        }
        if !self.start_enabled {
            return Err(MatchmakingError::StartNotEnabled);
        }
        info!("🏁 Starting match in lobby {}", lobby);
        session.set_lobby_data(service, lobby, KEY_STATE, ReadyState::Steady.as_str())?;
        Ok(())
    }

    pub fn session_loaded<S: LobbyService>(
        &mut self,
        session: &mut LobbySession,
        service: &mut S,
    ) -> Result<()> {
        self.advance_local(session, service, ReadyState::Go).map(|_| ())
    }

    /// Writes the local member state if `target` lies ahead of the stored
    /// one. Returns whether a write was issued.
    pub fn advance_local<S: LobbyService>(
        &mut self,
        session: &mut LobbySession,
        service: &mut S,
        target: ReadyState,
    ) -> Result<bool> {
        let local = service.local_id();
        let current = ReadyState::parse(&session.member_data(service, local, KEY_STATE)?);
        if current.is_some_and(|state| state >= target) {
            debug!("member state is already {:?}, not moving back to {}", current, target);
            return Ok(false);
        }
        session.set_member_data(service, KEY_STATE, target.as_str())?;
        Ok(true)
    }
}
