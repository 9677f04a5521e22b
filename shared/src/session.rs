use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::error::{MatchmakingError, ProtocolViolation, Result, ServiceError};
use crate::frontend::JoinFailure;
use crate::protocol::{
    LobbyCreateResult, LobbyEnterResult, LobbyId, LobbyParams, MemberId, ReadyState, KEY_NAME,
    KEY_STATE,
};
use crate::service::LobbyService;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LobbyMember {
    pub id: MemberId,
    pub data: HashMap<String, String>,
}

/// Local mirror of the lobby the local user occupies.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Lobby {
    pub id: LobbyId,
    pub owner: MemberId,
    pub data: HashMap<String, String>,
    pub members: Vec<LobbyMember>,
}

impl Lobby {
    fn new(id: LobbyId, owner: MemberId) -> Self {
        Self {
            id,
            owner,
            data: HashMap::new(),
            members: Vec::new(),
        }
    }

    fn member_mut(&mut self, id: MemberId) -> &mut LobbyMember {
        let index = match self.members.iter().position(|m| m.id == id) {
            Some(index) => index,
            None => {
                self.members.push(LobbyMember {
                    id,
                    data: HashMap::new(),
                });
                self.members.len() - 1
            }
        };
        &mut self.members[index]
    }
}

/// The single lobby the local participant currently occupies.
///
/// Lobby id and owner live in one `Option`, so they are established and
/// cleared together. Owner identity belongs to this session only.
#[derive(Debug, Default)]
pub struct LobbySession {
    current: Option<Lobby>,
    pending_name: Option<String>,
}

impl LobbySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Lobby> {
        self.current.as_ref()
    }

    pub fn current_id(&self) -> Option<LobbyId> {
        self.current.as_ref().map(|l| l.id)
    }

    pub fn owner_id(&self) -> Option<MemberId> {
        self.current.as_ref().map(|l| l.owner)
    }

    pub fn is_current(&self, lobby: LobbyId) -> bool {
        self.current_id() == Some(lobby)
    }

    pub fn is_owner(&self, member: MemberId) -> bool {
        self.owner_id() == Some(member)
    }

    fn require(&self) -> Result<LobbyId> {
        self.current_id().ok_or(MatchmakingError::NoCurrentLobby)
    }

    // ==== COMMANDS ====

    pub fn create<S: LobbyService>(
        &mut self,
        service: &mut S,
        name: &str,
        params: &LobbyParams,
    ) -> Result<(), ServiceError> {
        info!("🏠 Creating lobby '{}' for {} members", name, params.max_members);
        service
            .create_lobby(params)
            .inspect_err(|e| warn!("Could not create lobby for reason: {}", e))?;
        self.pending_name = Some(name.to_string());
        Ok(())
    }

    /// Establishes the mirror for a freshly created lobby and seeds its
    /// data. Returns `false` when creation failed; current-lobby state is
    /// then untouched.
    pub fn on_created<S: LobbyService>(
        &mut self,
        service: &mut S,
        lobby: LobbyId,
        result: LobbyCreateResult,
    ) -> bool {
        let name = self.pending_name.take().unwrap_or_default();
        if result != LobbyCreateResult::Success {
            warn!("❌ Lobby creation failed: {:?}", result);
            return false;
        }
        let owner = match service.owner(lobby) {
            Ok(owner) => owner,
            Err(e) => {
                warn!("Could not resolve owner of new lobby {}: {}", lobby, e);
                abandon(service, lobby);
                return false;
            }
        };

        let mut mirror = Lobby::new(lobby, owner);
        let seed = [
            (KEY_NAME, name.as_str()),
            (KEY_STATE, ReadyState::NotReady.as_str()),
        ];
        for (key, value) in seed {
            match service.set_lobby_data(lobby, key, value) {
                Ok(()) => {
                    mirror.data.insert(key.to_string(), value.to_string());
                }
                Err(e) => warn!("Could not set lobby {} data {} to {}: {}", lobby, key, value, e),
            }
        }
        self.current = Some(mirror);
        self.seed_member_state(service);
        info!("🚀 Created lobby {} owned by {}", lobby, owner);
        true
    }

    pub fn join<S: LobbyService>(
        &mut self,
        service: &mut S,
        lobby: LobbyId,
    ) -> Result<(), ServiceError> {
        info!("🚪 Joining lobby {}", lobby);
        service
            .join_lobby(lobby)
            .inspect_err(|e| warn!("Could not join lobby {} for reason: {}", lobby, e))
    }

    pub fn on_entered<S: LobbyService>(
        &mut self,
        service: &mut S,
        lobby: LobbyId,
        result: LobbyEnterResult,
    ) -> Result<(), JoinFailure> {
        let failure = match result {
            LobbyEnterResult::Success => None,
            LobbyEnterResult::LobbyDoesNotExist => Some(JoinFailure::LobbyMissing),
            LobbyEnterResult::LobbyIsFull => Some(JoinFailure::LobbyFull),
            LobbyEnterResult::Error => Some(JoinFailure::Unspecified),
        };
        if let Some(failure) = failure {
            warn!("❌ Could not enter lobby {}: {}", lobby, failure.describe());
            return Err(failure);
        }
        let owner = match service.owner(lobby) {
            Ok(owner) => owner,
            Err(e) => {
                warn!("Could not resolve owner of lobby {}: {}", lobby, e);
                abandon(service, lobby);
                return Err(JoinFailure::Unspecified);
            }
        };
        self.current = Some(Lobby::new(lobby, owner));
        self.seed_member_state(service);
        info!("🎮 Entered lobby {} owned by {}", lobby, owner);
        Ok(())
    }

    fn seed_member_state<S: LobbyService>(&mut self, service: &mut S) {
        if let Err(e) = self.set_member_data(service, KEY_STATE, ReadyState::NotReady.as_str()) {
            warn!("Could not seed member state: {}", e);
        }
    }

    /// Asks the service to leave. The mirror is cleared when the matching
    /// leave event arrives, since the service may reject or delay the leave.
    pub fn leave<S: LobbyService>(&mut self, service: &mut S) -> Result<()> {
        let lobby = self.require()?;
        info!("👋 Leaving lobby {}", lobby);
        service
            .leave_lobby(lobby)
            .inspect_err(|e| warn!("Could not leave lobby {} for reason: {}", lobby, e))?;
        Ok(())
    }

    /// Discards the mirror if it is the lobby that was left.
    pub fn on_left(&mut self, lobby: LobbyId) -> Option<Lobby> {
        if !self.is_current(lobby) {
            return None;
        }
        self.current.take()
    }

    // ==== RECORD ACCESS ====

    pub fn owner<S: LobbyService>(
        &self,
        service: &S,
        lobby: LobbyId,
    ) -> Result<MemberId, ServiceError> {
        service
            .owner(lobby)
            .inspect_err(|e| warn!("Could not retrieve lobby {} owner for reason: {}", lobby, e))
    }

    pub fn lobby_data<S: LobbyService>(
        &mut self,
        service: &S,
        lobby: LobbyId,
        key: &str,
    ) -> Result<String, ServiceError> {
        let value = service.lobby_data(lobby, key).inspect_err(|e| {
            warn!("Could not retrieve lobby {} data {} for reason: {}", lobby, key, e)
        })?;
        if let Some(mirror) = self.current.as_mut().filter(|l| l.id == lobby) {
            mirror.data.insert(key.to_string(), value.clone());
        }
        Ok(value)
    }

    pub fn set_lobby_data<S: LobbyService>(
        &mut self,
        service: &mut S,
        lobby: LobbyId,
        key: &str,
        value: &str,
    ) -> Result<(), ServiceError> {
        service.set_lobby_data(lobby, key, value).inspect_err(|e| {
            warn!("Could not set lobby {} data {} to {} for reason: {}", lobby, key, value, e)
        })?;
        if let Some(mirror) = self.current.as_mut().filter(|l| l.id == lobby) {
            mirror.data.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    pub fn member_data<S: LobbyService>(
        &mut self,
        service: &S,
        member: MemberId,
        key: &str,
    ) -> Result<String> {
        let lobby = self.require()?;
        let value = service.member_data(lobby, member, key).inspect_err(|e| {
            warn!("Could not read lobby {} member {} data {} for reason: {}", lobby, member, key, e)
        })?;
        if let Some(mirror) = self.current.as_mut() {
            mirror.member_mut(member).data.insert(key.to_string(), value.clone());
        }
        Ok(value)
    }

    /// Writes the local member's own data in the current lobby.
    pub fn set_member_data<S: LobbyService>(
        &mut self,
        service: &mut S,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let lobby = self.require()?;
        service.set_member_data(lobby, key, value).inspect_err(|e| {
            warn!(
                "Could not set lobby {} member data {} to {} for reason: {}",
                lobby, key, value, e
            )
        })?;
        let local = service.local_id();
        if let Some(mirror) = self.current.as_mut() {
            mirror.member_mut(local).data.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    pub fn member_by_index<S: LobbyService>(&self, service: &S, index: u32) -> Result<MemberId> {
        let lobby = self.require()?;
        Ok(service
            .member_by_index(lobby, index)
            .inspect_err(|e| warn!("Could not get lobby member {} for reason: {}", index, e))?)
    }

    pub fn member_count<S: LobbyService>(&self, service: &S) -> Result<u32> {
        let lobby = self.require()?;
        Ok(service
            .member_count(lobby)
            .inspect_err(|e| warn!("Could not get lobby member count for reason: {}", e))?)
    }

    /// Current roster, in service order.
    pub fn members<S: LobbyService>(&mut self, service: &S) -> Result<Vec<MemberId>> {
        let count = self.member_count(service)?;
        let members = (0..count)
            .map(|i| self.member_by_index(service, i))
            .collect::<Result<Vec<_>>>()?;
        if let Some(mirror) = self.current.as_mut() {
            mirror.members.retain(|m| members.contains(&m.id));
            for &id in &members {
                mirror.member_mut(id);
            }
        }
        Ok(members)
    }

    /// The member that is not the local user. Only defined for a lobby of
    /// exactly two.
    pub fn second_participant<S: LobbyService>(&mut self, service: &S) -> Result<MemberId> {
        let members = self.members(service)?;
        if members.len() != 2 {
            return Err(ProtocolViolation::MemberCount(members.len() as u32).into());
        }
        let local = service.local_id();
        let second = if members[0] != local { members[0] } else { members[1] };
        Ok(second)
    }
}

// best effort: do not linger in a lobby we could not mirror
fn abandon<S: LobbyService>(service: &mut S, lobby: LobbyId) {
    if let Err(e) = service.leave_lobby(lobby) {
        warn!("Could not leave lobby {}: {}", lobby, e);
    }
}
