//! Scripted lobby service for unit tests: serves reads from an in-memory
//! record, applies writes immediately, and records every command issued.
//! Events are injected by the test itself.

use std::collections::HashMap;

use crate::error::ServiceError;
use crate::protocol::{LobbyId, LobbyParams, MemberId};
use crate::service::LobbyService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    RequestList(bool),
    RequestData(LobbyId),
    Join(LobbyId),
    Create(LobbyParams),
    Leave(LobbyId),
    SetLobbyData(LobbyId, String, String),
    SetMemberData(LobbyId, String, String),
    Send(LobbyId, String),
    InviteDialog(String),
    Invite(MemberId, String),
}

#[derive(Debug, Default)]
pub(crate) struct FakeLobby {
    pub owner: MemberId,
    pub data: HashMap<String, String>,
    pub members: Vec<(MemberId, HashMap<String, String>)>,
    pub messages: HashMap<u32, (MemberId, String)>,
}

#[derive(Debug, Default)]
pub(crate) struct FakeService {
    pub local: MemberId,
    pub lobbies: HashMap<LobbyId, FakeLobby>,
    pub listed: Vec<LobbyId>,
    pub names: HashMap<MemberId, String>,
    pub pings: HashMap<MemberId, u32>,
    pub calls: Vec<Call>,
    pub offline: bool,
}

impl FakeService {
    pub fn new(local: u64) -> Self {
        Self {
            local: MemberId(local),
            ..Self::default()
        }
    }

    /// Adds a lobby owned by `owner` with the given members, all `notReady`.
    pub fn with_lobby(mut self, lobby: u64, owner: u64, members: &[u64]) -> Self {
        let mut record = FakeLobby {
            owner: MemberId(owner),
            ..FakeLobby::default()
        };
        record.data.insert("state".into(), "notReady".into());
        for &m in members {
            let mut data = HashMap::new();
            data.insert("state".to_string(), "notReady".to_string());
            record.members.push((MemberId(m), data));
        }
        self.lobbies.insert(LobbyId(lobby), record);
        self
    }

    pub fn put_member(&mut self, lobby: u64, member: u64, key: &str, value: &str) {
        if let Some(record) = self.lobbies.get_mut(&LobbyId(lobby)) {
            if let Some((_, data)) = record.members.iter_mut().find(|(m, _)| m.0 == member) {
                data.insert(key.to_string(), value.to_string());
            }
        }
    }

    pub fn put_lobby(&mut self, lobby: u64, key: &str, value: &str) {
        if let Some(record) = self.lobbies.get_mut(&LobbyId(lobby)) {
            record.data.insert(key.to_string(), value.to_string());
        }
    }

    pub fn lobby_writes(&self) -> Vec<(String, String)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::SetLobbyData(_, k, v) => Some((k.clone(), v.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn member_writes(&self) -> Vec<(String, String)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::SetMemberData(_, k, v) => Some((k.clone(), v.clone())),
                _ => None,
            })
            .collect()
    }

    fn online(&self) -> Result<(), ServiceError> {
        if self.offline {
            Err(ServiceError::Unavailable("offline".into()))
        } else {
            Ok(())
        }
    }

    fn lobby(&self, lobby: LobbyId) -> Result<&FakeLobby, ServiceError> {
        self.online()?;
        self.lobbies
            .get(&lobby)
            .ok_or(ServiceError::LobbyNotFound(lobby))
    }
}

impl LobbyService for FakeService {
    fn local_id(&self) -> MemberId {
        self.local
    }

    fn request_lobby_list(&mut self, include_full: bool) -> Result<(), ServiceError> {
        self.online()?;
        self.calls.push(Call::RequestList(include_full));
        Ok(())
    }

    fn lobby_by_index(&self, index: u32) -> Result<LobbyId, ServiceError> {
        self.listed
            .get(index as usize)
            .copied()
            .ok_or(ServiceError::IndexOutOfRange {
                index,
                len: self.listed.len() as u32,
            })
    }

    fn request_lobby_data(&mut self, lobby: LobbyId) -> Result<(), ServiceError> {
        self.online()?;
        self.calls.push(Call::RequestData(lobby));
        Ok(())
    }

    fn join_lobby(&mut self, lobby: LobbyId) -> Result<(), ServiceError> {
        self.online()?;
        self.calls.push(Call::Join(lobby));
        Ok(())
    }

    fn create_lobby(&mut self, params: &LobbyParams) -> Result<(), ServiceError> {
        self.online()?;
        self.calls.push(Call::Create(params.clone()));
        Ok(())
    }

    fn leave_lobby(&mut self, lobby: LobbyId) -> Result<(), ServiceError> {
        self.online()?;
        self.calls.push(Call::Leave(lobby));
        Ok(())
    }

    fn lobby_data(&self, lobby: LobbyId, key: &str) -> Result<String, ServiceError> {
        Ok(self.lobby(lobby)?.data.get(key).cloned().unwrap_or_default())
    }

    fn set_lobby_data(
        &mut self,
        lobby: LobbyId,
        key: &str,
        value: &str,
    ) -> Result<(), ServiceError> {
        self.online()?;
        self.calls
            .push(Call::SetLobbyData(lobby, key.to_string(), value.to_string()));
        self.put_lobby(lobby.0, key, value);
        Ok(())
    }

    fn member_data(
        &self,
        lobby: LobbyId,
        member: MemberId,
        key: &str,
    ) -> Result<String, ServiceError> {
        let record = self.lobby(lobby)?;
        record
            .members
            .iter()
            .find(|(m, _)| *m == member)
            .map(|(_, data)| data.get(key).cloned().unwrap_or_default())
            .ok_or(ServiceError::NotAMember { lobby, member })
    }

    fn set_member_data(
        &mut self,
        lobby: LobbyId,
        key: &str,
        value: &str,
    ) -> Result<(), ServiceError> {
        self.online()?;
        self.calls
            .push(Call::SetMemberData(lobby, key.to_string(), value.to_string()));
        let local = self.local.0;
        self.put_member(lobby.0, local, key, value);
        Ok(())
    }

    fn member_by_index(&self, lobby: LobbyId, index: u32) -> Result<MemberId, ServiceError> {
        let record = self.lobby(lobby)?;
        record
            .members
            .get(index as usize)
            .map(|(m, _)| *m)
            .ok_or(ServiceError::IndexOutOfRange {
                index,
                len: record.members.len() as u32,
            })
    }

    fn member_count(&self, lobby: LobbyId) -> Result<u32, ServiceError> {
        Ok(self.lobby(lobby)?.members.len() as u32)
    }

    fn owner(&self, lobby: LobbyId) -> Result<MemberId, ServiceError> {
        Ok(self.lobby(lobby)?.owner)
    }

    fn send_lobby_message(&mut self, lobby: LobbyId, text: &str) -> Result<bool, ServiceError> {
        self.lobby(lobby)?;
        self.calls.push(Call::Send(lobby, text.to_string()));
        Ok(true)
    }

    fn lobby_message(
        &self,
        lobby: LobbyId,
        message: u32,
    ) -> Result<(MemberId, String), ServiceError> {
        self.lobby(lobby)?
            .messages
            .get(&message)
            .cloned()
            .ok_or(ServiceError::MessageNotFound { lobby, message })
    }

    fn persona_name(&self, user: MemberId) -> Result<String, ServiceError> {
        self.names
            .get(&user)
            .cloned()
            .ok_or(ServiceError::UnknownUser(user))
    }

    fn ping_with(&self, user: MemberId) -> Result<u32, ServiceError> {
        self.online()?;
        self.pings
            .get(&user)
            .copied()
            .ok_or_else(|| ServiceError::Unavailable(format!("no route to {}", user)))
    }

    fn show_invite_dialog(&mut self, connection: &str) -> Result<(), ServiceError> {
        self.online()?;
        self.calls.push(Call::InviteDialog(connection.to_string()));
        Ok(())
    }

    fn send_invitation(&mut self, user: MemberId, connection: &str) -> Result<(), ServiceError> {
        self.online()?;
        self.calls.push(Call::Invite(user, connection.to_string()));
        Ok(())
    }
}
