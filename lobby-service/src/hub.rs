use parking_lot::RwLock;
use serde::Serialize;
use shared::error::ServiceError;
use shared::protocol::{
    FailureReason, LobbyCreateResult, LobbyEnterResult, LobbyId, LobbyLeaveReason, LobbyParams,
    LobbyVisibility, MemberId, MemberStateChange, ServiceEvent,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
pub struct HubMember {
    pub id: MemberId,
    pub data: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HubLobby {
    pub id: LobbyId,
    pub owner: MemberId,
    pub params: LobbyParams,
    pub data: HashMap<String, String>,
    pub members: Vec<HubMember>,
    pub messages: Vec<(MemberId, String)>,
}

impl HubLobby {
    fn is_full(&self) -> bool {
        self.members.len() as u32 >= self.params.max_members
    }

    fn is_listed(&self) -> bool {
        self.params.joinable && self.params.visibility == LobbyVisibility::Public
    }

    fn contains(&self, member: MemberId) -> bool {
        self.members.iter().any(|m| m.id == member)
    }

    fn member_ids(&self) -> Vec<MemberId> {
        self.members.iter().map(|m| m.id).collect()
    }
}

#[derive(Debug)]
struct User {
    name: String,
    outbox: UnboundedSender<ServiceEvent>,
    online: bool,
    latency_ms: u32,
    listing: Vec<LobbyId>,
    invitations: Vec<(MemberId, String)>,
}

#[derive(Debug)]
struct HubState {
    next_lobby: u64,
    next_member: u64,
    lobbies: HashMap<LobbyId, HubLobby>,
    users: HashMap<MemberId, User>,
}

impl Default for HubState {
    fn default() -> Self {
        // 0 is the lobby-level sentinel, never handed out
        Self {
            next_lobby: 1,
            next_member: 1,
            lobbies: HashMap::new(),
            users: HashMap::new(),
        }
    }
}

impl HubState {
    fn user(&self, id: MemberId) -> Result<&User, ServiceError> {
        match self.users.get(&id) {
            Some(user) if user.online => Ok(user),
            Some(_) => Err(ServiceError::Unavailable(format!("user {} is offline", id))),
            None => Err(ServiceError::UnknownUser(id)),
        }
    }

    fn lobby(&self, lobby: LobbyId) -> Result<&HubLobby, ServiceError> {
        self.lobbies
            .get(&lobby)
            .ok_or(ServiceError::LobbyNotFound(lobby))
    }

    fn member_lobby(
        &mut self,
        lobby: LobbyId,
        member: MemberId,
    ) -> Result<&mut HubLobby, ServiceError> {
        let record = self
            .lobbies
            .get_mut(&lobby)
            .ok_or(ServiceError::LobbyNotFound(lobby))?;
        if !record.contains(member) {
            return Err(ServiceError::NotAMember { lobby, member });
        }
        Ok(record)
    }

    fn send(&self, to: MemberId, event: ServiceEvent) {
        let Some(user) = self.users.get(&to).filter(|u| u.online) else {
            return;
        };
        if user.outbox.send(event).is_err() {
            debug!("user {} stopped listening", to);
        }
    }

    fn broadcast(&self, to: &[MemberId], event: ServiceEvent) {
        for &member in to {
            self.send(member, event.clone());
        }
    }

    /// Removes `member` and tells everyone involved. An owner departing
    /// closes the lobby for the rest.
    fn depart(
        &mut self,
        lobby: LobbyId,
        member: MemberId,
        own: LobbyLeaveReason,
        change: MemberStateChange,
    ) {
        let Some(record) = self.lobbies.get_mut(&lobby) else {
            return;
        };
        record.members.retain(|m| m.id != member);
        let owner_left = record.owner == member;
        let remaining = record.member_ids();

        self.send(member, ServiceEvent::LobbyLeft { lobby, reason: own });
        self.broadcast(
            &remaining,
            ServiceEvent::LobbyMemberStateChanged {
                lobby,
                member,
                change,
            },
        );
        if owner_left || remaining.is_empty() {
            self.lobbies.remove(&lobby);
            self.broadcast(
                &remaining,
                ServiceEvent::LobbyLeft {
                    lobby,
                    reason: LobbyLeaveReason::LobbyClosed,
                },
            );
            info!("🗑️ Closed lobby {}", lobby);
        }
    }
}

/// Every lobby record of an in-memory lobby service. Cheap to clone; all
/// clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct LobbyHub {
    state: Arc<RwLock<HubState>>,
}

impl LobbyHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signs a new user in. Events for the user arrive on the returned
    /// receiver.
    pub fn register(&self, name: &str) -> (MemberId, UnboundedReceiver<ServiceEvent>) {
        let (outbox, inbox) = unbounded_channel();
        let mut state = self.state.write();
        let id = MemberId(state.next_member);
        state.next_member += 1;
        state.users.insert(
            id,
            User {
                name: name.to_string(),
                outbox,
                online: true,
                latency_ms: 0,
                listing: Vec::new(),
                invitations: Vec::new(),
            },
        );
        info!("👤 {} signed in as {}", name, id);
        (id, inbox)
    }

    /// Drops the user's connection: every lobby they occupy sees them
    /// disconnect and they get `connectionLost` for each.
    pub fn disconnect(&self, user: MemberId) {
        let mut state = self.state.write();
        let occupied: Vec<LobbyId> = state
            .lobbies
            .values()
            .filter(|l| l.contains(user))
            .map(|l| l.id)
            .collect();
        for lobby in occupied {
            state.depart(
                lobby,
                user,
                LobbyLeaveReason::ConnectionLost,
                MemberStateChange::Disconnected,
            );
        }
        if let Some(record) = state.users.get_mut(&user) {
            record.online = false;
        }
        info!("🔌 User {} disconnected", user);
    }

    pub fn lobby_count(&self) -> usize {
        self.state.read().lobbies.len()
    }

    /// Snapshot of one lobby record.
    pub fn snapshot(&self, lobby: LobbyId) -> Option<HubLobby> {
        self.state.read().lobbies.get(&lobby).cloned()
    }

    pub fn invitations(&self, user: MemberId) -> Vec<(MemberId, String)> {
        self.state
            .read()
            .users
            .get(&user)
            .map(|u| u.invitations.clone())
            .unwrap_or_default()
    }

    // ==== ASYNC COMMANDS ====

    pub fn request_list(&self, user: MemberId, include_full: bool) -> Result<(), ServiceError> {
        let mut state = self.state.write();
        state.user(user)?;
        let mut listing: Vec<LobbyId> = state
            .lobbies
            .values()
            .filter(|l| l.is_listed() && (include_full || !l.is_full()))
            .map(|l| l.id)
            .collect();
        listing.sort();
        let count = listing.len() as u32;
        if let Some(record) = state.users.get_mut(&user) {
            record.listing = listing;
        }
        info!("📋 Listing {} lobbies for {}", count, user);
        state.send(user, ServiceEvent::LobbyList { count, result: Ok(()) });
        Ok(())
    }

    pub fn lobby_by_index(&self, user: MemberId, index: u32) -> Result<LobbyId, ServiceError> {
        let state = self.state.read();
        let listing = &state.user(user)?.listing;
        listing
            .get(index as usize)
            .copied()
            .ok_or(ServiceError::IndexOutOfRange {
                index,
                len: listing.len() as u32,
            })
    }

    pub fn request_data(&self, user: MemberId, lobby: LobbyId) -> Result<(), ServiceError> {
        let state = self.state.read();
        state.user(user)?;
        let result = if state.lobbies.contains_key(&lobby) {
            Ok(())
        } else {
            Err(FailureReason::LobbyDoesNotExist)
        };
        state.send(user, ServiceEvent::LobbyDataRetrieved { lobby, result });
        Ok(())
    }

    pub fn create(&self, user: MemberId, params: &LobbyParams) -> Result<(), ServiceError> {
        let mut state = self.state.write();
        state.user(user)?;
        let lobby = LobbyId(state.next_lobby);
        if params.max_members == 0 {
            state.send(
                user,
                ServiceEvent::LobbyCreated {
                    lobby,
                    result: LobbyCreateResult::Error,
                },
            );
            return Ok(());
        }
        state.next_lobby += 1;
        state.lobbies.insert(
            lobby,
            HubLobby {
                id: lobby,
                owner: user,
                params: params.clone(),
                data: HashMap::new(),
                members: vec![HubMember {
                    id: user,
                    data: HashMap::new(),
                }],
                messages: Vec::new(),
            },
        );
        info!("🚀 Created lobby {} owned by {}", lobby, user);
        state.send(
            user,
            ServiceEvent::LobbyCreated {
                lobby,
                result: LobbyCreateResult::Success,
            },
        );
        Ok(())
    }

    pub fn join(&self, user: MemberId, lobby: LobbyId) -> Result<(), ServiceError> {
        let mut state = self.state.write();
        state.user(user)?;
        let mut others = Vec::new();
        let result = match state.lobbies.get_mut(&lobby) {
            None => LobbyEnterResult::LobbyDoesNotExist,
            Some(record) if record.contains(user) => LobbyEnterResult::Success,
            Some(record) if record.is_full() => LobbyEnterResult::LobbyIsFull,
            Some(record) if !record.params.joinable => LobbyEnterResult::Error,
            Some(record) => {
                others = record.member_ids();
                record.members.push(HubMember {
                    id: user,
                    data: HashMap::new(),
                });
                info!("🎮 {} joined lobby {}", user, lobby);
                LobbyEnterResult::Success
            }
        };
        state.broadcast(
            &others,
            ServiceEvent::LobbyMemberStateChanged {
                lobby,
                member: user,
                change: MemberStateChange::Entered,
            },
        );
        state.send(user, ServiceEvent::LobbyEntered { lobby, result });
        Ok(())
    }

    pub fn leave(&self, user: MemberId, lobby: LobbyId) -> Result<(), ServiceError> {
        let mut state = self.state.write();
        state.user(user)?;
        state.member_lobby(lobby, user)?;
        state.depart(lobby, user, LobbyLeaveReason::UserLeft, MemberStateChange::Left);
        info!("👋 {} left lobby {}", user, lobby);
        Ok(())
    }

    // ==== RECORD ACCESS ====

    pub fn lobby_data(&self, lobby: LobbyId, key: &str) -> Result<String, ServiceError> {
        let state = self.state.read();
        Ok(state.lobby(lobby)?.data.get(key).cloned().unwrap_or_default())
    }

    pub fn set_lobby_data(
        &self,
        user: MemberId,
        lobby: LobbyId,
        key: &str,
        value: &str,
    ) -> Result<(), ServiceError> {
        let mut state = self.state.write();
        state.user(user)?;
        let record = state.member_lobby(lobby, user)?;
        if record.owner != user {
            return Err(ServiceError::NotOwner { lobby, member: user });
        }
        record.data.insert(key.to_string(), value.to_string());
        let members = record.member_ids();
        debug!(%lobby, key, value, "lobby data written");
        state.broadcast(
            &members,
            ServiceEvent::LobbyDataUpdated {
                lobby,
                member: MemberId::NONE,
            },
        );
        Ok(())
    }

    pub fn member_data(
        &self,
        lobby: LobbyId,
        member: MemberId,
        key: &str,
    ) -> Result<String, ServiceError> {
        let state = self.state.read();
        state
            .lobby(lobby)?
            .members
            .iter()
            .find(|m| m.id == member)
            .map(|m| m.data.get(key).cloned().unwrap_or_default())
            .ok_or(ServiceError::NotAMember { lobby, member })
    }

    pub fn set_member_data(
        &self,
        user: MemberId,
        lobby: LobbyId,
        key: &str,
        value: &str,
    ) -> Result<(), ServiceError> {
        let mut state = self.state.write();
        state.user(user)?;
        let record = state.member_lobby(lobby, user)?;
        if let Some(member) = record.members.iter_mut().find(|m| m.id == user) {
            member.data.insert(key.to_string(), value.to_string());
        }
        let members = record.member_ids();
        debug!(%lobby, %user, key, value, "member data written");
        state.broadcast(&members, ServiceEvent::LobbyDataUpdated { lobby, member: user });
        Ok(())
    }

    pub fn member_by_index(&self, lobby: LobbyId, index: u32) -> Result<MemberId, ServiceError> {
        let state = self.state.read();
        let record = state.lobby(lobby)?;
        record
            .members
            .get(index as usize)
            .map(|m| m.id)
            .ok_or(ServiceError::IndexOutOfRange {
                index,
                len: record.members.len() as u32,
            })
    }

    pub fn member_count(&self, lobby: LobbyId) -> Result<u32, ServiceError> {
        Ok(self.state.read().lobby(lobby)?.members.len() as u32)
    }

    pub fn owner(&self, lobby: LobbyId) -> Result<MemberId, ServiceError> {
        Ok(self.state.read().lobby(lobby)?.owner)
    }

    // ==== MESSAGES AND INVITES ====

    pub fn send_message(
        &self,
        user: MemberId,
        lobby: LobbyId,
        text: &str,
    ) -> Result<bool, ServiceError> {
        let mut state = self.state.write();
        state.user(user)?;
        let record = state.member_lobby(lobby, user)?;
        let message = record.messages.len() as u32;
        record.messages.push((user, text.to_string()));
        let members = record.member_ids();
        state.broadcast(
            &members,
            ServiceEvent::LobbyMessageReceived {
                lobby,
                sender: user,
                message,
                length: text.len() as u32,
            },
        );
        Ok(true)
    }

    pub fn message(
        &self,
        lobby: LobbyId,
        message: u32,
    ) -> Result<(MemberId, String), ServiceError> {
        self.state
            .read()
            .lobby(lobby)?
            .messages
            .get(message as usize)
            .cloned()
            .ok_or(ServiceError::MessageNotFound { lobby, message })
    }

    pub fn persona_name(&self, user: MemberId) -> Result<String, ServiceError> {
        self.state
            .read()
            .users
            .get(&user)
            .map(|u| u.name.clone())
            .ok_or(ServiceError::UnknownUser(user))
    }

    /// Simulated one-way delay for `user`. Pings add up both ends.
    pub fn set_latency(&self, user: MemberId, latency_ms: u32) {
        if let Some(record) = self.state.write().users.get_mut(&user) {
            record.latency_ms = latency_ms;
        }
    }

    pub fn ping(&self, from: MemberId, to: MemberId) -> Result<u32, ServiceError> {
        let state = self.state.read();
        let source = state.user(from)?;
        let target = state.user(to)?;
        if !state.lobbies.values().any(|l| l.contains(from) && l.contains(to)) {
            return Err(ServiceError::Unavailable(format!("{} shares no lobby with {}", to, from)));
        }
        Ok(source.latency_ms + target.latency_ms)
    }

    pub fn invite(
        &self,
        from: MemberId,
        to: MemberId,
        connection: &str,
    ) -> Result<(), ServiceError> {
        let mut state = self.state.write();
        state.user(from)?;
        let target = state.users.get_mut(&to).ok_or(ServiceError::UnknownUser(to))?;
        target.invitations.push((from, connection.to_string()));
        info!("✉️ {} invited {} ({})", from, to, connection);
        Ok(())
    }
}
