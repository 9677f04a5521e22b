use shared::error::ServiceError;
use shared::protocol::{LobbyId, LobbyParams, MemberId, ServiceEvent};
use shared::service::LobbyService;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::hub::LobbyHub;

/// One signed-in user's handle on a [`LobbyHub`].
#[derive(Debug, Clone)]
pub struct LocalLobbyService {
    hub: LobbyHub,
    user: MemberId,
}

impl LocalLobbyService {
    /// Signs `name` in. The receiver carries every event addressed to it.
    pub fn connect(hub: &LobbyHub, name: &str) -> (Self, UnboundedReceiver<ServiceEvent>) {
        let (user, events) = hub.register(name);
        let service = Self {
            hub: hub.clone(),
            user,
        };
        (service, events)
    }

    /// Simulates losing the connection to the service.
    pub fn disconnect(&self) {
        self.hub.disconnect(self.user);
    }

    pub fn hub(&self) -> &LobbyHub {
        &self.hub
    }
}

impl LobbyService for LocalLobbyService {
    fn local_id(&self) -> MemberId {
        self.user
    }

    fn request_lobby_list(&mut self, include_full: bool) -> Result<(), ServiceError> {
        self.hub.request_list(self.user, include_full)
    }

    fn lobby_by_index(&self, index: u32) -> Result<LobbyId, ServiceError> {
        self.hub.lobby_by_index(self.user, index)
    }

    fn request_lobby_data(&mut self, lobby: LobbyId) -> Result<(), ServiceError> {
        self.hub.request_data(self.user, lobby)
    }

    fn join_lobby(&mut self, lobby: LobbyId) -> Result<(), ServiceError> {
        self.hub.join(self.user, lobby)
    }

    fn create_lobby(&mut self, params: &LobbyParams) -> Result<(), ServiceError> {
        self.hub.create(self.user, params)
    }

    fn leave_lobby(&mut self, lobby: LobbyId) -> Result<(), ServiceError> {
        self.hub.leave(self.user, lobby)
    }

    fn lobby_data(&self, lobby: LobbyId, key: &str) -> Result<String, ServiceError> {
        self.hub.lobby_data(lobby, key)
    }

    fn set_lobby_data(
        &mut self,
        lobby: LobbyId,
        key: &str,
        value: &str,
    ) -> Result<(), ServiceError> {
        self.hub.set_lobby_data(self.user, lobby, key, value)
    }

    fn member_data(
        &self,
        lobby: LobbyId,
        member: MemberId,
        key: &str,
    ) -> Result<String, ServiceError> {
        self.hub.member_data(lobby, member, key)
    }

    fn set_member_data(
        &mut self,
        lobby: LobbyId,
        key: &str,
        value: &str,
    ) -> Result<(), ServiceError> {
        self.hub.set_member_data(self.user, lobby, key, value)
    }

    fn member_by_index(&self, lobby: LobbyId, index: u32) -> Result<MemberId, ServiceError> {
        self.hub.member_by_index(lobby, index)
    }

    fn member_count(&self, lobby: LobbyId) -> Result<u32, ServiceError> {
        self.hub.member_count(lobby)
    }

    fn owner(&self, lobby: LobbyId) -> Result<MemberId, ServiceError> {
        self.hub.owner(lobby)
    }

    fn send_lobby_message(&mut self, lobby: LobbyId, text: &str) -> Result<bool, ServiceError> {
        self.hub.send_message(self.user, lobby, text)
    }

    fn lobby_message(
        &self,
        lobby: LobbyId,
        message: u32,
    ) -> Result<(MemberId, String), ServiceError> {
        self.hub.message(lobby, message)
    }

    fn persona_name(&self, user: MemberId) -> Result<String, ServiceError> {
        self.hub.persona_name(user)
    }

    fn ping_with(&self, user: MemberId) -> Result<u32, ServiceError> {
        self.hub.ping(self.user, user)
    }

    fn show_invite_dialog(&mut self, connection: &str) -> Result<(), ServiceError> {
        // no overlay here: the string is only announced
        info!("✉️ Invite dialog for {} opened with {}", self.user, connection);
        Ok(())
    }

    fn send_invitation(&mut self, user: MemberId, connection: &str) -> Result<(), ServiceError> {
        self.hub.invite(self.user, user, connection)
    }
}
