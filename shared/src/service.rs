use crate::error::ServiceError;
use crate::protocol::{LobbyId, LobbyParams, MemberId};

/// The external lobby service.
///
/// Commands with a meaningful outcome (`request_*`, `join_lobby`,
/// `create_lobby`, `leave_lobby`) only schedule work: their outcome arrives
/// later as a [`ServiceEvent`](crate::protocol::ServiceEvent). Everything
/// else is a synchronous read or write against the shared lobby record.
pub trait LobbyService {
    /// Identity of the local user.
    fn local_id(&self) -> MemberId;

    fn request_lobby_list(&mut self, include_full: bool) -> Result<(), ServiceError>;
    /// Lobby at `index` in the most recent list result.
    fn lobby_by_index(&self, index: u32) -> Result<LobbyId, ServiceError>;
    fn request_lobby_data(&mut self, lobby: LobbyId) -> Result<(), ServiceError>;
    fn join_lobby(&mut self, lobby: LobbyId) -> Result<(), ServiceError>;
    fn create_lobby(&mut self, params: &LobbyParams) -> Result<(), ServiceError>;
    fn leave_lobby(&mut self, lobby: LobbyId) -> Result<(), ServiceError>;

    fn lobby_data(&self, lobby: LobbyId, key: &str) -> Result<String, ServiceError>;
    fn set_lobby_data(
        &mut self,
        lobby: LobbyId,
        key: &str,
        value: &str,
    ) -> Result<(), ServiceError>;
    fn member_data(
        &self,
        lobby: LobbyId,
        member: MemberId,
        key: &str,
    ) -> Result<String, ServiceError>;
    /// Writes the local user's member data.
    fn set_member_data(
        &mut self,
        lobby: LobbyId,
        key: &str,
        value: &str,
    ) -> Result<(), ServiceError>;
    fn member_by_index(&self, lobby: LobbyId, index: u32) -> Result<MemberId, ServiceError>;
    fn member_count(&self, lobby: LobbyId) -> Result<u32, ServiceError>;
    fn owner(&self, lobby: LobbyId) -> Result<MemberId, ServiceError>;

    /// Returns whether the message was accepted for sending, not whether it
    /// was delivered.
    fn send_lobby_message(&mut self, lobby: LobbyId, text: &str) -> Result<bool, ServiceError>;
    fn lobby_message(
        &self,
        lobby: LobbyId,
        message: u32,
    ) -> Result<(MemberId, String), ServiceError>;

    fn persona_name(&self, user: MemberId) -> Result<String, ServiceError>;
    /// Round trip to a user sharing a lobby with the local one, in milliseconds.
    fn ping_with(&self, user: MemberId) -> Result<u32, ServiceError>;
    fn show_invite_dialog(&mut self, connection: &str) -> Result<(), ServiceError>;
    fn send_invitation(&mut self, user: MemberId, connection: &str) -> Result<(), ServiceError>;
}
