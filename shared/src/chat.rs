use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::ServiceError;
use crate::protocol::{LobbyId, MemberId};
use crate::service::LobbyService;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: MemberId,
    pub sender_name: String,
    pub text: String,
    pub message_id: u32,
}

/// Per-lobby chat history, in notification arrival order. Never pruned.
#[derive(Debug, Default)]
pub struct ChatChannel {
    histories: HashMap<LobbyId, Vec<ChatMessage>>,
}

impl ChatChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire-and-forget send. `true` means the service accepted the message
    /// for sending.
    pub fn send<S: LobbyService>(
        &self,
        service: &mut S,
        lobby: LobbyId,
        text: &str,
    ) -> Result<bool, ServiceError> {
        let scheduled = service
            .send_lobby_message(lobby, text)
            .inspect_err(|e| warn!("Could not send message to lobby {}: {}", lobby, e))?;
        debug!(%lobby, scheduled, "chat message sent");
        Ok(scheduled)
    }

    /// Pulls the body of a notified message and appends it. A body that
    /// cannot be pulled is dropped.
    pub fn on_message<S: LobbyService>(
        &mut self,
        service: &S,
        lobby: LobbyId,
        message_id: u32,
    ) -> Option<&ChatMessage> {
        let (sender, text) = match service.lobby_message(lobby, message_id) {
            Ok(body) => body,
            Err(e) => {
                warn!("Could not read message {} in lobby {}: {}", message_id, lobby, e);
                return None;
            }
        };
        let sender_name = service
            .persona_name(sender)
            .unwrap_or_else(|_| sender.to_string());
        info!("💬 New message from {} to lobby {}: {}", sender_name, lobby, text);

        let history = self.histories.entry(lobby).or_default();
        history.push(ChatMessage {
            sender,
            sender_name,
            text,
            message_id,
        });
        history.last()
    }

    pub fn history(&self, lobby: LobbyId) -> &[ChatMessage] {
        self.histories.get(&lobby).map(Vec::as_slice).unwrap_or(&[])
    }
}
