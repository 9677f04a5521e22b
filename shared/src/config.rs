use serde::{Deserialize, Serialize};

use crate::protocol::{LobbyParams, LobbyTopology, LobbyVisibility};

/// Lobby creation and browsing settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MatchmakingConfig {
    pub game_name: String,
    pub max_members: u32,
    pub visibility: LobbyVisibility,
    pub topology: LobbyTopology,
    pub joinable: bool,
    /// List lobbies that are already full.
    pub include_full: bool,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            game_name: "Two-Player Duel".to_string(),
            max_members: 2,
            visibility: LobbyVisibility::Public,
            topology: LobbyTopology::FcmOwnershipTransition,
            joinable: true,
            include_full: false,
        }
    }
}

impl MatchmakingConfig {
    pub fn params(&self) -> LobbyParams {
        LobbyParams {
            visibility: self.visibility,
            max_members: self.max_members,
            joinable: self.joinable,
            topology: self.topology,
        }
    }
}
