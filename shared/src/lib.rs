//! Two-party matchmaking over an external lobby service: lobby browsing,
//! creation and joining, and the readiness handshake that brings host and
//! guest into one synchronized session.

pub mod chat;
pub mod config;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod frontend;
pub mod invite;
pub mod matchmaking;
pub mod protocol;
pub mod readiness;
pub mod service;
pub mod session;

#[cfg(test)]
mod testing;

pub mod prelude {
    pub use crate::chat::{ChatChannel, ChatMessage};
    pub use crate::config::MatchmakingConfig;
    pub use crate::directory::{LobbyDirectory, LobbySummary, Listing};
    pub use crate::dispatcher::{EventDispatcher, Feature};
    pub use crate::error::{MatchmakingError, ProtocolViolation, ServiceError};
    pub use crate::frontend::{Departure, Frontend, JoinFailure, MatchEnd, Signal, SignalLog};
    pub use crate::invite::{connection_string, parse_connection_string};
    pub use crate::matchmaking::Matchmaking;
    pub use crate::protocol::*;
    pub use crate::readiness::ReadinessProtocol;
    pub use crate::service::LobbyService;
    pub use crate::session::{Lobby, LobbyMember, LobbySession};
}
