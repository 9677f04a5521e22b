//! In-memory lobby service. A [`LobbyHub`] holds every lobby record; each
//! participant talks to it through its own [`LocalLobbyService`] and
//! receives pushed events on a channel.

mod client;
mod hub;

pub use client::LocalLobbyService;
pub use hub::{HubLobby, HubMember, LobbyHub};

use shared::config::MatchmakingConfig;
use shared::error::MatchmakingError;
use shared::frontend::Frontend;
use shared::matchmaking::Matchmaking;
use shared::protocol::ServiceEvent;
use tokio::sync::mpsc::UnboundedReceiver;

/// A participant wired to a hub: its matchmaking stack plus the event
/// stream that feeds it.
pub struct Peer<F> {
    pub matchmaking: Matchmaking<LocalLobbyService, F>,
    events: UnboundedReceiver<ServiceEvent>,
}

impl<F: Frontend> Peer<F> {
    /// Signs in and activates matchmaking.
    pub fn connect(hub: &LobbyHub, name: &str, frontend: F, config: MatchmakingConfig) -> Self {
        let (service, events) = LocalLobbyService::connect(hub, name);
        let mut matchmaking = Matchmaking::new(service, frontend, config);
        matchmaking.activate();
        Self {
            matchmaking,
            events,
        }
    }

    pub async fn recv(&mut self) -> Option<ServiceEvent> {
        self.events.recv().await
    }

    pub fn handle(&mut self, event: ServiceEvent) -> Result<(), MatchmakingError> {
        self.matchmaking.handle_event(event)
    }

    /// Handles every event already queued. Returns how many there were.
    pub fn pump(&mut self) -> Result<usize, MatchmakingError> {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.matchmaking.handle_event(event)?;
            handled += 1;
        }
        Ok(handled)
    }
}

/// Pumps every peer until none has anything queued.
pub fn settle<F: Frontend>(peers: &mut [&mut Peer<F>]) -> Result<(), MatchmakingError> {
    loop {
        let mut handled = 0;
        for peer in peers.iter_mut() {
            handled += peer.pump()?;
        }
        if handled == 0 {
            return Ok(());
        }
    }
}
