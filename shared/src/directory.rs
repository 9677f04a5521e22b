use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::error::ServiceError;
use crate::protocol::{FailureReason, LobbyId, ReadyState, KEY_NAME, KEY_STATE};
use crate::service::LobbyService;

/// A browsable lobby, built from its retrieved data. Never persisted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LobbySummary {
    pub id: LobbyId,
    pub name: String,
    pub state: Option<ReadyState>,
    pub member_count: u32,
}

/// Where an aggregation stands after a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Pending,
    Complete(Vec<LobbySummary>),
    Failed(FailureReason),
}

/// Aggregates a lobby listing: one list request, then one data request per
/// entry. The set is released only once every entry has resolved.
#[derive(Debug, Default)]
pub struct LobbyDirectory {
    // list requests still waiting for their callback; only the newest counts
    outstanding: u32,
    expected: usize,
    resolved: usize,
    pending: HashSet<LobbyId>,
    summaries: Vec<LobbySummary>,
}

impl LobbyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a listing request. Any aggregation still in flight is discarded.
    pub fn request_list<S: LobbyService>(
        &mut self,
        service: &mut S,
        include_full: bool,
    ) -> Result<(), ServiceError> {
        info!("📋 Requesting lobby list");
        if self.is_aggregating() {
            debug!(
                "discarding partial listing ({}/{} resolved)",
                self.resolved, self.expected
            );
        }
        self.reset();
        service.request_lobby_list(include_full)?;
        self.outstanding += 1;
        Ok(())
    }

    pub fn on_list<S: LobbyService>(
        &mut self,
        service: &mut S,
        count: u32,
        result: Result<(), FailureReason>,
    ) -> Listing {
        if self.outstanding == 0 {
            debug!("unsolicited lobby list result, ignoring");
            return Listing::Pending;
        }
        self.outstanding -= 1;
        if self.outstanding > 0 {
            debug!("superseded lobby list result, ignoring");
            return Listing::Pending;
        }

        if let Err(reason) = result {
            warn!("❌ Lobby list failed: {:?}", reason);
            self.reset();
            return Listing::Failed(reason);
        }

        info!("📋 {} lobbies listed", count);
        self.expected = count as usize;
        for index in 0..count {
            let lobby = match service.lobby_by_index(index) {
                Ok(lobby) => lobby,
                Err(e) => {
                    warn!("Could not read lobby #{} of the listing: {}", index, e);
                    self.resolved += 1;
                    continue;
                }
            };
            if !self.pending.insert(lobby) {
                self.resolved += 1;
                continue;
            }
            debug!("Requesting lobby data for lobby {} with id {}", index, lobby);
            if let Err(e) = service.request_lobby_data(lobby) {
                warn!("Could not request lobby {} data: {}", lobby, e);
                self.pending.remove(&lobby);
                self.resolved += 1;
            }
        }
        self.complete_if_resolved()
    }

    pub fn on_data_retrieved<S: LobbyService>(
        &mut self,
        service: &S,
        lobby: LobbyId,
        result: Result<(), FailureReason>,
    ) -> Listing {
        if !self.pending.remove(&lobby) {
            debug!("data for lobby {} is not part of the current listing", lobby);
            return Listing::Pending;
        }
        match result {
            Ok(()) => match summarize(service, lobby) {
                Ok(summary) => self.summaries.push(summary),
                Err(e) => warn!("Could not read lobby {} data: {}", lobby, e),
            },
            Err(reason) => warn!("Lobby {} data retrieval failed: {:?}", lobby, reason),
        }
        self.resolved += 1;
        debug!(
            "Data retrieved for {} lobbies out of {}",
            self.resolved, self.expected
        );
        self.complete_if_resolved()
    }

    pub fn is_aggregating(&self) -> bool {
        self.outstanding > 0 || !self.pending.is_empty()
    }

    pub fn resolved(&self) -> usize {
        self.resolved
    }

    fn complete_if_resolved(&mut self) -> Listing {
        if self.resolved < self.expected {
            return Listing::Pending;
        }
        let summaries = std::mem::take(&mut self.summaries);
        self.reset();
        Listing::Complete(summaries)
    }

    // leaves `outstanding` alone: answers to superseded requests are still due
    fn reset(&mut self) {
        self.expected = 0;
        self.resolved = 0;
        self.pending.clear();
        self.summaries.clear();
    }
}

fn summarize<S: LobbyService>(service: &S, lobby: LobbyId) -> Result<LobbySummary, ServiceError> {
    Ok(LobbySummary {
        id: lobby,
        name: service.lobby_data(lobby, KEY_NAME)?,
        state: ReadyState::parse(&service.lobby_data(lobby, KEY_STATE)?),
        member_count: service.member_count(lobby)?,
    })
}
