use tracing::{debug, info, warn};

use crate::chat::ChatChannel;
use crate::config::MatchmakingConfig;
use crate::directory::{LobbyDirectory, Listing};
use crate::dispatcher::{EventDispatcher, Feature, Handler};
use crate::error::{MatchmakingError, Result};
use crate::frontend::Frontend;
use crate::invite::{connection_string, parse_connection_string};
use crate::protocol::{
    EventKind, LobbyId, LobbyLeaveReason, MemberId, MemberStateChange, ServiceEvent,
};
use crate::readiness::ReadinessProtocol;
use crate::service::LobbyService;
use crate::session::LobbySession;

/// One participant's matchmaking stack: the lobby service handle, the
/// collaborators it reports to, and every piece of protocol state.
///
/// Feed each event delivered by the service to [`Matchmaking::handle_event`],
/// one at a time.
pub struct Matchmaking<S, F> {
    service: S,
    frontend: F,
    config: MatchmakingConfig,
    listeners: EventDispatcher<Matchmaking<S, F>>,
    directory: LobbyDirectory,
    session: LobbySession,
    readiness: ReadinessProtocol,
    chat: ChatChannel,
}

impl<S: LobbyService, F: Frontend> Matchmaking<S, F> {
    pub fn new(service: S, frontend: F, config: MatchmakingConfig) -> Self {
        Self {
            service,
            frontend,
            config,
            listeners: EventDispatcher::new(),
            directory: LobbyDirectory::new(),
            session: LobbySession::new(),
            readiness: ReadinessProtocol::new(),
            chat: ChatChannel::new(),
        }
    }

    // ==== LIFECYCLE ====

    /// Starts from a clean slate: every listener group from an earlier
    /// activation is dropped before browsing and creation are armed.
    pub fn activate(&mut self) {
        self.listeners.dispose_all();
        self.directory = LobbyDirectory::new();
        self.readiness.reset();
        self.listeners_init(Feature::Browsing);
        self.listeners_init(Feature::Creation);
        info!("🎮 Matchmaking active for user {}", self.service.local_id());
    }

    pub fn deactivate(&mut self) {
        self.listeners.dispose_all();
        info!("Matchmaking inactive");
    }

    pub fn listeners_init(&mut self, feature: Feature) {
        self.listeners.init(feature, &Self::bindings(feature));
    }

    pub fn listeners_dispose(&mut self, feature: Feature) {
        self.listeners.dispose(feature);
    }

    fn bindings(feature: Feature) -> Vec<(EventKind, Handler<Self>)> {
        fn bind<C>(kind: EventKind, handler: Handler<C>) -> (EventKind, Handler<C>) {
            (kind, handler)
        }
        match feature {
            Feature::Browsing => vec![
                bind(EventKind::LobbyList, Self::on_lobby_list),
                bind(EventKind::LobbyDataRetrieve, Self::on_lobby_data_retrieved),
                bind(EventKind::LobbyEntered, Self::on_lobby_entered),
            ],
            Feature::Creation => vec![bind(EventKind::LobbyCreated, Self::on_lobby_created)],
            Feature::MainMenu => vec![
                bind(EventKind::LobbyDataUpdated, Self::on_lobby_data_menu),
                bind(EventKind::LobbyLeft, Self::on_lobby_left),
                bind(EventKind::LobbyMemberState, Self::on_member_state),
            ],
            Feature::InGame => vec![
                bind(EventKind::LobbyDataUpdated, Self::on_lobby_data_game),
                bind(EventKind::LobbyLeft, Self::on_lobby_left),
                bind(EventKind::LobbyMemberState, Self::on_member_state),
            ],
            Feature::Chat => vec![bind(EventKind::LobbyMessage, Self::on_lobby_message)],
        }
    }

    /// Routes one service event. Service failures inside a handler are
    /// logged and dropped; protocol violations are returned.
    pub fn handle_event(&mut self, event: ServiceEvent) -> Result<()> {
        debug!("event {:?}", event);
        match EventDispatcher::dispatch(self, event, |mm| &mm.listeners) {
            Err(MatchmakingError::Service(e)) => {
                warn!("Service call failed while handling event: {}", e);
                Ok(())
            }
            other => other,
        }
    }

    // ==== COMMANDS ====

    pub fn request_list(&mut self) -> Result<()> {
        let include_full = self.config.include_full;
        Ok(self.directory.request_list(&mut self.service, include_full)?)
    }

    pub fn create(&mut self) -> Result<()> {
        let params = self.config.params();
        Ok(self
            .session
            .create(&mut self.service, &self.config.game_name, &params)?)
    }

    pub fn join(&mut self, lobby: LobbyId) -> Result<()> {
        Ok(self.session.join(&mut self.service, lobby)?)
    }

    pub fn join_from_connection_string(&mut self, raw: &str) -> Result<()> {
        let lobby = parse_connection_string(raw)?;
        self.join(lobby)
    }

    pub fn leave(&mut self) -> Result<()> {
        self.session.leave(&mut self.service)
    }

    pub fn set_ready(&mut self) -> Result<()> {
        self.readiness.set_ready(&mut self.session, &mut self.service)
    }

    pub fn start_match(&mut self) -> Result<()> {
        self.readiness.start_match(&mut self.session, &mut self.service)
    }

    /// The shared session finished loading: lobby events now go to the
    /// in-game handlers and the local member reports `go`.
    pub fn session_loaded(&mut self) -> Result<()> {
        self.listeners_init(Feature::InGame);
        self.listeners_dispose(Feature::MainMenu);
        self.readiness.session_loaded(&mut self.session, &mut self.service)
    }

    pub fn send_chat(&mut self, text: &str) -> Result<bool> {
        let lobby = self.current_lobby()?;
        Ok(self.chat.send(&mut self.service, lobby, text)?)
    }

    pub fn show_invite_dialog(&mut self) -> Result<()> {
        let connection = connection_string(self.current_lobby()?);
        Ok(self.service.show_invite_dialog(&connection)?)
    }

    pub fn send_invitation(&mut self, user: MemberId) -> Result<()> {
        let connection = connection_string(self.current_lobby()?);
        info!("✉️ Inviting {} with {}", user, connection);
        Ok(self.service.send_invitation(user, &connection)?)
    }

    /// Round trip to the other participant, in milliseconds.
    pub fn opponent_ping(&mut self) -> Result<u32> {
        let opponent = self.session.second_participant(&self.service)?;
        Ok(self
            .service
            .ping_with(opponent)
            .inspect_err(|e| warn!("Could not get ping with {} for reason: {}", opponent, e))?)
    }

    pub fn members(&mut self) -> Result<Vec<MemberId>> {
        self.session.members(&self.service)
    }

    fn current_lobby(&self) -> Result<LobbyId> {
        self.session
            .current_id()
            .ok_or(MatchmakingError::NoCurrentLobby)
    }

    // ==== HANDLERS ====

    fn on_lobby_list(&mut self, event: ServiceEvent) -> Result<()> {
        let ServiceEvent::LobbyList { count, result } = event else {
            return Ok(());
        };
        let listing = self.directory.on_list(&mut self.service, count, result);
        self.deliver(listing);
        Ok(())
    }

    fn on_lobby_data_retrieved(&mut self, event: ServiceEvent) -> Result<()> {
        let ServiceEvent::LobbyDataRetrieved { lobby, result } = event else {
            return Ok(());
        };
        let listing = self.directory.on_data_retrieved(&self.service, lobby, result);
        self.deliver(listing);
        Ok(())
    }

    fn deliver(&mut self, listing: Listing) {
        match listing {
            Listing::Pending => {}
            Listing::Complete(lobbies) => self.frontend.lobby_list_ready(lobbies),
            Listing::Failed(reason) => self.frontend.lobby_list_failed(reason),
        }
    }

    fn on_lobby_entered(&mut self, event: ServiceEvent) -> Result<()> {
        let ServiceEvent::LobbyEntered { lobby, result } = event else {
            return Ok(());
        };
        match self.session.on_entered(&mut self.service, lobby, result) {
            Ok(()) => self.enter(lobby),
            Err(failure) => self.frontend.join_failed(failure),
        }
        Ok(())
    }

    fn on_lobby_created(&mut self, event: ServiceEvent) -> Result<()> {
        let ServiceEvent::LobbyCreated { lobby, result } = event else {
            return Ok(());
        };
        if self.session.on_created(&mut self.service, lobby, result) {
            self.enter(lobby);
        } else {
            self.frontend.create_failed();
        }
        Ok(())
    }

    fn enter(&mut self, lobby: LobbyId) {
        self.readiness.reset();
        self.listeners_init(Feature::MainMenu);
        self.listeners_init(Feature::Chat);
        let owner = self.session.is_owner(self.service.local_id());
        self.frontend.lobby_entered(lobby, owner);
    }

    fn on_lobby_data_menu(&mut self, event: ServiceEvent) -> Result<()> {
        let ServiceEvent::LobbyDataUpdated { lobby, member } = event else {
            return Ok(());
        };
        if member.is_none() {
            self.readiness
                .on_lobby_update(&mut self.session, &mut self.service, &mut self.frontend, lobby)
        } else {
            self.readiness
                .on_member_update(&mut self.session, &mut self.service, lobby)
        }
    }

    fn on_lobby_data_game(&mut self, event: ServiceEvent) -> Result<()> {
        let ServiceEvent::LobbyDataUpdated { lobby, member } = event else {
            return Ok(());
        };
        self.readiness.on_session_update(
            &mut self.session,
            &mut self.service,
            &mut self.frontend,
            lobby,
            member,
        )
    }

    fn on_lobby_left(&mut self, event: ServiceEvent) -> Result<()> {
        let ServiceEvent::LobbyLeft { lobby, reason } = event else {
            return Ok(());
        };
        if !self.session.is_current(lobby) {
            debug!("left lobby {} is not the current one", lobby);
            return Ok(());
        }
        let local_is_owner = self.session.is_owner(self.service.local_id());
        self.readiness
            .on_lobby_left(&mut self.frontend, local_is_owner, reason);

        // the mirror goes whatever the reason
        self.session.on_left(lobby);
        self.readiness.reset();
        self.listeners_dispose(Feature::MainMenu);
        self.listeners_dispose(Feature::InGame);
        info!("👋 Lobby {} left ({:?})", lobby, reason);
        if reason == LobbyLeaveReason::UserLeft {
            self.frontend.lobby_left(lobby);
        }
        Ok(())
    }

    fn on_member_state(&mut self, event: ServiceEvent) -> Result<()> {
        let ServiceEvent::LobbyMemberStateChanged {
            lobby,
            member,
            change,
        } = event
        else {
            return Ok(());
        };
        if !self.session.is_current(lobby) || member == self.service.local_id() {
            return Ok(());
        }
        let member_is_owner = self.session.is_owner(member);
        self.readiness
            .on_member_state(&mut self.frontend, lobby, member, member_is_owner, change);
        if change != MemberStateChange::Entered && !self.readiness.session_started() {
            // the roster shrank: a lobby left `ready` by the departed member falls back
            self.readiness
                .on_member_update(&mut self.session, &mut self.service, lobby)?;
        }
        Ok(())
    }

    fn on_lobby_message(&mut self, event: ServiceEvent) -> Result<()> {
        let ServiceEvent::LobbyMessageReceived { lobby, message, .. } = event else {
            return Ok(());
        };
        if let Some(received) = self.chat.on_message(&self.service, lobby, message) {
            self.frontend.chat_message(lobby, received);
        }
        Ok(())
    }

    // ==== ACCESS ====

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut S {
        &mut self.service
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    pub fn config(&self) -> &MatchmakingConfig {
        &self.config
    }

    pub fn session(&self) -> &LobbySession {
        &self.session
    }

    pub fn readiness(&self) -> &ReadinessProtocol {
        &self.readiness
    }

    pub fn chat(&self) -> &ChatChannel {
        &self.chat
    }

    pub fn listeners(&self) -> &EventDispatcher<Self> {
        &self.listeners
    }
}
