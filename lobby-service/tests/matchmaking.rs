use lobby_service::{settle, LobbyHub, Peer};
use shared::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn peer(hub: &LobbyHub, name: &str) -> Peer<SignalLog> {
    Peer::connect(hub, name, SignalLog::new(), MatchmakingConfig::default())
}

fn signals(peer: &Peer<SignalLog>) -> &[Signal] {
    &peer.matchmaking.frontend().signals
}

/// Host creates a lobby, guest joins it; both end up idle.
fn lobby_of_two(hub: &LobbyHub) -> (Peer<SignalLog>, Peer<SignalLog>, LobbyId) {
    init_tracing();
    let mut host = peer(hub, "host");
    let mut guest = peer(hub, "guest");
    host.matchmaking.create().unwrap();
    settle(&mut [&mut host]).unwrap();
    let lobby = host.matchmaking.session().current_id().unwrap();

    guest.matchmaking.join(lobby).unwrap();
    settle(&mut [&mut host, &mut guest]).unwrap();
    (host, guest, lobby)
}

/// Both ready, owner starts; both peers are inside the session afterwards.
fn started(hub: &LobbyHub) -> (Peer<SignalLog>, Peer<SignalLog>, LobbyId) {
    let (mut host, mut guest, lobby) = lobby_of_two(hub);
    host.matchmaking.set_ready().unwrap();
    guest.matchmaking.set_ready().unwrap();
    settle(&mut [&mut host, &mut guest]).unwrap();
    host.matchmaking.start_match().unwrap();
    settle(&mut [&mut host, &mut guest]).unwrap();
    (host, guest, lobby)
}

fn state_of(hub: &LobbyHub, lobby: LobbyId) -> String {
    hub.snapshot(lobby)
        .and_then(|l| l.data.get(KEY_STATE).cloned())
        .unwrap_or_default()
}

fn count(peer: &Peer<SignalLog>, pred: impl Fn(&Signal) -> bool) -> usize {
    peer.matchmaking.frontend().count(pred)
}

#[test]
fn both_participants_enter_the_lobby() {
    let hub = LobbyHub::new();
    let (host, guest, lobby) = lobby_of_two(&hub);

    assert_eq!(
        signals(&host),
        &[
            Signal::LobbyEntered { lobby, owner: true },
            Signal::MemberEntered {
                lobby,
                member: guest.matchmaking.service().local_id()
            },
        ]
    );
    assert_eq!(signals(&guest), &[Signal::LobbyEntered { lobby, owner: false }]);
    assert_eq!(
        guest.matchmaking.session().owner_id(),
        Some(host.matchmaking.service().local_id())
    );

    let record = hub.snapshot(lobby).unwrap();
    assert_eq!(record.data.get(KEY_NAME).map(String::as_str), Some("Two-Player Duel"));
    assert_eq!(state_of(&hub, lobby), "notReady");
    assert!(record
        .members
        .iter()
        .all(|m| m.data.get(KEY_STATE).map(String::as_str) == Some("notReady")));
}

#[test]
fn readiness_handshake_reaches_go() {
    let hub = LobbyHub::new();
    let (mut host, mut guest, lobby) = lobby_of_two(&hub);

    host.matchmaking.set_ready().unwrap();
    settle(&mut [&mut host, &mut guest]).unwrap();
    assert_eq!(state_of(&hub, lobby), "notReady");
    assert_eq!(host.matchmaking.readiness().ready_members(), 1);

    guest.matchmaking.set_ready().unwrap();
    settle(&mut [&mut host, &mut guest]).unwrap();
    assert_eq!(state_of(&hub, lobby), "ready");
    assert!(signals(&host).contains(&Signal::StartControl(true)));
    assert_eq!(count(&guest, |s| matches!(s, Signal::StartControl(_))), 0);
    assert_eq!(
        guest.matchmaking.start_match(),
        Err(MatchmakingError::NotOwner)
    );

    host.matchmaking.start_match().unwrap();
    settle(&mut [&mut host, &mut guest]).unwrap();
    assert_eq!(state_of(&hub, lobby), "steady");
    for peer in [&host, &guest] {
        assert_eq!(count(peer, |s| *s == Signal::BeginSession(lobby)), 1);
    }
    let record = hub.snapshot(lobby).unwrap();
    assert!(record
        .members
        .iter()
        .all(|m| m.data.get(KEY_STATE).map(String::as_str) == Some("steady")));

    host.matchmaking.session_loaded().unwrap();
    guest.matchmaking.session_loaded().unwrap();
    settle(&mut [&mut host, &mut guest]).unwrap();
    assert_eq!(state_of(&hub, lobby), "go");
    for peer in [&host, &guest] {
        assert_eq!(count(peer, |s| *s == Signal::SessionSynchronized(lobby)), 1);
        assert!(peer.matchmaking.readiness().synchronized());
    }
}

#[test]
fn repeated_steady_update_starts_the_session_once() {
    let hub = LobbyHub::new();
    let (mut host, mut guest, lobby) = started(&hub);

    for _ in 0..2 {
        let update = ServiceEvent::LobbyDataUpdated {
            lobby,
            member: MemberId::NONE,
        };
        host.handle(update.clone()).unwrap();
        guest.handle(update).unwrap();
    }
    settle(&mut [&mut host, &mut guest]).unwrap();
    for peer in [&host, &guest] {
        assert_eq!(count(peer, |s| matches!(s, Signal::BeginSession(_))), 1);
    }
}

#[test]
fn guest_connection_loss_ends_the_match_once() {
    let hub = LobbyHub::new();
    let (mut host, mut guest, lobby) = lobby_of_two(&hub);
    let guest_id = guest.matchmaking.service().local_id();

    guest.matchmaking.service().disconnect();
    settle(&mut [&mut host, &mut guest]).unwrap();

    assert_eq!(
        signals(&host).last(),
        Some(&Signal::MatchEnded(MatchEnd::GuestLeft(Departure::Member(
            MemberStateChange::Disconnected
        ))))
    );
    assert_eq!(count(&host, |s| matches!(s, Signal::MatchEnded(_))), 1);
    assert_eq!(state_of(&hub, lobby), "notReady");
    let record = hub.snapshot(lobby).unwrap();
    assert!(record.members.iter().all(|m| m.id != guest_id));

    // the dropped side loses its mirror as well
    assert!(guest.matchmaking.session().current().is_none());
    assert_eq!(count(&guest, |s| matches!(s, Signal::MatchEnded(_))), 1);
}

#[test]
fn guest_dropping_right_after_go_ends_the_match() {
    let hub = LobbyHub::new();
    let (mut host, mut guest, lobby) = started(&hub);
    host.matchmaking.session_loaded().unwrap();
    settle(&mut [&mut host, &mut guest]).unwrap();

    // the guest's go update is still queued when its connection goes
    guest.matchmaking.session_loaded().unwrap();
    guest.matchmaking.service().disconnect();
    settle(&mut [&mut host, &mut guest]).unwrap();

    assert_eq!(
        signals(&host).last(),
        Some(&Signal::MatchEnded(MatchEnd::GuestLeft(Departure::Member(
            MemberStateChange::Disconnected
        ))))
    );
    assert_eq!(count(&host, |s| matches!(s, Signal::MatchEnded(_))), 1);
    assert_eq!(count(&host, |s| matches!(s, Signal::SessionSynchronized(_))), 0);
    assert_eq!(state_of(&hub, lobby), "steady");
}

#[test]
fn lobby_reopens_for_a_new_guest_after_a_departure() {
    let hub = LobbyHub::new();
    let (mut host, mut first, lobby) = lobby_of_two(&hub);
    host.matchmaking.set_ready().unwrap();
    first.matchmaking.set_ready().unwrap();
    settle(&mut [&mut host, &mut first]).unwrap();
    assert!(host.matchmaking.readiness().start_enabled());

    first.matchmaking.leave().unwrap();
    settle(&mut [&mut host, &mut first]).unwrap();
    assert_eq!(state_of(&hub, lobby), "notReady");
    assert!(!host.matchmaking.readiness().start_enabled());
    assert_eq!(count(&host, |s| *s == Signal::StartControl(false)), 1);
    assert_eq!(
        signals(&host).last(),
        Some(&Signal::MatchEnded(MatchEnd::GuestLeft(Departure::Member(
            MemberStateChange::Left
        ))))
    );

    let mut second = peer(&hub, "second");
    second.matchmaking.join(lobby).unwrap();
    settle(&mut [&mut host, &mut second]).unwrap();
    assert!(!host.matchmaking.readiness().match_over());
    second.matchmaking.set_ready().unwrap();
    settle(&mut [&mut host, &mut second]).unwrap();
    assert_eq!(state_of(&hub, lobby), "ready");
    assert!(host.matchmaking.readiness().start_enabled());

    second.matchmaking.service().disconnect();
    settle(&mut [&mut host, &mut second]).unwrap();
    assert_eq!(count(&host, |s| matches!(s, Signal::MatchEnded(_))), 2);
    assert_eq!(
        signals(&host).last(),
        Some(&Signal::MatchEnded(MatchEnd::GuestLeft(Departure::Member(
            MemberStateChange::Disconnected
        ))))
    );
    assert_eq!(host.matchmaking.session().current_id(), Some(lobby));
}

#[test]
fn user_left_tears_down_the_leaving_side() {
    let hub = LobbyHub::new();
    let (mut host, mut guest, lobby) = lobby_of_two(&hub);

    guest.matchmaking.leave().unwrap();
    settle(&mut [&mut host, &mut guest]).unwrap();

    assert_eq!(guest.matchmaking.session().current_id(), None);
    assert_eq!(guest.matchmaking.session().owner_id(), None);
    assert_eq!(signals(&guest).last(), Some(&Signal::LobbyLeft(lobby)));
    assert!(!guest.matchmaking.listeners().is_active(Feature::MainMenu));
    assert!(!guest.matchmaking.listeners().is_active(Feature::InGame));
    assert_eq!(count(&guest, |s| matches!(s, Signal::MatchEnded(_))), 0);

    assert_eq!(
        signals(&host).last(),
        Some(&Signal::MatchEnded(MatchEnd::GuestLeft(Departure::Member(
            MemberStateChange::Left
        ))))
    );

    // later lobby traffic no longer reaches the guest
    host.matchmaking.set_ready().unwrap();
    let before = signals(&guest).len();
    settle(&mut [&mut host, &mut guest]).unwrap();
    assert_eq!(signals(&guest).len(), before);
}

#[test]
fn owner_leaving_closes_the_lobby_for_the_guest() {
    let hub = LobbyHub::new();
    let (mut host, mut guest, _) = started(&hub);

    host.matchmaking.leave().unwrap();
    settle(&mut [&mut host, &mut guest]).unwrap();

    assert_eq!(hub.lobby_count(), 0);
    assert!(host.matchmaking.session().current().is_none());
    assert!(guest.matchmaking.session().current().is_none());
    assert_eq!(count(&guest, |s| matches!(s, Signal::MatchEnded(_))), 1);
    assert!(matches!(
        signals(&guest).last(),
        Some(Signal::MatchEnded(MatchEnd::HostLeft(_)))
    ));
}

#[test]
fn chat_history_follows_arrival_order() {
    let hub = LobbyHub::new();
    let (mut host, mut guest, lobby) = lobby_of_two(&hub);

    assert!(host.matchmaking.send_chat("gl hf").unwrap());
    assert!(guest.matchmaking.send_chat("you too").unwrap());
    settle(&mut [&mut host, &mut guest]).unwrap();

    for peer in [&host, &guest] {
        let history: Vec<(&str, &str)> = peer
            .matchmaking
            .chat()
            .history(lobby)
            .iter()
            .map(|m| (m.sender_name.as_str(), m.text.as_str()))
            .collect();
        assert_eq!(history, [("host", "gl hf"), ("guest", "you too")]);
        assert_eq!(count(peer, |s| matches!(s, Signal::ChatMessage { .. })), 2);
    }
}

#[test]
fn browsing_lists_open_lobbies_with_their_data() {
    init_tracing();
    let hub = LobbyHub::new();
    let mut alpha = Peer::connect(
        &hub,
        "alpha",
        SignalLog::new(),
        MatchmakingConfig {
            game_name: "Alpha".into(),
            ..MatchmakingConfig::default()
        },
    );
    let mut beta = Peer::connect(
        &hub,
        "beta",
        SignalLog::new(),
        MatchmakingConfig {
            game_name: "Beta".into(),
            ..MatchmakingConfig::default()
        },
    );
    let mut hidden = Peer::connect(
        &hub,
        "hidden",
        SignalLog::new(),
        MatchmakingConfig {
            visibility: LobbyVisibility::Private,
            ..MatchmakingConfig::default()
        },
    );
    let mut browser = peer(&hub, "browser");
    for host in [&mut alpha, &mut beta, &mut hidden] {
        host.matchmaking.create().unwrap();
    }
    settle(&mut [&mut alpha, &mut beta, &mut hidden]).unwrap();

    browser.matchmaking.request_list().unwrap();
    settle(&mut [&mut browser]).unwrap();

    let Some(Signal::LobbyListReady(lobbies)) = signals(&browser).last() else {
        panic!("no listing delivered: {:?}", signals(&browser));
    };
    let mut names: Vec<&str> = lobbies.iter().map(|l| l.name.as_str()).collect();
    names.sort();
    assert_eq!(names, ["Alpha", "Beta"]);
    assert!(lobbies
        .iter()
        .all(|l| l.state == Some(ReadyState::NotReady) && l.member_count == 1));
}

#[test]
fn joining_reports_missing_and_full_lobbies() {
    init_tracing();
    let hub = LobbyHub::new();
    let mut host = Peer::connect(
        &hub,
        "host",
        SignalLog::new(),
        MatchmakingConfig {
            max_members: 1,
            ..MatchmakingConfig::default()
        },
    );
    let mut guest = peer(&hub, "guest");
    host.matchmaking.create().unwrap();
    settle(&mut [&mut host]).unwrap();
    let lobby = host.matchmaking.session().current_id().unwrap();

    guest.matchmaking.join(lobby).unwrap();
    guest.matchmaking.join(LobbyId(999)).unwrap();
    settle(&mut [&mut host, &mut guest]).unwrap();

    assert_eq!(
        signals(&guest),
        &[
            Signal::JoinFailed(JoinFailure::LobbyFull),
            Signal::JoinFailed(JoinFailure::LobbyMissing),
        ]
    );
    assert!(guest.matchmaking.session().current().is_none());
}

#[test]
fn invitation_leads_into_the_lobby() {
    let hub = LobbyHub::new();
    init_tracing();
    let mut host = peer(&hub, "host");
    let mut friend = peer(&hub, "friend");
    host.matchmaking.create().unwrap();
    settle(&mut [&mut host]).unwrap();
    let lobby = host.matchmaking.session().current_id().unwrap();

    let friend_id = friend.matchmaking.service().local_id();
    host.matchmaking.send_invitation(friend_id).unwrap();
    let invitations = hub.invitations(friend_id);
    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0].1, connection_string(lobby));

    friend
        .matchmaking
        .join_from_connection_string(&invitations[0].1)
        .unwrap();
    settle(&mut [&mut host, &mut friend]).unwrap();
    assert_eq!(friend.matchmaking.session().current_id(), Some(lobby));
}

#[tokio::test]
async fn events_arrive_over_the_channel() {
    let hub = LobbyHub::new();
    let mut host = peer(&hub, "host");
    host.matchmaking.create().unwrap();

    let event = host.recv().await.unwrap();
    assert!(matches!(
        event,
        ServiceEvent::LobbyCreated {
            result: LobbyCreateResult::Success,
            ..
        }
    ));
    host.handle(event).unwrap();
    assert!(host.matchmaking.session().is_owner(host.matchmaking.service().local_id()));
}
