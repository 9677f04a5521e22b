use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::Result;
use crate::protocol::{EventKind, ServiceEvent};

/// Plain function over the owning component's state.
pub type Handler<C> = fn(&mut C, ServiceEvent) -> Result<()>;

/// Listener groups, each activated and released as a unit.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Browsing,
    Creation,
    MainMenu,
    InGame,
    Chat,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::Browsing,
        Feature::Creation,
        Feature::MainMenu,
        Feature::InGame,
        Feature::Chat,
    ];

    /// Event categories the group listens to.
    pub fn kinds(self) -> &'static [EventKind] {
        match self {
            Feature::Browsing => &[
                EventKind::LobbyList,
                EventKind::LobbyDataRetrieve,
                EventKind::LobbyEntered,
            ],
            Feature::Creation => &[EventKind::LobbyCreated],
            Feature::MainMenu | Feature::InGame => &[
                EventKind::LobbyDataUpdated,
                EventKind::LobbyLeft,
                EventKind::LobbyMemberState,
            ],
            Feature::Chat => &[EventKind::LobbyMessage],
        }
    }
}

struct Listener<C> {
    feature: Feature,
    handler: Handler<C>,
}

/// Handler table keyed by event category. Each category has at most one
/// listener, so every event reaches exactly one handler or none.
pub struct EventDispatcher<C> {
    listeners: HashMap<EventKind, Listener<C>>,
}

impl<C> Default for EventDispatcher<C> {
    fn default() -> Self {
        Self {
            listeners: HashMap::new(),
        }
    }
}

impl<C> EventDispatcher<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the group's handlers for the categories it does not hold yet.
    /// A category held by another group is handed over to this one.
    pub fn init(&mut self, feature: Feature, bindings: &[(EventKind, Handler<C>)]) {
        for &(kind, handler) in bindings {
            debug_assert!(feature.kinds().contains(&kind));
            match self.listeners.get(&kind) {
                Some(listener) if listener.feature == feature => continue,
                Some(listener) => {
                    debug!(
                        "🔀 {:?} listener moves from {:?} to {:?}",
                        kind, listener.feature, feature
                    );
                }
                None => {}
            }
            self.listeners.insert(kind, Listener { feature, handler });
        }
    }

    /// Releases whatever the group still holds. Safe to call repeatedly.
    pub fn dispose(&mut self, feature: Feature) {
        self.listeners.retain(|_, listener| listener.feature != feature);
    }

    pub fn dispose_all(&mut self) {
        for feature in Feature::ALL {
            self.dispose(feature);
        }
    }

    pub fn is_active(&self, feature: Feature) -> bool {
        self.listeners.values().any(|l| l.feature == feature)
    }

    pub fn owner(&self, kind: EventKind) -> Option<Feature> {
        self.listeners.get(&kind).map(|l| l.feature)
    }

    pub fn route(&self, kind: EventKind) -> Option<Handler<C>> {
        self.listeners.get(&kind).map(|l| l.handler)
    }

    /// Routes one event to its handler. Events nobody listens to are dropped.
    pub fn dispatch(ctx: &mut C, event: ServiceEvent, table: impl Fn(&C) -> &Self) -> Result<()> {
        let kind = event.kind();
        match table(&*ctx).route(kind) {
            Some(handler) => handler(ctx, event),
            None => {
                debug!("🔇 no listener for {:?}, dropping", kind);
                Ok(())
            }
        }
    }
}
