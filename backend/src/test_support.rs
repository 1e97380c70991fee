//! Shared fixtures for integration tests.
//!
//! Builds the full service graph over the in-memory adapters so tests can
//! drive real flows, from swipes through to notifications, without
//! PostgreSQL or Redis.

use std::sync::Arc;

use actix_web::web;
use chrono::Utc;

use crate::domain::ports::{
    EventBus, FixtureIdentityResolver, FixtureInterestCatalog, SystemClock,
};
use crate::domain::user::{
    DisplayName, GeoPoint, InterestVector, PrivacyVector, Profile, UserId,
};
use crate::domain::{
    ConversationService, GroupBuilder, MaintenanceService, MatchingService, NotificationService,
    SwipeService,
};
use crate::inbound::http::state::HttpState;
use crate::inbound::ws::state::WsState;
use crate::outbound::cache::InMemoryCandidateCache;
use crate::outbound::channels::BroadcastEventBus;
use crate::outbound::memory::MemoryStore;

/// Build an active profile with the given name and interest ratings.
pub fn profile_named(name: &str, ratings: &[f64]) -> Profile {
    Profile {
        id: UserId::random(),
        display_name: DisplayName::new(name).expect("test profile names are valid"),
        avatar_url: None,
        interest_vector: (!ratings.is_empty())
            .then(|| InterestVector::new(ratings.iter().copied().map(Some).collect())),
        privacy: PrivacyVector::permissive(),
        location: None,
        is_active: true,
        last_seen_at: Utc::now(),
    }
}

/// [`profile_named`] with a location attached.
pub fn located_profile(name: &str, ratings: &[f64], lat: f64, lng: f64) -> Profile {
    let mut profile = profile_named(name, ratings);
    profile.location = Some(GeoPoint { lat, lng });
    profile
}

/// Fully wired application backed by in-memory adapters.
pub struct TestBackend {
    /// Shared store for seeding and assertions.
    pub store: Arc<MemoryStore>,
    /// Bus for publishing or subscribing in tests.
    pub events: Arc<BroadcastEventBus>,
    /// HTTP handler state.
    pub http_state: web::Data<HttpState>,
    /// WebSocket handler state.
    pub ws_state: web::Data<WsState>,
}

impl TestBackend {
    /// Wire every service over one fresh in-memory store.
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let events = Arc::new(BroadcastEventBus::new());
        let events_port: Arc<dyn EventBus> = events.clone();

        let matching = Arc::new(MatchingService::new(
            store.clone(),
            Arc::new(InMemoryCandidateCache::new()),
        ));
        let notifications = Arc::new(NotificationService::new(
            store.clone(),
            store.clone(),
            events_port.clone(),
        ));
        let swipes = Arc::new(SwipeService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            notifications.clone(),
            matching.clone(),
        ));
        let conversations = Arc::new(ConversationService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(FixtureInterestCatalog),
            notifications.clone(),
            events_port.clone(),
            swipes.clone(),
        ));
        let grouping = Arc::new(GroupBuilder::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            notifications.clone(),
        ));
        let maintenance = Arc::new(MaintenanceService::new(
            store.clone(),
            Arc::new(SystemClock),
        ));

        let http_state = web::Data::new(HttpState {
            identity: Arc::new(FixtureIdentityResolver),
            matching,
            swipes,
            conversations: conversations.clone(),
            groups: store.clone(),
            grouping,
            maintenance,
        });
        let ws_state = web::Data::new(WsState {
            identity: Arc::new(FixtureIdentityResolver),
            conversations,
            notifications,
            events: events_port,
        });

        Self {
            store,
            events,
            http_state,
            ws_state,
        }
    }

    /// Seed a profile and return its id.
    pub fn seed(&self, profile: Profile) -> UserId {
        let id = profile.id;
        self.store.upsert_profile(profile);
        id
    }
}

impl Default for TestBackend {
    fn default() -> Self {
        Self::new()
    }
}
