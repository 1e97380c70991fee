//! Adapter selection and service composition.
//!
//! Real backends are wired when URLs are configured; otherwise the server
//! degrades to the in-memory adapters so it can run standalone.

use std::sync::Arc;

use actix_web::web;

use crate::domain::ports::{
    CandidateCache, ConversationRepository, EventBus, FixtureIdentityResolver,
    FixtureInterestCatalog, GroupRepository, IdentityResolver, InterestCatalog,
    NotificationRepository, ProfileRepository, SwipeRepository, SystemClock,
};
use crate::domain::{
    ConversationService, GroupBuilder, MaintenanceService, MatchingService, NotificationService,
    SwipeService,
};
use crate::inbound::http::state::HttpState;
use crate::inbound::ws::state::WsState;
use crate::outbound::cache::{InMemoryCandidateCache, RedisCandidateCache};
use crate::outbound::channels::BroadcastEventBus;
use crate::outbound::memory::MemoryStore;
use crate::outbound::persistence::{
    DbPool, DieselConversationRepository, DieselGroupRepository, DieselIdentityResolver,
    DieselInterestCatalog, DieselNotificationRepository, DieselProfileRepository,
    DieselSwipeRepository, PoolConfig,
};
use crate::server::config::ServerConfig;

/// One implementation per repository-side port.
struct Adapters {
    profiles: Arc<dyn ProfileRepository>,
    swipe_edges: Arc<dyn SwipeRepository>,
    conversations: Arc<dyn ConversationRepository>,
    groups: Arc<dyn GroupRepository>,
    notifications: Arc<dyn NotificationRepository>,
    interests: Arc<dyn InterestCatalog>,
    identity: Arc<dyn IdentityResolver>,
}

fn diesel_adapters(pool: &DbPool) -> Adapters {
    Adapters {
        profiles: Arc::new(DieselProfileRepository::new(pool.clone())),
        swipe_edges: Arc::new(DieselSwipeRepository::new(pool.clone())),
        conversations: Arc::new(DieselConversationRepository::new(pool.clone())),
        groups: Arc::new(DieselGroupRepository::new(pool.clone())),
        notifications: Arc::new(DieselNotificationRepository::new(pool.clone())),
        interests: Arc::new(DieselInterestCatalog::new(pool.clone())),
        identity: Arc::new(DieselIdentityResolver::new(pool.clone())),
    }
}

fn memory_adapters() -> Adapters {
    let store = MemoryStore::new();
    Adapters {
        profiles: store.clone(),
        swipe_edges: store.clone(),
        conversations: store.clone(),
        groups: store.clone(),
        notifications: store,
        interests: Arc::new(FixtureInterestCatalog),
        identity: Arc::new(FixtureIdentityResolver),
    }
}

/// Fully wired application state shared by HTTP and WebSocket adapters.
#[derive(Clone)]
pub(crate) struct AppState {
    pub http_state: web::Data<HttpState>,
    pub ws_state: web::Data<WsState>,
}

/// Build adapters and services according to the configuration.
pub(crate) async fn build_state(config: &ServerConfig) -> std::io::Result<AppState> {
    let adapters = match &config.database_url {
        Some(url) => {
            crate::outbound::persistence::run_pending_migrations(url)
                .await
                .map_err(|err| std::io::Error::other(format!("migrations: {err}")))?;
            let pool = DbPool::new(PoolConfig::new(url))
                .await
                .map_err(|err| std::io::Error::other(format!("database pool: {err}")))?;
            diesel_adapters(&pool)
        }
        None => memory_adapters(),
    };

    let cache: Arc<dyn CandidateCache> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisCandidateCache::connect(url)
                .await
                .map_err(|err| std::io::Error::other(format!("redis cache: {err}")))?,
        ),
        None => Arc::new(InMemoryCandidateCache::new()),
    };
    let events: Arc<dyn EventBus> = Arc::new(BroadcastEventBus::new());

    let matching = Arc::new(MatchingService::new(adapters.profiles.clone(), cache));
    let notifications = Arc::new(NotificationService::new(
        adapters.notifications.clone(),
        adapters.conversations.clone(),
        events.clone(),
    ));
    let swipes = Arc::new(SwipeService::new(
        adapters.profiles.clone(),
        adapters.swipe_edges.clone(),
        adapters.conversations.clone(),
        notifications.clone(),
        matching.clone(),
    ));
    let conversations = Arc::new(ConversationService::new(
        adapters.profiles.clone(),
        adapters.conversations.clone(),
        adapters.groups.clone(),
        adapters.swipe_edges.clone(),
        adapters.interests.clone(),
        notifications.clone(),
        events.clone(),
        swipes.clone(),
    ));
    let grouping = Arc::new(GroupBuilder::new(
        adapters.profiles.clone(),
        adapters.swipe_edges.clone(),
        adapters.groups.clone(),
        adapters.conversations.clone(),
        notifications.clone(),
    ));
    let maintenance = Arc::new(MaintenanceService::new(
        adapters.profiles.clone(),
        Arc::new(SystemClock),
    ));

    let http_state = web::Data::new(HttpState {
        identity: adapters.identity.clone(),
        matching,
        swipes,
        conversations: conversations.clone(),
        groups: adapters.groups,
        grouping,
        maintenance,
    });
    let ws_state = web::Data::new(WsState {
        identity: adapters.identity,
        conversations,
        notifications,
        events,
    });

    Ok(AppState {
        http_state,
        ws_state,
    })
}
