//! Shared HTTP adapter state.
//!
//! Handlers accept this bundle via `actix_web::web::Data` so they depend
//! only on domain services and ports and stay testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{GroupRepository, IdentityResolver};
use crate::domain::{
    ConversationService, GroupBuilder, MaintenanceService, MatchingService, SwipeService,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Bearer-token resolution.
    pub identity: Arc<dyn IdentityResolver>,
    /// Candidate ranking and cache refresh.
    pub matching: Arc<MatchingService>,
    /// Like/reject state machine.
    pub swipes: Arc<SwipeService>,
    /// Conversations and messages.
    pub conversations: Arc<ConversationService>,
    /// Group listing.
    pub groups: Arc<dyn GroupRepository>,
    /// Grouping sweep trigger.
    pub grouping: Arc<GroupBuilder>,
    /// Inactivity housekeeping.
    pub maintenance: Arc<MaintenanceService>,
}
