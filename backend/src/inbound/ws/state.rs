//! Shared WebSocket adapter state.
//!
//! WebSocket entry points depend on domain services and ports rather than
//! constructing them, which keeps the session loops testable with
//! deterministic doubles.

use std::sync::Arc;

use crate::domain::ports::{EventBus, IdentityResolver};
use crate::domain::{ConversationService, NotificationService};

/// Dependency bundle for WebSocket entry points and sessions.
#[derive(Clone)]
pub struct WsState {
    /// Bearer-token resolution for the `token` query parameter.
    pub identity: Arc<dyn IdentityResolver>,
    /// Message posting and membership checks.
    pub conversations: Arc<ConversationService>,
    /// Unread backlog and read marking.
    pub notifications: Arc<NotificationService>,
    /// Live channel subscription.
    pub events: Arc<dyn EventBus>,
}
