//! Domain entities, services, and the port seams they depend on.
//!
//! Everything in here is transport and storage agnostic: inbound adapters
//! translate requests into service calls, outbound adapters implement the
//! traits under [`ports`].

pub mod conversations;
pub mod error;
pub mod events;
pub mod grouping;
pub mod maintenance;
pub mod matching;
pub mod notifications;
pub mod ports;
pub mod scoring;
pub mod swipes;
pub mod user;

pub use self::conversations::{ChatMessage, Conversation, ConversationService, DirectConversation};
pub use self::error::{Error, ErrorCode};
pub use self::events::{ChannelTopic, ChatMessageEvent, LiveEvent, NotificationEvent};
pub use self::grouping::{Group, GroupBuilder, GroupMember, SweepReport};
pub use self::maintenance::MaintenanceService;
pub use self::matching::{MatchParams, MatchingService, RankedCandidate};
pub use self::notifications::{Notification, NotificationService};
pub use self::swipes::{Interactions, RejectReason, SwipeAction, SwipeOutcome, SwipeService};
pub use self::user::{
    DisplayName, GeoPoint, InterestVector, PrivacyField, PrivacyVector, Profile, UserId,
    UserValidationError,
};

/// Convenient result alias for domain operations.
pub type ApiResult<T> = Result<T, Error>;
