//! Swipe state machine and mutual-match detection.
//!
//! Directed like/reject edges are written idempotently; reciprocity on a
//! like triggers the match sequence: find-or-create the direct
//! conversation, notify both participants, and refresh both candidate
//! caches in the background.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::matching::MatchingService;
use crate::domain::notifications::NotificationService;
use crate::domain::ports::{
    ConversationRepository, ConversationRepositoryError, ProfileRepository,
    ProfileRepositoryError, SwipeRepository, SwipeRepositoryError,
};
use crate::domain::user::{Profile, UserId};

/// Notification text sent to both participants of a fresh mutual match.
const MATCH_NOTIFICATION_TEXT: &str = "You have a new match! Open the chat and say hi.";

/// Client swipe decision. Unknown actions are unrepresentable: the
/// boundary rejects them at deserialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeAction {
    /// Positive interest; may complete a mutual match.
    Like,
    /// Neutral pass.
    Skip,
    /// Negative pass.
    Dislike,
}

/// Reason tag stored on a rejection edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectReason {
    /// The user skipped the candidate.
    Skip,
    /// The user disliked the candidate.
    Dislike,
}

impl RejectReason {
    /// Stable string form stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Dislike => "dislike",
        }
    }

    /// Parse the stored string form.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "skip" => Some(Self::Skip),
            "dislike" => Some(Self::Dislike),
            _ => None,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one swipe.
#[derive(Debug, Clone, PartialEq)]
pub struct SwipeOutcome {
    /// Whether the swipe completed a mutual match.
    pub mutual: bool,
    /// The direct conversation between the pair, present on mutual.
    pub conversation_id: Option<Uuid>,
    /// Whether the mutual match created the conversation just now (drives
    /// 201-vs-200 at the boundary).
    pub created_conversation: bool,
}

impl SwipeOutcome {
    fn not_mutual() -> Self {
        Self {
            mutual: false,
            conversation_id: None,
            created_conversation: false,
        }
    }
}

/// Liked and rejected profiles of one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Interactions {
    /// Users the caller liked.
    pub liked: Vec<Profile>,
    /// Users the caller rejected.
    pub rejected: Vec<Profile>,
}

fn map_swipe_error(error: SwipeRepositoryError) -> Error {
    match error {
        SwipeRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("swipe repository unavailable: {message}"))
        }
        SwipeRepositoryError::Query { message } => {
            Error::internal(format!("swipe repository error: {message}"))
        }
    }
}

fn map_profile_error(error: ProfileRepositoryError) -> Error {
    match error {
        ProfileRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("profile repository unavailable: {message}"))
        }
        ProfileRepositoryError::Query { message } => {
            Error::internal(format!("profile repository error: {message}"))
        }
    }
}

fn map_conversation_error(error: ConversationRepositoryError) -> Error {
    match error {
        ConversationRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("conversation repository unavailable: {message}"))
        }
        ConversationRepositoryError::Query { message } => {
            Error::internal(format!("conversation repository error: {message}"))
        }
    }
}

/// Swipe engine over the like/reject edge store.
#[derive(Clone)]
pub struct SwipeService {
    profiles: Arc<dyn ProfileRepository>,
    swipes: Arc<dyn SwipeRepository>,
    conversations: Arc<dyn ConversationRepository>,
    notifications: Arc<NotificationService>,
    matching: Arc<MatchingService>,
}

impl SwipeService {
    /// Create a new swipe service.
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        swipes: Arc<dyn SwipeRepository>,
        conversations: Arc<dyn ConversationRepository>,
        notifications: Arc<NotificationService>,
        matching: Arc<MatchingService>,
    ) -> Self {
        Self {
            profiles,
            swipes,
            conversations,
            notifications,
            matching,
        }
    }

    /// Apply one swipe from `user` to `target`.
    pub async fn swipe(
        &self,
        user: &UserId,
        target: &UserId,
        action: SwipeAction,
    ) -> Result<SwipeOutcome, Error> {
        if user == target {
            return Err(Error::invalid_request("cannot swipe on yourself"));
        }
        self.require_profile(target).await?;

        match action {
            SwipeAction::Like => {
                self.swipes
                    .insert_like(user, target)
                    .await
                    .map_err(map_swipe_error)?;
                let reciprocal = self
                    .swipes
                    .like_exists(target, user)
                    .await
                    .map_err(map_swipe_error)?;
                if reciprocal {
                    self.complete_match(user, target).await
                } else {
                    Ok(SwipeOutcome::not_mutual())
                }
            }
            SwipeAction::Skip => self.reject(user, target, RejectReason::Skip).await,
            SwipeAction::Dislike => self.reject(user, target, RejectReason::Dislike).await,
        }
    }

    /// Record a like implied by replying in a direct conversation.
    ///
    /// No-op when the sender already liked the other participant. Returns
    /// the match outcome when the implicit like completed a mutual match.
    pub async fn record_implicit_like(
        &self,
        sender: &UserId,
        other: &UserId,
    ) -> Result<Option<SwipeOutcome>, Error> {
        let already = self
            .swipes
            .like_exists(sender, other)
            .await
            .map_err(map_swipe_error)?;
        if already {
            return Ok(None);
        }

        self.swipes
            .insert_like(sender, other)
            .await
            .map_err(map_swipe_error)?;
        let reciprocal = self
            .swipes
            .like_exists(other, sender)
            .await
            .map_err(map_swipe_error)?;
        if reciprocal {
            Ok(Some(self.complete_match(sender, other).await?))
        } else {
            Ok(None)
        }
    }

    /// Liked and rejected profiles of a user.
    pub async fn list_interactions(&self, user: &UserId) -> Result<Interactions, Error> {
        let liked_ids = self
            .swipes
            .liked_ids(user)
            .await
            .map_err(map_swipe_error)?;
        let rejected_ids = self
            .swipes
            .rejected_ids(user)
            .await
            .map_err(map_swipe_error)?;

        let liked = self
            .profiles
            .find_by_ids(&liked_ids)
            .await
            .map_err(map_profile_error)?;
        let rejected = self
            .profiles
            .find_by_ids(&rejected_ids)
            .await
            .map_err(map_profile_error)?;
        Ok(Interactions { liked, rejected })
    }

    /// Clear the user's entire skip/dislike history.
    pub async fn reset_rejections(&self, user: &UserId) -> Result<u64, Error> {
        self.swipes
            .delete_rejections(user)
            .await
            .map_err(map_swipe_error)
    }

    /// Remove the user's rejection of one target.
    pub async fn remove_rejection(&self, user: &UserId, target: &UserId) -> Result<u64, Error> {
        self.swipes
            .delete_rejection(user, target)
            .await
            .map_err(map_swipe_error)
    }

    async fn reject(
        &self,
        user: &UserId,
        target: &UserId,
        reason: RejectReason,
    ) -> Result<SwipeOutcome, Error> {
        self.swipes
            .insert_rejection(user, target, reason)
            .await
            .map_err(map_swipe_error)?;
        Ok(SwipeOutcome::not_mutual())
    }

    /// The mutual-match sequence: find-or-create the direct conversation,
    /// notify both participants, then refresh both candidate caches off
    /// the request path.
    async fn complete_match(&self, a: &UserId, b: &UserId) -> Result<SwipeOutcome, Error> {
        let existing = self
            .conversations
            .find_direct_between(a, b)
            .await
            .map_err(map_conversation_error)?;
        let (conversation, created) = match existing {
            Some(conversation) => (conversation, false),
            None => {
                let conversation = self
                    .conversations
                    .create_direct(a, b)
                    .await
                    .map_err(map_conversation_error)?;
                (conversation, true)
            }
        };

        for participant in [a, b] {
            self.notifications
                .notify(participant, conversation.id, MATCH_NOTIFICATION_TEXT)
                .await?;
        }

        self.schedule_cache_refresh([*a, *b]);

        Ok(SwipeOutcome {
            mutual: true,
            conversation_id: Some(conversation.id),
            created_conversation: created,
        })
    }

    /// A mutual match changes both users' eligibility, so their cached
    /// pools are recomputed asynchronously.
    fn schedule_cache_refresh(&self, users: [UserId; 2]) {
        for user in users {
            let matching = Arc::clone(&self.matching);
            tokio::spawn(async move {
                if let Err(error) = matching.refresh_cache(&user).await {
                    warn!(%user, %error, "post-match cache refresh failed");
                }
            });
        }
    }

    async fn require_profile(&self, id: &UserId) -> Result<Profile, Error> {
        self.profiles
            .find_by_id(id)
            .await
            .map_err(map_profile_error)?
            .filter(|profile| profile.is_active)
            .ok_or_else(|| Error::not_found(format!("user {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversations::Conversation;
    use crate::domain::notifications::Notification;
    use crate::domain::ports::{
        MockCandidateCache, MockConversationRepository, MockNotificationRepository,
        MockProfileRepository, MockSwipeRepository, NullEventBus,
    };
    use crate::domain::user::{DisplayName, PrivacyVector};
    use chrono::Utc;
    use rstest::rstest;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn profile(id: UserId) -> Profile {
        Profile {
            id,
            display_name: DisplayName::new("Someone").expect("valid fixture name"),
            avatar_url: None,
            interest_vector: None,
            privacy: PrivacyVector::permissive(),
            location: None,
            is_active: true,
            last_seen_at: Utc::now(),
        }
    }

    fn quiet_cache() -> MockCandidateCache {
        let mut cache = MockCandidateCache::new();
        cache.expect_get().returning(|_| Ok(None));
        cache.expect_put().returning(|_, _| Ok(()));
        cache.expect_invalidate().returning(|_| Ok(()));
        cache
    }

    struct Fixture {
        profiles: MockProfileRepository,
        swipes: MockSwipeRepository,
        conversations: MockConversationRepository,
        notifications: MockNotificationRepository,
    }

    impl Fixture {
        fn new() -> Self {
            let mut profiles = MockProfileRepository::new();
            profiles
                .expect_find_by_id()
                .returning(|id| Ok(Some(profile(*id))));
            // Background refreshes may or may not run before the test ends.
            profiles.expect_candidate_pool().returning(|_| Ok(vec![]));
            Self {
                profiles,
                swipes: MockSwipeRepository::new(),
                conversations: MockConversationRepository::new(),
                notifications: MockNotificationRepository::new(),
            }
        }

        fn build(self) -> SwipeService {
            let conversations: Arc<dyn ConversationRepository> = Arc::new(self.conversations);
            let notification_service = Arc::new(NotificationService::new(
                Arc::new(self.notifications),
                Arc::clone(&conversations),
                Arc::new(NullEventBus),
            ));
            let profiles: Arc<dyn ProfileRepository> = Arc::new(self.profiles);
            let matching = Arc::new(MatchingService::new(
                Arc::clone(&profiles),
                Arc::new(quiet_cache()),
            ));
            SwipeService::new(
                profiles,
                Arc::new(self.swipes),
                conversations,
                notification_service,
                matching,
            )
        }
    }

    fn direct_conversation(a: UserId, b: UserId) -> Conversation {
        Conversation {
            id: Uuid::new_v4(),
            group_id: None,
            participants: vec![a, b],
            created_at: Utc::now(),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn like_without_reciprocity_is_not_mutual() {
        let (a, b) = (UserId::random(), UserId::random());
        let mut fixture = Fixture::new();
        fixture.swipes.expect_insert_like().returning(|_, _| Ok(true));
        fixture.swipes.expect_like_exists().returning(|_, _| Ok(false));

        let outcome = fixture
            .build()
            .swipe(&a, &b, SwipeAction::Like)
            .await
            .expect("swipe succeeds");
        assert_eq!(outcome, SwipeOutcome::not_mutual());
    }

    #[rstest]
    #[tokio::test]
    async fn reciprocal_like_creates_conversation_and_two_notifications() {
        let (a, b) = (UserId::random(), UserId::random());
        let mut fixture = Fixture::new();
        fixture.swipes.expect_insert_like().returning(|_, _| Ok(true));
        fixture.swipes.expect_like_exists().returning(|_, _| Ok(true));
        fixture
            .conversations
            .expect_find_direct_between()
            .returning(|_, _| Ok(None));
        fixture
            .conversations
            .expect_create_direct()
            .times(1)
            .returning(move |x, y| Ok(direct_conversation(*x, *y)));
        fixture
            .conversations
            .expect_find_by_id()
            .returning(move |id| {
                let mut conversation = direct_conversation(a, b);
                conversation.id = id;
                Ok(Some(conversation))
            });

        let recipients = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&recipients);
        fixture
            .notifications
            .expect_insert()
            .times(2)
            .returning(move |user, conversation, text| {
                seen.lock().expect("no poisoned lock").push(*user);
                Ok(Notification {
                    id: Uuid::new_v4(),
                    user: *user,
                    conversation_id: conversation,
                    text: text.to_owned(),
                    read: false,
                    created_at: Utc::now(),
                })
            });

        let outcome = fixture
            .build()
            .swipe(&a, &b, SwipeAction::Like)
            .await
            .expect("swipe succeeds");

        assert!(outcome.mutual);
        assert!(outcome.created_conversation);
        assert!(outcome.conversation_id.is_some());
        let notified = recipients.lock().expect("no poisoned lock").clone();
        assert_eq!(notified.len(), 2);
        assert!(notified.contains(&a) && notified.contains(&b));
    }

    #[rstest]
    #[tokio::test]
    async fn mutual_like_reuses_existing_conversation() {
        let (a, b) = (UserId::random(), UserId::random());
        let existing = direct_conversation(a, b);
        let existing_id = existing.id;

        let mut fixture = Fixture::new();
        fixture.swipes.expect_insert_like().returning(|_, _| Ok(false));
        fixture.swipes.expect_like_exists().returning(|_, _| Ok(true));
        fixture
            .conversations
            .expect_find_direct_between()
            .returning(move |_, _| Ok(Some(existing.clone())));
        fixture.conversations.expect_create_direct().never();
        let lookup = direct_conversation(a, b);
        fixture
            .conversations
            .expect_find_by_id()
            .returning(move |id| {
                let mut conversation = lookup.clone();
                conversation.id = id;
                Ok(Some(conversation))
            });
        fixture
            .notifications
            .expect_insert()
            .times(2)
            .returning(|user, conversation, text| {
                Ok(Notification {
                    id: Uuid::new_v4(),
                    user: *user,
                    conversation_id: conversation,
                    text: text.to_owned(),
                    read: false,
                    created_at: Utc::now(),
                })
            });

        let outcome = fixture
            .build()
            .swipe(&a, &b, SwipeAction::Like)
            .await
            .expect("swipe succeeds");
        assert!(outcome.mutual);
        assert!(!outcome.created_conversation);
        assert_eq!(outcome.conversation_id, Some(existing_id));
    }

    #[rstest]
    #[case(SwipeAction::Skip, RejectReason::Skip)]
    #[case(SwipeAction::Dislike, RejectReason::Dislike)]
    #[tokio::test]
    async fn non_like_actions_store_rejection_edges(
        #[case] action: SwipeAction,
        #[case] expected: RejectReason,
    ) {
        let (a, b) = (UserId::random(), UserId::random());
        let mut fixture = Fixture::new();
        fixture
            .swipes
            .expect_insert_rejection()
            .times(1)
            .withf(move |_, _, reason| *reason == expected)
            .returning(|_, _, _| Ok(true));

        let outcome = fixture
            .build()
            .swipe(&a, &b, action)
            .await
            .expect("swipe succeeds");
        assert!(!outcome.mutual);
    }

    #[rstest]
    #[tokio::test]
    async fn self_swipe_is_invalid() {
        let a = UserId::random();
        let error = Fixture::new()
            .build()
            .swipe(&a, &a, SwipeAction::Like)
            .await
            .expect_err("self swipe fails");
        assert_eq!(error.code(), crate::domain::ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn implicit_like_skips_when_edge_exists() {
        let (a, b) = (UserId::random(), UserId::random());
        let mut fixture = Fixture::new();
        fixture.swipes.expect_like_exists().returning(|_, _| Ok(true));
        fixture.swipes.expect_insert_like().never();

        let outcome = fixture
            .build()
            .record_implicit_like(&a, &b)
            .await
            .expect("implicit like succeeds");
        assert!(outcome.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn implicit_like_completes_pending_match() {
        let (a, b) = (UserId::random(), UserId::random());
        let mut fixture = Fixture::new();
        let calls = AtomicUsize::new(0);
        // First call: sender has no edge yet; second: the other side does.
        fixture.swipes.expect_like_exists().returning(move |_, _| {
            Ok(calls.fetch_add(1, Ordering::SeqCst) > 0)
        });
        fixture.swipes.expect_insert_like().times(1).returning(|_, _| Ok(true));
        fixture
            .conversations
            .expect_find_direct_between()
            .returning(move |x, y| Ok(Some(direct_conversation(*x, *y))));
        let lookup_pair = (a, b);
        fixture
            .conversations
            .expect_find_by_id()
            .returning(move |id| {
                let mut conversation = direct_conversation(lookup_pair.0, lookup_pair.1);
                conversation.id = id;
                Ok(Some(conversation))
            });
        fixture
            .notifications
            .expect_insert()
            .times(2)
            .returning(|user, conversation, text| {
                Ok(Notification {
                    id: Uuid::new_v4(),
                    user: *user,
                    conversation_id: conversation,
                    text: text.to_owned(),
                    read: false,
                    created_at: Utc::now(),
                })
            });

        let outcome = fixture
            .build()
            .record_implicit_like(&a, &b)
            .await
            .expect("implicit like succeeds");
        assert!(outcome.is_some_and(|o| o.mutual));
    }
}
