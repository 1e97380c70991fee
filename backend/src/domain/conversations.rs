//! Conversations, messages, and the reply-implies-interest shortcut.
//!
//! Two deliberate product behaviours live here and must stay exactly as
//! they are: a freshly created direct conversation opens with an automatic
//! introduction naming the pair's closest-rated interests, and replying in
//! a direct conversation counts as liking the other participant back.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::events::{ChannelTopic, ChatMessageEvent, LiveEvent};
use crate::domain::notifications::NotificationService;
use crate::domain::ports::{
    ConversationRepository, ConversationRepositoryError, EventBus, GroupRepository,
    GroupRepositoryError, InterestCatalog, InterestCatalogError, ProfileRepository,
    ProfileRepositoryError, SwipeRepository, SwipeRepositoryError,
};
use crate::domain::swipes::SwipeService;
use crate::domain::user::{Profile, UserId};

/// How many interests the automatic introduction names.
const INTRO_INTERESTS: usize = 3;
/// Notification snippets truncate the message body to this many characters.
const SNIPPET_CHARS: usize = 50;

/// A conversation and its participant set.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    /// Conversation identifier.
    pub id: Uuid,
    /// Owning group for group chats, `None` for direct conversations.
    pub group_id: Option<Uuid>,
    /// Participants; exactly two for direct conversations.
    pub participants: Vec<UserId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Whether this is a group chat.
    pub fn is_group(&self) -> bool {
        self.group_id.is_some()
    }

    /// Whether the user participates in this conversation.
    pub fn has_participant(&self, user: &UserId) -> bool {
        self.participants.contains(user)
    }

    /// The other participant of a two-party conversation.
    pub fn counterpart_of(&self, user: &UserId) -> Option<UserId> {
        if self.participants.len() != 2 {
            return None;
        }
        self.participants.iter().find(|id| *id != user).copied()
    }
}

/// Immutable chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Message identifier.
    pub id: Uuid,
    /// Conversation the message belongs to.
    pub conversation_id: Uuid,
    /// Author.
    pub sender: UserId,
    /// Message body.
    pub text: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Result of a direct-conversation lookup-or-create.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectConversation {
    /// The conversation.
    pub conversation: Conversation,
    /// Whether it was created by this call.
    pub created: bool,
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

fn map_group_error(error: GroupRepositoryError) -> Error {
    match error {
        GroupRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("group repository unavailable: {message}"))
        }
        GroupRepositoryError::Query { message } => {
            Error::internal(format!("group repository error: {message}"))
        }
    }
}

fn map_catalog_error(error: InterestCatalogError) -> Error {
    let InterestCatalogError::Unavailable { message } = error;
    Error::service_unavailable(format!("interest catalogue unavailable: {message}"))
}

/// Conversation and message operations.
#[derive(Clone)]
pub struct ConversationService {
    profiles: Arc<dyn ProfileRepository>,
    conversations: Arc<dyn ConversationRepository>,
    groups: Arc<dyn GroupRepository>,
    swipe_edges: Arc<dyn SwipeRepository>,
    interests: Arc<dyn InterestCatalog>,
    notifications: Arc<NotificationService>,
    events: Arc<dyn EventBus>,
    swipes: Arc<SwipeService>,
}

impl ConversationService {
    /// Create a new conversation service.
    #[expect(clippy::too_many_arguments, reason = "explicit port wiring at composition time")]
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        conversations: Arc<dyn ConversationRepository>,
        groups: Arc<dyn GroupRepository>,
        swipe_edges: Arc<dyn SwipeRepository>,
        interests: Arc<dyn InterestCatalog>,
        notifications: Arc<NotificationService>,
        events: Arc<dyn EventBus>,
        swipes: Arc<SwipeService>,
    ) -> Self {
        Self {
            profiles,
            conversations,
            groups,
            swipe_edges,
            interests,
            notifications,
            events,
            swipes,
        }
    }

    /// Look up or create the single direct conversation between two users.
    ///
    /// Creation, and only creation, records the initiator's like edge
    /// toward the partner, posts the automatic introduction, and notifies
    /// the partner. Looking up an existing conversation has no side
    /// effects.
    pub async fn get_or_create_direct(
        &self,
        initiator: &UserId,
        partner: &UserId,
    ) -> Result<DirectConversation, Error> {
        if initiator == partner {
            return Err(Error::invalid_request(
                "cannot open a conversation with yourself",
            ));
        }
        let initiator_profile = self.require_profile(initiator).await?;
        let partner_profile = self.require_profile(partner).await?;

        if let Some(existing) = self
            .conversations
            .find_direct_between(initiator, partner)
            .await
            .map_err(map_conversation_error)?
        {
            return Ok(DirectConversation {
                conversation: existing,
                created: false,
            });
        }

        let conversation = self
            .conversations
            .create_direct(initiator, partner)
            .await
            .map_err(map_conversation_error)?;

        // Opening a conversation implies interest.
        self.swipe_edges
            .insert_like(initiator, partner)
            .await
            .map_err(map_swipe_error)?;

        let names = self.interests.names().await.map_err(map_catalog_error)?;
        let text = intro_text(&initiator_profile, &partner_profile, &names);
        let message = self
            .conversations
            .append_message(conversation.id, initiator, &text)
            .await
            .map_err(map_conversation_error)?;

        self.broadcast_message(&message, &initiator_profile);
        self.notifications
            .notify(
                partner,
                conversation.id,
                &format!(
                    "You have a new direct message from {}",
                    initiator_profile.display_name
                ),
            )
            .await?;

        Ok(DirectConversation {
            conversation,
            created: true,
        })
    }

    /// Append a message to a conversation the sender participates in.
    ///
    /// Direct conversations additionally run the reciprocal-like check:
    /// replying counts as liking the other participant back, and may
    /// complete a mutual match.
    pub async fn post_message(
        &self,
        conversation_id: Uuid,
        sender: &UserId,
        text: &str,
    ) -> Result<ChatMessage, Error> {
        let body = text.trim();
        if body.is_empty() {
            return Err(Error::invalid_request("message text must not be blank"));
        }

        let conversation = self.require_conversation(conversation_id).await?;
        if !conversation.has_participant(sender) {
            return Err(Error::forbidden("not a participant of this conversation"));
        }
        let sender_profile = self.require_profile(sender).await?;

        let message = self
            .conversations
            .append_message(conversation_id, sender, body)
            .await
            .map_err(map_conversation_error)?;

        self.broadcast_message(&message, &sender_profile);
        self.notify_recipients(&conversation, &message).await?;

        if !conversation.is_group() {
            if let Some(other) = conversation.counterpart_of(sender) {
                if let Some(outcome) = self.swipes.record_implicit_like(sender, &other).await? {
                    debug!(%sender, %other, mutual = outcome.mutual, "reply completed a match");
                }
            }
        }

        Ok(message)
    }

    /// Conversations the user participates in, newest first.
    pub async fn list_for_user(&self, user: &UserId) -> Result<Vec<Conversation>, Error> {
        self.conversations
            .list_for_user(user)
            .await
            .map_err(map_conversation_error)
    }

    /// Messages of a conversation, oldest first. Participants only.
    pub async fn list_messages(
        &self,
        conversation_id: Uuid,
        viewer: &UserId,
    ) -> Result<Vec<ChatMessage>, Error> {
        let conversation = self.require_conversation(conversation_id).await?;
        if !conversation.has_participant(viewer) {
            return Err(Error::forbidden("not a participant of this conversation"));
        }
        self.conversations
            .list_messages(conversation_id)
            .await
            .map_err(map_conversation_error)
    }

    /// Fetch a conversation and verify the viewer participates, for the
    /// realtime edge's join check.
    pub async fn require_membership(
        &self,
        conversation_id: Uuid,
        viewer: &UserId,
    ) -> Result<Conversation, Error> {
        let conversation = self.require_conversation(conversation_id).await?;
        if !conversation.has_participant(viewer) {
            return Err(Error::forbidden("not a participant of this conversation"));
        }
        Ok(conversation)
    }

    fn broadcast_message(&self, message: &ChatMessage, sender: &Profile) {
        let event = ChatMessageEvent {
            id: message.id,
            sender: message.sender,
            sender_name: sender.display_name.to_string(),
            sender_avatar: sender.avatar_url.clone(),
            text: message.text.clone(),
            created_at: message.created_at,
        };
        let delivered = self.events.publish(
            &ChannelTopic::Conversation(message.conversation_id),
            &LiveEvent::Chat(event),
        );
        if delivered == 0 {
            debug!(conversation = %message.conversation_id, "no live subscriber for chat message");
        }
    }

    async fn notify_recipients(
        &self,
        conversation: &Conversation,
        message: &ChatMessage,
    ) -> Result<(), Error> {
        let title = self.conversation_title(conversation, &message.sender).await?;
        let snippet: String = message.text.chars().take(SNIPPET_CHARS).collect();
        let text = format!("New message in \"{title}\": {snippet}");
        for recipient in conversation
            .participants
            .iter()
            .filter(|id| **id != message.sender)
        {
            self.notifications
                .notify(recipient, conversation.id, &text)
                .await?;
        }
        Ok(())
    }

    /// Chat title as recipients see it: the group name for group chats,
    /// the sender's display name for direct ones.
    async fn conversation_title(
        &self,
        conversation: &Conversation,
        sender: &UserId,
    ) -> Result<String, Error> {
        if let Some(group_id) = conversation.group_id {
            let group = self
                .groups
                .find_by_id(group_id)
                .await
                .map_err(map_group_error)?;
            if let Some(group) = group {
                return Ok(group.name);
            }
        }
        let profile = self.require_profile(sender).await?;
        Ok(profile.display_name.to_string())
    }

    async fn require_profile(&self, id: &UserId) -> Result<Profile, Error> {
        self.profiles
            .find_by_id(id)
            .await
            .map_err(map_profile_error)?
            .filter(|profile| profile.is_active)
            .ok_or_else(|| Error::not_found(format!("user {id} not found")))
    }

    async fn require_conversation(&self, id: Uuid) -> Result<Conversation, Error> {
        self.conversations
            .find_by_id(id)
            .await
            .map_err(map_conversation_error)?
            .ok_or_else(|| Error::not_found(format!("conversation {id} not found")))
    }
}

/// Build the automatic introduction: the initiator greets the partner with
/// the up-to-three interests where their ratings sit closest together
/// (ties broken by ascending interest id).
fn intro_text(initiator: &Profile, partner: &Profile, interest_names: &[String]) -> String {
    let mine = resolve_for_intro(initiator);
    let theirs = resolve_for_intro(partner);

    let mut gaps: Vec<(usize, f64)> = mine
        .iter()
        .zip(&theirs)
        .map(|(a, b)| (a - b).abs())
        .enumerate()
        .collect();
    gaps.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    let mut picked: Vec<usize> = gaps
        .into_iter()
        .take(INTRO_INTERESTS)
        .map(|(index, _)| index)
        .collect();
    picked.sort_unstable();

    let shared: Vec<&str> = picked
        .into_iter()
        .filter_map(|index| interest_names.get(index))
        .map(String::as_str)
        .collect();

    format!(
        "Hi, I'm {}. Looks like we are both into: {}",
        initiator.display_name,
        shared.join(", ")
    )
}

/// The introduction compares raw ratings with unrated slots as zero, so a
/// mutual lack of interest also reads as agreement.
fn resolve_for_intro(profile: &Profile) -> Vec<f64> {
    profile
        .interests_or_neutral()
        .slots()
        .iter()
        .map(|slot| slot.unwrap_or(0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::{DisplayName, InterestVector, PrivacyVector};
    use rstest::rstest;

    fn profile_with_vector(name: &str, slots: Vec<Option<f64>>) -> Profile {
        Profile {
            id: UserId::random(),
            display_name: DisplayName::new(name).expect("valid fixture name"),
            avatar_url: None,
            interest_vector: Some(InterestVector::new(slots)),
            privacy: PrivacyVector::permissive(),
            location: None,
            is_active: true,
            last_seen_at: Utc::now(),
        }
    }

    fn names() -> Vec<String> {
        (0..15).map(|i| format!("interest-{i}")).collect()
    }

    #[rstest]
    fn intro_names_closest_rated_interests_in_id_order() {
        let me = profile_with_vector(
            "Ada",
            vec![Some(5.0), Some(1.0), Some(3.0), Some(4.0), Some(2.0)],
        );
        let you = profile_with_vector(
            "Bob",
            vec![Some(1.0), Some(1.0), Some(3.0), Some(4.0), Some(5.0)],
        );

        let text = intro_text(&me, &you, &names());
        // Slots 1..=3 have zero gap (and every trailing unrated slot ties at
        // zero, losing on the index tiebreak).
        assert!(text.starts_with("Hi, I'm Ada."), "got {text}");
        assert!(
            text.ends_with("interest-1, interest-2, interest-3"),
            "got {text}"
        );
    }

    #[rstest]
    fn intro_treats_unrated_slots_as_zero() {
        let me = profile_with_vector("Ada", vec![Some(5.0)]);
        let you = profile_with_vector("Bob", vec![Some(5.0)]);

        let text = intro_text(&me, &you, &names());
        // Slot 0 gap is zero, as are all mutually-unrated slots; ascending
        // id keeps slot 0 in front.
        assert!(text.contains("interest-0"), "got {text}");
    }

    #[rstest]
    fn counterpart_resolution_only_applies_to_pairs() {
        let (a, b, c) = (UserId::random(), UserId::random(), UserId::random());
        let direct = Conversation {
            id: Uuid::new_v4(),
            group_id: None,
            participants: vec![a, b],
            created_at: Utc::now(),
        };
        assert_eq!(direct.counterpart_of(&a), Some(b));

        let group = Conversation {
            id: Uuid::new_v4(),
            group_id: Some(Uuid::new_v4()),
            participants: vec![a, b, c],
            created_at: Utc::now(),
        };
        assert_eq!(group.counterpart_of(&a), None);
    }
}
