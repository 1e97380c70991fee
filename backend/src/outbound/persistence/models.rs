//! Row structs bridging the Diesel schema and domain types.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{
    conversation_participants, conversations, group_members, groups, messages, notifications,
    user_likes, user_rejections, users,
};
use crate::domain::conversations::{ChatMessage, Conversation};
use crate::domain::grouping::{Group, GroupMember};
use crate::domain::notifications::Notification;
use crate::domain::user::{
    DisplayName, GeoPoint, InterestVector, PrivacyVector, Profile, UserId, UserValidationError,
};

/// Read model for the `users` table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users, check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    /// Primary key.
    pub id: Uuid,
    /// Display name.
    pub display_name: String,
    /// Avatar URL.
    pub avatar_url: Option<String>,
    /// Interest ratings.
    pub interest_vector: Option<Vec<Option<f64>>>,
    /// Privacy flags.
    pub privacy_vector: Option<Vec<bool>>,
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lng: Option<f64>,
    /// Activity flag.
    pub is_active: bool,
    /// Last authenticated activity.
    pub last_seen_at: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Convert a row into a validated domain profile.
    pub fn into_profile(self) -> Result<Profile, UserValidationError> {
        let location = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        };
        Ok(Profile {
            id: UserId::new(self.id),
            display_name: DisplayName::new(self.display_name)?,
            avatar_url: self.avatar_url,
            interest_vector: self.interest_vector.map(InterestVector::new),
            privacy: self
                .privacy_vector
                .map(PrivacyVector::new)
                .unwrap_or_default(),
            location,
            is_active: self.is_active,
            last_seen_at: self.last_seen_at,
        })
    }
}

/// Insert model for `user_likes`.
#[derive(Debug, Insertable)]
#[diesel(table_name = user_likes)]
pub struct NewLikeRow {
    /// Liking user.
    pub user_id: Uuid,
    /// Liked user.
    pub liked_user_id: Uuid,
}

/// Insert model for `user_rejections`.
#[derive(Debug, Insertable)]
#[diesel(table_name = user_rejections)]
pub struct NewRejectionRow<'a> {
    /// Rejecting user.
    pub user_id: Uuid,
    /// Rejected user.
    pub rejected_user_id: Uuid,
    /// Reason tag.
    pub reason: &'a str,
}

/// Read model for the `conversations` table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = conversations, check_for_backend(diesel::pg::Pg))]
pub struct ConversationRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning group, when a group chat.
    pub group_id: Option<Uuid>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl ConversationRow {
    /// Attach participants to build the domain conversation.
    pub fn into_conversation(self, participants: Vec<UserId>) -> Conversation {
        Conversation {
            id: self.id,
            group_id: self.group_id,
            participants,
            created_at: self.created_at,
        }
    }
}

/// Insert model for `conversations`.
#[derive(Debug, Insertable)]
#[diesel(table_name = conversations)]
pub struct NewConversationRow {
    /// Primary key, generated by the caller.
    pub id: Uuid,
    /// Owning group, when a group chat.
    pub group_id: Option<Uuid>,
}

/// Insert model for `conversation_participants`.
#[derive(Debug, Insertable)]
#[diesel(table_name = conversation_participants)]
pub struct NewParticipantRow {
    /// Conversation.
    pub conversation_id: Uuid,
    /// Participant.
    pub user_id: Uuid,
}

/// Read model for the `messages` table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = messages, check_for_backend(diesel::pg::Pg))]
pub struct MessageRow {
    /// Primary key.
    pub id: Uuid,
    /// Conversation.
    pub conversation_id: Uuid,
    /// Author.
    pub sender_id: Uuid,
    /// Body.
    pub text: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            conversation_id: row.conversation_id,
            sender: UserId::new(row.sender_id),
            text: row.text,
            created_at: row.created_at,
        }
    }
}

/// Insert model for `messages`.
#[derive(Debug, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessageRow<'a> {
    /// Primary key, generated by the caller.
    pub id: Uuid,
    /// Conversation.
    pub conversation_id: Uuid,
    /// Author.
    pub sender_id: Uuid,
    /// Body.
    pub text: &'a str,
}

/// Read model for the `groups` table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = groups, check_for_backend(diesel::pg::Pg))]
pub struct GroupRow {
    /// Primary key.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

/// Insert model for `groups`.
#[derive(Debug, Insertable)]
#[diesel(table_name = groups)]
pub struct NewGroupRow<'a> {
    /// Primary key, generated by the caller.
    pub id: Uuid,
    /// Display name.
    pub name: &'a str,
    /// Description.
    pub description: &'a str,
}

/// Read model for the `group_members` table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = group_members, check_for_backend(diesel::pg::Pg))]
pub struct GroupMemberRow {
    /// Group.
    pub group_id: Uuid,
    /// Member.
    pub user_id: Uuid,
    /// Admin flag.
    pub is_admin: bool,
    /// Active flag.
    pub is_active: bool,
    /// Join timestamp.
    pub joined_at: DateTime<Utc>,
}

impl From<GroupMemberRow> for GroupMember {
    fn from(row: GroupMemberRow) -> Self {
        Self {
            user: UserId::new(row.user_id),
            is_admin: row.is_admin,
            is_active: row.is_active,
            joined_at: row.joined_at,
        }
    }
}

/// Insert model for `group_members`.
#[derive(Debug, Insertable)]
#[diesel(table_name = group_members)]
pub struct NewGroupMemberRow {
    /// Group.
    pub group_id: Uuid,
    /// Member.
    pub user_id: Uuid,
    /// Admin flag.
    pub is_admin: bool,
    /// Active flag.
    pub is_active: bool,
}

/// Read model for the `notifications` table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = notifications, check_for_backend(diesel::pg::Pg))]
pub struct NotificationRow {
    /// Primary key.
    pub id: Uuid,
    /// Recipient.
    pub user_id: Uuid,
    /// Conversation.
    pub conversation_id: Uuid,
    /// Text.
    pub text: String,
    /// Read flag.
    pub read: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            user: UserId::new(row.user_id),
            conversation_id: row.conversation_id,
            text: row.text,
            read: row.read,
            created_at: row.created_at,
        }
    }
}

/// Insert model for `notifications`.
#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotificationRow<'a> {
    /// Primary key, generated by the caller.
    pub id: Uuid,
    /// Recipient.
    pub user_id: Uuid,
    /// Conversation.
    pub conversation_id: Uuid,
    /// Text.
    pub text: &'a str,
}
