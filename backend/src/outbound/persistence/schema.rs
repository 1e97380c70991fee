//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the migrations under `migrations/`
//! exactly; `diesel print-schema` can regenerate them from a live
//! database.

diesel::table! {
    /// User profiles as the matching core sees them.
    users (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Human-readable display name.
        display_name -> Varchar,
        /// Avatar URL in the external media store.
        avatar_url -> Nullable<Varchar>,
        /// Interest ratings, one slot per catalogue entry; NULL elements
        /// mean "never rated".
        interest_vector -> Nullable<Array<Nullable<Double>>>,
        /// Visibility flags for non-matched viewers.
        privacy_vector -> Nullable<Array<Bool>>,
        /// Last known latitude.
        lat -> Nullable<Double>,
        /// Last known longitude.
        lng -> Nullable<Double>,
        /// Whether the user participates in matching.
        is_active -> Bool,
        /// Last authenticated activity.
        last_seen_at -> Timestamptz,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Interest catalogue naming the vector slots, ordered by id.
    interests (id) {
        /// Slot position, 1-based.
        id -> Int4,
        /// Display name.
        name -> Varchar,
    }
}

diesel::table! {
    /// Directed like edges, unique per ordered pair.
    user_likes (user_id, liked_user_id) {
        /// Liking user.
        user_id -> Uuid,
        /// Liked user.
        liked_user_id -> Uuid,
        /// Edge creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Directed reject edges, unique per (pair, reason).
    user_rejections (user_id, rejected_user_id, reason) {
        /// Rejecting user.
        user_id -> Uuid,
        /// Rejected user.
        rejected_user_id -> Uuid,
        /// Why: `skip` or `dislike`.
        reason -> Varchar,
        /// Edge creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Conversations; `group_id` NULL marks a direct conversation.
    conversations (id) {
        /// Primary key.
        id -> Uuid,
        /// Owning group for group chats.
        group_id -> Nullable<Uuid>,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Conversation membership join.
    conversation_participants (conversation_id, user_id) {
        /// Conversation.
        conversation_id -> Uuid,
        /// Participant.
        user_id -> Uuid,
    }
}

diesel::table! {
    /// Immutable chat messages.
    messages (id) {
        /// Primary key.
        id -> Uuid,
        /// Conversation the message belongs to.
        conversation_id -> Uuid,
        /// Author.
        sender_id -> Uuid,
        /// Message body.
        text -> Text,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Interest groups built by the grouping sweep.
    groups (id) {
        /// Primary key.
        id -> Uuid,
        /// Auto-generated display name.
        name -> Varchar,
        /// Description.
        description -> Text,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Group membership rows, unique per (group, user).
    group_members (group_id, user_id) {
        /// Group.
        group_id -> Uuid,
        /// Member.
        user_id -> Uuid,
        /// Whether the member administers the group.
        is_admin -> Bool,
        /// Whether the membership is active.
        is_active -> Bool,
        /// Join timestamp.
        joined_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-user notification log.
    notifications (id) {
        /// Primary key.
        id -> Uuid,
        /// Recipient.
        user_id -> Uuid,
        /// Conversation the notification points at.
        conversation_id -> Uuid,
        /// Notification text.
        text -> Text,
        /// Whether the recipient has seen it.
        read -> Bool,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(conversation_participants -> conversations (conversation_id));
diesel::joinable!(messages -> conversations (conversation_id));
diesel::joinable!(group_members -> groups (group_id));
diesel::joinable!(notifications -> conversations (conversation_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    interests,
    user_likes,
    user_rejections,
    conversations,
    conversation_participants,
    messages,
    groups,
    group_members,
    notifications,
);
