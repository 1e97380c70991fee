//! In-memory implementations of every repository port.
//!
//! The database-less fallback: one shared [`MemoryStore`] backs all five
//! repository ports so the server can run (and the integration tests can
//! exercise full flows) without PostgreSQL. Ordering mirrors the SQL
//! adapters (ascending ids for pools, newest-first for conversations and
//! notifications) so behaviour does not depend on which adapter is
//! wired.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::conversations::{ChatMessage, Conversation};
use crate::domain::grouping::{Group, GroupMember};
use crate::domain::notifications::Notification;
use crate::domain::ports::{
    ConversationRepository, ConversationRepositoryError, GroupRepository, GroupRepositoryError,
    NotificationRepository, NotificationRepositoryError, ProfileRepository,
    ProfileRepositoryError, SwipeRepository, SwipeRepositoryError,
};
use crate::domain::swipes::RejectReason;
use crate::domain::user::{Profile, UserId};

#[derive(Default)]
struct StoreState {
    profiles: BTreeMap<UserId, Profile>,
    likes: BTreeSet<(UserId, UserId)>,
    rejections: BTreeSet<(UserId, UserId, RejectReason)>,
    conversations: BTreeMap<Uuid, Conversation>,
    messages: Vec<ChatMessage>,
    groups: Vec<Group>,
    group_members: BTreeMap<Uuid, Vec<GroupMember>>,
    notifications: Vec<Notification>,
}

/// Shared in-memory state implementing all repository ports.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert or replace a profile.
    pub fn upsert_profile(&self, profile: Profile) {
        self.lock().profiles.insert(profile.id, profile);
    }

    /// Number of stored messages; used by tests asserting that rejected
    /// input produced no rows.
    pub fn message_count(&self) -> usize {
        self.lock().messages.len()
    }

    /// Number of stored like edges.
    pub fn like_count(&self) -> usize {
        self.lock().likes.len()
    }

    /// Number of stored direct (non-group) conversations.
    pub fn direct_conversation_count(&self) -> usize {
        self.lock()
            .conversations
            .values()
            .filter(|conversation| conversation.group_id.is_none())
            .count()
    }

    /// All notifications for a user, read or not.
    pub fn notifications_for(&self, user: &UserId) -> Vec<Notification> {
        self.lock()
            .notifications
            .iter()
            .filter(|notification| notification.user == *user)
            .cloned()
            .collect()
    }

    /// Number of stored groups.
    pub fn group_count(&self) -> usize {
        self.lock().groups.len()
    }

    /// Snapshot of every stored group in creation order.
    pub fn groups(&self) -> Vec<Group> {
        self.lock().groups.clone()
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Profile>, ProfileRepositoryError> {
        Ok(self.lock().profiles.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<Profile>, ProfileRepositoryError> {
        let state = self.lock();
        let mut found: Vec<Profile> = ids
            .iter()
            .filter_map(|id| state.profiles.get(id).cloned())
            .collect();
        found.sort_by_key(|profile| profile.id);
        found.dedup_by_key(|profile| profile.id);
        Ok(found)
    }

    async fn candidate_pool(
        &self,
        for_user: &UserId,
    ) -> Result<Vec<Profile>, ProfileRepositoryError> {
        let state = self.lock();
        Ok(state
            .profiles
            .values()
            .filter(|profile| profile.is_active)
            .filter(|profile| profile.id != *for_user)
            .filter(|profile| !state.likes.contains(&(*for_user, profile.id)))
            .filter(|profile| {
                !state
                    .rejections
                    .iter()
                    .any(|(user, target, _)| user == for_user && *target == profile.id)
            })
            .cloned()
            .collect())
    }

    async fn list_active(&self) -> Result<Vec<Profile>, ProfileRepositoryError> {
        Ok(self
            .lock()
            .profiles
            .values()
            .filter(|profile| profile.is_active)
            .cloned()
            .collect())
    }

    async fn deactivate_idle_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, ProfileRepositoryError> {
        let mut state = self.lock();
        let mut changed = 0;
        for profile in state.profiles.values_mut() {
            if profile.is_active && profile.last_seen_at < cutoff {
                profile.is_active = false;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl SwipeRepository for MemoryStore {
    async fn insert_like(
        &self,
        user: &UserId,
        target: &UserId,
    ) -> Result<bool, SwipeRepositoryError> {
        Ok(self.lock().likes.insert((*user, *target)))
    }

    async fn like_exists(
        &self,
        user: &UserId,
        target: &UserId,
    ) -> Result<bool, SwipeRepositoryError> {
        Ok(self.lock().likes.contains(&(*user, *target)))
    }

    async fn insert_rejection(
        &self,
        user: &UserId,
        target: &UserId,
        reason: RejectReason,
    ) -> Result<bool, SwipeRepositoryError> {
        Ok(self.lock().rejections.insert((*user, *target, reason)))
    }

    async fn delete_rejections(&self, user: &UserId) -> Result<u64, SwipeRepositoryError> {
        let mut state = self.lock();
        let before = state.rejections.len();
        state.rejections.retain(|(owner, _, _)| owner != user);
        Ok((before - state.rejections.len()) as u64)
    }

    async fn delete_rejection(
        &self,
        user: &UserId,
        target: &UserId,
    ) -> Result<u64, SwipeRepositoryError> {
        let mut state = self.lock();
        let before = state.rejections.len();
        state
            .rejections
            .retain(|(owner, rejected, _)| !(owner == user && rejected == target));
        Ok((before - state.rejections.len()) as u64)
    }

    async fn liked_ids(&self, user: &UserId) -> Result<Vec<UserId>, SwipeRepositoryError> {
        Ok(self
            .lock()
            .likes
            .iter()
            .filter(|(owner, _)| owner == user)
            .map(|(_, target)| *target)
            .collect())
    }

    async fn rejected_ids(&self, user: &UserId) -> Result<Vec<UserId>, SwipeRepositoryError> {
        let ids: BTreeSet<UserId> = self
            .lock()
            .rejections
            .iter()
            .filter(|(owner, _, _)| owner == user)
            .map(|(_, target, _)| *target)
            .collect();
        Ok(ids.into_iter().collect())
    }

    async fn mutual_pairs(&self) -> Result<Vec<(UserId, UserId)>, SwipeRepositoryError> {
        let state = self.lock();
        Ok(state
            .likes
            .iter()
            .filter(|(a, b)| a < b && state.likes.contains(&(*b, *a)))
            .copied()
            .collect())
    }
}

#[async_trait]
impl ConversationRepository for MemoryStore {
    async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<Conversation>, ConversationRepositoryError> {
        Ok(self.lock().conversations.get(&id).cloned())
    }

    async fn find_direct_between(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<Conversation>, ConversationRepositoryError> {
        Ok(self
            .lock()
            .conversations
            .values()
            .filter(|conversation| conversation.group_id.is_none())
            .find(|conversation| {
                conversation.has_participant(a) && conversation.has_participant(b)
            })
            .cloned())
    }

    async fn create_direct(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Conversation, ConversationRepositoryError> {
        let conversation = Conversation {
            id: Uuid::new_v4(),
            group_id: None,
            participants: vec![*a, *b],
            created_at: Utc::now(),
        };
        self.lock()
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn create_group_chat(
        &self,
        group_id: Uuid,
        members: &[UserId],
    ) -> Result<Conversation, ConversationRepositoryError> {
        let conversation = Conversation {
            id: Uuid::new_v4(),
            group_id: Some(group_id),
            participants: members.to_vec(),
            created_at: Utc::now(),
        };
        self.lock()
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn list_for_user(
        &self,
        user: &UserId,
    ) -> Result<Vec<Conversation>, ConversationRepositoryError> {
        let mut conversations: Vec<Conversation> = self
            .lock()
            .conversations
            .values()
            .filter(|conversation| conversation.has_participant(user))
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(conversations)
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender: &UserId,
        text: &str,
    ) -> Result<ChatMessage, ConversationRepositoryError> {
        let mut state = self.lock();
        if !state.conversations.contains_key(&conversation_id) {
            return Err(ConversationRepositoryError::query("record not found"));
        }
        let message = ChatMessage {
            id: Uuid::new_v4(),
            conversation_id,
            sender: *sender,
            text: text.to_owned(),
            created_at: Utc::now(),
        };
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<ChatMessage>, ConversationRepositoryError> {
        Ok(self
            .lock()
            .messages
            .iter()
            .filter(|message| message.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>, GroupRepositoryError> {
        Ok(self
            .lock()
            .groups
            .iter()
            .find(|group| group.id == id)
            .cloned())
    }

    async fn member_set_exists(
        &self,
        member_ids: &[UserId],
    ) -> Result<bool, GroupRepositoryError> {
        let wanted: BTreeSet<UserId> = member_ids.iter().copied().collect();
        let state = self.lock();
        Ok(state.group_members.values().any(|members| {
            let existing: BTreeSet<UserId> =
                members.iter().map(|member| member.user).collect();
            existing == wanted
        }))
    }

    async fn create_group(
        &self,
        name: &str,
        description: &str,
        member_ids: &[UserId],
    ) -> Result<Group, GroupRepositoryError> {
        let group = Group {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            description: description.to_owned(),
            created_at: Utc::now(),
        };
        let members: Vec<GroupMember> = member_ids
            .iter()
            .map(|user| GroupMember {
                user: *user,
                is_admin: false,
                is_active: true,
                joined_at: Utc::now(),
            })
            .collect();
        let mut state = self.lock();
        state.groups.push(group.clone());
        state.group_members.insert(group.id, members);
        Ok(group)
    }

    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Group>, GroupRepositoryError> {
        let state = self.lock();
        let mut groups: Vec<Group> = state
            .groups
            .iter()
            .filter(|group| {
                state.group_members.get(&group.id).is_some_and(|members| {
                    members
                        .iter()
                        .any(|member| member.user == *user && member.is_active)
                })
            })
            .cloned()
            .collect();
        groups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(groups)
    }

    async fn list_members(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<GroupMember>, GroupRepositoryError> {
        Ok(self
            .lock()
            .group_members
            .get(&group_id)
            .map(|members| {
                members
                    .iter()
                    .filter(|member| member.is_active)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn insert(
        &self,
        user: &UserId,
        conversation_id: Uuid,
        text: &str,
    ) -> Result<Notification, NotificationRepositoryError> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user: *user,
            conversation_id,
            text: text.to_owned(),
            read: false,
            created_at: Utc::now(),
        };
        self.lock().notifications.push(notification.clone());
        Ok(notification)
    }

    async fn unread_for(
        &self,
        user: &UserId,
    ) -> Result<Vec<Notification>, NotificationRepositoryError> {
        let mut unread: Vec<Notification> = self
            .lock()
            .notifications
            .iter()
            .filter(|notification| notification.user == *user && !notification.read)
            .cloned()
            .collect();
        unread.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(unread)
    }

    async fn mark_read(&self, id: Uuid) -> Result<(), NotificationRepositoryError> {
        let mut state = self.lock();
        if let Some(notification) = state
            .notifications
            .iter_mut()
            .find(|notification| notification.id == id)
        {
            notification.read = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::{DisplayName, PrivacyVector};
    use rstest::rstest;

    fn profile(id: UserId) -> Profile {
        Profile {
            id,
            display_name: DisplayName::new("Member").expect("valid fixture name"),
            avatar_url: None,
            interest_vector: None,
            privacy: PrivacyVector::permissive(),
            location: None,
            is_active: true,
            last_seen_at: Utc::now(),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn candidate_pool_excludes_self_liked_and_rejected() {
        let store = MemoryStore::new();
        let me = UserId::random();
        let liked = UserId::random();
        let rejected = UserId::random();
        let fresh = UserId::random();
        let inactive = UserId::random();

        for id in [me, liked, rejected, fresh] {
            store.upsert_profile(profile(id));
        }
        let mut dormant = profile(inactive);
        dormant.is_active = false;
        store.upsert_profile(dormant);

        store.insert_like(&me, &liked).await.expect("like stored");
        store
            .insert_rejection(&me, &rejected, RejectReason::Skip)
            .await
            .expect("rejection stored");
        // Incoming edges must not hide anyone.
        store.insert_like(&fresh, &me).await.expect("like stored");

        let pool = store.candidate_pool(&me).await.expect("pool loads");
        let ids: Vec<UserId> = pool.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![fresh]);
    }

    #[rstest]
    #[tokio::test]
    async fn like_insert_is_idempotent() {
        let store = MemoryStore::new();
        let (a, b) = (UserId::random(), UserId::random());
        assert!(store.insert_like(&a, &b).await.expect("insert"));
        assert!(!store.insert_like(&a, &b).await.expect("insert"));
        assert_eq!(store.like_count(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn mutual_pairs_fold_both_directions() {
        let store = MemoryStore::new();
        let (a, b, c) = (UserId::random(), UserId::random(), UserId::random());
        store.insert_like(&a, &b).await.expect("insert");
        store.insert_like(&b, &a).await.expect("insert");
        store.insert_like(&a, &c).await.expect("insert");

        let pairs = store.mutual_pairs().await.expect("pairs load");
        assert_eq!(pairs.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn deactivation_respects_cutoff() {
        let store = MemoryStore::new();
        let old = UserId::random();
        let recent = UserId::random();

        let mut idle = profile(old);
        idle.last_seen_at = Utc::now() - chrono::Duration::days(10);
        store.upsert_profile(idle);
        store.upsert_profile(profile(recent));

        let cutoff = Utc::now() - chrono::Duration::days(7);
        let changed = store
            .deactivate_idle_since(cutoff)
            .await
            .expect("sweep runs");
        assert_eq!(changed, 1);

        let survivors = store.list_active().await.expect("list loads");
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors.first().map(|p| p.id), Some(recent));
    }
}
