//! Notification hub: persist first, push second.
//!
//! A notification row is the durable record; the live push is an
//! optimisation. Publish failures (nobody connected, channel trouble) are
//! logged and swallowed so the triggering operation never fails on them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::events::{ChannelTopic, LiveEvent, NotificationEvent};
use crate::domain::ports::{
    ConversationRepository, ConversationRepositoryError, EventBus, NotificationRepository,
    NotificationRepositoryError,
};
use crate::domain::user::UserId;

/// Persisted notification row.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Notification identifier.
    pub id: Uuid,
    /// Recipient.
    pub user: UserId,
    /// Conversation the notification points at.
    pub conversation_id: Uuid,
    /// Notification text.
    pub text: String,
    /// Whether the recipient has seen it.
    pub read: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

fn map_repository_error(error: NotificationRepositoryError) -> Error {
    match error {
        NotificationRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("notification repository unavailable: {message}"))
        }
        NotificationRepositoryError::Query { message } => {
            Error::internal(format!("notification repository error: {message}"))
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

/// Persists notifications and fans them out to user channels.
#[derive(Clone)]
pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
    conversations: Arc<dyn ConversationRepository>,
    events: Arc<dyn EventBus>,
}

impl NotificationService {
    /// Create a new notification service.
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        conversations: Arc<dyn ConversationRepository>,
        events: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            notifications,
            conversations,
            events,
        }
    }

    /// Persist a notification for `user`, then best-effort push it live.
    ///
    /// Persistence failures propagate; a push reaching zero subscribers is
    /// the normal offline case.
    pub async fn notify(
        &self,
        user: &UserId,
        conversation_id: Uuid,
        text: &str,
    ) -> Result<Notification, Error> {
        let row = self
            .notifications
            .insert(user, conversation_id, text)
            .await
            .map_err(map_repository_error)?;

        let event = self.to_event(&row).await?;
        let delivered = self
            .events
            .publish(&ChannelTopic::User(*user), &LiveEvent::Notification(event));
        if delivered == 0 {
            debug!(%user, conversation = %conversation_id, "no live subscriber for notification");
        }
        Ok(row)
    }

    /// Unread notifications for a user as live-event payloads, most recent
    /// first. Does not mark anything read; delivery edges do that as each
    /// payload actually reaches the client.
    pub async fn unread_payloads(&self, user: &UserId) -> Result<Vec<NotificationEvent>, Error> {
        let rows = self
            .notifications
            .unread_for(user)
            .await
            .map_err(map_repository_error)?;

        let mut payloads = Vec::with_capacity(rows.len());
        for row in &rows {
            payloads.push(self.to_event(row).await?);
        }
        Ok(payloads)
    }

    /// Flip one notification to read.
    pub async fn mark_read(&self, id: Uuid) -> Result<(), Error> {
        self.notifications
            .mark_read(id)
            .await
            .map_err(map_repository_error)
    }

    /// Resolve the display payload for one row. The counterpart (`from`)
    /// only exists for two-party conversations.
    async fn to_event(&self, row: &Notification) -> Result<NotificationEvent, Error> {
        let conversation = self
            .conversations
            .find_by_id(row.conversation_id)
            .await
            .map_err(map_conversation_error)?;
        let from = conversation.and_then(|c| c.counterpart_of(&row.user));

        Ok(NotificationEvent {
            conversation: row.conversation_id,
            text: row.text.clone(),
            from,
            id: row.id,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversations::Conversation;
    use crate::domain::ports::{
        MockConversationRepository, MockNotificationRepository, NullEventBus,
    };
    use rstest::rstest;

    fn row(user: UserId, conversation_id: Uuid) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user,
            conversation_id,
            text: "hello".to_owned(),
            read: false,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn notify_persists_before_publishing() {
        let user = UserId::random();
        let conversation_id = Uuid::new_v4();

        let mut notifications = MockNotificationRepository::new();
        let persisted = row(user, conversation_id);
        let returned = persisted.clone();
        notifications
            .expect_insert()
            .times(1)
            .returning(move |_, _, _| Ok(returned.clone()));

        let mut conversations = MockConversationRepository::new();
        conversations.expect_find_by_id().returning(|_| Ok(None));

        let service = NotificationService::new(
            Arc::new(notifications),
            Arc::new(conversations),
            Arc::new(NullEventBus),
        );
        let saved = service
            .notify(&user, conversation_id, "hello")
            .await
            .expect("notify persists");
        assert_eq!(saved, persisted);
    }

    #[rstest]
    #[tokio::test]
    async fn unread_payloads_resolve_counterpart_for_direct_conversations() {
        let user = UserId::random();
        let other = UserId::random();
        let conversation_id = Uuid::new_v4();

        let mut notifications = MockNotificationRepository::new();
        let unread = vec![row(user, conversation_id)];
        notifications
            .expect_unread_for()
            .returning(move |_| Ok(unread.clone()));

        let mut conversations = MockConversationRepository::new();
        conversations.expect_find_by_id().returning(move |id| {
            Ok(Some(Conversation {
                id,
                group_id: None,
                participants: vec![user, other],
                created_at: Utc::now(),
            }))
        });

        let service = NotificationService::new(
            Arc::new(notifications),
            Arc::new(conversations),
            Arc::new(NullEventBus),
        );
        let payloads = service
            .unread_payloads(&user)
            .await
            .expect("payloads resolve");
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads.first().and_then(|p| p.from), Some(other));
    }

    #[rstest]
    #[tokio::test]
    async fn group_notifications_have_no_counterpart() {
        let user = UserId::random();
        let conversation_id = Uuid::new_v4();

        let mut notifications = MockNotificationRepository::new();
        let unread = vec![row(user, conversation_id)];
        notifications
            .expect_unread_for()
            .returning(move |_| Ok(unread.clone()));

        let mut conversations = MockConversationRepository::new();
        conversations.expect_find_by_id().returning(move |id| {
            Ok(Some(Conversation {
                id,
                group_id: Some(Uuid::new_v4()),
                participants: vec![user, UserId::random(), UserId::random()],
                created_at: Utc::now(),
            }))
        });

        let service = NotificationService::new(
            Arc::new(notifications),
            Arc::new(conversations),
            Arc::new(NullEventBus),
        );
        let payloads = service
            .unread_payloads(&user)
            .await
            .expect("payloads resolve");
        assert!(payloads.first().and_then(|p| p.from).is_none());
    }
}
