//! PostgreSQL-backed `ConversationRepository` implementation using Diesel.
//!
//! Conversation creation attaches participants inside the same
//! transaction, so a half-created direct conversation is never visible to
//! the duplicate lookup.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::conversations::{ChatMessage, Conversation};
use crate::domain::ports::{ConversationRepository, ConversationRepositoryError};
use crate::domain::user::UserId;

use super::error_mapping::{diesel_error_into, pool_error_into};
use super::models::{ConversationRow, MessageRow, NewConversationRow, NewMessageRow, NewParticipantRow};
use super::pool::{DbPool, PoolError};
use super::schema::{conversation_participants, conversations, messages};

/// Diesel-backed implementation of the conversation repository port.
#[derive(Clone)]
pub struct DieselConversationRepository {
    pool: DbPool,
}

impl DieselConversationRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn create_with_participants(
        &self,
        group_id: Option<Uuid>,
        members: &[UserId],
    ) -> Result<Conversation, ConversationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let id = Uuid::new_v4();
        let participant_rows: Vec<NewParticipantRow> = members
            .iter()
            .map(|member| NewParticipantRow {
                conversation_id: id,
                user_id: *member.as_uuid(),
            })
            .collect();

        let row = conn
            .transaction::<ConversationRow, diesel::result::Error, _>(|conn| {
                async move {
                    let row: ConversationRow = diesel::insert_into(conversations::table)
                        .values(&NewConversationRow { id, group_id })
                        .returning(ConversationRow::as_returning())
                        .get_result(conn)
                        .await?;

                    diesel::insert_into(conversation_participants::table)
                        .values(&participant_rows)
                        .execute(conn)
                        .await?;

                    Ok(row)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        Ok(row.into_conversation(members.to_vec()))
    }
}

fn map_pool_error(error: PoolError) -> ConversationRepositoryError {
    pool_error_into(error, ConversationRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> ConversationRepositoryError {
    diesel_error_into(
        error,
        ConversationRepositoryError::query,
        ConversationRepositoryError::connection,
    )
}

#[async_trait]
impl ConversationRepository for DieselConversationRepository {
    async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<Conversation>, ConversationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = conversations::table
            .find(id)
            .select(ConversationRow::as_select())
            .first::<ConversationRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let participants = conversation_participants::table
            .filter(conversation_participants::conversation_id.eq(id))
            .order(conversation_participants::user_id.asc())
            .select(conversation_participants::user_id)
            .load::<Uuid>(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(Some(row.into_conversation(
            participants.into_iter().map(UserId::new).collect(),
        )))
    }

    async fn find_direct_between(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<Conversation>, ConversationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let of_a: Vec<Uuid> = conversation_participants::table
            .filter(conversation_participants::user_id.eq(a.as_uuid()))
            .select(conversation_participants::conversation_id)
            .load::<Uuid>(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let of_b: Vec<Uuid> = conversation_participants::table
            .filter(conversation_participants::user_id.eq(b.as_uuid()))
            .select(conversation_participants::conversation_id)
            .load::<Uuid>(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let shared: Vec<Uuid> = of_a.into_iter().filter(|id| of_b.contains(id)).collect();
        if shared.is_empty() {
            return Ok(None);
        }

        let row = conversations::table
            .filter(conversations::id.eq_any(shared))
            .filter(conversations::group_id.is_null())
            .order(conversations::created_at.asc())
            .select(ConversationRow::as_select())
            .first::<ConversationRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        match row {
            Some(row) => {
                let id = row.id;
                drop(conn);
                self.find_by_id(id).await
            }
            None => Ok(None),
        }
    }

    async fn create_direct(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Conversation, ConversationRepositoryError> {
        self.create_with_participants(None, &[*a, *b]).await
    }

    async fn create_group_chat(
        &self,
        group_id: Uuid,
        members: &[UserId],
    ) -> Result<Conversation, ConversationRepositoryError> {
        self.create_with_participants(Some(group_id), members).await
    }

    async fn list_for_user(
        &self,
        user: &UserId,
    ) -> Result<Vec<Conversation>, ConversationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let ids: Vec<Uuid> = conversation_participants::table
            .filter(conversation_participants::user_id.eq(user.as_uuid()))
            .select(conversation_participants::conversation_id)
            .load::<Uuid>(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = conversations::table
            .filter(conversations::id.eq_any(&ids))
            .order(conversations::created_at.desc())
            .select(ConversationRow::as_select())
            .load::<ConversationRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let memberships = conversation_participants::table
            .filter(conversation_participants::conversation_id.eq_any(&ids))
            .order(conversation_participants::user_id.asc())
            .select((
                conversation_participants::conversation_id,
                conversation_participants::user_id,
            ))
            .load::<(Uuid, Uuid)>(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let mut by_conversation: HashMap<Uuid, Vec<UserId>> = HashMap::new();
        for (conversation_id, user_id) in memberships {
            by_conversation
                .entry(conversation_id)
                .or_default()
                .push(UserId::new(user_id));
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let participants = by_conversation.remove(&row.id).unwrap_or_default();
                row.into_conversation(participants)
            })
            .collect())
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender: &UserId,
        text: &str,
    ) -> Result<ChatMessage, ConversationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: MessageRow = diesel::insert_into(messages::table)
            .values(&NewMessageRow {
                id: Uuid::new_v4(),
                conversation_id,
                sender_id: *sender.as_uuid(),
                text,
            })
            .returning(MessageRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(row.into())
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<ChatMessage>, ConversationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows = messages::table
            .filter(messages::conversation_id.eq(conversation_id))
            .order((messages::created_at.asc(), messages::id.asc()))
            .select(MessageRow::as_select())
            .load::<MessageRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
