//! Conversation and message HTTP handlers.
//!
//! ```text
//! POST /api/v1/conversations
//! GET  /api/v1/conversations
//! GET  /api/v1/conversations/{id}/messages
//! POST /api/v1/conversations/{id}/messages
//! ```

use actix_web::{HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::conversations::{ChatMessage, Conversation};
use crate::domain::UserId;
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Identity;
use crate::inbound::http::state::HttpState;

/// Request payload for opening a direct conversation.
#[derive(Debug, Deserialize)]
pub struct OpenConversationBody {
    /// The other participant.
    pub partner: Uuid,
}

/// Conversation payload.
#[derive(Debug, Serialize)]
pub struct ConversationBody {
    /// Conversation identifier.
    pub id: Uuid,
    /// Owning group for group chats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Uuid>,
    /// Participants.
    pub participants: Vec<UserId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Conversation> for ConversationBody {
    fn from(value: Conversation) -> Self {
        Self {
            id: value.id,
            group_id: value.group_id,
            participants: value.participants,
            created_at: value.created_at,
        }
    }
}

/// Message payload.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    /// Message identifier.
    pub id: Uuid,
    /// Author.
    pub sender: UserId,
    /// Body text.
    pub text: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessage> for MessageBody {
    fn from(value: ChatMessage) -> Self {
        Self {
            id: value.id,
            sender: value.sender,
            text: value.text,
            created_at: value.created_at,
        }
    }
}

/// Request payload for posting a message.
#[derive(Debug, Deserialize)]
pub struct PostMessageBody {
    /// Message text; must not be blank.
    pub text: String,
}

/// Open (or return the existing) direct conversation with a partner.
/// Returns 201 on creation, 200 when the conversation already existed.
#[post("/conversations")]
pub async fn open_conversation(
    state: web::Data<HttpState>,
    identity: Identity,
    body: web::Json<OpenConversationBody>,
) -> ApiResult<HttpResponse> {
    let partner = UserId::new(body.partner);
    let outcome = state
        .conversations
        .get_or_create_direct(identity.user_id(), &partner)
        .await?;

    let payload = ConversationBody::from(outcome.conversation);
    if outcome.created {
        Ok(HttpResponse::Created().json(payload))
    } else {
        Ok(HttpResponse::Ok().json(payload))
    }
}

/// Conversations the caller participates in.
#[get("/conversations")]
pub async fn list_conversations(
    state: web::Data<HttpState>,
    identity: Identity,
) -> ApiResult<web::Json<Vec<ConversationBody>>> {
    let conversations = state
        .conversations
        .list_for_user(identity.user_id())
        .await?;
    Ok(web::Json(
        conversations.into_iter().map(Into::into).collect(),
    ))
}

/// Messages of one conversation, oldest first.
#[get("/conversations/{id}/messages")]
pub async fn list_messages(
    state: web::Data<HttpState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<Vec<MessageBody>>> {
    let messages = state
        .conversations
        .list_messages(path.into_inner(), identity.user_id())
        .await?;
    Ok(web::Json(messages.into_iter().map(Into::into).collect()))
}

/// Post a message to a conversation the caller participates in.
#[post("/conversations/{id}/messages")]
pub async fn post_message(
    state: web::Data<HttpState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<PostMessageBody>,
) -> ApiResult<HttpResponse> {
    let message = state
        .conversations
        .post_message(path.into_inner(), identity.user_id(), &body.text)
        .await?;
    Ok(HttpResponse::Created().json(MessageBody::from(message)))
}
