//! WebSocket inbound adapter.
//!
//! Responsibilities:
//! - validate upgrade requests (origin allow-list, `token` query auth)
//! - enforce conversation membership before joining a chat channel
//! - subscribe to the relevant broadcast topic and hand the connection to
//!   the per-session loop
//!
//! A client joins exactly one channel per connection: a conversation
//! channel (`/ws/conversations/{id}`) or its own user channel
//! (`/ws/notifications`).

use actix_web::http::header::{HeaderValue, ORIGIN};
use actix_web::web::Payload;
use actix_web::{HttpRequest, HttpResponse, get, web};
use serde::Deserialize;
use tracing::{error, warn};
use url::Url;
use uuid::Uuid;

use crate::domain::events::ChannelTopic;
use crate::domain::user::UserId;

mod session;

pub mod messages;
pub mod state;

use session::{ChatSession, NotifySession};
use state::WsState;

/// Query parameters accepted on WebSocket upgrades.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Bearer token; WebSocket clients cannot set headers reliably, so it
    /// travels in the query string.
    pub token: Option<String>,
}

/// Handle WebSocket upgrade for a conversation channel.
#[get("/ws/conversations/{id}")]
pub async fn chat_entry(
    state: web::Data<WsState>,
    req: HttpRequest,
    stream: Payload,
    path: web::Path<Uuid>,
    query: web::Query<WsQuery>,
) -> actix_web::Result<HttpResponse> {
    validate_upgrade(&req)?;
    let user = authenticate(&state, query.into_inner()).await?;
    let conversation_id = path.into_inner();

    state
        .conversations
        .require_membership(conversation_id, &user)
        .await
        .map_err(actix_web::Error::from)?;

    let live = state
        .events
        .subscribe(&ChannelTopic::Conversation(conversation_id));
    let (response, session, msg_stream) = actix_ws::handle(&req, stream)?;
    let runner = ChatSession {
        conversations: state.conversations.clone(),
        conversation_id,
        user,
    };
    actix_web::rt::spawn(runner.run(session, msg_stream, live));
    Ok(response)
}

/// Handle WebSocket upgrade for the caller's notification channel.
#[get("/ws/notifications")]
pub async fn notify_entry(
    state: web::Data<WsState>,
    req: HttpRequest,
    stream: Payload,
    query: web::Query<WsQuery>,
) -> actix_web::Result<HttpResponse> {
    validate_upgrade(&req)?;
    let user = authenticate(&state, query.into_inner()).await?;

    let live = state.events.subscribe(&ChannelTopic::User(user));
    let (response, session, msg_stream) = actix_ws::handle(&req, stream)?;
    let runner = NotifySession {
        notifications: state.notifications.clone(),
        user,
    };
    actix_web::rt::spawn(runner.run(session, msg_stream, live));
    Ok(response)
}

async fn authenticate(state: &WsState, query: WsQuery) -> actix_web::Result<UserId> {
    let token = query.token.ok_or_else(|| {
        warn!("WebSocket upgrade without token");
        actix_web::error::ErrorUnauthorized("token required")
    })?;

    match state.identity.resolve(&token).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(actix_web::error::ErrorUnauthorized("invalid token")),
        Err(err) => {
            error!(error = %err, "identity resolution failed during WS upgrade");
            Err(actix_web::error::ErrorServiceUnavailable(
                "authentication unavailable",
            ))
        }
    }
}

fn validate_upgrade(req: &HttpRequest) -> actix_web::Result<()> {
    let mut origin_iter = req.headers().get_all(ORIGIN);
    let origin_header = origin_iter.next().ok_or_else(|| {
        error!("missing Origin header on WebSocket upgrade");
        actix_web::error::ErrorForbidden("Origin not allowed")
    })?;
    if origin_iter.next().is_some() {
        error!("multiple Origin headers on WebSocket upgrade");
        return Err(actix_web::error::ErrorBadRequest("Invalid Origin header"));
    }
    validate_origin(origin_header)
}

fn validate_origin(origin_header: &HeaderValue) -> actix_web::Result<()> {
    let origin_value = origin_header.to_str().map_err(|err| {
        error!(error = %err, "failed to parse Origin header as string");
        actix_web::error::ErrorBadRequest("Invalid Origin header")
    })?;

    let origin = Url::parse(origin_value).map_err(|err| {
        error!(error = %err, "failed to parse Origin header as URL");
        actix_web::error::ErrorBadRequest("Invalid Origin header")
    })?;

    if is_allowed_origin(&origin) {
        Ok(())
    } else {
        warn!(
            origin = origin_value,
            "rejected WS upgrade due to disallowed Origin"
        );
        Err(actix_web::error::ErrorForbidden("Origin not allowed"))
    }
}

const PRIMARY_HOST: &str = "mutuals.example";
const LOCALHOST: &str = "localhost";
const ALLOWED_SUBDOMAIN_SUFFIX: &str = ".mutuals.example";

/// Returns true when a parsed Origin belongs to the static allow-list:
/// HTTPS from the production domain and its subdomains, HTTP from
/// localhost with an explicit non-zero port.
fn is_allowed_origin(origin: &Url) -> bool {
    let Some(host) = origin.host_str() else {
        return false;
    };

    match origin.scheme() {
        "http" if host == LOCALHOST => matches!(origin.port(), Some(port) if port != 0),
        "https" if host == PRIMARY_HOST => true,
        "https" if host.strip_suffix(ALLOWED_SUBDOMAIN_SUFFIX).is_some() => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::{StatusCode, header::HeaderValue};
    use rstest::rstest;

    fn header(value: &str) -> HeaderValue {
        HeaderValue::from_str(value).expect("valid header value")
    }

    #[rstest]
    #[case("http://localhost:3000")]
    #[case("https://mutuals.example")]
    #[case("https://chat.mutuals.example")]
    fn accepts_configured_origins(#[case] origin: &str) {
        assert!(validate_origin(&header(origin)).is_ok());
    }

    #[rstest]
    #[case("http://localhost")]
    #[case("https://example.com")]
    #[case("wss://mutuals.example")]
    fn rejects_disallowed_origins(#[case] origin: &str) {
        let error = validate_origin(&header(origin)).expect_err("origin should be rejected");
        assert_eq!(
            error.as_response_error().status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[rstest]
    fn rejects_unparsable_origin_header() {
        let error = validate_origin(&HeaderValue::from_static("not a url"))
            .expect_err("origin should be rejected");
        assert_eq!(
            error.as_response_error().status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[rstest]
    #[case("http://localhost:4000", true)]
    #[case("http://localhost:0", false)]
    #[case("http://localhost", false)]
    #[case("https://mutuals.example", true)]
    #[case("https://chat.mutuals.example", true)]
    #[case("https://mutuals.example.evil.com", false)]
    #[case("wss://mutuals.example", false)]
    fn evaluates_allow_list(#[case] origin: &str, #[case] expected: bool) {
        let parsed = Url::parse(origin).expect("url should parse");
        assert_eq!(is_allowed_origin(&parsed), expected);
    }
}
