//! Per-connection WebSocket session loops.
//!
//! Framing and heartbeats stay at this edge; application behaviour is
//! deferred to the injected services. The public contract pings every 5s
//! and considers a connection idle after 10s without client traffic
//! (shortened under `cfg(test)` to speed feedback up).
//!
//! A malformed or failing inbound chat payload is logged and the socket
//! stays open: one bad message must not end the session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_ws::{CloseCode, CloseReason, Closed, Message, MessageStream, ProtocolError, Session};
use tokio::sync::broadcast;
use tokio::time;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::events::LiveEvent;
use crate::domain::user::UserId;
use crate::domain::{ConversationService, NotificationService};
use crate::inbound::ws::messages::InboundChatMessage;

/// Time between heartbeats to the client.
#[cfg(not(test))]
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
#[cfg(test)]
const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(50);

/// Max idle time before disconnecting the client.
#[cfg(not(test))]
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);
#[cfg(test)]
const CLIENT_TIMEOUT: Duration = Duration::from_millis(100);

enum SessionEnd {
    ClientClosed(Option<CloseReason>),
    StreamClosed,
    HeartbeatTimeout,
    Protocol(ProtocolError),
    Network(Closed),
}

impl SessionEnd {
    fn log(&self) {
        match self {
            Self::HeartbeatTimeout => {
                warn!("WebSocket heartbeat timeout; closing connection");
            }
            Self::Protocol(error) => {
                warn!(error = %error, "WebSocket protocol error");
            }
            Self::Network(error) => {
                warn!(error = %error, "WebSocket send failed; closing connection");
            }
            Self::ClientClosed(_) | Self::StreamClosed => {}
        }
    }

    fn close_reason(&self) -> Option<Option<CloseReason>> {
        match self {
            Self::HeartbeatTimeout => Some(Some(CloseReason {
                code: CloseCode::Normal,
                description: Some("heartbeat timeout".to_owned()),
            })),
            Self::Protocol(_) => Some(Some(CloseReason {
                code: CloseCode::Protocol,
                description: Some("protocol error".to_owned()),
            })),
            Self::ClientClosed(reason) => Some(reason.clone()),
            Self::StreamClosed | Self::Network(_) => None,
        }
    }
}

async fn finish(session: Session, end: SessionEnd) {
    end.log();
    if let Some(reason) = end.close_reason() {
        if let Err(error) = session.close(reason).await {
            warn!(error = %error, "failed to close WebSocket session");
        }
    }
}

/// Heartbeat bookkeeping shared by both session kinds.
struct Heartbeat {
    last_seen: Instant,
}

impl Heartbeat {
    fn new() -> Self {
        Self {
            last_seen: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    async fn tick(&self, session: &mut Session) -> Result<(), SessionEnd> {
        if Instant::now().duration_since(self.last_seen) > CLIENT_TIMEOUT {
            return Err(SessionEnd::HeartbeatTimeout);
        }
        session.ping(b"").await.map_err(SessionEnd::Network)
    }
}

async fn send_json<T: serde::Serialize>(
    session: &mut Session,
    payload: &T,
) -> Result<(), SessionEnd> {
    match serde_json::to_string(payload) {
        Ok(body) => session.text(body).await.map_err(SessionEnd::Network),
        Err(error) => {
            warn!(error = %error, "failed to serialise WebSocket payload");
            Ok(())
        }
    }
}

/// Handle transport-level frames common to both session kinds. Returns
/// the text payload when the frame carries one.
fn classify_frame(
    heartbeat: &mut Heartbeat,
    message: Option<Result<Message, ProtocolError>>,
) -> Result<Option<String>, SessionEnd> {
    let Some(message) = message else {
        return Err(SessionEnd::StreamClosed);
    };
    match message {
        Ok(Message::Text(text)) => {
            heartbeat.touch();
            Ok(Some(text.to_string()))
        }
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_)) => {
            heartbeat.touch();
            Ok(None)
        }
        Ok(Message::Continuation(_) | Message::Nop) => Ok(None),
        Ok(Message::Close(reason)) => Err(SessionEnd::ClientClosed(reason)),
        Err(error) => Err(SessionEnd::Protocol(error)),
    }
}

/// Pings need a pong reply; actix-ws surfaces them as messages, so the
/// loop answers here rather than in `classify_frame`.
async fn maybe_pong(
    session: &mut Session,
    message: &Option<Result<Message, ProtocolError>>,
) -> Result<(), SessionEnd> {
    if let Some(Ok(Message::Ping(payload))) = message {
        session.pong(payload).await.map_err(SessionEnd::Network)?;
    }
    Ok(())
}

/// Conversation-channel session: relays chat events out, routes inbound
/// frames through the conversation service.
pub(super) struct ChatSession {
    pub conversations: Arc<ConversationService>,
    pub conversation_id: Uuid,
    pub user: UserId,
}

impl ChatSession {
    pub(super) async fn run(
        self,
        mut session: Session,
        mut stream: MessageStream,
        mut live: broadcast::Receiver<LiveEvent>,
    ) {
        let mut heartbeat = Heartbeat::new();
        let mut ticker = time::interval(HEARTBEAT_INTERVAL);

        loop {
            let result = tokio::select! {
                _ = ticker.tick() => heartbeat.tick(&mut session).await,
                message = stream.recv() => {
                    match maybe_pong(&mut session, &message).await {
                        Ok(()) => match classify_frame(&mut heartbeat, message) {
                            Ok(Some(text)) => {
                                self.handle_text(&text).await;
                                Ok(())
                            }
                            Ok(None) => Ok(()),
                            Err(end) => Err(end),
                        },
                        Err(end) => Err(end),
                    }
                }
                event = live.recv() => self.relay(&mut session, event).await,
            };

            if let Err(end) = result {
                finish(session, end).await;
                return;
            }
        }
    }

    /// Route one inbound frame into the domain. All failures are logged
    /// and swallowed; the session survives malformed input.
    async fn handle_text(&self, text: &str) {
        let frame = match serde_json::from_str::<InboundChatMessage>(text) {
            Ok(frame) => frame,
            Err(error) => {
                warn!(
                    conversation = %self.conversation_id,
                    %error,
                    "ignoring malformed chat payload"
                );
                return;
            }
        };

        if let Err(error) = self
            .conversations
            .post_message(self.conversation_id, &self.user, &frame.text)
            .await
        {
            warn!(
                conversation = %self.conversation_id,
                user = %self.user,
                %error,
                "failed to handle inbound chat message"
            );
        }
    }

    async fn relay(
        &self,
        session: &mut Session,
        event: Result<LiveEvent, broadcast::error::RecvError>,
    ) -> Result<(), SessionEnd> {
        match event {
            Ok(LiveEvent::Chat(payload)) => send_json(session, &payload).await,
            Ok(LiveEvent::Notification(_)) => Ok(()),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                debug!(
                    conversation = %self.conversation_id,
                    missed,
                    "chat subscriber lagged; events dropped"
                );
                Ok(())
            }
            Err(broadcast::error::RecvError::Closed) => Err(SessionEnd::StreamClosed),
        }
    }
}

/// User-channel session: flushes the unread backlog, then relays live
/// notification events.
pub(super) struct NotifySession {
    pub notifications: Arc<NotificationService>,
    pub user: UserId,
}

impl NotifySession {
    pub(super) async fn run(
        self,
        mut session: Session,
        mut stream: MessageStream,
        mut live: broadcast::Receiver<LiveEvent>,
    ) {
        if let Err(end) = self.flush_unread(&mut session).await {
            finish(session, end).await;
            return;
        }

        let mut heartbeat = Heartbeat::new();
        let mut ticker = time::interval(HEARTBEAT_INTERVAL);

        loop {
            let result = tokio::select! {
                _ = ticker.tick() => heartbeat.tick(&mut session).await,
                message = stream.recv() => {
                    match maybe_pong(&mut session, &message).await {
                        // Inbound text on a notification channel carries no
                        // meaning; it only refreshes the heartbeat.
                        Ok(()) => classify_frame(&mut heartbeat, message).map(|_| ()),
                        Err(end) => Err(end),
                    }
                }
                event = live.recv() => self.relay(&mut session, event).await,
            };

            if let Err(end) = result {
                finish(session, end).await;
                return;
            }
        }
    }

    /// Deliver the unread backlog, marking each notification read as it
    /// goes out. A failed read-mark is logged and does not re-deliver
    /// forever: the next connect retries it.
    async fn flush_unread(&self, session: &mut Session) -> Result<(), SessionEnd> {
        let payloads = match self.notifications.unread_payloads(&self.user).await {
            Ok(payloads) => payloads,
            Err(error) => {
                warn!(user = %self.user, %error, "failed to load unread notifications");
                return Ok(());
            }
        };

        for payload in payloads {
            send_json(session, &payload).await?;
            if let Err(error) = self.notifications.mark_read(payload.id).await {
                warn!(user = %self.user, notification = %payload.id, %error,
                    "failed to mark notification read");
            }
        }
        Ok(())
    }

    async fn relay(
        &self,
        session: &mut Session,
        event: Result<LiveEvent, broadcast::error::RecvError>,
    ) -> Result<(), SessionEnd> {
        match event {
            Ok(LiveEvent::Notification(payload)) => send_json(session, &payload).await,
            Ok(LiveEvent::Chat(_)) => Ok(()),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                debug!(user = %self.user, missed, "notification subscriber lagged");
                Ok(())
            }
            Err(broadcast::error::RecvError::Closed) => Err(SessionEnd::StreamClosed),
        }
    }
}
