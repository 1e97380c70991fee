//! Realtime delivery over real WebSocket connections.
//!
//! Binds the production app to an ephemeral listener and drives it with
//! `awc`, covering chat round-trips, the unread-backlog flush, and the
//! keep-open contract for malformed chat frames.

use actix_web::dev::{Server, ServerHandle};
use actix_web::http::header;
use actix_web::{HttpServer, web};
use awc::ws::{Codec, Frame, Message};
use backend::domain::UserId;
use backend::inbound::http::health::HealthState;
use backend::server::build_app;
use backend::test_support::{TestBackend, profile_named};
use futures_util::{SinkExt, StreamExt};
use rstest::rstest;
use serde_json::{Value, json};
use std::time::Duration;
use uuid::Uuid;

type WsClient = actix_codec::Framed<awc::BoxedSocket, Codec>;

fn start_server(backend: &TestBackend) -> (String, Server) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let http_state = backend.http_state.clone();
    let ws_state = backend.ws_state.clone();
    let server = HttpServer::new(move || {
        build_app(
            web::Data::new(HealthState::new()),
            http_state.clone(),
            ws_state.clone(),
        )
    })
    .workers(1)
    .listen(listener)
    .expect("bind test server")
    .disable_signals()
    .run();
    (format!("http://{addr}"), server)
}

async fn connect(url: &str, path: &str, token: &UserId) -> WsClient {
    let (_resp, socket) = awc::Client::default()
        .ws(format!("{url}{path}?token={token}"))
        .set_header(header::ORIGIN, "http://localhost:3000")
        .connect()
        .await
        .expect("websocket connect");
    socket
}

async fn next_json_frame(socket: &mut WsClient) -> Value {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            let frame = socket
                .next()
                .await
                .expect("frame available")
                .expect("frame decodes");
            match frame {
                Frame::Text(bytes) => {
                    return serde_json::from_slice(&bytes).expect("frame is json");
                }
                Frame::Ping(_) | Frame::Pong(_) => continue,
                other => panic!("expected text frame, got {other:?}"),
            }
        }
    })
    .await
    .expect("frame within deadline")
}

#[rstest]
#[actix_rt::test]
async fn chat_messages_round_trip_to_all_participants() {
    let backend = TestBackend::new();
    let a = backend.seed(profile_named("Alice", &[3.0]));
    let b = backend.seed(profile_named("Bob", &[3.0]));
    let opened = backend
        .http_state
        .conversations
        .get_or_create_direct(&a, &b)
        .await
        .expect("conversation opens");
    let conversation_id = opened.conversation.id;

    let (url, server) = start_server(&backend);
    let handle: ServerHandle = server.handle();
    actix_web::rt::spawn(server);

    let path = format!("/ws/conversations/{conversation_id}");
    let mut alice = connect(&url, &path, &a).await;
    let mut bob = connect(&url, &path, &b).await;

    alice
        .send(Message::Text(json!({ "text": "hello bob" }).to_string().into()))
        .await
        .expect("send frame");

    for socket in [&mut alice, &mut bob] {
        let event = next_json_frame(socket).await;
        assert_eq!(event["text"], json!("hello bob"));
        assert_eq!(event["sender"], json!(a.to_string()));
        assert_eq!(event["sender_name"], json!("Alice"));
    }

    handle.stop(true).await;
}

#[rstest]
#[actix_rt::test]
async fn malformed_chat_frames_leave_the_session_open() {
    let backend = TestBackend::new();
    let a = backend.seed(profile_named("Alice", &[3.0]));
    let b = backend.seed(profile_named("Bob", &[3.0]));
    let opened = backend
        .http_state
        .conversations
        .get_or_create_direct(&a, &b)
        .await
        .expect("conversation opens");
    let conversation_id = opened.conversation.id;

    let (url, server) = start_server(&backend);
    let handle = server.handle();
    actix_web::rt::spawn(server);

    let path = format!("/ws/conversations/{conversation_id}");
    let mut alice = connect(&url, &path, &a).await;

    // Junk first: the session must survive it and keep serving.
    alice
        .send(Message::Text("not-json".into()))
        .await
        .expect("send frame");
    alice
        .send(Message::Text(json!({ "text": "still here" }).to_string().into()))
        .await
        .expect("send frame");

    let event = next_json_frame(&mut alice).await;
    assert_eq!(event["text"], json!("still here"));

    handle.stop(true).await;
}

#[rstest]
#[actix_rt::test]
async fn unread_notifications_flush_on_connect_and_mark_read() {
    let backend = TestBackend::new();
    let a = backend.seed(profile_named("Alice", &[3.0]));
    let b = backend.seed(profile_named("Bob", &[3.0]));
    let opened = backend
        .http_state
        .conversations
        .get_or_create_direct(&a, &b)
        .await
        .expect("conversation opens");
    // Bob already has the conversation-opened notification; unread until
    // he connects.
    let conversation_id = opened.conversation.id;

    let (url, server) = start_server(&backend);
    let handle = server.handle();
    actix_web::rt::spawn(server);

    let mut bob = connect(&url, "/ws/notifications", &b).await;
    let backlog = next_json_frame(&mut bob).await;
    assert_eq!(backlog["conversation"], json!(conversation_id.to_string()));
    assert_eq!(backlog["from"], json!(a.to_string()));

    // The session marks each payload read right after sending it; give
    // that write a moment before asserting.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let remaining = backend
        .store
        .notifications_for(&b)
        .into_iter()
        .filter(|notification| !notification.read)
        .count();
    assert_eq!(remaining, 0);

    handle.stop(true).await;
}

#[rstest]
#[actix_rt::test]
async fn live_notifications_reach_a_connected_user() {
    let backend = TestBackend::new();
    let a = backend.seed(profile_named("Alice", &[3.0]));
    let b = backend.seed(profile_named("Bob", &[3.0]));

    let (url, server) = start_server(&backend);
    let handle = server.handle();
    actix_web::rt::spawn(server);

    let mut bob = connect(&url, "/ws/notifications", &b).await;

    // A mutual match pushes a notification to both participants; Bob is
    // connected and receives his live.
    backend
        .http_state
        .swipes
        .swipe(&a, &b, backend::domain::SwipeAction::Like)
        .await
        .expect("first swipe succeeds");
    backend
        .http_state
        .swipes
        .swipe(&b, &a, backend::domain::SwipeAction::Like)
        .await
        .expect("second swipe succeeds");

    let event = next_json_frame(&mut bob).await;
    assert!(
        event["text"]
            .as_str()
            .is_some_and(|text| text.contains("match")),
        "got {event}"
    );

    handle.stop(true).await;
}

#[rstest]
#[actix_rt::test]
async fn ws_upgrades_require_authentication_and_membership() {
    let backend = TestBackend::new();
    let a = backend.seed(profile_named("Alice", &[3.0]));
    let b = backend.seed(profile_named("Bob", &[3.0]));
    let outsider = backend.seed(profile_named("Outsider", &[3.0]));
    let opened = backend
        .http_state
        .conversations
        .get_or_create_direct(&a, &b)
        .await
        .expect("conversation opens");
    let conversation_id = opened.conversation.id;

    let (url, server) = start_server(&backend);
    let handle = server.handle();
    actix_web::rt::spawn(server);

    // No token.
    let result = awc::Client::default()
        .ws(format!("{url}/ws/conversations/{conversation_id}"))
        .set_header(header::ORIGIN, "http://localhost:3000")
        .connect()
        .await;
    assert!(result.is_err(), "upgrade without token must fail");

    // Authenticated but not a participant.
    let result = awc::Client::default()
        .ws(format!(
            "{url}/ws/conversations/{conversation_id}?token={outsider}"
        ))
        .set_header(header::ORIGIN, "http://localhost:3000")
        .connect()
        .await;
    assert!(result.is_err(), "upgrade by a non-participant must fail");

    // Unknown conversation.
    let result = awc::Client::default()
        .ws(format!("{url}/ws/conversations/{}?token={a}", Uuid::new_v4()))
        .set_header(header::ORIGIN, "http://localhost:3000")
        .connect()
        .await;
    assert!(result.is_err(), "upgrade to an unknown conversation must fail");

    // Disallowed origin.
    let result = awc::Client::default()
        .ws(format!("{url}/ws/conversations/{conversation_id}?token={a}"))
        .set_header(header::ORIGIN, "https://evil.example")
        .connect()
        .await;
    assert!(result.is_err(), "disallowed origin must fail");

    handle.stop(true).await;
}
