//! Room WebSocket session tests against a live server.

use super::*;
use crate::domain::ports::{
    ChatRoomCommand, KickMemberRequest, LeaveChatRoomRequest, PresenceRegistry,
};
use crate::domain::{Board, ChatRoom, DayBoundary, MessageService, RoomService};
use crate::inbound::http::auth::USER_ID_HEADER;
use crate::inbound::ws;
use crate::inbound::ws::state::{AllowedOrigins, WsStatePorts};
use crate::outbound::realtime::BroadcastHub;
use crate::test_support::CompanionHarness;
use actix_web::{App, HttpServer, dev::ServerHandle, http::header};
use awc::{BoxedSocket, ws::Codec, ws::Frame};
use futures_util::{SinkExt, StreamExt};
use rstest::rstest;
use serde_json::Value;

type Socket = actix_codec::Framed<BoxedSocket, Codec>;

const ORIGIN: &str = "http://localhost:3000";

struct Fixture {
    harness: CompanionHarness,
    hub: BroadcastHub,
    rooms: Arc<RoomService>,
    messages: Arc<MessageService>,
    room: ChatRoom,
    owner: UserId,
    guest: UserId,
    url: String,
    server: ServerHandle,
}

async fn seated(harness: &CompanionHarness) -> (Board, ChatRoom, UserId, UserId) {
    let owner = harness.user("host", Some("token-host")).await;
    let guest = harness.user("guest", Some("token-guest")).await;
    let board = harness.board(owner, "Jazz night", 3).await;
    let room = harness.room(&board).await;
    harness.seat(&board, &room, guest).await;
    (board, room, owner, guest)
}

async fn start() -> Fixture {
    let harness = CompanionHarness::new();
    let (_board, room, owner, guest) = seated(&harness).await;
    let hub = BroadcastHub::default();
    let mut ports = harness.ports();
    ports.publisher = Arc::new(hub.clone());
    let messages = Arc::new(MessageService::new(
        &ports,
        harness.clock(),
        DayBoundary::utc(),
    ));
    let rooms = Arc::new(RoomService::new(&ports, messages.clone(), harness.clock()));
    let ws_state = WsState::new(
        WsStatePorts {
            messages: messages.clone(),
            rooms: rooms.clone(),
            presence: Arc::new(harness.presence.clone()),
            topics: Arc::new(hub.clone()),
        },
        AllowedOrigins::new([ORIGIN]),
    );

    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let server = HttpServer::new(move || {
        App::new()
            .app_data(actix_web::web::Data::new(ws_state.clone()))
            .service(ws::ws_entry)
    })
    .listen(listener)
    .expect("bind test server")
    .disable_signals()
    .run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    Fixture {
        harness,
        hub,
        rooms,
        messages,
        room,
        owner,
        guest,
        url: format!("http://{addr}"),
        server: handle,
    }
}

async fn connect(fixture: &Fixture, user: UserId) -> Result<Socket, awc::error::WsClientError> {
    awc::Client::default()
        .ws(format!("{}/ws/chat-rooms/{}", fixture.url, fixture.room.id))
        .set_header(header::ORIGIN, ORIGIN)
        .set_header(USER_ID_HEADER, user.to_string())
        .connect()
        .await
        .map(|(_resp, socket)| socket)
}

async fn next_text_frame(socket: &mut Socket) -> Value {
    loop {
        let frame = socket.next().await.expect("response frame").expect("frame");
        match frame {
            Frame::Text(bytes) => return serde_json::from_slice(&bytes).expect("json frame"),
            Frame::Ping(_) | Frame::Pong(_) => continue,
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

/// Read until the server closes, answering pings; any text frame fails.
async fn close_reason_without_text(socket: &mut Socket) -> Option<CloseReason> {
    loop {
        let frame = socket.next().await.expect("response frame").expect("frame");
        match frame {
            Frame::Ping(payload) => socket
                .send(awc::ws::Message::Pong(payload))
                .await
                .expect("send pong"),
            Frame::Pong(_) => continue,
            Frame::Close(reason) => return reason,
            other => panic!("expected close frame, got {other:?}"),
        }
    }
}

async fn wait_for_subscribers(fixture: &Fixture, expected: usize) {
    let topic = room_topic(&fixture.room.id);
    tokio::time::timeout(Duration::from_secs(2), async {
        while fixture.hub.subscriber_count(&topic) != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("subscriber count never settled");
}

#[rstest]
#[actix_rt::test]
async fn messages_are_broadcast_to_every_participant() {
    let fixture = start().await;
    let mut owner = connect(&fixture, fixture.owner).await.expect("owner connects");
    let mut guest = connect(&fixture, fixture.guest).await.expect("guest connects");
    wait_for_subscribers(&fixture, 2).await;

    guest
        .send(awc::ws::Message::Text(
            serde_json::json!({ "content": "see you at 8" }).to_string().into(),
        ))
        .await
        .expect("send text");

    for socket in [&mut owner, &mut guest] {
        let divider = next_text_frame(socket).await;
        assert_eq!(divider["type"], "DATE_DIVIDER");
        let talk = next_text_frame(socket).await;
        assert_eq!(talk["type"], "TALK");
        assert_eq!(talk["content"], "see you at 8");
        assert_eq!(talk["senderId"], fixture.guest.to_string());
    }
    fixture.server.stop(true).await;
}

async fn wait_for_presence(fixture: &Fixture, user: UserId, expected: bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while fixture
            .harness
            .presence
            .is_present(&fixture.room.id, &user)
            .await
            .expect("presence")
            != expected
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("presence never settled");
}

#[rstest]
#[actix_rt::test]
async fn presence_follows_the_connection() {
    let fixture = start().await;
    let mut socket = connect(&fixture, fixture.guest).await.expect("connects");
    wait_for_presence(&fixture, fixture.guest, true).await;
    assert_eq!(fixture.hub.subscriber_count(&room_topic(&fixture.room.id)), 1);

    socket
        .send(awc::ws::Message::Close(None))
        .await
        .expect("send close");

    wait_for_presence(&fixture, fixture.guest, false).await;
    wait_for_subscribers(&fixture, 0).await;
    fixture.server.stop(true).await;
}

#[rstest]
#[actix_rt::test]
async fn outsiders_cannot_upgrade() {
    let fixture = start().await;
    let outsider = fixture.harness.user("lurker", None).await;

    let error = connect(&fixture, outsider)
        .await
        .err()
        .expect("outsider rejected");

    assert!(
        matches!(
            error,
            awc::error::WsClientError::InvalidResponseStatus(status)
                if status == actix_web::http::StatusCode::FORBIDDEN
        ),
        "unexpected error: {error:?}"
    );
    fixture.server.stop(true).await;
}

#[rstest]
#[actix_rt::test]
async fn blank_messages_get_an_error_frame() {
    let fixture = start().await;
    let mut socket = connect(&fixture, fixture.guest).await.expect("connects");

    socket
        .send(awc::ws::Message::Text(
            serde_json::json!({ "content": "   " }).to_string().into(),
        ))
        .await
        .expect("send text");

    let frame = next_text_frame(&mut socket).await;
    assert_eq!(frame["type"], "ERROR");
    assert_eq!(frame["code"], "invalid_request");
    fixture.server.stop(true).await;
}

#[rstest]
#[actix_rt::test]
async fn closes_on_malformed_json() {
    let fixture = start().await;
    let mut socket = connect(&fixture, fixture.guest).await.expect("connects");

    socket
        .send(awc::ws::Message::Text("not-json".into()))
        .await
        .expect("send text");

    loop {
        let frame = socket.next().await.expect("response frame").expect("frame");
        match frame {
            Frame::Ping(_) | Frame::Pong(_) => continue,
            Frame::Close(reason) => {
                assert_eq!(reason.expect("reason").code, CloseCode::Policy);
                break;
            }
            other => panic!("expected close frame, got {other:?}"),
        }
    }
    fixture.server.stop(true).await;
}

#[rstest]
#[actix_rt::test]
async fn closes_after_timeout_without_client_messages() {
    let fixture = start().await;
    let mut socket = connect(&fixture, fixture.guest).await.expect("connects");
    tokio::time::sleep(CLIENT_TIMEOUT + HEARTBEAT_INTERVAL * 3).await;

    let observed_close = tokio::time::timeout(Duration::from_secs(2), async {
        let mut observed = None;
        while let Some(frame) = socket.next().await {
            let frame = frame.expect("frame");
            match frame {
                Frame::Ping(_) | Frame::Pong(_) => continue,
                Frame::Close(reason) => {
                    observed = reason;
                    break;
                }
                other => panic!("unexpected frame before close: {other:?}"),
            }
        }
        observed
    })
    .await
    .expect("close frame missing within timeout")
    .expect("close frame missing after timeout");

    assert_eq!(observed_close.code, CloseCode::Normal);
    assert_eq!(observed_close.description.as_deref(), Some("heartbeat timeout"));
    fixture.server.stop(true).await;
}

#[rstest]
#[actix_rt::test]
async fn kicked_members_are_disconnected() {
    let fixture = start().await;
    let mut owner = connect(&fixture, fixture.owner).await.expect("owner connects");
    let mut guest = connect(&fixture, fixture.guest).await.expect("guest connects");
    wait_for_subscribers(&fixture, 2).await;
    wait_for_presence(&fixture, fixture.guest, true).await;

    fixture
        .rooms
        .kick(KickMemberRequest {
            owner_id: fixture.owner,
            chat_room_id: fixture.room.id,
            target_user_id: fixture.guest,
        })
        .await
        .expect("kick succeeds");

    let revoked = next_text_frame(&mut owner).await;
    assert_eq!(revoked["type"], "REVOKED");
    assert_eq!(revoked["userId"], fixture.guest.to_string());

    let reason = close_reason_without_text(&mut guest)
        .await
        .expect("close reason");
    assert_eq!(reason.code, CloseCode::Policy);
    assert_eq!(reason.description.as_deref(), Some("membership revoked"));
    wait_for_presence(&fixture, fixture.guest, false).await;

    fixture
        .messages
        .send(SendMessageRequest {
            chat_room_id: fixture.room.id,
            sender_id: fixture.owner,
            content: "still there?".to_owned(),
        })
        .await
        .expect("owner sends");
    let after = tokio::time::timeout(Duration::from_millis(200), guest.next()).await;
    assert!(
        !matches!(after, Ok(Some(Ok(Frame::Text(_))))),
        "removed member received a frame: {after:?}"
    );
    fixture.server.stop(true).await;
}

#[rstest]
#[actix_rt::test]
async fn dissolving_the_room_disconnects_every_member() {
    let fixture = start().await;
    let mut guest = connect(&fixture, fixture.guest).await.expect("guest connects");
    wait_for_subscribers(&fixture, 1).await;

    fixture
        .rooms
        .leave(LeaveChatRoomRequest {
            user_id: fixture.owner,
            chat_room_id: fixture.room.id,
        })
        .await
        .expect("owner leaves");

    let reason = close_reason_without_text(&mut guest)
        .await
        .expect("close reason");
    assert_eq!(reason.code, CloseCode::Away);
    assert_eq!(reason.description.as_deref(), Some("room closed"));
    wait_for_presence(&fixture, fixture.guest, false).await;
    fixture.server.stop(true).await;
}
