//! Tests for chat room HTTP handlers.

use super::*;
use crate::domain::{Error, MAX_IMAGE_BYTES};
use crate::inbound::http::test_utils::{CALLER, MockPorts, caller_header};
use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use chrono::TimeZone;
use rstest::rstest;
use serde_json::Value;

const BOARD: &str = "22222222-2222-4222-8222-222222222222";
const ROOM: &str = "44444444-4444-4444-8444-444444444444";
const GUEST: &str = "55555555-5555-4555-8555-555555555555";

fn caller() -> UserId {
    CALLER.parse().expect("caller id")
}

fn room_id() -> ChatRoomId {
    ROOM.parse().expect("room id")
}

fn sample_room() -> ChatRoom {
    let created_at = Utc
        .with_ymd_and_hms(2026, 3, 14, 19, 0, 0)
        .single()
        .expect("timestamp");
    ChatRoom {
        id: room_id(),
        board_id: BOARD.parse().expect("board id"),
        participant_count: 1,
        image_url: None,
        last_message_at: None,
        last_message_content: None,
        created_at,
        deleted_at: None,
    }
}

fn sample_overview(unread_count: u64) -> RoomOverview {
    let mut room = sample_room();
    room.participant_count = 3;
    room.last_message_at = Some(room.created_at);
    room.last_message_content = Some("see you at 8".to_owned());
    RoomOverview {
        room,
        board_title: "Jazz night".to_owned(),
        is_owner: true,
        notifications_enabled: false,
        unread_count,
    }
}

async fn call(ports: MockPorts, req: actix_test::TestRequest) -> (StatusCode, Value) {
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(ports.into_state()))
            .app_data(web::PayloadConfig::new(MAX_IMAGE_BYTES + 1))
            .service(
                web::scope("/api/v1")
                    .service(create_chat_room)
                    .service(list_chat_rooms)
                    .service(get_chat_room)
                    .service(leave_chat_room)
                    .service(kick_member)
                    .service(update_room_image)
                    .service(update_notification_setting),
            ),
    )
    .await;
    let res = actix_test::call_service(&app, req.to_request()).await;
    let status = res.status();
    let body = actix_test::read_body(res).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("json body")
    };
    (status, value)
}

#[rstest]
#[actix_rt::test]
async fn create_opens_the_room() {
    let mut ports = MockPorts::default();
    ports
        .chat_rooms
        .expect_create_room_for_board()
        .withf(|request| request.owner_id == caller() && request.board_id.to_string() == BOARD)
        .times(1)
        .returning(|_| Ok(sample_room()));

    let (status, body) = call(
        ports,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/boards/{BOARD}/chat-room"))
            .insert_header(caller_header()),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], ROOM);
    assert_eq!(body["participantCount"], 1);
    assert!(body.get("imageUrl").is_none());
}

#[rstest]
#[actix_rt::test]
async fn a_second_room_for_the_board_conflicts() {
    let mut ports = MockPorts::default();
    ports
        .chat_rooms
        .expect_create_room_for_board()
        .times(1)
        .returning(|_| Err(Error::conflict("board already has a chat room")));

    let (status, body) = call(
        ports,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/boards/{BOARD}/chat-room"))
            .insert_header(caller_header()),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[rstest]
#[actix_rt::test]
async fn listing_renders_overviews_with_unread_counts() {
    let mut ports = MockPorts::default();
    ports
        .chat_rooms_query
        .expect_list_rooms()
        .withf(|user| *user == caller())
        .times(1)
        .returning(|_| Ok(vec![sample_overview(4)]));

    let (status, body) = call(
        ports,
        actix_test::TestRequest::get()
            .uri("/api/v1/chat-rooms")
            .insert_header(caller_header()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let first = &body[0];
    assert_eq!(first["chatRoomId"], ROOM);
    assert_eq!(first["boardTitle"], "Jazz night");
    assert_eq!(first["unreadCount"], 4);
    assert_eq!(first["isOwner"], true);
    assert_eq!(first["notificationsEnabled"], false);
    assert_eq!(first["lastMessageContent"], "see you at 8");
}

#[rstest]
#[case::outsider(Error::forbidden("not a participant"), StatusCode::FORBIDDEN)]
#[case::missing(Error::not_found("chat room not found"), StatusCode::NOT_FOUND)]
#[actix_rt::test]
async fn get_room_surfaces_access_errors(#[case] error: Error, #[case] expected: StatusCode) {
    let mut ports = MockPorts::default();
    ports
        .chat_rooms_query
        .expect_get_room()
        .times(1)
        .returning(move |_, _| Err(error.clone()));

    let (status, _) = call(
        ports,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/chat-rooms/{ROOM}"))
            .insert_header(caller_header()),
    )
    .await;

    assert_eq!(status, expected);
}

#[rstest]
#[actix_rt::test]
async fn leave_returns_no_content() {
    let mut ports = MockPorts::default();
    ports
        .chat_rooms
        .expect_leave()
        .withf(|request| request.user_id == caller() && request.chat_room_id == room_id())
        .times(1)
        .returning(|_| Ok(()));

    let (status, _) = call(
        ports,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/chat-rooms/{ROOM}/membership"))
            .insert_header(caller_header()),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[rstest]
#[actix_rt::test]
async fn kick_targets_the_path_user() {
    let mut ports = MockPorts::default();
    ports
        .chat_rooms
        .expect_kick()
        .withf(|request| {
            request.owner_id == caller()
                && request.chat_room_id == room_id()
                && request.target_user_id.to_string() == GUEST
        })
        .times(1)
        .returning(|_| Ok(()));

    let (status, _) = call(
        ports,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/chat-rooms/{ROOM}/members/{GUEST}"))
            .insert_header(caller_header()),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[rstest]
#[actix_rt::test]
async fn kick_rejects_malformed_user_ids() {
    let mut ports = MockPorts::default();
    ports.chat_rooms.expect_kick().never();

    let (status, body) = call(
        ports,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/chat-rooms/{ROOM}/members/guest"))
            .insert_header(caller_header()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "userId");
}

#[rstest]
#[actix_rt::test]
async fn image_upload_forwards_bytes_and_content_type() {
    let mut ports = MockPorts::default();
    ports
        .chat_rooms
        .expect_update_room_image()
        .withf(|request| {
            request.owner_id == caller()
                && request.bytes == b"\x89PNG".to_vec()
                && request.content_type == "image/png"
        })
        .times(1)
        .returning(|_| Ok("http://cdn.test/rooms/abc.png".to_owned()));

    let (status, body) = call(
        ports,
        actix_test::TestRequest::put()
            .uri(&format!("/api/v1/chat-rooms/{ROOM}/image"))
            .insert_header(caller_header())
            .insert_header((header::CONTENT_TYPE, "image/png"))
            .set_payload(&b"\x89PNG"[..]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imageUrl"], "http://cdn.test/rooms/abc.png");
}

#[rstest]
#[actix_rt::test]
async fn image_upload_requires_a_content_type() {
    let mut ports = MockPorts::default();
    ports.chat_rooms.expect_update_room_image().never();

    let (status, body) = call(
        ports,
        actix_test::TestRequest::put()
            .uri(&format!("/api/v1/chat-rooms/{ROOM}/image"))
            .insert_header(caller_header())
            .set_payload(&b"raw"[..]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["code"], "missing_content_type");
}

#[rstest]
#[case(true)]
#[case(false)]
#[actix_rt::test]
async fn notification_setting_is_forwarded(#[case] enabled: bool) {
    let mut ports = MockPorts::default();
    ports
        .chat_rooms
        .expect_update_notification_setting()
        .withf(move |request| request.user_id == caller() && request.enabled == enabled)
        .times(1)
        .returning(|_| Ok(()));

    let (status, _) = call(
        ports,
        actix_test::TestRequest::put()
            .uri(&format!("/api/v1/chat-rooms/{ROOM}/notifications"))
            .insert_header(caller_header())
            .set_json(serde_json::json!({ "enabled": enabled })),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
}
