//! Chat room HTTP handlers.
//!
//! ```text
//! POST   /api/v1/boards/{boardId}/chat-room
//! GET    /api/v1/chat-rooms
//! GET    /api/v1/chat-rooms/{chatRoomId}
//! DELETE /api/v1/chat-rooms/{chatRoomId}/membership
//! DELETE /api/v1/chat-rooms/{chatRoomId}/members/{userId}
//! PUT    /api/v1/chat-rooms/{chatRoomId}/image
//! PUT    /api/v1/chat-rooms/{chatRoomId}/notifications
//! ```

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::ports::{
    CreateChatRoomRequest, KickMemberRequest, LeaveChatRoomRequest,
    UpdateNotificationSettingRequest, UpdateRoomImageRequest,
};
use crate::domain::{BoardId, ChatRoom, ChatRoomId, RoomOverview, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Caller;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_content_type_error, parse_id};

/// A freshly opened chat room.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoomBody {
    pub id: Uuid,
    pub board_id: Uuid,
    pub participant_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ChatRoom> for ChatRoomBody {
    fn from(value: ChatRoom) -> Self {
        Self {
            id: *value.id.as_uuid(),
            board_id: *value.board_id.as_uuid(),
            participant_count: value.participant_count,
            image_url: value.image_url,
            created_at: value.created_at,
        }
    }
}

/// A room as seen by one participant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomOverviewBody {
    pub chat_room_id: Uuid,
    pub board_id: Uuid,
    pub board_title: String,
    pub participant_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_content: Option<String>,
    /// Whether the caller owns the room's board.
    pub is_owner: bool,
    pub notifications_enabled: bool,
    /// Talk messages from others since the caller last read the room.
    pub unread_count: u64,
    pub created_at: DateTime<Utc>,
}

impl From<RoomOverview> for RoomOverviewBody {
    fn from(value: RoomOverview) -> Self {
        let RoomOverview {
            room,
            board_title,
            is_owner,
            notifications_enabled,
            unread_count,
        } = value;
        Self {
            chat_room_id: *room.id.as_uuid(),
            board_id: *room.board_id.as_uuid(),
            board_title,
            participant_count: room.participant_count,
            image_url: room.image_url,
            last_message_at: room.last_message_at,
            last_message_content: room.last_message_content,
            is_owner,
            notifications_enabled,
            unread_count,
            created_at: room.created_at,
        }
    }
}

/// Location of an uploaded room image.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomImageBody {
    pub image_url: String,
}

/// Push preference for one membership.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettingBody {
    pub enabled: bool,
}

pub(crate) fn chat_room_id(raw: &str) -> ApiResult<ChatRoomId> {
    parse_id(raw, FieldName::new("chatRoomId"))
}

/// Complete a board and open its chat room with the owner inside.
#[utoipa::path(
    post,
    path = "/api/v1/boards/{boardId}/chat-room",
    params(("boardId" = Uuid, Path, description = "Board owned by the caller")),
    responses(
        (status = 201, description = "Chat room opened", body = ChatRoomBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Caller does not own the board", body = ErrorSchema),
        (status = 404, description = "Board not found", body = ErrorSchema),
        (status = 409, description = "Board already has a room", body = ErrorSchema)
    ),
    tags = ["chat-rooms"],
    operation_id = "createChatRoom"
)]
#[post("/boards/{board_id}/chat-room")]
pub async fn create_chat_room(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let board_id: BoardId = parse_id(&path.into_inner(), FieldName::new("boardId"))?;
    let room = state
        .chat_rooms
        .create_room_for_board(CreateChatRoomRequest {
            owner_id: caller.user_id(),
            board_id,
        })
        .await?;
    Ok(HttpResponse::Created().json(ChatRoomBody::from(room)))
}

/// Rooms the caller participates in, most recently active first.
#[utoipa::path(
    get,
    path = "/api/v1/chat-rooms",
    responses(
        (status = 200, description = "Caller's rooms", body = [RoomOverviewBody]),
        (status = 401, description = "Unauthorized", body = ErrorSchema)
    ),
    tags = ["chat-rooms"],
    operation_id = "listChatRooms"
)]
#[get("/chat-rooms")]
pub async fn list_chat_rooms(
    state: web::Data<HttpState>,
    caller: Caller,
) -> ApiResult<web::Json<Vec<RoomOverviewBody>>> {
    let rooms = state.chat_rooms_query.list_rooms(caller.user_id()).await?;
    Ok(web::Json(rooms.into_iter().map(Into::into).collect()))
}

/// One room the caller participates in.
#[utoipa::path(
    get,
    path = "/api/v1/chat-rooms/{chatRoomId}",
    params(("chatRoomId" = Uuid, Path, description = "Chat room")),
    responses(
        (status = 200, description = "Room overview", body = RoomOverviewBody),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Caller is not a participant", body = ErrorSchema),
        (status = 404, description = "Room not found", body = ErrorSchema)
    ),
    tags = ["chat-rooms"],
    operation_id = "getChatRoom"
)]
#[get("/chat-rooms/{chat_room_id}")]
pub async fn get_chat_room(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<web::Json<RoomOverviewBody>> {
    let room_id = chat_room_id(&path.into_inner())?;
    let overview = state
        .chat_rooms_query
        .get_room(caller.user_id(), room_id)
        .await?;
    Ok(web::Json(overview.into()))
}

/// Leave a room. An owner leaving closes the board and the room.
#[utoipa::path(
    delete,
    path = "/api/v1/chat-rooms/{chatRoomId}/membership",
    params(("chatRoomId" = Uuid, Path, description = "Chat room to leave")),
    responses(
        (status = 204, description = "Left the room"),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Caller is not a participant", body = ErrorSchema),
        (status = 404, description = "Room not found", body = ErrorSchema)
    ),
    tags = ["chat-rooms"],
    operation_id = "leaveChatRoom"
)]
#[delete("/chat-rooms/{chat_room_id}/membership")]
pub async fn leave_chat_room(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let room_id = chat_room_id(&path.into_inner())?;
    state
        .chat_rooms
        .leave(LeaveChatRoomRequest {
            user_id: caller.user_id(),
            chat_room_id: room_id,
        })
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Remove a participant on the owner's behalf.
#[utoipa::path(
    delete,
    path = "/api/v1/chat-rooms/{chatRoomId}/members/{userId}",
    params(
        ("chatRoomId" = Uuid, Path, description = "Chat room"),
        ("userId" = Uuid, Path, description = "Participant to remove")
    ),
    responses(
        (status = 204, description = "Participant removed"),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Caller does not own the board", body = ErrorSchema),
        (status = 404, description = "Room or participant not found", body = ErrorSchema),
        (status = 409, description = "Owner cannot remove themselves", body = ErrorSchema)
    ),
    tags = ["chat-rooms"],
    operation_id = "kickChatRoomMember"
)]
#[delete("/chat-rooms/{chat_room_id}/members/{user_id}")]
pub async fn kick_member(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (raw_room, raw_user) = path.into_inner();
    let room_id = chat_room_id(&raw_room)?;
    let target: UserId = parse_id(&raw_user, FieldName::new("userId"))?;
    state
        .chat_rooms
        .kick(KickMemberRequest {
            owner_id: caller.user_id(),
            chat_room_id: room_id,
            target_user_id: target,
        })
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Replace the room image. The body is the raw image.
#[utoipa::path(
    put,
    path = "/api/v1/chat-rooms/{chatRoomId}/image",
    params(("chatRoomId" = Uuid, Path, description = "Chat room")),
    request_body(content = Vec<u8>, content_type = "image/*", description = "Raw image bytes"),
    responses(
        (status = 200, description = "Image stored", body = RoomImageBody),
        (status = 400, description = "Missing content type, empty or oversized image", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Caller does not own the board", body = ErrorSchema),
        (status = 404, description = "Room not found", body = ErrorSchema),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["chat-rooms"],
    operation_id = "updateChatRoomImage"
)]
#[put("/chat-rooms/{chat_room_id}/image")]
pub async fn update_room_image(
    state: web::Data<HttpState>,
    caller: Caller,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Bytes,
) -> ApiResult<web::Json<RoomImageBody>> {
    let room_id = chat_room_id(&path.into_inner())?;
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(missing_content_type_error)?
        .to_owned();
    let image_url = state
        .chat_rooms
        .update_room_image(UpdateRoomImageRequest {
            owner_id: caller.user_id(),
            chat_room_id: room_id,
            bytes: body.to_vec(),
            content_type,
        })
        .await?;
    Ok(web::Json(RoomImageBody { image_url }))
}

/// Toggle push notifications for the caller's membership.
#[utoipa::path(
    put,
    path = "/api/v1/chat-rooms/{chatRoomId}/notifications",
    params(("chatRoomId" = Uuid, Path, description = "Chat room")),
    request_body = NotificationSettingBody,
    responses(
        (status = 204, description = "Preference stored"),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Caller is not a participant", body = ErrorSchema)
    ),
    tags = ["chat-rooms"],
    operation_id = "updateChatRoomNotifications"
)]
#[put("/chat-rooms/{chat_room_id}/notifications")]
pub async fn update_notification_setting(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
    payload: web::Json<NotificationSettingBody>,
) -> ApiResult<HttpResponse> {
    let room_id = chat_room_id(&path.into_inner())?;
    state
        .chat_rooms
        .update_notification_setting(UpdateNotificationSettingRequest {
            user_id: caller.user_id(),
            chat_room_id: room_id,
            enabled: payload.enabled,
        })
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
#[path = "chat_rooms_tests.rs"]
mod tests;
