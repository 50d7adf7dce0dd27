//! Chat message HTTP handlers.
//!
//! Reading a page of messages moves the caller's read marker, mirroring what
//! the mobile clients expect when a room is opened.

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use pagination::PageParams;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Message;
use crate::domain::ports::{ListMessagesRequest, SendMessageRequest};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Caller;
use crate::inbound::http::chat_rooms::chat_room_id;
use crate::inbound::http::pages::{PageBody, page_body};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Request body for posting a message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    pub content: String,
}

/// A logged message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    pub id: Uuid,
    pub chat_room_id: Uuid,
    /// Absent for date dividers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<Uuid>,
    pub content: String,
    /// TALK, ENTER, LEAVE or DATE_DIVIDER.
    #[serde(rename = "type")]
    #[schema(example = "TALK")]
    pub message_type: String,
    pub sent_at: DateTime<Utc>,
}

impl From<Message> for MessageBody {
    fn from(value: Message) -> Self {
        Self {
            id: *value.id.as_uuid(),
            chat_room_id: *value.chat_room_id.as_uuid(),
            sender_id: value.sender_id.map(|id| *id.as_uuid()),
            content: value.content,
            message_type: value.message_type.as_str().to_owned(),
            sent_at: value.sent_at,
        }
    }
}

/// Unread message count for one room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountBody {
    pub count: u64,
}

/// Post a message to a room.
#[utoipa::path(
    post,
    path = "/api/v1/chat-rooms/{chatRoomId}/messages",
    params(("chatRoomId" = Uuid, Path, description = "Chat room")),
    request_body = SendMessageBody,
    responses(
        (status = 201, description = "Message logged and broadcast", body = MessageBody),
        (status = 400, description = "Blank or oversized message", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Caller is not a participant", body = ErrorSchema),
        (status = 503, description = "Message log unavailable", body = ErrorSchema)
    ),
    tags = ["messages"],
    operation_id = "sendMessage"
)]
#[post("/chat-rooms/{chat_room_id}/messages")]
pub async fn send_message(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
    payload: web::Json<SendMessageBody>,
) -> ApiResult<HttpResponse> {
    let room_id = chat_room_id(&path.into_inner())?;
    let message = state
        .messages
        .send(SendMessageRequest {
            chat_room_id: room_id,
            sender_id: caller.user_id(),
            content: payload.into_inner().content,
        })
        .await?;
    Ok(HttpResponse::Created().json(MessageBody::from(message)))
}

/// Messages newest first. Marks the room as read for the caller.
#[utoipa::path(
    get,
    path = "/api/v1/chat-rooms/{chatRoomId}/messages",
    params(
        ("chatRoomId" = Uuid, Path, description = "Chat room"),
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page"),
        ("limit" = Option<usize>, Query, description = "Page size, 1 to 100")
    ),
    responses(
        (status = 200, description = "Messages", body = PageBody<MessageBody>),
        (status = 400, description = "Malformed cursor", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Caller is not a participant", body = ErrorSchema)
    ),
    tags = ["messages"],
    operation_id = "listMessages"
)]
#[get("/chat-rooms/{chat_room_id}/messages")]
pub async fn list_messages(
    state: web::Data<HttpState>,
    caller: Caller,
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<PageParams>,
) -> ApiResult<web::Json<PageBody<MessageBody>>> {
    let room_id = chat_room_id(&path.into_inner())?;
    let params = query.into_inner();
    let page = state
        .messages_query
        .list(ListMessagesRequest {
            user_id: caller.user_id(),
            chat_room_id: room_id,
            page: params.clone(),
        })
        .await?;
    Ok(web::Json(page_body(&req, &params, page, MessageBody::from)))
}

/// Move the caller's read marker to now.
#[utoipa::path(
    post,
    path = "/api/v1/chat-rooms/{chatRoomId}/read",
    params(("chatRoomId" = Uuid, Path, description = "Chat room")),
    responses(
        (status = 204, description = "Room marked as read"),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Caller is not a participant", body = ErrorSchema)
    ),
    tags = ["messages"],
    operation_id = "markRoomRead"
)]
#[post("/chat-rooms/{chat_room_id}/read")]
pub async fn mark_read(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let room_id = chat_room_id(&path.into_inner())?;
    state.messages.mark_read(caller.user_id(), room_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Talk messages from others since the caller last read the room.
#[utoipa::path(
    get,
    path = "/api/v1/chat-rooms/{chatRoomId}/unread-count",
    params(("chatRoomId" = Uuid, Path, description = "Chat room")),
    responses(
        (status = 200, description = "Unread count", body = UnreadCountBody),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Caller is not a participant", body = ErrorSchema)
    ),
    tags = ["messages"],
    operation_id = "unreadCount"
)]
#[get("/chat-rooms/{chat_room_id}/unread-count")]
pub async fn unread_count(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<web::Json<UnreadCountBody>> {
    let room_id = chat_room_id(&path.into_inner())?;
    let count = state
        .messages_query
        .unread_count(caller.user_id(), room_id)
        .await?;
    Ok(web::Json(UnreadCountBody { count }))
}

#[cfg(test)]
#[path = "chat_messages_tests.rs"]
mod tests;
