//! WebSocket inbound adapter for live chat rooms.
//!
//! Responsibilities:
//! - validate upgrade requests (origin allow-list, caller, membership)
//! - hand the connection to a per-room session task
//! - keep WebSocket-specific concerns at the edge of the system

use actix_web::web::{self, Payload};
use actix_web::{
    HttpRequest, HttpResponse, get,
    http::header::{HeaderValue, ORIGIN},
};
use tracing::{error, info, warn};
use url::Url;

use crate::domain::ports::room_topic;
use crate::inbound::http::auth::Caller;
use crate::inbound::http::chat_rooms::chat_room_id;

mod session;

pub mod messages;
pub mod state;

use state::{AllowedOrigins, WsState};

/// Upgrade to a live channel for one chat room.
#[utoipa::path(
    get,
    path = "/ws/chat-rooms/{chatRoomId}",
    params(("chatRoomId" = uuid::Uuid, Path, description = "Chat room")),
    responses(
        (status = 101, description = "Switching protocols"),
        (status = 400, description = "Invalid Origin header or room id"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Origin not allowed or caller not a participant"),
        (status = 404, description = "Room not found")
    ),
    tags = ["chat-rooms"],
    operation_id = "connectChatRoom"
)]
#[get("/ws/chat-rooms/{chat_room_id}")]
pub async fn ws_entry(
    state: web::Data<WsState>,
    req: HttpRequest,
    path: web::Path<String>,
    stream: Payload,
) -> actix_web::Result<HttpResponse> {
    let mut origin_iter = req.headers().get_all(ORIGIN);
    let origin_header = origin_iter.next().ok_or_else(|| {
        error!("Missing Origin header on WebSocket upgrade");
        actix_web::error::ErrorForbidden("Origin not allowed")
    })?;
    if origin_iter.next().is_some() {
        error!("Multiple Origin headers on WebSocket upgrade");
        return Err(actix_web::error::ErrorBadRequest("Invalid Origin header"));
    }
    validate_origin(&state.origins, origin_header)?;

    let caller = Caller::from_headers(&req)?;
    let room_id = chat_room_id(&path.into_inner())?;
    state.rooms.get_room(caller.user_id(), room_id).await?;

    let (response, session, msg_stream) = actix_ws::handle(&req, stream).map_err(|error| {
        error!(error = %error, "WebSocket upgrade failed");
        actix_web::error::ErrorInternalServerError("WebSocket upgrade failed")
    })?;

    let events = state.topics.subscribe(&room_topic(&room_id));
    let seat = session::Seat {
        room_id,
        user_id: caller.user_id(),
    };
    info!(chat_room_id = %room_id, user_id = %seat.user_id, "room websocket opened");
    let state = state.get_ref().clone();
    actix_web::rt::spawn(async move {
        session::handle_ws_session(state, seat, events, session, msg_stream).await;
    });

    Ok(response)
}

fn validate_origin(allowed: &AllowedOrigins, origin_header: &HeaderValue) -> actix_web::Result<()> {
    let origin_value = match origin_header.to_str() {
        Ok(value) => value,
        Err(error) => {
            error!(error = %error, "Failed to parse Origin header as string");
            return Err(actix_web::error::ErrorBadRequest("Invalid Origin header"));
        }
    };

    let origin = Url::parse(origin_value).map_err(|error| {
        error!(error = %error, "Failed to parse Origin header as URL");
        actix_web::error::ErrorBadRequest("Invalid Origin header")
    })?;

    if allowed.allows(&origin) {
        Ok(())
    } else {
        warn!(
            origin = origin_value,
            "Rejected WS upgrade due to disallowed Origin"
        );
        Err(actix_web::error::ErrorForbidden("Origin not allowed"))
    }
}
