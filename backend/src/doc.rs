//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! document for the REST API. It registers:
//!
//! - **Paths**: every HTTP endpoint from the inbound layer (enrollments, chat
//!   rooms, messages, internal cleanup, health) and the room WebSocket upgrade
//! - **Schemas**: request and response bodies plus the domain error wrappers
//!   ([`ErrorSchema`], [`ErrorCodeSchema`])
//! - **Security**: the gateway-forwarded `X-User-Id` header
//!
//! The generated document is used by Swagger UI (debug builds) and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use crate::inbound::http::chat_messages::{MessageBody, SendMessageBody, UnreadCountBody};
use crate::inbound::http::chat_rooms::{
    ChatRoomBody, NotificationSettingBody, RoomImageBody, RoomOverviewBody,
};
use crate::inbound::http::enrollments::{
    EnrollmentBody, EnrollmentCreatedBody, EnrollmentDecisionBody, NewEnrollmentCountBody,
    RequestEnrollmentBody,
};
use crate::inbound::http::internal::DeletedMessagesBody;
use crate::inbound::http::pages::PageLinksBody;
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the caller header security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "UserIdHeader",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "X-User-Id",
                "Authenticated user id forwarded by the upstream gateway.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Companion backend API",
        description = "Companion boards: enrollments, chat rooms, messages and health checks."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("UserIdHeader" = [])),
    paths(
        crate::inbound::http::enrollments::request_enrollment,
        crate::inbound::http::enrollments::cancel_enrollment,
        crate::inbound::http::enrollments::accept_enrollment,
        crate::inbound::http::enrollments::reject_enrollment,
        crate::inbound::http::enrollments::list_sent_enrollments,
        crate::inbound::http::enrollments::list_received_enrollments,
        crate::inbound::http::enrollments::count_new_enrollments,
        crate::inbound::http::enrollments::list_board_enrollments,
        crate::inbound::http::chat_rooms::create_chat_room,
        crate::inbound::http::chat_rooms::list_chat_rooms,
        crate::inbound::http::chat_rooms::get_chat_room,
        crate::inbound::http::chat_rooms::leave_chat_room,
        crate::inbound::http::chat_rooms::kick_member,
        crate::inbound::http::chat_rooms::update_room_image,
        crate::inbound::http::chat_rooms::update_notification_setting,
        crate::inbound::http::chat_messages::send_message,
        crate::inbound::http::chat_messages::list_messages,
        crate::inbound::http::chat_messages::mark_read,
        crate::inbound::http::chat_messages::unread_count,
        crate::inbound::http::internal::delete_all_messages,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
        crate::inbound::ws::ws_entry,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        RequestEnrollmentBody,
        EnrollmentCreatedBody,
        EnrollmentBody,
        EnrollmentDecisionBody,
        NewEnrollmentCountBody,
        ChatRoomBody,
        RoomOverviewBody,
        RoomImageBody,
        NotificationSettingBody,
        SendMessageBody,
        MessageBody,
        UnreadCountBody,
        DeletedMessagesBody,
        PageLinksBody,
    )),
    tags(
        (name = "enrollments", description = "Requests to join a board"),
        (name = "chat-rooms", description = "Board chat rooms and membership"),
        (name = "messages", description = "Chat history and read state"),
        (name = "internal", description = "Maintenance endpoints for scheduled jobs"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
