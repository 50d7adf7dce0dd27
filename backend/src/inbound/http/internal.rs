//! Internal endpoints for scheduled maintenance jobs.
//!
//! These routes are not exposed through the public gateway and carry no
//! caller identity.

use actix_web::{delete, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::inbound::http::ApiResult;
use crate::inbound::http::chat_rooms::chat_room_id;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Number of messages removed from a room's log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletedMessagesBody {
    pub deleted_count: u64,
}

/// Drop a room's whole message log.
#[utoipa::path(
    delete,
    path = "/internal/chat-rooms/{chatRoomId}/messages",
    params(("chatRoomId" = Uuid, Path, description = "Chat room")),
    responses(
        (status = 200, description = "Messages deleted", body = DeletedMessagesBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 503, description = "Message log unavailable", body = ErrorSchema)
    ),
    tags = ["internal"],
    operation_id = "deleteAllMessages",
    security([])
)]
#[delete("/chat-rooms/{chat_room_id}/messages")]
pub async fn delete_all_messages(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<DeletedMessagesBody>> {
    let room_id = chat_room_id(&path.into_inner())?;
    let deleted_count = state.messages.delete_all_messages(room_id).await?;
    info!(chat_room_id = %room_id, deleted_count, "room message log cleared");
    Ok(web::Json(DeletedMessagesBody { deleted_count }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::MockPorts;
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use rstest::rstest;

    const ROOM: &str = "44444444-4444-4444-8444-444444444444";

    #[rstest]
    #[actix_rt::test]
    async fn reports_the_deleted_count_without_a_caller() {
        let mut ports = MockPorts::default();
        ports
            .messages
            .expect_delete_all_messages()
            .withf(|room| room.to_string() == ROOM)
            .times(1)
            .returning(|_| Ok(12));
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(ports.into_state()))
                .service(web::scope("/internal").service(delete_all_messages)),
        )
        .await;

        let req = actix_test::TestRequest::delete()
            .uri(&format!("/internal/chat-rooms/{ROOM}/messages"))
            .to_request();
        let res = actix_test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        let body: DeletedMessagesBody = actix_test::read_body_json(res).await;
        assert_eq!(body.deleted_count, 12);
    }
}
