//! Enrollment HTTP handlers.
//!
//! ```text
//! POST   /api/v1/boards/{boardId}/enrollments
//! DELETE /api/v1/enrollments/{enrollmentId}
//! POST   /api/v1/enrollments/{enrollmentId}/accept
//! POST   /api/v1/enrollments/{enrollmentId}/reject
//! GET    /api/v1/enrollments/sent
//! GET    /api/v1/enrollments/received
//! GET    /api/v1/enrollments/received/new-count
//! GET    /api/v1/boards/{boardId}/enrollments
//! ```
//!
//! Listing received enrollments clears their "new" flag, so the new-count
//! drops to zero after the owner has paged through them.

use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use chrono::{DateTime, Utc};
use pagination::PageParams;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::ports::{
    CancelEnrollmentRequest, ListBoardEnrollmentsRequest, ListEnrollmentsRequest,
    RequestEnrollmentRequest, RequestEnrollmentResponse, RespondEnrollmentRequest,
    RespondEnrollmentResponse,
};
use crate::domain::{BoardId, Enrollment, EnrollmentId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Caller;
use crate::inbound::http::pages::{PageBody, page_body};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

/// Request body for joining a board.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnrollmentBody {
    /// Introduction shown to the board owner.
    #[serde(default)]
    pub description: String,
}

/// Identifier of a newly created enrollment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentCreatedBody {
    pub enrollment_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<RequestEnrollmentResponse> for EnrollmentCreatedBody {
    fn from(value: RequestEnrollmentResponse) -> Self {
        Self {
            enrollment_id: *value.enrollment_id.as_uuid(),
            created_at: value.created_at,
        }
    }
}

/// Enrollment as shown in sent and received listings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentBody {
    pub id: Uuid,
    pub board_id: Uuid,
    pub applicant_id: Uuid,
    #[schema(example = "PENDING")]
    pub status: String,
    /// True until the owner has listed it once.
    pub is_new: bool,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<Enrollment> for EnrollmentBody {
    fn from(value: Enrollment) -> Self {
        Self {
            id: *value.id.as_uuid(),
            board_id: *value.board_id.as_uuid(),
            applicant_id: *value.applicant_id.as_uuid(),
            status: value.status.as_str().to_owned(),
            is_new: value.is_new,
            description: value.description,
            created_at: value.created_at,
        }
    }
}

/// Outcome of an accept or reject decision.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentDecisionBody {
    pub enrollment_id: Uuid,
    #[schema(example = "ACCEPTED")]
    pub status: String,
    /// Room the applicant joined; present for accepted enrollments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_room_id: Option<Uuid>,
}

impl From<RespondEnrollmentResponse> for EnrollmentDecisionBody {
    fn from(value: RespondEnrollmentResponse) -> Self {
        Self {
            enrollment_id: *value.enrollment_id.as_uuid(),
            status: value.status.as_str().to_owned(),
            chat_room_id: value.chat_room_id.map(|id| *id.as_uuid()),
        }
    }
}

/// Number of enrollments the owner has not listed yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewEnrollmentCountBody {
    pub count: u64,
}

fn board_id(raw: &str) -> ApiResult<BoardId> {
    parse_id(raw, FieldName::new("boardId"))
}

fn enrollment_id(raw: &str) -> ApiResult<EnrollmentId> {
    parse_id(raw, FieldName::new("enrollmentId"))
}

/// Ask to join a recruiting board.
#[utoipa::path(
    post,
    path = "/api/v1/boards/{boardId}/enrollments",
    params(("boardId" = Uuid, Path, description = "Board to join")),
    request_body = RequestEnrollmentBody,
    responses(
        (status = 201, description = "Enrollment created", body = EnrollmentCreatedBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Caller owns the board", body = ErrorSchema),
        (status = 404, description = "Board not found", body = ErrorSchema),
        (status = 409, description = "Board closed or already enrolled", body = ErrorSchema)
    ),
    tags = ["enrollments"],
    operation_id = "requestEnrollment"
)]
#[post("/boards/{board_id}/enrollments")]
pub async fn request_enrollment(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
    payload: web::Json<RequestEnrollmentBody>,
) -> ApiResult<HttpResponse> {
    let board_id = board_id(&path.into_inner())?;
    let response = state
        .enrollments
        .request(RequestEnrollmentRequest {
            applicant_id: caller.user_id(),
            board_id,
            description: payload.into_inner().description,
        })
        .await?;
    Ok(HttpResponse::Created().json(EnrollmentCreatedBody::from(response)))
}

/// Withdraw a pending enrollment.
#[utoipa::path(
    delete,
    path = "/api/v1/enrollments/{enrollmentId}",
    params(("enrollmentId" = Uuid, Path, description = "Enrollment to withdraw")),
    responses(
        (status = 204, description = "Enrollment withdrawn"),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Caller is not the applicant", body = ErrorSchema),
        (status = 404, description = "Enrollment not found", body = ErrorSchema),
        (status = 409, description = "Enrollment already decided", body = ErrorSchema)
    ),
    tags = ["enrollments"],
    operation_id = "cancelEnrollment"
)]
#[delete("/enrollments/{enrollment_id}")]
pub async fn cancel_enrollment(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let enrollment_id = enrollment_id(&path.into_inner())?;
    state
        .enrollments
        .cancel(CancelEnrollmentRequest {
            applicant_id: caller.user_id(),
            enrollment_id,
        })
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Accept a pending enrollment and seat the applicant in the board's room.
#[utoipa::path(
    post,
    path = "/api/v1/enrollments/{enrollmentId}/accept",
    params(("enrollmentId" = Uuid, Path, description = "Enrollment to accept")),
    responses(
        (status = 200, description = "Enrollment accepted", body = EnrollmentDecisionBody),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Caller does not own the board", body = ErrorSchema),
        (status = 404, description = "Enrollment not found", body = ErrorSchema),
        (status = 409, description = "Already decided or board full", body = ErrorSchema)
    ),
    tags = ["enrollments"],
    operation_id = "acceptEnrollment"
)]
#[post("/enrollments/{enrollment_id}/accept")]
pub async fn accept_enrollment(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<web::Json<EnrollmentDecisionBody>> {
    let enrollment_id = enrollment_id(&path.into_inner())?;
    let response = state
        .enrollments
        .accept(RespondEnrollmentRequest {
            owner_id: caller.user_id(),
            enrollment_id,
        })
        .await?;
    Ok(web::Json(response.into()))
}

/// Reject a pending enrollment.
#[utoipa::path(
    post,
    path = "/api/v1/enrollments/{enrollmentId}/reject",
    params(("enrollmentId" = Uuid, Path, description = "Enrollment to reject")),
    responses(
        (status = 200, description = "Enrollment rejected", body = EnrollmentDecisionBody),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Caller does not own the board", body = ErrorSchema),
        (status = 404, description = "Enrollment not found", body = ErrorSchema),
        (status = 409, description = "Enrollment already decided", body = ErrorSchema)
    ),
    tags = ["enrollments"],
    operation_id = "rejectEnrollment"
)]
#[post("/enrollments/{enrollment_id}/reject")]
pub async fn reject_enrollment(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<web::Json<EnrollmentDecisionBody>> {
    let enrollment_id = enrollment_id(&path.into_inner())?;
    let response = state
        .enrollments
        .reject(RespondEnrollmentRequest {
            owner_id: caller.user_id(),
            enrollment_id,
        })
        .await?;
    Ok(web::Json(response.into()))
}

/// Pending enrollments the caller has sent.
#[utoipa::path(
    get,
    path = "/api/v1/enrollments/sent",
    params(
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page"),
        ("limit" = Option<usize>, Query, description = "Page size, 1 to 100")
    ),
    responses(
        (status = 200, description = "Sent enrollments", body = PageBody<EnrollmentBody>),
        (status = 400, description = "Malformed cursor", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema)
    ),
    tags = ["enrollments"],
    operation_id = "listSentEnrollments"
)]
#[get("/enrollments/sent")]
pub async fn list_sent_enrollments(
    state: web::Data<HttpState>,
    caller: Caller,
    req: HttpRequest,
    query: web::Query<PageParams>,
) -> ApiResult<web::Json<PageBody<EnrollmentBody>>> {
    let params = query.into_inner();
    let page = state
        .enrollments_query
        .list_sent(ListEnrollmentsRequest {
            user_id: caller.user_id(),
            page: params.clone(),
        })
        .await?;
    Ok(web::Json(page_body(&req, &params, page, EnrollmentBody::from)))
}

/// Pending enrollments on any of the caller's boards.
#[utoipa::path(
    get,
    path = "/api/v1/enrollments/received",
    params(
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page"),
        ("limit" = Option<usize>, Query, description = "Page size, 1 to 100")
    ),
    responses(
        (status = 200, description = "Received enrollments", body = PageBody<EnrollmentBody>),
        (status = 400, description = "Malformed cursor", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema)
    ),
    tags = ["enrollments"],
    operation_id = "listReceivedEnrollments"
)]
#[get("/enrollments/received")]
pub async fn list_received_enrollments(
    state: web::Data<HttpState>,
    caller: Caller,
    req: HttpRequest,
    query: web::Query<PageParams>,
) -> ApiResult<web::Json<PageBody<EnrollmentBody>>> {
    let params = query.into_inner();
    let page = state
        .enrollments_query
        .list_received_for_owner(ListEnrollmentsRequest {
            user_id: caller.user_id(),
            page: params.clone(),
        })
        .await?;
    Ok(web::Json(page_body(&req, &params, page, EnrollmentBody::from)))
}

/// Number of received enrollments the caller has not listed yet.
#[utoipa::path(
    get,
    path = "/api/v1/enrollments/received/new-count",
    responses(
        (status = 200, description = "Unseen enrollment count", body = NewEnrollmentCountBody),
        (status = 401, description = "Unauthorized", body = ErrorSchema)
    ),
    tags = ["enrollments"],
    operation_id = "countNewEnrollments"
)]
#[get("/enrollments/received/new-count")]
pub async fn count_new_enrollments(
    state: web::Data<HttpState>,
    caller: Caller,
) -> ApiResult<web::Json<NewEnrollmentCountBody>> {
    let count = state.enrollments_query.count_new(caller.user_id()).await?;
    Ok(web::Json(NewEnrollmentCountBody { count }))
}

/// Pending enrollments on one of the caller's boards.
#[utoipa::path(
    get,
    path = "/api/v1/boards/{boardId}/enrollments",
    params(
        ("boardId" = Uuid, Path, description = "Board owned by the caller"),
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page"),
        ("limit" = Option<usize>, Query, description = "Page size, 1 to 100")
    ),
    responses(
        (status = 200, description = "Board enrollments", body = PageBody<EnrollmentBody>),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Caller does not own the board", body = ErrorSchema),
        (status = 404, description = "Board not found", body = ErrorSchema)
    ),
    tags = ["enrollments"],
    operation_id = "listBoardEnrollments"
)]
#[get("/boards/{board_id}/enrollments")]
pub async fn list_board_enrollments(
    state: web::Data<HttpState>,
    caller: Caller,
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<PageParams>,
) -> ApiResult<web::Json<PageBody<EnrollmentBody>>> {
    let board_id = board_id(&path.into_inner())?;
    let params = query.into_inner();
    let page = state
        .enrollments_query
        .list_received_for_board(ListBoardEnrollmentsRequest {
            owner_id: caller.user_id(),
            board_id,
            page: params.clone(),
        })
        .await?;
    Ok(web::Json(page_body(&req, &params, page, EnrollmentBody::from)))
}

#[cfg(test)]
#[path = "enrollments_tests.rs"]
mod tests;
