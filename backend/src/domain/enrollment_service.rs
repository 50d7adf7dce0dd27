//! Enrollment workflow: request, cancel, accept, reject and the inbox reads.
//!
//! Accept and reject lock the enrollment row first, then the board row, then
//! the room row, and re-read everything through those locks before deciding.
//! Two owners racing on the same enrollment therefore serialise on the
//! enrollment lock (the loser sees "already responded"), and two accepts
//! racing for the last slot of a board serialise on the board lock (the loser
//! sees "board is full").
//!
//! Push notifications and the ENTER system message are sent only after the
//! transaction committed; their failure never undoes the state change.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use pagination::Paginated;
use tracing::{info, warn};

use crate::domain::ports::{
    BoardDirectory, CancelEnrollmentRequest, CompanionPorts, CompanionStore, EnrollmentCommand,
    EnrollmentKey, EnrollmentQuery, EnrollmentRepository, ListBoardEnrollmentsRequest,
    ListEnrollmentsRequest, RequestEnrollmentRequest, RequestEnrollmentResponse,
    RespondEnrollmentRequest, RespondEnrollmentResponse, StoreTransaction, UserDirectory,
};
use crate::domain::service_support::{
    decode_cursor, finish, into_page, map_directory_error, map_enrollment_repository_error,
    map_store_error,
};
use crate::domain::{
    AcceptStatus, Board, CapacityError, ChatRoomId, Enrollment, EnrollmentId, EnrollmentStatus,
    Error, MessageService, MessageType, Notification, NotificationFanout, PushMessage,
    PushPayload, RoomMembership, UserId,
};

/// Longest accepted enrollment introduction, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Enrollment service implementing the enrollment driving ports.
#[derive(Clone)]
pub struct EnrollmentService {
    store: Arc<dyn CompanionStore>,
    enrollments: Arc<dyn EnrollmentRepository>,
    boards: Arc<dyn BoardDirectory>,
    users: Arc<dyn UserDirectory>,
    messages: Arc<MessageService>,
    fanout: NotificationFanout,
    clock: Arc<dyn Clock>,
}

/// Facts gathered inside a decision transaction for the post-commit steps.
struct Decision {
    board: Board,
    enrollment: Enrollment,
    applicant_notice: Notification,
    chat_room_id: Option<ChatRoomId>,
}

impl EnrollmentService {
    /// Build the service from the shared port bundle.
    pub fn new(ports: &CompanionPorts, messages: Arc<MessageService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::clone(&ports.store),
            enrollments: Arc::clone(&ports.enrollments),
            boards: Arc::clone(&ports.boards),
            users: Arc::clone(&ports.users),
            messages,
            fanout: NotificationFanout::new(ports),
            clock,
        }
    }

    async fn applicant_nickname(&self, user_id: &UserId) -> Result<String, Error> {
        self.users
            .find_user(user_id)
            .await
            .map_err(map_directory_error)?
            .map(|user| user.nickname)
            .ok_or_else(|| Error::not_found(format!("user {user_id} not found")))
    }

    async fn record_request(
        &self,
        tx: &mut dyn StoreTransaction,
        request: &RequestEnrollmentRequest,
        nickname: &str,
        now: DateTime<Utc>,
    ) -> Result<(Board, Enrollment, Notification), Error> {
        let board = tx
            .find_board(&request.board_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::not_found(format!("board {} not found", request.board_id)))?;
        if board.is_owned_by(&request.applicant_id) {
            return Err(Error::conflict("cannot enroll in your own board"));
        }
        if tx
            .find_active_enrollment(&board.id, &request.applicant_id)
            .await
            .map_err(map_store_error)?
            .is_some()
        {
            return Err(Error::conflict("an enrollment for this board already exists"));
        }
        if let Some(room) = tx
            .find_room_for_board(&board.id)
            .await
            .map_err(map_store_error)?
        {
            let member = tx
                .find_membership(&room.id, &request.applicant_id)
                .await
                .map_err(map_store_error)?;
            if member.is_some() {
                return Err(Error::conflict("already a participant of this board"));
            }
        }

        let enrollment = Enrollment::request(
            board.id,
            request.applicant_id,
            request.description.trim(),
            now,
        );
        tx.insert_enrollment(&enrollment)
            .await
            .map_err(map_store_error)?;
        let notice = Notification::new_request(&board, &enrollment, nickname, now);
        tx.insert_notification(&notice)
            .await
            .map_err(map_store_error)?;
        Ok((board, enrollment, notice))
    }

    async fn record_cancel(
        &self,
        tx: &mut dyn StoreTransaction,
        request: &CancelEnrollmentRequest,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        let mut enrollment = tx
            .lock_enrollment(&request.enrollment_id)
            .await
            .map_err(map_store_error)?
            .filter(Enrollment::is_active)
            .ok_or_else(|| enrollment_not_found(&request.enrollment_id))?;
        if enrollment.applicant_id != request.applicant_id {
            return Err(Error::forbidden("only the applicant may cancel an enrollment"));
        }
        let mut notice = tx
            .find_notification_for_enrollment(&enrollment.id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| missing_notification(&enrollment.id))?;

        enrollment.withdraw(now);
        tx.save_enrollment(&enrollment)
            .await
            .map_err(map_store_error)?;
        notice.soft_delete(now);
        tx.save_notification(&notice)
            .await
            .map_err(map_store_error)?;
        Ok(())
    }

    async fn record_decision(
        &self,
        tx: &mut dyn StoreTransaction,
        request: &RespondEnrollmentRequest,
        decision: AcceptStatus,
        now: DateTime<Utc>,
    ) -> Result<Decision, Error> {
        let mut enrollment = tx
            .lock_enrollment(&request.enrollment_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| enrollment_not_found(&request.enrollment_id))?;
        let mut board = tx
            .lock_board(&enrollment.board_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::not_found(format!("board {} not found", enrollment.board_id)))?;
        if !board.is_owned_by(&request.owner_id) {
            return Err(Error::forbidden("only the board owner may respond to enrollments"));
        }
        if enrollment.status != EnrollmentStatus::Pending {
            return Err(Error::conflict("enrollment already responded"));
        }
        if !enrollment.is_active() {
            return Err(enrollment_not_found(&enrollment.id));
        }

        let mut admitted = None;
        if decision == AcceptStatus::Accepted {
            board.capacity.try_occupy().map_err(|err| match err {
                CapacityError::Full => Error::conflict("board is full"),
                other => Error::integrity_violation(other.to_string()),
            })?;
            let room_id = tx
                .find_room_for_board(&board.id)
                .await
                .map_err(map_store_error)?
                .map(|room| room.id)
                .ok_or_else(|| Error::not_found("chat room for this board not found"))?;
            let room = tx
                .lock_room(&room_id)
                .await
                .map_err(map_store_error)?
                .ok_or_else(|| Error::not_found("chat room for this board not found"))?;
            admitted = Some(room);
        }

        let mut origin = tx
            .find_notification_for_enrollment(&enrollment.id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| missing_notification(&enrollment.id))?;

        enrollment.respond(decision, now).map_err(|_| Error::conflict("enrollment already responded"))?;
        tx.save_enrollment(&enrollment)
            .await
            .map_err(map_store_error)?;

        if let Some(room) = admitted.as_mut() {
            tx.save_board(&board).await.map_err(map_store_error)?;
            let membership = RoomMembership::join(room.id, enrollment.applicant_id, now);
            tx.insert_membership(&membership)
                .await
                .map_err(map_store_error)?;
            room.admit();
            tx.save_room(room).await.map_err(map_store_error)?;
        }

        origin.mark_handled(decision);
        tx.save_notification(&origin)
            .await
            .map_err(map_store_error)?;
        let applicant_notice = Notification::decision(&board, &enrollment, decision, now);
        tx.insert_notification(&applicant_notice)
            .await
            .map_err(map_store_error)?;

        Ok(Decision {
            board,
            enrollment,
            applicant_notice,
            chat_room_id: admitted.map(|room| room.id),
        })
    }

    async fn respond(
        &self,
        request: RespondEnrollmentRequest,
        decision: AcceptStatus,
    ) -> Result<RespondEnrollmentResponse, Error> {
        let now = self.clock.utc();
        let mut tx = self.store.begin().await.map_err(map_store_error)?;
        let outcome = self
            .record_decision(tx.as_mut(), &request, decision, now)
            .await;
        let decided = finish(tx, outcome).await?;

        info!(
            enrollment_id = %decided.enrollment.id,
            board_id = %decided.board.id,
            status = %decided.enrollment.status,
            "enrollment decided"
        );

        if let Some(room_id) = decided.chat_room_id {
            self.announce_entry(room_id, &decided.enrollment.applicant_id)
                .await;
        }

        let push = PushMessage::new(
            decided.applicant_notice.title.clone(),
            decided.applicant_notice.body.clone(),
            PushPayload::EnrollmentEvent {
                board_id: decided.board.id,
                accept_status: Some(decision),
                chat_room_id: decided.chat_room_id,
            },
        );
        self.fanout
            .dispatch_enrollment_event(&decided.enrollment.applicant_id, &push)
            .await;

        Ok(RespondEnrollmentResponse {
            enrollment_id: decided.enrollment.id,
            status: decided.enrollment.status,
            chat_room_id: decided.chat_room_id,
        })
    }

    async fn announce_entry(&self, room_id: ChatRoomId, applicant_id: &UserId) {
        let name = match self.users.find_user(applicant_id).await {
            Ok(Some(user)) => user.nickname,
            Ok(None) => "A new member".to_owned(),
            Err(error) => {
                warn!(user_id = %applicant_id, error = %error, "nickname lookup failed");
                "A new member".to_owned()
            }
        };
        if let Err(error) = self
            .messages
            .send_system_message(
                room_id,
                &format!("{name} joined the chat."),
                *applicant_id,
                MessageType::Enter,
            )
            .await
        {
            warn!(room_id = %room_id, error = %error, "failed to log ENTER message");
        }
    }

    async fn received_page<F, Fut>(
        &self,
        request_page: &pagination::PageParams,
        fetch: F,
    ) -> Result<Paginated<Enrollment>, Error>
    where
        F: FnOnce(Option<EnrollmentKey>, usize) -> Fut,
        Fut: std::future::Future<
                Output = Result<Vec<Enrollment>, crate::domain::ports::EnrollmentRepositoryError>,
            >,
    {
        let after: Option<EnrollmentKey> = decode_cursor(request_page)?;
        let limit = request_page.limit();
        let rows = fetch(after, limit + 1)
            .await
            .map_err(map_enrollment_repository_error)?;
        let page = into_page(rows, limit, |row: &Enrollment| EnrollmentKey::from(row))?;

        let unseen: Vec<EnrollmentId> = page
            .data
            .iter()
            .filter(|enrollment| enrollment.is_new)
            .map(|enrollment| enrollment.id)
            .collect();
        if !unseen.is_empty() {
            self.enrollments
                .mark_seen(&unseen)
                .await
                .map_err(map_enrollment_repository_error)?;
        }
        Ok(page)
    }
}

fn enrollment_not_found(id: &EnrollmentId) -> Error {
    Error::not_found(format!("enrollment {id} not found"))
}

fn missing_notification(id: &EnrollmentId) -> Error {
    Error::integrity_violation(format!("notification for enrollment {id} is missing"))
}

#[async_trait]
impl EnrollmentCommand for EnrollmentService {
    async fn request(
        &self,
        request: RequestEnrollmentRequest,
    ) -> Result<RequestEnrollmentResponse, Error> {
        if request.description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(Error::invalid_request(format!(
                "description must be at most {MAX_DESCRIPTION_CHARS} characters"
            ))
            .with_details(serde_json::json!({ "field": "description", "code": "too_long" })));
        }
        let nickname = self.applicant_nickname(&request.applicant_id).await?;
        let now = self.clock.utc();

        let mut tx = self.store.begin().await.map_err(map_store_error)?;
        let outcome = self
            .record_request(tx.as_mut(), &request, &nickname, now)
            .await;
        let (board, enrollment, notice) = finish(tx, outcome).await?;

        info!(enrollment_id = %enrollment.id, board_id = %board.id, "enrollment requested");
        let push = PushMessage::new(
            notice.title,
            notice.body,
            PushPayload::EnrollmentEvent {
                board_id: board.id,
                accept_status: None,
                chat_room_id: None,
            },
        );
        self.fanout
            .dispatch_enrollment_event(&board.owner_id, &push)
            .await;

        Ok(RequestEnrollmentResponse {
            enrollment_id: enrollment.id,
            created_at: enrollment.created_at,
        })
    }

    async fn cancel(&self, request: CancelEnrollmentRequest) -> Result<(), Error> {
        let now = self.clock.utc();
        let mut tx = self.store.begin().await.map_err(map_store_error)?;
        let outcome = self.record_cancel(tx.as_mut(), &request, now).await;
        finish(tx, outcome).await?;
        info!(enrollment_id = %request.enrollment_id, "enrollment cancelled");
        Ok(())
    }

    async fn accept(
        &self,
        request: RespondEnrollmentRequest,
    ) -> Result<RespondEnrollmentResponse, Error> {
        self.respond(request, AcceptStatus::Accepted).await
    }

    async fn reject(
        &self,
        request: RespondEnrollmentRequest,
    ) -> Result<RespondEnrollmentResponse, Error> {
        self.respond(request, AcceptStatus::Rejected).await
    }
}

#[async_trait]
impl EnrollmentQuery for EnrollmentService {
    async fn list_sent(
        &self,
        request: ListEnrollmentsRequest,
    ) -> Result<Paginated<Enrollment>, Error> {
        let after: Option<EnrollmentKey> = decode_cursor(&request.page)?;
        let limit = request.page.limit();
        let rows = self
            .enrollments
            .list_sent(&request.user_id, after, limit + 1)
            .await
            .map_err(map_enrollment_repository_error)?;
        into_page(rows, limit, |row: &Enrollment| EnrollmentKey::from(row))
    }

    async fn list_received_for_owner(
        &self,
        request: ListEnrollmentsRequest,
    ) -> Result<Paginated<Enrollment>, Error> {
        let owner_id = request.user_id;
        self.received_page(&request.page, |after, limit| {
            let repo = Arc::clone(&self.enrollments);
            async move { repo.list_received_for_owner(&owner_id, after, limit).await }
        })
        .await
    }

    async fn list_received_for_board(
        &self,
        request: ListBoardEnrollmentsRequest,
    ) -> Result<Paginated<Enrollment>, Error> {
        let board = self
            .boards
            .find_board(&request.board_id)
            .await
            .map_err(map_directory_error)?
            .ok_or_else(|| Error::not_found(format!("board {} not found", request.board_id)))?;
        if !board.is_owned_by(&request.owner_id) {
            return Err(Error::forbidden("only the board owner may list its enrollments"));
        }
        let board_id = board.id;
        self.received_page(&request.page, |after, limit| {
            let repo = Arc::clone(&self.enrollments);
            async move { repo.list_received_for_board(&board_id, after, limit).await }
        })
        .await
    }

    async fn count_new(&self, owner_id: UserId) -> Result<u64, Error> {
        self.enrollments
            .count_new(&owner_id)
            .await
            .map_err(map_enrollment_repository_error)
    }
}

#[cfg(test)]
#[path = "enrollment_service_tests.rs"]
mod tests;
