//! PostgreSQL unit of work for the enrollment and room workflows.
//!
//! Each [`DieselStoreTransaction`] owns one pooled connection with an open
//! transaction. `lock_*` reads use `SELECT ... FOR UPDATE`, so concurrent
//! accepts on the same board serialize on the board row and the second one
//! observes the first one's capacity change.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager};
use tracing::warn;

use crate::domain::ports::{CompanionStore, CompanionStoreError, StoreTransaction};
use crate::domain::{
    Board, BoardId, ChatRoom, ChatRoomId, Enrollment, EnrollmentId, Notification, RoomMembership,
    UserId,
};

use super::diesel_error_mapping::{map_basic_pool_error, map_constrained_diesel_error};
use super::models::{
    BoardRow, BoardUpdate, ChatRoomRow, ChatRoomUpdate, EnrollmentRow, EnrollmentUpdate,
    MembershipRow, MembershipUpdate, NotificationRow, NotificationUpdate,
};
use super::pool::{DbPool, PoolError};
use super::schema::{boards, chat_rooms, enrollments, notifications, room_memberships};

/// Diesel-backed implementation of the companion store port.
#[derive(Clone)]
pub struct DieselCompanionStore {
    pool: DbPool,
}

impl DieselCompanionStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CompanionStoreError {
    map_basic_pool_error(error, CompanionStoreError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> CompanionStoreError {
    map_constrained_diesel_error(
        error,
        CompanionStoreError::query,
        CompanionStoreError::connection,
        CompanionStoreError::conflict,
    )
}

fn corrupt(message: String) -> CompanionStoreError {
    CompanionStoreError::query(format!("corrupt row: {message}"))
}

#[async_trait]
impl CompanionStore for DieselCompanionStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, CompanionStoreError> {
        let mut conn = self.pool.get_owned().await.map_err(map_pool_error)?;
        AnsiTransactionManager::begin_transaction(&mut *conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(Box::new(DieselStoreTransaction { conn }))
    }
}

/// One open PostgreSQL transaction.
///
/// Dropping it without `commit` leaves the transaction open on the
/// connection; the pool notices the broken transaction state and discards the
/// connection, which rolls the writes back server-side.
pub struct DieselStoreTransaction {
    conn: PooledConnection<'static, AsyncPgConnection>,
}

#[async_trait]
impl StoreTransaction for DieselStoreTransaction {
    async fn find_board(&mut self, id: &BoardId) -> Result<Option<Board>, CompanionStoreError> {
        let row = boards::table
            .find(id.as_uuid())
            .filter(boards::deleted_at.is_null())
            .select(BoardRow::as_select())
            .get_result(&mut *self.conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(Board::try_from).transpose().map_err(corrupt)
    }

    async fn lock_board(&mut self, id: &BoardId) -> Result<Option<Board>, CompanionStoreError> {
        let row = boards::table
            .find(id.as_uuid())
            .filter(boards::deleted_at.is_null())
            .select(BoardRow::as_select())
            .for_update()
            .get_result(&mut *self.conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(Board::try_from).transpose().map_err(corrupt)
    }

    async fn save_board(&mut self, board: &Board) -> Result<(), CompanionStoreError> {
        let update = BoardUpdate::try_from(board).map_err(corrupt)?;
        diesel::update(boards::table.find(board.id.as_uuid()))
            .set(&update)
            .execute(&mut *self.conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn lock_enrollment(
        &mut self,
        id: &EnrollmentId,
    ) -> Result<Option<Enrollment>, CompanionStoreError> {
        let row = enrollments::table
            .find(id.as_uuid())
            .select(EnrollmentRow::as_select())
            .for_update()
            .get_result(&mut *self.conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(Enrollment::try_from).transpose().map_err(corrupt)
    }

    async fn find_active_enrollment(
        &mut self,
        board_id: &BoardId,
        applicant_id: &UserId,
    ) -> Result<Option<Enrollment>, CompanionStoreError> {
        let row = enrollments::table
            .filter(enrollments::board_id.eq(board_id.as_uuid()))
            .filter(enrollments::applicant_id.eq(applicant_id.as_uuid()))
            .filter(enrollments::deleted_at.is_null())
            .select(EnrollmentRow::as_select())
            .first(&mut *self.conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(Enrollment::try_from).transpose().map_err(corrupt)
    }

    async fn insert_enrollment(
        &mut self,
        enrollment: &Enrollment,
    ) -> Result<(), CompanionStoreError> {
        diesel::insert_into(enrollments::table)
            .values(EnrollmentRow::from(enrollment))
            .execute(&mut *self.conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn save_enrollment(
        &mut self,
        enrollment: &Enrollment,
    ) -> Result<(), CompanionStoreError> {
        diesel::update(enrollments::table.find(enrollment.id.as_uuid()))
            .set(EnrollmentUpdate::from(enrollment))
            .execute(&mut *self.conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn soft_delete_enrollments(
        &mut self,
        board_id: &BoardId,
        applicant_id: Option<&UserId>,
        at: DateTime<Utc>,
    ) -> Result<u64, CompanionStoreError> {
        let active = enrollments::board_id
            .eq(*board_id.as_uuid())
            .and(enrollments::deleted_at.is_null());
        let updated = match applicant_id {
            Some(applicant_id) => {
                diesel::update(
                    enrollments::table
                        .filter(active)
                        .filter(enrollments::applicant_id.eq(*applicant_id.as_uuid())),
                )
                .set(enrollments::deleted_at.eq(at))
                .execute(&mut *self.conn)
                .await
            }
            None => {
                diesel::update(enrollments::table.filter(active))
                    .set(enrollments::deleted_at.eq(at))
                    .execute(&mut *self.conn)
                    .await
            }
        }
        .map_err(map_diesel_error)?;
        Ok(updated as u64)
    }

    async fn find_room_for_board(
        &mut self,
        board_id: &BoardId,
    ) -> Result<Option<ChatRoom>, CompanionStoreError> {
        let row = chat_rooms::table
            .filter(chat_rooms::board_id.eq(board_id.as_uuid()))
            .filter(chat_rooms::deleted_at.is_null())
            .select(ChatRoomRow::as_select())
            .first(&mut *self.conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(ChatRoom::try_from).transpose().map_err(corrupt)
    }

    async fn find_room(
        &mut self,
        id: &ChatRoomId,
    ) -> Result<Option<ChatRoom>, CompanionStoreError> {
        let row = chat_rooms::table
            .find(id.as_uuid())
            .filter(chat_rooms::deleted_at.is_null())
            .select(ChatRoomRow::as_select())
            .get_result(&mut *self.conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(ChatRoom::try_from).transpose().map_err(corrupt)
    }

    async fn lock_room(
        &mut self,
        id: &ChatRoomId,
    ) -> Result<Option<ChatRoom>, CompanionStoreError> {
        let row = chat_rooms::table
            .find(id.as_uuid())
            .filter(chat_rooms::deleted_at.is_null())
            .select(ChatRoomRow::as_select())
            .for_update()
            .get_result(&mut *self.conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(ChatRoom::try_from).transpose().map_err(corrupt)
    }

    async fn insert_room(&mut self, room: &ChatRoom) -> Result<(), CompanionStoreError> {
        let row = ChatRoomRow::try_from(room).map_err(corrupt)?;
        diesel::insert_into(chat_rooms::table)
            .values(row)
            .execute(&mut *self.conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn save_room(&mut self, room: &ChatRoom) -> Result<(), CompanionStoreError> {
        let update = ChatRoomUpdate::try_from(room).map_err(corrupt)?;
        diesel::update(chat_rooms::table.find(room.id.as_uuid()))
            .set(&update)
            .execute(&mut *self.conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_membership(
        &mut self,
        room_id: &ChatRoomId,
        user_id: &UserId,
    ) -> Result<Option<RoomMembership>, CompanionStoreError> {
        room_memberships::table
            .filter(room_memberships::chat_room_id.eq(room_id.as_uuid()))
            .filter(room_memberships::user_id.eq(user_id.as_uuid()))
            .filter(room_memberships::deleted_at.is_null())
            .select(MembershipRow::as_select())
            .first::<MembershipRow>(&mut *self.conn)
            .await
            .optional()
            .map(|row| row.map(RoomMembership::from))
            .map_err(map_diesel_error)
    }

    async fn insert_membership(
        &mut self,
        membership: &RoomMembership,
    ) -> Result<(), CompanionStoreError> {
        diesel::insert_into(room_memberships::table)
            .values(MembershipRow::from(membership))
            .execute(&mut *self.conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn save_membership(
        &mut self,
        membership: &RoomMembership,
    ) -> Result<(), CompanionStoreError> {
        diesel::update(room_memberships::table.find(membership.id.as_uuid()))
            .set(MembershipUpdate::from(membership))
            .execute(&mut *self.conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn soft_delete_memberships(
        &mut self,
        room_id: &ChatRoomId,
        at: DateTime<Utc>,
    ) -> Result<u64, CompanionStoreError> {
        let updated = diesel::update(
            room_memberships::table
                .filter(room_memberships::chat_room_id.eq(room_id.as_uuid()))
                .filter(room_memberships::deleted_at.is_null()),
        )
        .set(room_memberships::deleted_at.eq(at))
        .execute(&mut *self.conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(updated as u64)
    }

    async fn find_notification_for_enrollment(
        &mut self,
        enrollment_id: &EnrollmentId,
    ) -> Result<Option<Notification>, CompanionStoreError> {
        let row = notifications::table
            .filter(notifications::enrollment_id.eq(enrollment_id.as_uuid()))
            .filter(notifications::deleted_at.is_null())
            .order(notifications::created_at.asc())
            .select(NotificationRow::as_select())
            .first(&mut *self.conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(Notification::try_from).transpose().map_err(corrupt)
    }

    async fn insert_notification(
        &mut self,
        notification: &Notification,
    ) -> Result<(), CompanionStoreError> {
        diesel::insert_into(notifications::table)
            .values(NotificationRow::from(notification))
            .execute(&mut *self.conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn save_notification(
        &mut self,
        notification: &Notification,
    ) -> Result<(), CompanionStoreError> {
        diesel::update(notifications::table.find(notification.id.as_uuid()))
            .set(NotificationUpdate::from(notification))
            .execute(&mut *self.conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), CompanionStoreError> {
        AnsiTransactionManager::commit_transaction(&mut *self.conn)
            .await
            .map_err(map_diesel_error)
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), CompanionStoreError> {
        AnsiTransactionManager::rollback_transaction(&mut *self.conn)
            .await
            .map_err(|err| {
                warn!(error = %err, "rollback failed; connection will be discarded");
                map_diesel_error(err)
            })
    }
}
