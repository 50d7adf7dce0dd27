//! Unit-of-work port for the transactional enrollment and room workflows.
//!
//! Every state change that touches more than one aggregate (accept, leave,
//! kick, room creation) runs inside one [`StoreTransaction`]. The `lock_*`
//! methods take an exclusive row lock that is held until `commit` or
//! `rollback`; callers acquire locks in the order enrollment, board, chat room
//! and must re-read state through the lock before deciding anything.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Board, BoardId, ChatRoom, ChatRoomId, Enrollment, EnrollmentId, Notification, RoomMembership,
    UserId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by companion store adapters.
    pub enum CompanionStoreError {
        /// Store connection could not be established.
        Connection { message: String } =>
            "companion store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "companion store query failed: {message}",
        /// A uniqueness constraint rejected the write.
        Conflict { message: String } =>
            "companion store constraint violated: {message}",
    }
}

/// Opens transactions over the relational companion data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompanionStore: Send + Sync {
    /// Start a transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, CompanionStoreError>;
}

/// One open transaction.
///
/// Dropping a transaction without calling `commit` discards its writes.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Read an active board without locking it.
    async fn find_board(&mut self, id: &BoardId) -> Result<Option<Board>, CompanionStoreError>;

    /// Lock and read an active board.
    async fn lock_board(&mut self, id: &BoardId) -> Result<Option<Board>, CompanionStoreError>;

    /// Write back counters, completion and deletion markers.
    async fn save_board(&mut self, board: &Board) -> Result<(), CompanionStoreError>;

    /// Lock and read an enrollment, including retired ones.
    async fn lock_enrollment(
        &mut self,
        id: &EnrollmentId,
    ) -> Result<Option<Enrollment>, CompanionStoreError>;

    /// Read the active enrollment for an applicant on a board.
    async fn find_active_enrollment(
        &mut self,
        board_id: &BoardId,
        applicant_id: &UserId,
    ) -> Result<Option<Enrollment>, CompanionStoreError>;

    /// Insert a new enrollment.
    ///
    /// Fails with [`CompanionStoreError::Conflict`] when an active enrollment
    /// for the same applicant and board already exists.
    async fn insert_enrollment(
        &mut self,
        enrollment: &Enrollment,
    ) -> Result<(), CompanionStoreError>;

    /// Write back status and markers.
    async fn save_enrollment(&mut self, enrollment: &Enrollment)
    -> Result<(), CompanionStoreError>;

    /// Soft-delete active enrollments on a board, optionally for one applicant.
    async fn soft_delete_enrollments(
        &mut self,
        board_id: &BoardId,
        applicant_id: Option<&UserId>,
        at: DateTime<Utc>,
    ) -> Result<u64, CompanionStoreError>;

    /// Read the active room of a board.
    async fn find_room_for_board(
        &mut self,
        board_id: &BoardId,
    ) -> Result<Option<ChatRoom>, CompanionStoreError>;

    /// Read an active room without locking it.
    async fn find_room(&mut self, id: &ChatRoomId)
    -> Result<Option<ChatRoom>, CompanionStoreError>;

    /// Lock and read an active room.
    async fn lock_room(&mut self, id: &ChatRoomId)
    -> Result<Option<ChatRoom>, CompanionStoreError>;

    /// Insert a new room.
    async fn insert_room(&mut self, room: &ChatRoom) -> Result<(), CompanionStoreError>;

    /// Write back the participant count and markers.
    async fn save_room(&mut self, room: &ChatRoom) -> Result<(), CompanionStoreError>;

    /// Read a user's active membership in a room.
    async fn find_membership(
        &mut self,
        room_id: &ChatRoomId,
        user_id: &UserId,
    ) -> Result<Option<RoomMembership>, CompanionStoreError>;

    /// Insert a new membership.
    async fn insert_membership(
        &mut self,
        membership: &RoomMembership,
    ) -> Result<(), CompanionStoreError>;

    /// Write back membership markers.
    async fn save_membership(
        &mut self,
        membership: &RoomMembership,
    ) -> Result<(), CompanionStoreError>;

    /// Soft-delete every active membership of a room.
    async fn soft_delete_memberships(
        &mut self,
        room_id: &ChatRoomId,
        at: DateTime<Utc>,
    ) -> Result<u64, CompanionStoreError>;

    /// Read the active notification announcing an enrollment.
    async fn find_notification_for_enrollment(
        &mut self,
        enrollment_id: &EnrollmentId,
    ) -> Result<Option<Notification>, CompanionStoreError>;

    /// Insert a notification.
    async fn insert_notification(
        &mut self,
        notification: &Notification,
    ) -> Result<(), CompanionStoreError>;

    /// Write back notification status and markers.
    async fn save_notification(
        &mut self,
        notification: &Notification,
    ) -> Result<(), CompanionStoreError>;

    /// Make every write visible and release the locks.
    async fn commit(self: Box<Self>) -> Result<(), CompanionStoreError>;

    /// Discard every write and release the locks.
    async fn rollback(self: Box<Self>) -> Result<(), CompanionStoreError>;
}
