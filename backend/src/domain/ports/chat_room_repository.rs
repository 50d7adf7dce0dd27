//! Port for chat room reads and the single-row updates that need no lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ChatRoom, ChatRoomId, RoomMembership, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by chat room repository adapters.
    pub enum ChatRoomRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "chat room repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "chat room repository query failed: {message}",
    }
}

/// Active room joined with the caller's membership and board facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRoom {
    /// Room metadata.
    pub room: ChatRoom,
    /// The caller's active membership.
    pub membership: RoomMembership,
    /// Title of the room's board.
    pub board_title: String,
    /// Owner of the room's board.
    pub board_owner_id: UserId,
}

/// Port for chat room metadata and membership reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRoomRepository: Send + Sync {
    /// Fetch an active room together with the user's active membership.
    async fn find_member_room(
        &self,
        room_id: &ChatRoomId,
        user_id: &UserId,
    ) -> Result<Option<MemberRoom>, ChatRoomRepositoryError>;

    /// Every active room the user belongs to, most recently active first.
    async fn list_member_rooms(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<MemberRoom>, ChatRoomRepositoryError>;

    /// Active memberships of a room.
    async fn list_memberships(
        &self,
        room_id: &ChatRoomId,
    ) -> Result<Vec<RoomMembership>, ChatRoomRepositoryError>;

    /// Record the latest message on the room summary.
    ///
    /// Adapters ignore summaries older than the stored one so concurrent
    /// senders never move the summary backwards.
    async fn touch_last_message(
        &self,
        room_id: &ChatRoomId,
        sent_at: DateTime<Utc>,
        content: &str,
    ) -> Result<(), ChatRoomRepositoryError>;

    /// Move the user's read marker; returns `false` when no active membership
    /// exists.
    async fn mark_read(
        &self,
        room_id: &ChatRoomId,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, ChatRoomRepositoryError>;

    /// Toggle the user's push preference; returns `false` when no active
    /// membership exists.
    async fn set_notifications(
        &self,
        room_id: &ChatRoomId,
        user_id: &UserId,
        enabled: bool,
    ) -> Result<bool, ChatRoomRepositoryError>;

    /// Store the room image URL.
    async fn set_image(
        &self,
        room_id: &ChatRoomId,
        image_url: &str,
    ) -> Result<(), ChatRoomRepositoryError>;
}
