//! Driving port for chat room reads.

use async_trait::async_trait;

use crate::domain::{ChatRoomId, Error, RoomOverview, UserId};

/// Driving port for room overviews annotated with unread counts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRoomQuery: Send + Sync {
    /// One room the caller participates in.
    async fn get_room(&self, user_id: UserId, chat_room_id: ChatRoomId)
    -> Result<RoomOverview, Error>;

    /// Every room the caller participates in, most recently active first.
    async fn list_rooms(&self, user_id: UserId) -> Result<Vec<RoomOverview>, Error>;
}
