//! Driving port for chat message reads.

use async_trait::async_trait;
use pagination::{PageParams, Paginated};

use crate::domain::{ChatRoomId, Error, Message, UserId};

/// Page request over a room's message log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMessagesRequest {
    /// Caller; must participate in the room.
    pub user_id: UserId,
    /// Room to read.
    pub chat_room_id: ChatRoomId,
    /// Cursor and page size.
    pub page: PageParams,
}

/// Driving port for message reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatMessageQuery: Send + Sync {
    /// Messages newest first. Reading also marks the room as read.
    async fn list(&self, request: ListMessagesRequest) -> Result<Paginated<Message>, Error>;

    /// TALK messages from others since the caller's read marker.
    async fn unread_count(&self, user_id: UserId, chat_room_id: ChatRoomId)
    -> Result<u64, Error>;
}
