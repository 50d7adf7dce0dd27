//! Driving port for chat message writes.

use async_trait::async_trait;

use crate::domain::{ChatRoomId, Error, Message, UserId};

/// Request to post a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    /// Target room.
    pub chat_room_id: ChatRoomId,
    /// Author; must participate in the room.
    pub sender_id: UserId,
    /// Message text.
    pub content: String,
}

/// Driving port for the message pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatMessageCommand: Send + Sync {
    /// Append, broadcast and fan out a chat message.
    async fn send(&self, request: SendMessageRequest) -> Result<Message, Error>;

    /// Move the caller's read marker to now.
    async fn mark_read(&self, user_id: UserId, chat_room_id: ChatRoomId) -> Result<(), Error>;

    /// Drop a room's whole message log; used by the stale-board cleanup job.
    async fn delete_all_messages(&self, chat_room_id: ChatRoomId) -> Result<u64, Error>;
}
